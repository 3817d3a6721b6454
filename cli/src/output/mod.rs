//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::{SilentReporter, TerminalReporter};

use console::Term;
use owo_colors::OwoColorize as _;
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        Self {
            styles: if use_colors {
                Styles::colored()
            } else {
                Styles::default()
            },
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Selected output mode for a command.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl<'a> Renderer<'a> {
    /// Pick the renderer for the `--json` flag.
    #[must_use]
    pub fn new(ctx: &'a OutputContext, json: bool) -> Self {
        if json {
            Self::Json(JsonRenderer)
        } else {
            Self::Human(HumanRenderer::new(ctx))
        }
    }

    /// Whether machine-readable output was requested.
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// Render an enablement report.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_report(&self, report: &crate::domain::EnableReport) -> anyhow::Result<()> {
        match self {
            Self::Human(r) => {
                r.render_report(report);
                Ok(())
            }
            Self::Json(r) => r.render_report(report),
        }
    }

    /// Render configuration entries.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(
        &self,
        entries: &[(&'static str, String)],
        path: &std::path::Path,
    ) -> anyhow::Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config(entries, path);
                Ok(())
            }
            Self::Json(r) => {
                let map: serde_json::Map<String, serde_json::Value> = entries
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), serde_json::Value::String(v.clone())))
                    .collect();
                r.render(&serde_json::json!({
                    "path": path.display().to_string(),
                    "config": map,
                }))
            }
        }
    }

    /// Render a user-data payload.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_payload(&self, payload: &str, encoded: bool) -> anyhow::Result<()> {
        match self {
            Self::Human(r) => {
                r.render_payload(payload);
                Ok(())
            }
            Self::Json(r) => r.render(&serde_json::json!({
                "payload": payload,
                "encoding": if encoded { "base64" } else { "raw" },
            })),
        }
    }

    /// Render version information.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> anyhow::Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(r) => r.render(&serde_json::json!({ "version": version })),
        }
    }
}
