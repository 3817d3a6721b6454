//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::enablement::{ConfigureStatus, EnableReport, PhaseRecord};
use crate::domain::instance::InstanceState;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        println!("rlenable {version}");
    }

    /// Render the outcome of an enablement run.
    pub fn render_report(&self, report: &EnableReport) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header(&format!("Enablement of {}", report.deployment));
        self.ctx.kv(
            "Duration:",
            &format_elapsed(report.finished_at - report.started_at),
        );
        println!();

        self.ctx.header("Phases:");
        self.render_phases(&report.phases);
        println!();

        self.ctx.header("Members:");
        for member in &report.members {
            match &member.configure {
                ConfigureStatus::Applied { payload_sha256 } => self.ctx.success(&format!(
                    "{} ({}) user-data {}",
                    member.display_name,
                    member.resource_uid,
                    short_digest(payload_sha256).style(self.ctx.styles.dim)
                )),
                ConfigureStatus::Failed { reason } => self.ctx.warn(&format!(
                    "{} ({}) not configured: {reason}",
                    member.display_name, member.resource_uid
                )),
            }
        }
        println!();

        self.ctx.header("Servers:");
        for server in &report.servers {
            let line = format!("{:<24} {}", server.name, server.state);
            if server.state == InstanceState::Operational {
                self.ctx.success(&line);
            } else {
                self.ctx.warn(&line);
            }
        }

        if report.is_clean() {
            println!();
            self.ctx.success("All servers enabled.");
        } else {
            println!();
            self.ctx.warn(&format!(
                "{} apply failure(s), {} stranded server(s).",
                report.apply_failures(),
                report.stranded()
            ));
        }
    }

    /// Render the phase history, one line per phase.
    fn render_phases(&self, phases: &[PhaseRecord]) {
        if self.ctx.quiet {
            return;
        }
        for record in phases {
            self.ctx.kv(
                &format!("{:<22}", record.phase.to_string()),
                &record.entered_at.format("%H:%M:%S").to_string(),
            );
        }
    }

    /// Render the current configuration.
    pub fn render_config(&self, entries: &[(&'static str, String)], path: &std::path::Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        for (key, value) in entries {
            println!("  {:<38} {value}", format!("{key}:"));
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["RLENABLE_CONFIG", "RLENABLE_CREDENTIALS", "RLENABLE_LOG", "NO_COLOR"] {
            println!(
                "    {:<22} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
    }

    /// Render a user-data payload.
    pub fn render_payload(&self, payload: &str) {
        println!("{payload}");
    }
}

/// First 12 hex digits of a digest.
#[must_use]
pub fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

/// Format an elapsed duration as `1h 2m 3s`, `2m 3s`, or `3s`.
#[must_use]
pub fn format_elapsed(elapsed: chrono::TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m {s}s"),
        _ => format!("{h}h {m}m {s}s"),
    }
}
