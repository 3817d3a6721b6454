//! JSON output helpers.
//!
//! Every `--json` code path prints one pretty-printed JSON document on
//! stdout. Failures print the error object from [`format_error`].

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::enablement::EnableReport;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Renders domain types as JSON documents on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Print any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// Print an enablement report with its summary counts.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_report(&self, report: &EnableReport) -> Result<()> {
        self.render(&serde_json::json!({
            "report": report,
            "summary": {
                "members": report.members.len(),
                "apply_failures": report.apply_failures(),
                "stranded": report.stranded(),
                "clean": report.is_clean(),
            }
        }))
    }
}
