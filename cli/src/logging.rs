//! Diagnostic logging setup.
//!
//! Logs go to stderr so `--json` output on stdout stays machine readable.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "RLENABLE_LOG";

/// Default filter for a `-v` count.
#[must_use]
pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "rlenable_cli=debug,info",
        _ => "rlenable_cli=trace,debug",
    }
}

/// Install the global subscriber. `RLENABLE_LOG` wins over `-v`.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .try_init();
}
