//! rlenable - enable raw cloud instances for management

use std::process::ExitCode;

use clap::Parser;

use rlenable_cli::cli::Cli;
use rlenable_cli::output::json::format_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.wants_json();
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            match json.then(|| format_error(&message, "COMMAND_FAILED")) {
                Some(Ok(obj)) => println!("{obj}"),
                _ => eprintln!("Error: {message}"),
            }
            ExitCode::FAILURE
        }
    }
}
