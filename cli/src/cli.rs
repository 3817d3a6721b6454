//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Drive raw cloud instances through stop, user-data injection and restart
#[derive(Parser)]
#[command(
    name = "rlenable",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Enable a batch of running instances
    Enable(commands::enable::EnableArgs),

    /// Run the enablement workflow against an in-memory cloud
    Simulate(commands::simulate::SimulateArgs),

    /// Print the enablement user-data for one server
    Payload(commands::payload::PayloadArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Whether JSON output was requested; used by `main` to format errors.
    #[must_use]
    pub fn wants_json(&self) -> bool {
        self.json
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            verbose,
            command,
        } = self;

        crate::logging::init(verbose);

        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes, verbose },
        });

        match command {
            Command::Enable(args) => commands::enable::run(&app, args).await,
            Command::Simulate(args) => commands::simulate::run(&app, args).await,
            Command::Payload(args) => commands::payload::run(&app, &args),
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}
