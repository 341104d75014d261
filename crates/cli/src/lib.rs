pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "relay",
    about = "Relay gateway operator CLI",
    long_about = "Inspect routing decisions, dispatch one-off questions, check backend readiness, and manage the internal tool token.",
    after_help = "Examples:\n  relay classify \"quiz me on chapter 3\"\n  relay ask \"What is RAG?\"\n  relay doctor --json\n  relay config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Show which tool a message would be routed to, without dispatching it")]
    Classify {
        message: String,
        #[arg(long, help = "Treat the message as having a media attachment")]
        media: bool,
    },
    #[command(about = "Dispatch one message through the configured gateway and print the envelope")]
    Ask {
        message: String,
        #[arg(long, help = "Treat the message as having a media attachment")]
        media: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and check that the RAG backend is reachable")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Generate a random shared token for the tool-protocol endpoint")]
    Token,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Classify { message, media } => commands::classify::run(&message, media),
        Command::Ask { message, media } => commands::ask::run(&message, media),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Token => commands::token::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
