//! tracktest CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod course;

#[derive(Parser)]
#[command(name = "tracktest", version, about = "Assessment attempt tracking and scoring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a course definition
    Validate {
        /// Path to the course definition TOML
        #[arg(long)]
        course: PathBuf,
    },

    /// Play a scripted learner through a course
    Simulate {
        /// Path to the course definition TOML
        #[arg(long)]
        course: PathBuf,

        /// Path to the simulation script TOML
        #[arg(long)]
        script: PathBuf,

        /// State file to resume from and persist to (in-memory if omitted)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Write a JSON report of the run
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the attempt history held in a saved state file
    Inspect {
        /// Path to a state file written by `simulate --state`
        #[arg(long)]
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tracktest=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { course } => commands::validate::execute(course),
        Commands::Simulate {
            course,
            script,
            state,
            output,
        } => commands::simulate::execute(course, script, state, output).await,
        Commands::Inspect { state } => commands::inspect::execute(state),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
