//! Conductor - multi-agent question answering

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;
mod eval;

use commands::{ask_command, init_command, seed_command, status_command};
use eval::{eval_judge_command, eval_run_command};

/// Conductor - ask questions answered by a team of agents
#[derive(Parser)]
#[command(name = "conductor")]
#[command(about = "◆ Multi-agent question answering over a database, the web and a calculator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and data directory
    Init,
    /// Reset and seed the demo database
    Seed {
        /// Number of users
        #[arg(long, default_value_t = 30)]
        users: usize,
        /// Number of projects
        #[arg(long, default_value_t = 30)]
        projects: usize,
        /// Database file (defaults to the configured path)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Ask the coordinator a question
    Ask {
        /// Question to ask; omit for interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Show system status
    Status,
    /// Batch evaluation
    Eval {
        #[command(subcommand)]
        command: EvalCommands,
    },
}

#[derive(Subcommand)]
enum EvalCommands {
    /// Answer every question of a SQuAD-style file
    Run {
        /// SQuAD-style JSON questions
        #[arg(short, long)]
        questions: PathBuf,
        /// JSONL output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Judge recorded answers against the expected ones
    Judge {
        /// JSONL file written by `eval run`
        #[arg(short, long)]
        input: PathBuf,
        /// JSONL output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Seed {
            users,
            projects,
            path,
        } => seed_command(users, projects, path).await,
        Commands::Ask { message } => ask_command(message).await,
        Commands::Status => status_command().await,
        Commands::Eval { command } => match command {
            EvalCommands::Run { questions, output } => eval_run_command(questions, output).await,
            EvalCommands::Judge { input, output } => eval_judge_command(input, output).await,
        },
    };

    if let Err(e) = result {
        error!("◆ {:#}", e);
        std::process::exit(1);
    }
}
