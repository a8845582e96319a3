//! # UniBot CLI (`unibot`)
//!
//! Answers questions about a directory of university documents using
//! retrieval-augmented generation.
//!
//! ## Usage
//!
//! ```bash
//! unibot --config ./config/unibot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `unibot chat` | Interactive conversation (`reset` clears history, `exit` quits) |
//! | `unibot ask "<question>"` | Answer a single question and exit |
//! | `unibot index build` | Build the index if it does not exist |
//! | `unibot index rebuild` | Re-read the documents and replace the index |
//! | `unibot index status` | Show the stored index and whether documents changed |
//!
//! Logs go to stderr; set `RUST_LOG` (e.g. `RUST_LOG=unibot=debug`) to
//! change verbosity.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unibot::{commands, config};

/// UniBot: a document question-answering assistant.
#[derive(Parser)]
#[command(
    name = "unibot",
    about = "UniBot: answers questions from your documents with retrieval-augmented generation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/unibot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session.
    ///
    /// Builds the index on first run. Type `reset` (or `clear`) to forget
    /// the conversation and `exit` (or `quit`) to leave.
    Chat,

    /// Answer a single question without conversation history.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Manage the persisted passage index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Build the index if none exists at `index.path`.
    Build,
    /// Re-read the documents and replace the stored index.
    Rebuild,
    /// Show index metadata and whether the documents changed since the build.
    Status,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unibot=info,unibot_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Chat => commands::run_chat(&cfg).await?,
        Commands::Ask { question } => commands::run_ask(&cfg, &question).await?,
        Commands::Index { action } => match action {
            IndexAction::Build => commands::run_index_build(&cfg).await?,
            IndexAction::Rebuild => commands::run_index_rebuild(&cfg).await?,
            IndexAction::Status => commands::run_index_status(&cfg, std::io::stdout()).await?,
        },
    }

    Ok(())
}
