//! Steer CLI - Command-line interface for a run's command store
//!
//! Lets an operator enqueue commands for a running training loop and
//! inspect the responses the dispatcher has written back.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use steer::commands::storage::CommandStore;
use steer::commands::{CommandQueue, DEFAULT_FILE_NAME, Schedule};

#[derive(Parser)]
#[command(name = "steer")]
#[command(about = "Send commands to a running training loop", long_about = None)]
struct Cli {
    /// Run output directory holding the command store
    #[arg(short, long, default_value = "result")]
    out: PathBuf,

    /// Store file name inside the output directory
    #[arg(long, default_value = DEFAULT_FILE_NAME)]
    file_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a pending command
    Enqueue {
        /// Receiver name (e.g. take_snapshot, adjust_hyperparams)
        name: String,

        /// Request body as JSON
        #[arg(long)]
        body: Option<String>,

        /// Run when the epoch counter equals this value
        #[arg(long, conflicts_with = "iteration")]
        epoch: Option<i64>,

        /// Run when the iteration counter equals this value
        #[arg(long)]
        iteration: Option<i64>,
    },

    /// List commands as JSON
    List {
        /// Only show commands without a response
        #[arg(long)]
        pending: bool,
    },

    /// Show a single command as JSON
    Show {
        /// Command id (UUID)
        id: String,
    },

    /// Delete the command store
    Clear,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let queue = CommandQueue::new(CommandStore::in_dir(&cli.out, &cli.file_name));

    match cli.command {
        Commands::Enqueue {
            name,
            body,
            epoch,
            iteration,
        } => {
            let body = body
                .map(|text| serde_json::from_str::<serde_json::Value>(&text))
                .transpose()
                .context("Request body is not valid JSON")?;
            let schedule = match (epoch, iteration) {
                (Some(epoch), _) => Some(Schedule::epoch(epoch)),
                (None, Some(iteration)) => Some(Schedule::iteration(iteration)),
                (None, None) => None,
            };

            let record = queue.enqueue(name, body, schedule)?;
            if let Some(id) = record.id() {
                println!("{}", id);
            }
        }

        Commands::List { pending } => {
            let records = if pending {
                queue.pending()?
            } else {
                queue.list()?
            };
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Commands::Show { id } => {
            let id = uuid::Uuid::parse_str(&id).with_context(|| format!("Invalid id {}", id))?;
            match queue.find(id)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => bail!("No command with id {}", id),
            }
        }

        Commands::Clear => {
            queue.clear()?;
            println!("Cleared {:?}", queue.store().path());
        }
    }

    Ok(())
}
