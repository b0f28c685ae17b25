//! Inspect and maintain a memory store from the command line
//!
//! Usage:
//!   memctl recent [-n 10]       - Latest conversations
//!   memctl show <id>            - One conversation as JSON
//!   memctl search <query>       - Conversations matching a query
//!   memctl files <path>         - Interaction history of a file
//!   memctl context <query>      - The context block a query would get
//!   memctl clear --yes          - Wipe the store

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use memory_core::context::format::truncate;
use memory_core::observability::setup_logging;
use memory_core::storage::ConversationRecord;
use memory_core::{MemoryConfig, MemoryEngine};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memctl")]
#[command(about = "Inspect and maintain a memory-core store")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store file, overriding the config
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the most recent conversations
    Recent {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Print one conversation as JSON
    Show { id: String },

    /// Search conversations by text
    Search { query: String },

    /// Show the interaction history of a file
    Files { path: String },

    /// Render the prompt context for a query
    Context { query: String },

    /// Delete every stored record
    Clear {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MemoryConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(store) = cli.store {
        config = config.with_store_path(store);
    }
    setup_logging(config.log_format);

    let mut engine = MemoryEngine::open(config).context("failed to open memory store")?;

    match cli.command {
        Commands::Recent { count } => {
            for conv in engine.store().get_recent_conversations(count) {
                print_summary(conv);
            }
        }
        Commands::Show { id } => {
            let Some(conv) = engine.store().get_conversation(&id) else {
                bail!("no conversation with id {}", id);
            };
            println!("{}", serde_json::to_string_pretty(conv)?);
        }
        Commands::Search { query } => {
            let hits = engine.store().search_conversations(&query);
            if hits.is_empty() {
                println!("No conversations match {:?}", query);
            }
            for conv in hits {
                print_summary(conv);
            }
        }
        Commands::Files { path } => {
            let history = engine.store().get_file_history(&path);
            if history.is_empty() {
                println!("No interactions logged for {}", path);
            }
            for interaction in history {
                println!(
                    "{}  {:<6}  {}",
                    interaction.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    interaction.action,
                    interaction.conversation_id.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Context { query } => {
            println!("{}", engine.context_for_prompt(&query));
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("refusing to clear {} without --yes", engine.store().path().display());
            }
            engine.clear();
            engine.flush().context("failed to write cleared store")?;
            println!("Cleared {}", engine.store().path().display());
        }
    }

    Ok(())
}

fn print_summary(conv: &ConversationRecord) {
    println!(
        "{}  {}  {}",
        conv.id,
        conv.timestamp.format("%Y-%m-%d %H:%M"),
        truncate(&conv.user_input, 60)
    );
}
