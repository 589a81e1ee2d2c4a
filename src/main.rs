//! # opsmate CLI
//!
//! The `opsmate` binary is the primary interface for the assistant. It
//! provides commands for database initialization, knowledge-base
//! ingestion, retrieval inspection, one-shot question answering, and the
//! interactive chat loop.
//!
//! ## Usage
//!
//! ```bash
//! opsmate --config ./config/opsmate.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `opsmate init` | Create the SQLite database and schema |
//! | `opsmate ingest <path>` | Ingest a file or directory of documents |
//! | `opsmate retrieve "<query>"` | Print the top-k chunks for a query |
//! | `opsmate ask "<query>"` | Answer a question over the ingested corpus |
//! | `opsmate chat` | Start the interactive assistant |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use opsmate::{chat, config, db, ingest, retrieve};

/// opsmate — a platform operations assistant with intent-routed actions
/// and retrieval-augmented answers.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/opsmate.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "opsmate",
    about = "opsmate — a platform operations assistant over your runbooks",
    version,
    long_about = "opsmate ingests operational documents (markdown, PDF, DOCX, XLSX, JSON), \
    chunks and embeds them into a local vector index, and answers questions grounded in the \
    retrieved context. Operational requests (restart / status / logs / notify) are routed \
    through a keyword-classified dialogue machine instead."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/opsmate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the chunk and vector tables.
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Ingest documents into the knowledge base.
    ///
    /// Extracts text from each supported file (txt, md, pdf, docx, xlsx,
    /// json), splits it into overlapping chunks, embeds every chunk, and
    /// writes the batch to the vector index. Re-ingesting a document
    /// replaces its previous chunks.
    Ingest {
        /// A file, or a directory to walk recursively.
        path: PathBuf,
    },

    /// Print the top-k chunks retrieved for a query.
    ///
    /// Useful for inspecting what context `ask` would be grounded on.
    Retrieve {
        /// The query text.
        query: String,

        /// Override the configured number of chunks to return.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Answer a question over the ingested corpus.
    ///
    /// Retrieves the top-k chunks, then makes one generation call with
    /// the retrieved context and the question. Prints a fixed message
    /// when no relevant context is found.
    Ask {
        /// The question text.
        query: String,
    },

    /// Start the interactive assistant.
    ///
    /// Each line is one turn: operational requests (restart / status /
    /// logs / send email) run through the dialogue machine; anything else
    /// is answered from the knowledge base when embedding and generation
    /// providers are configured.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            db::run_init(&cfg).await?;
        }
        Commands::Ingest { path } => {
            ingest::run_ingest(&cfg, &path).await?;
        }
        Commands::Retrieve { query, top_k } => {
            retrieve::run_retrieve(&cfg, &query, top_k).await?;
        }
        Commands::Ask { query } => {
            retrieve::run_ask(&cfg, &query).await?;
        }
        Commands::Chat => {
            chat::run_chat(&cfg).await?;
        }
    }

    Ok(())
}
