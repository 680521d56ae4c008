//! # doclens CLI (`lens`)
//!
//! ## Usage
//!
//! ```bash
//! lens --config ./config/lens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lens init` | Create the SQLite cache and run schema migrations |
//! | `lens estimate <file>` | Token count, processing time, single-session fit |
//! | `lens chunk <file>` | Print the chunks a document splits into |
//! | `lens analyze <file>` | Summarize, classify, or extract entities |
//! | `lens library <dir>` | List documents with token counts and cache state |
//! | `lens cache list` | List cached analyses |
//! | `lens cache show <hash>` | Show one cached record |
//! | `lens cache delete <hash>` | Remove one cached record |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use doclens::chunk::ChunkStrategy;
use doclens::chunk_cmd::ChunkOverrides;
use doclens::progress::ProgressMode;
use doclens::{analyze, cache_cmd, chunk_cmd, config, library, migrate};
use doclens_core::models::AnalysisKind;

/// doclens CLI: budget-aware document analysis with a local cache.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. `estimate` and `chunk` fall back to defaults when it is missing.
#[derive(Parser)]
#[command(
    name = "lens",
    about = "doclens: chunk long documents to fit a model's context window and cache the analyses",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lens.toml")]
    config: PathBuf,

    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Progress output on stderr: off, human, json.
    ///
    /// Defaults to human when stderr is a terminal, otherwise off.
    #[arg(long, global = true)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the cache database. Safe to run repeatedly.
    Init,

    /// Estimate tokens, processing time, and chunk count for a document.
    Estimate {
        file: PathBuf,

        /// Token ceiling per session (default: chunking.max_tokens).
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Split a document into chunks and print them.
    Chunk {
        file: PathBuf,

        #[arg(long)]
        max_tokens: Option<usize>,

        /// `sentences` or `paragraphs` (default: chunking.strategy).
        #[arg(long)]
        strategy: Option<ChunkStrategy>,

        /// Do not repeat trailing sentences at the start of the next chunk.
        #[arg(long)]
        no_overlap: bool,

        #[arg(long)]
        json: bool,
    },

    /// Analyze a document and cache the result.
    Analyze {
        file: PathBuf,

        /// `summary`, `quick`, or `entities`.
        #[arg(long, default_value = "summary")]
        kind: AnalysisKind,

        /// Ignore a cached result and regenerate.
        #[arg(long)]
        force: bool,

        #[arg(long)]
        json: bool,
    },

    /// List the documents under a directory.
    Library { dir: PathBuf },

    /// Inspect or prune the analysis cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached analyses, most recently updated first.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one cached record by hash or unique hash prefix.
    Show {
        hash: String,

        #[arg(long)]
        json: bool,
    },
    /// Delete one cached record by hash or unique hash prefix.
    Delete { hash: String },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("doclens=debug,lens=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    // Commands that run without a config file
    match &cli.command {
        Commands::Estimate { file, max_tokens } => {
            let cfg = config::load_or_minimal(&cli.config)?;
            return chunk_cmd::run_estimate(&cfg, file, *max_tokens);
        }
        Commands::Chunk {
            file,
            max_tokens,
            strategy,
            no_overlap,
            json,
        } => {
            let cfg = config::load_or_minimal(&cli.config)?;
            let overrides = ChunkOverrides {
                max_tokens: *max_tokens,
                strategy: *strategy,
                no_overlap: *no_overlap,
            };
            return chunk_cmd::run_chunk(&cfg, file, &overrides, *json);
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Analyze {
            file,
            kind,
            force,
            json,
        } => {
            analyze::run_analyze(&cfg, &file, kind, force, json, progress).await?;
        }
        Commands::Library { dir } => {
            library::run_library(&cfg, &dir).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::List { json } => cache_cmd::run_list(&cfg, json).await?,
            CacheAction::Show { hash, json } => cache_cmd::run_show(&cfg, &hash, json).await?,
            CacheAction::Delete { hash } => cache_cmd::run_delete(&cfg, &hash).await?,
        },
        Commands::Estimate { .. } | Commands::Chunk { .. } => {}
    }

    Ok(())
}
