//! pdf-rag CLI
//!
//! Thin command-line wrapper around [`PdfQaClient`]. Results are printed as
//! JSON on stdout; logs go to stderr and are filtered with `RUST_LOG`
//! (e.g. `RUST_LOG=pdf_rag=debug pdf-rag list`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_rag::config::Config;
use pdf_rag::paths::PlatformPaths;
use pdf_rag::{AskRequest, DocumentId, IngestRequest, PdfQaClient};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(name = "pdf-rag")]
#[command(about = "Ask questions about uploaded PDF documents")]
#[command(version = VERSION)]
struct Cli {
    /// Path to config file (default: platform config dir)
    #[arg(short, long, global = true, env = "PDF_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload and index a PDF
    Ingest {
        /// PDF file to ingest
        file: PathBuf,

        /// Document id to use (re-ingesting an id replaces it)
        #[arg(long)]
        id: Option<String>,
    },

    /// Ask a question about an ingested document
    Ask {
        /// Document id
        id: String,

        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Number of chunks used as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Delete a document, its upload and its index
    Delete {
        /// Document id
        id: String,
    },

    /// List ingested documents
    List,

    /// Show one document record
    Show {
        /// Document id
        id: String,
    },

    /// Print the effective configuration
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Config { init } => show_config(config, init),
        Commands::Ingest { file, id } => {
            let client = PdfQaClient::with_config(config).await?;
            ingest(&client, file, id).await
        }
        Commands::Ask {
            id,
            question,
            top_k,
        } => {
            let client = PdfQaClient::with_config(config).await?;
            let response = client
                .ask(AskRequest {
                    document_id: DocumentId::parse(&id)?,
                    question: question.join(" "),
                    top_k,
                })
                .await?;
            print_json(&response)
        }
        Commands::Delete { id } => {
            let client = PdfQaClient::with_config(config).await?;
            let id = DocumentId::parse(&id)?;
            client.delete_document(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Commands::List => {
            let client = PdfQaClient::with_config(config).await?;
            print_json(&client.list_documents().await)
        }
        Commands::Show { id } => {
            let client = PdfQaClient::with_config(config).await?;
            let record = client.get_document(&DocumentId::parse(&id)?).await?;
            print_json(&record)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => Config::new()?,
    };

    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn ingest(client: &PdfQaClient, file: PathBuf, id: Option<String>) -> Result<()> {
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let document_id = id.as_deref().map(DocumentId::parse).transpose()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling ingestion");
            on_interrupt.cancel();
        }
    });

    let response = client
        .ingest_document_with_cancellation(
            IngestRequest {
                filename,
                bytes,
                document_id,
            },
            &cancel,
        )
        .await?;
    print_json(&response)
}

fn show_config(config: Config, init: bool) -> Result<()> {
    if init {
        let path = PlatformPaths::default_config_path();
        if path.exists() {
            tracing::info!("Config already exists at {}", path.display());
        } else {
            Config::default().save(&path)?;
            eprintln!("Wrote {}", path.display());
        }
    }

    let mut shown = config;
    if shown.generation.api_key.is_some() {
        shown.generation.api_key = Some("<redacted>".to_string());
    }
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
