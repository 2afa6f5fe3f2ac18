//! `docs-rag-load`: add the files of a data directory to a collection.

use clap::Parser;
use std::path::PathBuf;

use docs_rag::config;
use docs_rag::ingest::{run_load, LoadOptions};
use docs_rag::logging;
use docs_rag::progress::ProgressMode;

/// Load documents from a directory into a collection.
#[derive(Parser)]
#[command(name = "docs-rag-load", version)]
struct Cli {
    /// The directory where your text files are stored.
    #[arg(long = "data_directory", default_value = "docs")]
    data_directory: PathBuf,

    /// The name of the collection.
    #[arg(long = "collection_name", default_value = "docs_collection")]
    collection_name: String,

    /// The directory where the collection is stored.
    #[arg(long = "persist_directory", default_value = "chroma_storage")]
    persist_directory: PathBuf,

    /// Settings file; only its `embedding` section is read, and only if
    /// the file exists.
    #[arg(long, default_value = "settings.yaml")]
    config: PathBuf,

    /// Progress on stderr. Defaults to human when stderr is a terminal.
    #[arg(long, value_enum)]
    progress: Option<ProgressMode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("warn");
    let cli = Cli::parse();

    let embedding = config::load_embedding_config(&cli.config)?;
    let opts = LoadOptions {
        data_directory: cli.data_directory,
        collection_name: cli.collection_name,
        persist_directory: cli.persist_directory,
        embedding,
        progress: cli.progress.unwrap_or_else(ProgressMode::default_for_tty),
    };

    run_load(&opts).await?;
    Ok(())
}
