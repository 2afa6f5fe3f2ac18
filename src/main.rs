//! # docs-rag chat server (`docs-rag-chat`)
//!
//! Serves the retrieval-augmented chat page and API for a collection built
//! with `docs-rag-load`.
//!
//! ```bash
//! docs-rag-chat --config settings.yaml
//! docs-rag-chat --config settings.yaml --bind 127.0.0.1:8080
//! ```

use clap::Parser;
use std::path::PathBuf;

use docs_rag::{config, logging, server};

/// Chat with your documents through an OpenAI-compatible model.
#[derive(Parser)]
#[command(name = "docs-rag-chat", version)]
struct Cli {
    /// Path to the settings file (YAML or TOML).
    #[arg(long, default_value = "settings.yaml")]
    config: PathBuf,

    /// Listen address, overriding `server.bind`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("info");
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    server::run_server(&cfg, cli.bind).await
}
