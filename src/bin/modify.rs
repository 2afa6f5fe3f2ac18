//! `docs-rag-modify`: update or delete ingested files.

use clap::Parser;
use std::path::PathBuf;

use docs_rag::config;
use docs_rag::logging;
use docs_rag::modify::{run_modify, split_filenames, ModifyAction};

/// Modify document files in a collection.
#[derive(Parser)]
#[command(name = "docs-rag-modify", version)]
struct Cli {
    /// Path to the settings file (YAML or TOML).
    #[arg(long, default_value = "settings.yaml")]
    config: PathBuf,

    /// The document files (comma-delimited) to re-read from the documents directory.
    #[arg(short = 'u', long, conflicts_with = "delete")]
    update: Option<String>,

    /// The document files (comma-delimited) to remove from the collection.
    #[arg(short = 'd', long)]
    delete: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("warn");
    let cli = Cli::parse();

    let action = match (cli.update, cli.delete) {
        (Some(files), _) => ModifyAction::Update(split_filenames(&files)),
        (None, Some(files)) => ModifyAction::Delete(split_filenames(&files)),
        (None, None) => {
            println!("The parameter is insufficient!");
            return Ok(());
        }
    };

    let cfg = config::load_config(&cli.config)?;
    run_modify(&cfg, &action).await?;
    Ok(())
}
