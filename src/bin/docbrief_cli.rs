use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use docbrief::{
    classifier::classify,
    config, logging,
    document::{Document, DocumentKind},
    pipeline::{SummaryApi, SummaryInput, SummaryService},
};

#[derive(Parser)]
#[command(
    name = "docbrief-cli",
    about = "Classify or summarize documents from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report whether a PDF has a usable text layer. Runs offline.
    Classify {
        #[arg(long)]
        file: PathBuf,
    },
    /// Run the full summarization pipeline against the configured providers.
    Summarize {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Classify { file } => classify_file(&file),
        Command::Summarize { file } => summarize_file(&file).await,
    }
}

fn classify_file(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let verdict = classify(&bytes);
    println!(
        "{}: {} ({} chars, {} words)",
        path.display(),
        if verdict.is_native_text {
            "native text"
        } else {
            "needs OCR"
        },
        verdict.char_count,
        verdict.word_count
    );
    Ok(())
}

async fn summarize_file(path: &Path) -> Result<()> {
    config::init_config();
    logging::init_tracing();

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
    let kind = DocumentKind::from_file_name(&file_name)
        .ok_or_else(|| anyhow!("{file_name}: only PDF and PowerPoint files are supported"))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let service = SummaryService::from_config(config::get_config())
        .await
        .context("initializing providers")?;
    let outcome = service
        .summarize(SummaryInput::Direct(Document::new(file_name, kind, bytes)))
        .await?;

    eprintln!("source: {}", outcome.source);
    println!("{}", outcome.summary);
    Ok(())
}
