//! convo-rag command line
//!
//! Run with: cargo run -p convo-rag -- chat

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use convo_rag::ingestion::Ingestor;
use convo_rag::session::{ChatSession, RustylineSource, SessionLoop};
use convo_rag::{ProviderSet, RagConfig};

/// Conversational question answering over your indexed documents
#[derive(Parser, Debug)]
#[command(name = "convo-rag", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start an interactive chat session (default)
    Chat,
    /// Index documents (.pdf, .txt, .md) into the vector index
    Ingest {
        /// Files to index
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Check provider health and embedding dimensions
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they never mix with the chat on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "convo_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = RagConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.backend);
    tracing::info!("  - Embedding dimensions: {}", config.embedding_dimensions());
    tracing::info!("  - Top K: {}", config.retrieval.top_k);

    let providers = ProviderSet::from_config(&config)
        .await
        .context("Failed to initialise providers")?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&config, &providers).await,
        Command::Ingest { files } => ingest(&config, &providers, &files).await,
        Command::Check => check(&config, &providers).await,
    }
}

async fn chat(config: &RagConfig, providers: &ProviderSet) -> anyhow::Result<ExitCode> {
    let session = ChatSession::from_providers(providers, config);

    if config.session.verify_dimensions {
        session
            .retriever()
            .verify_dimensions()
            .await
            .context("Embedding and index dimensions do not match")?;
    }

    println!(
        "{}",
        style("Conversational document Q&A").bold().cyan()
    );
    println!(
        "{}",
        style(format!(
            "chat: {} ({})  embeddings: {}  index: {}",
            providers.llm.name(),
            providers.llm.model(),
            providers.embedder.name(),
            providers.vector_store.name()
        ))
        .dim()
    );

    let input = RustylineSource::new()?;
    let mut repl = SessionLoop::new(session, input, std::io::stdout())
        .with_prompt(config.session.prompt.clone())
        .with_exit_keyword(config.session.exit_keyword.clone());

    let outcome = repl.run().await?;
    tracing::debug!("Answered {} questions", outcome.turns_completed);

    Ok(ExitCode::from(outcome.status.code() as u8))
}

async fn ingest(
    config: &RagConfig,
    providers: &ProviderSet,
    files: &[PathBuf],
) -> anyhow::Result<ExitCode> {
    let ingestor = Ingestor::new(
        providers.embedder.clone(),
        providers.vector_store.clone(),
        config,
    );

    let mut failures = 0;
    for path in files {
        let spinner = spinner(path);
        match ingestor.ingest_file(path).await {
            Ok(report) => spinner.finish_with_message(format!(
                "{} {}: {} pages, {} chunks, {} vectors",
                style("✓").green(),
                report.source,
                report.pages,
                report.chunks,
                report.vectors_upserted
            )),
            Err(e) => {
                failures += 1;
                spinner.finish_with_message(format!(
                    "{} {}: {}",
                    style("✗").red(),
                    path.display(),
                    e
                ));
            }
        }
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn spinner(path: &Path) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(format!("Indexing {}", path.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn check(config: &RagConfig, providers: &ProviderSet) -> anyhow::Result<ExitCode> {
    let mut healthy = true;

    for (name, ok) in providers.health().await {
        let mark = if ok { style("✓").green() } else { style("✗").red() };
        println!("{} {}", mark, name);
        healthy &= ok;
    }

    let session = ChatSession::from_providers(providers, config);
    match session.retriever().verify_dimensions().await {
        Ok(()) => println!(
            "{} embedding dimensions ({})",
            style("✓").green(),
            config.embedding_dimensions()
        ),
        Err(e) => {
            println!("{} {}", style("✗").red(), e);
            healthy = false;
        }
    }

    Ok(if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
