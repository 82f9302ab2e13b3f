//! Filings CLI
//!
//! Interactive question answering over pre-built SEC filing indexes.

mod repl;
mod select;

use clap::{Parser, ValueEnum};
use filings_chat::Conversation;
use filings_core::{config::AppConfig, logging, AppError, AppResult};
use filings_knowledge::{create_provider, AnswerSynthesizer, IndexRegistry, RagPipeline, SearchMode};
use filings_llm::{create_client, ClientOptions};
use filings_prompt::{load_prompt, ANSWER_PROMPT_ID};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

const BANNER: &str = "SEC Filing Chatbot";

/// Chat with SEC filings stored in local vector indexes
#[derive(Parser, Debug)]
#[command(name = "filings")]
#[command(about = "Chat with SEC filings stored in local vector indexes", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, env = "FILINGS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, env = "FILINGS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding one subdirectory per index
    #[arg(long, env = "FILINGS_INDEXES_DIR")]
    indexes_dir: Option<PathBuf>,

    /// Search one index or several together
    #[arg(long, value_enum, default_value_t = ModeArg::Single)]
    mode: ModeArg,

    /// Index to search (repeatable or comma-separated); prompts when omitted
    #[arg(short, long = "index", value_delimiter = ',')]
    indexes: Vec<String>,

    /// Chat provider (claude, ollama)
    #[arg(short, long, env = "FILINGS_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, env = "FILINGS_MODEL")]
    model: Option<String>,

    /// Passages retrieved from each index
    #[arg(short = 'k', long, env = "FILINGS_TOP_K")]
    top_k: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Single,
    Multi,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => SearchMode::Single,
            ModeArg::Multi => SearchMode::Multi,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ AppError::StorageUnavailable(_)) => {
            eprintln!("Warning: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        None,
        cli.indexes_dir,
        cli.provider,
        cli.model,
        cli.top_k,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("Filings chat starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Indexes: {:?}", config.indexes_dir);
    tracing::debug!("Provider: {} ({})", config.provider, config.model);

    println!("{}", BANNER);
    println!();

    let embedder = create_provider(&config.embedding)?;
    let registry = IndexRegistry::new(&config.indexes_dir, embedder);
    let available = registry.require_available_indexes()?;

    let mode = SearchMode::from(cli.mode);
    let handles = select::resolve_interactively(&registry, mode, cli.indexes, &available)?;

    let timeout = Duration::from_secs(config.model_timeout_secs());
    let options = ClientOptions::new(timeout)
        .with_endpoint(config.provider_endpoint())
        .with_api_key(config.resolve_api_key(&config.provider))
        .with_api_version(config.provider_api_version());
    let client = create_client(&config.provider, &options)?;
    let prompt = load_prompt(&config.workspace, ANSWER_PROMPT_ID)?;
    let synthesizer = AnswerSynthesizer::new(client, config.model.clone())
        .with_prompt(prompt)
        .with_timeout(timeout);

    let pipeline = RagPipeline::new(handles, synthesizer).with_top_k(config.top_k);
    println!("Searching: {}", pipeline.index_names().join(", "));

    let conversation = Conversation::new(Arc::new(pipeline));
    let span = tracing::info_span!("session", id = %conversation.state().id());

    let result = repl::run(conversation).instrument(span).await;

    match &result {
        Ok(_) => tracing::info!("Session ended"),
        Err(e) => tracing::error!("Session failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_repeated_and_comma_separated_indexes() {
        let cli = Cli::try_parse_from([
            "filings", "--mode", "multi", "--index", "aapl", "-i", "msft,goog",
        ])
        .unwrap();
        assert_eq!(cli.mode, ModeArg::Multi);
        assert_eq!(cli.indexes, vec!["aapl", "msft", "goog"]);
    }

    #[test]
    fn test_cli_single_mode() {
        let cli = Cli::try_parse_from(["filings", "--mode", "single", "--index", "aapl"]).unwrap();
        assert_eq!(SearchMode::from(cli.mode), SearchMode::Single);
    }

    #[test]
    fn test_cli_defaults_to_single_mode() {
        let cli = Cli::try_parse_from(["filings"]).unwrap();
        assert_eq!(cli.mode, ModeArg::Single);
        assert!(cli.indexes.is_empty());
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["filings", "--mode", "all"]).is_err());
    }
}
