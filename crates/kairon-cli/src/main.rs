//! Kairon CLI: answer a question with the research pipeline.

mod logging;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use kairon_runtime::{
    KaironConfig, ProviderRegistry, ResearchOrchestratorBuilder, Secrets, TavilyClient,
};

use crate::output::OutputFormat;

const EXAMPLE_QUESTION: &str = "What are the latest developments in quantum computing?";

/// Research a question, draft an answer, and check its quality
#[derive(Parser, Debug)]
#[command(name = "kairon", version, about, long_about = None)]
struct Cli {
    /// Question to research (a built-in example is used if omitted)
    question: Option<String>,

    /// Maximum research iterations (defaults to the configured value)
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Configuration file path (defaults to ./kairon.yaml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config =
        KaironConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _guard = logging::init(&config.logging, cli.verbose)?;

    // Both keys are required before any stage runs.
    let secrets = Secrets::from_env().context("Missing credentials")?;
    tracing::debug!(
        google = %secrets.google_api_key,
        tavily = %secrets.tavily_api_key,
        "Credentials loaded"
    );

    let provider = ProviderRegistry::with_defaults()
        .create_with_credential(
            &config.generation.provider,
            &config.generation.provider_json(),
            secrets.google_api_key,
        )
        .with_context(|| {
            format!(
                "Failed to create generation provider '{}'",
                config.generation.provider
            )
        })?;
    let search =
        TavilyClient::with_credential(secrets.tavily_api_key).with_options(config.search.clone());

    let orchestrator = ResearchOrchestratorBuilder::from_config(&config)
        .provider(provider)
        .search(Arc::new(search))
        .build()?;

    let question = cli
        .question
        .unwrap_or_else(|| EXAMPLE_QUESTION.to_string());
    let max_iterations = cli
        .max_iterations
        .unwrap_or(config.research.max_iterations);

    let outcome = orchestrator
        .run_research(&question, max_iterations)
        .await
        .context("Research run failed")?;

    println!("{}", output::render(&question, &outcome, cli.format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["kairon"]).unwrap();
        assert!(cli.question.is_none());
        assert!(cli.max_iterations.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "kairon",
            "What is the capital of France?",
            "-n",
            "2",
            "--format",
            "json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.question.as_deref(), Some("What is the capital of France?"));
        assert_eq!(cli.max_iterations, Some(2));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["kairon", "--format", "xml"]).is_err());
    }
}
