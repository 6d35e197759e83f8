//! # kairon-runtime
//!
//! The networked half of Kairon: generation and web-search clients, the
//! three stage agents, and the orchestrator that runs a question through
//! research, drafting, quality checking and an optional revision.
//!
//! Everything deterministic (state, heuristics, policies, the quality
//! report) lives in `kairon-core`; this crate only adds the calls.
//!
//! ## Features
//!
//! - `gemini`: Google Gemini generation over HTTP
//! - `tavily`: Tavily web search over HTTP
//! - `all-providers`: both
//!
//! Without a feature the corresponding client compiles but answers every
//! call with a `NotConfigured` error.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kairon_runtime::{KaironConfig, ResearchOrchestratorBuilder, ProviderRegistry, Secrets, TavilyClient};
//!
//! let config = KaironConfig::load(None)?;
//! let secrets = Secrets::from_env()?;
//!
//! let provider = ProviderRegistry::with_defaults().create_with_credential(
//!     &config.generation.provider,
//!     &config.generation.provider_json(),
//!     secrets.google_api_key,
//! )?;
//! let search = TavilyClient::with_credential(secrets.tavily_api_key)
//!     .with_options(config.search.clone());
//!
//! let orchestrator = ResearchOrchestratorBuilder::from_config(&config)
//!     .provider(provider)
//!     .search(Arc::new(search))
//!     .build()?;
//!
//! let (answer, report) = orchestrator
//!     .run_research("What is the capital of France?", 3)
//!     .await?
//!     .into_parts();
//! ```

pub mod agents;
pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod search;
pub mod usage;

#[cfg(test)]
mod test_support;

pub use agents::{AgentError, DraftAgent, QualityAgent, ResearchAgent};
pub use config::{ConfigError, KaironConfig, Secrets};
pub use orchestrator::{
    ResearchOrchestrator, ResearchOrchestratorBuilder, ResearchOutcome, RuntimeError, Stage,
    DEFAULT_MAX_ITERATIONS,
};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderRegistry, SystemMessageMode, TokenUsage,
};
pub use search::{SearchError, SearchProvider, SearchResponse, TavilyClient};
pub use usage::{AgentKind, LlmUsage, MeteredProvider, UsageTracker};
