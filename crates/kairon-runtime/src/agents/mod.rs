//! The three stage agents.
//!
//! Each agent owns a generation provider (normally a
//! [`MeteredProvider`](crate::usage::MeteredProvider)) and the completion
//! settings for its calls. Agents keep no state between calls.

use kairon_core::InputError;
use thiserror::Error;

use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};

mod draft;
mod quality;
mod research;

pub use draft::DraftAgent;
pub use quality::QualityAgent;
pub use research::ResearchAgent;

/// Errors from stage agents.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Bad arguments, raised before any external call
    #[error(transparent)]
    Input(#[from] InputError),

    /// The generation capability failed; never retried
    #[error("Generation call failed: {0}")]
    Upstream(#[from] ProviderError),
}

impl AgentError {
    pub fn is_input(&self) -> bool {
        matches!(self, AgentError::Input(_))
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, AgentError::Upstream(_))
    }
}

/// One generation call, returning the raw text.
async fn generate(
    provider: &dyn LlmProvider,
    config: &CompletionConfig,
    system: Option<&str>,
    prompt: String,
) -> Result<String, ProviderError> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(prompt));

    let response = provider.complete(messages, config).await?;
    Ok(response.content)
}
