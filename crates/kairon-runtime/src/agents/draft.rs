//! Drafting and revision.

use std::sync::Arc;

use kairon_core::{format_findings, InputError, ResearchState};

use super::{generate, AgentError};
use crate::prompts::{draft_prompt, revise_prompt, DRAFT_SYSTEM_PROMPT};
use crate::providers::{CompletionConfig, LlmProvider};

/// Turns findings into prose and revises prose against feedback.
pub struct DraftAgent {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
}

impl DraftAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            config: CompletionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CompletionConfig) -> Self {
        self.config = config;
        self
    }

    /// Write the first draft from every finding, in collection order.
    ///
    /// Fails with `EmptyInput` when there are no findings. The model's text
    /// is returned as-is, even when empty.
    pub async fn draft_answer(&self, state: &ResearchState) -> Result<String, AgentError> {
        if state.findings().is_empty() {
            return Err(InputError::EmptyInput(
                "No research information available to draft from".to_string(),
            )
            .into());
        }

        let prompt = draft_prompt(
            state.question().as_str(),
            &format_findings(state.findings()),
        );
        let draft = generate(
            self.provider.as_ref(),
            &self.config,
            Some(DRAFT_SYSTEM_PROMPT),
            prompt,
        )
        .await?;

        if draft.trim().is_empty() {
            tracing::warn!(findings = state.findings().len(), "Model returned an empty draft");
        }

        Ok(draft)
    }

    /// Rewrite `current_draft` to address `feedback`, passed through verbatim.
    pub async fn revise_answer(
        &self,
        current_draft: &str,
        feedback: &str,
    ) -> Result<String, AgentError> {
        let revised = generate(
            self.provider.as_ref(),
            &self.config,
            Some(DRAFT_SYSTEM_PROMPT),
            revise_prompt(current_draft, feedback),
        )
        .await?;
        Ok(revised)
    }
}
