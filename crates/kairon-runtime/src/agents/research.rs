//! Bounded, search-augmented research loop.

use std::sync::Arc;

use kairon_core::{
    FocusStrategy, Finding, InputError, MinFindings, Question, ResearchState, SufficiencyPolicy,
    UnchangedFocus,
};

use super::{generate, AgentError};
use crate::prompts::{research_prompt, RESEARCH_SYSTEM_PROMPT};
use crate::providers::{CompletionConfig, LlmProvider};
use crate::search::{context_or_error, SearchProvider};

/// Gathers findings for a question over a bounded number of iterations.
///
/// Each iteration runs one web search for the composite query and one
/// generation call that summarizes the results. The summary becomes the
/// finding's result. Search failures are folded into the prompt as text;
/// generation failures end the run.
pub struct ResearchAgent {
    provider: Arc<dyn LlmProvider>,
    search: Arc<dyn SearchProvider>,
    focus: Arc<dyn FocusStrategy>,
    sufficiency: Arc<dyn SufficiencyPolicy>,
    config: CompletionConfig,
}

impl ResearchAgent {
    /// Agent with the default policies: the focus never changes and two
    /// findings are enough.
    pub fn new(provider: Arc<dyn LlmProvider>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            search,
            focus: Arc::new(UnchangedFocus),
            sufficiency: Arc::new(MinFindings::default()),
            config: CompletionConfig::default(),
        }
    }

    pub fn with_focus(mut self, focus: Arc<dyn FocusStrategy>) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_sufficiency(mut self, sufficiency: Arc<dyn SufficiencyPolicy>) -> Self {
        self.sufficiency = sufficiency;
        self
    }

    pub fn with_config(mut self, config: CompletionConfig) -> Self {
        self.config = config;
        self
    }

    /// Research a question given as raw text.
    pub async fn research(
        &self,
        question: &str,
        max_iterations: usize,
    ) -> Result<ResearchState, AgentError> {
        self.research_question(Question::new(question)?, max_iterations)
            .await
    }

    /// Research an already-validated question.
    ///
    /// Returns a state with between 1 and `max_iterations` findings.
    pub async fn research_question(
        &self,
        question: Question,
        max_iterations: usize,
    ) -> Result<ResearchState, AgentError> {
        if max_iterations == 0 {
            return Err(InputError::InvalidInput(
                "max_iterations must be at least 1".to_string(),
            )
            .into());
        }

        let mut state = ResearchState::new(question);

        while state.iteration_count() < max_iterations {
            let query = state.query_for_next_iteration();
            let iteration = state.iteration_count() + 1;

            let outcome = self.search.search(&query).await;
            if let Err(e) = &outcome {
                tracing::warn!(
                    search = self.search.name(),
                    iteration,
                    error = %e,
                    "Web search failed, continuing with error text"
                );
            }
            let context = context_or_error(outcome);

            let result = generate(
                self.provider.as_ref(),
                &self.config,
                Some(RESEARCH_SYSTEM_PROMPT),
                research_prompt(&query, &context),
            )
            .await?;

            state.record(Finding::new(query, result));
            let focus = self
                .focus
                .next_focus(&state, state.latest_result().unwrap_or_default());
            state.set_focus(focus);

            tracing::info!(
                iteration,
                max_iterations,
                findings = state.findings().len(),
                "Research iteration complete"
            );

            if self.sufficiency.is_sufficient(&state) {
                tracing::debug!(
                    policy = self.sufficiency.name(),
                    findings = state.findings().len(),
                    "Sufficient information gathered"
                );
                break;
            }
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingSearch, ScriptedProvider, StaticSearch};
    use proptest::prelude::*;

    const QUESTION: &str = "What is the capital of France?";

    fn provider() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::new().on(
            "Current research question",
            "Paris is the capital of France.",
        ))
    }

    struct NeverSufficient;

    impl SufficiencyPolicy for NeverSufficient {
        fn is_sufficient(&self, _state: &ResearchState) -> bool {
            false
        }
    }

    struct NumberedFocus;

    impl FocusStrategy for NumberedFocus {
        fn next_focus(&self, state: &ResearchState, _latest_result: &str) -> String {
            format!("aspect {}", state.iteration_count() + 1)
        }
    }

    #[tokio::test]
    async fn test_default_policy_stops_at_two() {
        let provider = provider();
        let agent = ResearchAgent::new(
            provider.clone(),
            Arc::new(StaticSearch::with_hit("France", "Paris is the capital.")),
        );

        let state = agent.research(QUESTION, 3).await.unwrap();

        assert_eq!(state.iteration_count(), 2);
        assert_eq!(state.findings().len(), 2);
        assert_eq!(state.findings()[0].query, QUESTION);
        assert_eq!(state.findings()[0].result, "Paris is the capital of France.");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_iteration_cap() {
        let agent = ResearchAgent::new(
            provider(),
            Arc::new(StaticSearch::with_hit("France", "Paris")),
        );

        let state = agent.research(QUESTION, 1).await.unwrap();
        assert_eq!(state.iteration_count(), 1);
    }

    #[tokio::test]
    async fn test_focus_strategy_shapes_queries() {
        let search = Arc::new(StaticSearch::with_hit("France", "Paris"));
        let agent = ResearchAgent::new(provider(), search.clone())
            .with_focus(Arc::new(NumberedFocus))
            .with_sufficiency(Arc::new(NeverSufficient));

        let state = agent.research(QUESTION, 3).await.unwrap();

        assert_eq!(state.iteration_count(), 3);
        assert_eq!(
            search.queries(),
            vec![
                QUESTION.to_string(),
                format!("{} aspect 2", QUESTION),
                format!("{} aspect 3", QUESTION),
            ]
        );
    }

    #[tokio::test]
    async fn test_search_context_reaches_prompt() {
        let provider = provider();
        let agent = ResearchAgent::new(
            provider.clone(),
            Arc::new(StaticSearch::with_hit("France", "Paris has been the capital since 508.")),
        );

        agent.research(QUESTION, 1).await.unwrap();
        assert!(provider.prompts()[0].contains("Paris has been the capital since 508."));
    }

    #[tokio::test]
    async fn test_search_failure_is_degraded() {
        let provider = provider();
        let agent = ResearchAgent::new(provider.clone(), Arc::new(FailingSearch));

        let state = agent.research(QUESTION, 2).await.unwrap();

        assert_eq!(state.findings().len(), 2);
        assert!(provider.prompts()[0]
            .contains("Error in web search: HTTP request failed: connection refused"));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let agent = ResearchAgent::new(
            Arc::new(ScriptedProvider::new()),
            Arc::new(StaticSearch::with_hit("France", "Paris")),
        );

        let err = agent.research(QUESTION, 3).await.unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_rejects_empty_question_before_any_call() {
        let provider = provider();
        let search = Arc::new(StaticSearch::with_hit("France", "Paris"));
        let agent = ResearchAgent::new(provider.clone(), search.clone());

        for question in ["", "   "] {
            match agent.research(question, 3).await {
                Err(AgentError::Input(e)) => assert!(e.is_invalid_input()),
                other => panic!("Expected InvalidInput, got {:?}", other.map(|s| s.iteration_count())),
            }
        }

        assert_eq!(provider.calls(), 0);
        assert!(search.queries().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_zero_iterations() {
        let agent = ResearchAgent::new(provider(), Arc::new(FailingSearch));
        let err = agent.research(QUESTION, 0).await.unwrap_err();
        assert!(err.is_input());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_iterations_within_bounds(max in 1usize..8, min_findings in 1usize..10) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();

            let state = rt.block_on(async {
                ResearchAgent::new(provider(), Arc::new(StaticSearch::with_hit("t", "c")))
                    .with_sufficiency(Arc::new(MinFindings(min_findings)))
                    .research(QUESTION, max)
                    .await
                    .unwrap()
            });

            prop_assert!(state.iteration_count() >= 1);
            prop_assert!(state.iteration_count() <= max);
            prop_assert_eq!(state.findings().len(), state.iteration_count());
            prop_assert_eq!(state.iteration_count(), max.min(min_findings));
        }
    }
}
