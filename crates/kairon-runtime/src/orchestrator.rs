//! Runs one question through research, drafting, quality checking and,
//! when the report calls for it, a single revision.
//!
//! ```text
//! START -> RESEARCHING -> DRAFTING -> QUALITY_CHECKING -> REVISING -> DONE
//!                                                    \-------------> DONE
//! ```
//!
//! Stages run strictly in sequence. Any stage error is logged and returned
//! as-is; nothing is retried and no partial result is kept.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use kairon_core::{
    DraftState, FocusStrategy, MinFindings, QualityReport, Question, RevisionPolicy,
    SufficiencyPolicy, UnchangedFocus,
};

use crate::agents::{AgentError, DraftAgent, QualityAgent, ResearchAgent};
use crate::config::KaironConfig;
use crate::providers::{CompletionConfig, LlmProvider};
use crate::search::SearchProvider;
use crate::usage::{AgentKind, LlmUsage, MeteredProvider, UsageTracker};

/// Iteration cap used when the caller has no preference.
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

/// Errors from the orchestrator.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Search not configured: {0}")]
    SearchNotConfigured(String),

    #[error("Research run timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl RuntimeError {
    /// Whether the question or arguments were rejected up front.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, RuntimeError::Agent(AgentError::Input(e)) if e.is_invalid_input())
    }
}

/// Pipeline position, logged at every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Researching,
    Drafting,
    QualityChecking,
    Revising,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Researching => "researching",
            Stage::Drafting => "drafting",
            Stage::QualityChecking => "quality_checking",
            Stage::Revising => "revising",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    /// The revised draft if a revision ran, otherwise the first draft
    pub answer: String,
    pub report: QualityReport,
    pub draft: DraftState,
    pub revised: bool,
    /// Usage recorded by this orchestrator so far
    pub usage: LlmUsage,
    pub completed_at: DateTime<Utc>,
}

impl ResearchOutcome {
    /// Final answer and quality report.
    pub fn into_parts(self) -> (String, QualityReport) {
        (self.answer, self.report)
    }
}

/// Sequences the three agents for one question at a time.
pub struct ResearchOrchestrator {
    research: ResearchAgent,
    draft: DraftAgent,
    quality: QualityAgent,
    revision: RevisionPolicy,
    usage: Arc<UsageTracker>,
    run_timeout: Option<Duration>,
}

impl ResearchOrchestrator {
    pub fn builder() -> ResearchOrchestratorBuilder {
        ResearchOrchestratorBuilder::new()
    }

    /// Answer `question` with at most `max_iterations` research rounds.
    ///
    /// Fails with an invalid-input error before any external call when the
    /// question is empty or `max_iterations` is zero.
    pub async fn run_research(
        &self,
        question: &str,
        max_iterations: usize,
    ) -> Result<ResearchOutcome, RuntimeError> {
        let question = Question::new(question).map_err(|e| {
            tracing::error!(error = %e, "Rejected research question");
            RuntimeError::from(AgentError::from(e))
        })?;

        match self.run_timeout {
            Some(limit) => {
                let run = self.run_stages(question, max_iterations);
                match tokio::time::timeout(limit, run).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::error!(timeout = ?limit, "Research run timed out");
                        Err(RuntimeError::Timeout(limit))
                    }
                }
            }
            None => self.run_stages(question, max_iterations).await,
        }
    }

    async fn run_stages(
        &self,
        question: Question,
        max_iterations: usize,
    ) -> Result<ResearchOutcome, RuntimeError> {
        tracing::info!(question = %question, max_iterations, "Starting research run");

        enter(Stage::Researching);
        let state = self
            .research
            .research_question(question, max_iterations)
            .await
            .map_err(|e| failed(Stage::Researching, e))?;

        enter(Stage::Drafting);
        let first_draft = self
            .draft
            .draft_answer(&state)
            .await
            .map_err(|e| failed(Stage::Drafting, e))?;
        let mut draft = DraftState::new(state, first_draft);

        enter(Stage::QualityChecking);
        let report = self
            .quality
            .check_content(&draft.current_draft, draft.research_state.findings())
            .await
            .map_err(|e| failed(Stage::QualityChecking, e))?;

        let revised = if self.revision.needs_revision(&report) {
            enter(Stage::Revising);
            let feedback = self.revision.feedback(&report);
            let text = self
                .draft
                .revise_answer(&draft.current_draft, &feedback)
                .await
                .map_err(|e| failed(Stage::Revising, e))?;
            draft.revise(text);
            true
        } else {
            false
        };

        enter(Stage::Done);
        tracing::info!(
            fact_accuracy = report.fact_accuracy(),
            bias_detected = report.bias_detected(),
            revised,
            "Research run complete"
        );

        Ok(ResearchOutcome {
            answer: draft.current_draft.clone(),
            report,
            draft,
            revised,
            usage: self.usage.total(),
            completed_at: Utc::now(),
        })
    }

    /// Revise a draft directly, outside a full run.
    pub async fn revise_answer(
        &self,
        current_draft: &str,
        feedback: &str,
    ) -> Result<String, RuntimeError> {
        self.draft
            .revise_answer(current_draft, feedback)
            .await
            .map_err(|e| failed(Stage::Revising, e))
    }

    /// Usage across every run of this orchestrator.
    pub fn usage(&self) -> LlmUsage {
        self.usage.total()
    }

    pub fn usage_tracker(&self) -> &Arc<UsageTracker> {
        &self.usage
    }
}

fn enter(stage: Stage) {
    tracing::info!(stage = %stage, "Entering stage");
}

fn failed(stage: Stage, error: AgentError) -> RuntimeError {
    tracing::error!(stage = %stage, error = %error, "Research run failed");
    RuntimeError::Agent(error)
}

/// Builder for [`ResearchOrchestrator`].
pub struct ResearchOrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    search: Option<Arc<dyn SearchProvider>>,
    completion: CompletionConfig,
    focus: Arc<dyn FocusStrategy>,
    sufficiency: Arc<dyn SufficiencyPolicy>,
    revision: RevisionPolicy,
    token_budget: Option<u32>,
    run_timeout: Option<Duration>,
}

impl ResearchOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            search: None,
            completion: CompletionConfig::default(),
            focus: Arc::new(UnchangedFocus),
            sufficiency: Arc::new(MinFindings::default()),
            revision: RevisionPolicy::default(),
            token_budget: None,
            run_timeout: None,
        }
    }

    /// Builder preloaded with the file/env configuration.
    pub fn from_config(config: &KaironConfig) -> Self {
        Self::new()
            .completion_config(config.generation.completion_config())
            .sufficiency(Arc::new(MinFindings(config.research.min_findings)))
            .revision_policy(RevisionPolicy::new(config.quality.accuracy_threshold))
            .token_budget(config.budget.max_tokens)
            .run_timeout(config.research.run_timeout)
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn completion_config(mut self, config: CompletionConfig) -> Self {
        self.completion = config;
        self
    }

    pub fn focus(mut self, focus: Arc<dyn FocusStrategy>) -> Self {
        self.focus = focus;
        self
    }

    pub fn sufficiency(mut self, sufficiency: Arc<dyn SufficiencyPolicy>) -> Self {
        self.sufficiency = sufficiency;
        self
    }

    pub fn revision_policy(mut self, policy: RevisionPolicy) -> Self {
        self.revision = policy;
        self
    }

    pub fn token_budget(mut self, max_tokens: Option<u32>) -> Self {
        self.token_budget = max_tokens;
        self
    }

    pub fn run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ResearchOrchestrator, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::ProviderNotConfigured("No provider set".to_string()))?;
        let search = self
            .search
            .ok_or_else(|| RuntimeError::SearchNotConfigured("No search provider set".to_string()))?;

        let usage = Arc::new(match self.token_budget {
            Some(max) => UsageTracker::with_budget(max),
            None => UsageTracker::unlimited(),
        });
        let metered = |agent: AgentKind| -> Arc<dyn LlmProvider> {
            Arc::new(MeteredProvider::new(provider.clone(), agent, usage.clone()))
        };

        let research = ResearchAgent::new(metered(AgentKind::Research), search)
            .with_focus(self.focus)
            .with_sufficiency(self.sufficiency)
            .with_config(self.completion.clone());
        let draft =
            DraftAgent::new(metered(AgentKind::Draft)).with_config(self.completion.clone());
        let quality = QualityAgent::new(metered(AgentKind::Quality)).with_config(self.completion);

        Ok(ResearchOrchestrator {
            research,
            draft,
            quality,
            revision: self.revision,
            usage,
            run_timeout: self.run_timeout,
        })
    }
}

impl Default for ResearchOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatMessage, CompletionResponse, ProviderError};
    use crate::test_support::{FailingSearch, ScriptedProvider, StaticSearch};
    use async_trait::async_trait;

    const QUESTION: &str = "What is the capital of France?";
    const ANSWER: &str = "Paris is the capital of France.";

    fn scripted(fact_check: &str, bias_check: &str) -> Arc<ScriptedProvider> {
        Arc::new(
            ScriptedProvider::new()
                .on("Please revise", "Paris is the capital and largest city of France.")
                .on("Current research question", ANSWER)
                .on("create a comprehensive answer", ANSWER)
                .on("factual accuracy", fact_check)
                .on("potential biases", bias_check)
                .on("Evaluate the readability", "Readability: 0.8\nConsider adding a source."),
        )
    }

    fn orchestrator(provider: Arc<ScriptedProvider>) -> ResearchOrchestrator {
        ResearchOrchestrator::builder()
            .provider(provider)
            .search(Arc::new(StaticSearch::with_hit("France", "Paris is the capital of France.")))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_accurate_unbiased_draft_is_kept() {
        let provider = scripted("Accuracy: 0.9", "No bias found.");
        let outcome = orchestrator(provider.clone())
            .run_research(QUESTION, DEFAULT_MAX_ITERATIONS)
            .await
            .unwrap();

        assert_eq!(outcome.answer, ANSWER);
        assert!(!outcome.revised);
        assert!(outcome.report.fact_accuracy() >= 0.7);
        assert!(!outcome.report.bias_detected());
        assert_eq!(outcome.draft.revision_count, 0);
        assert_eq!(provider.calls_matching("Please revise"), 0);

        // 2 research + 1 draft + 3 quality
        assert_eq!(provider.calls(), 6);
        assert_eq!(outcome.usage.llm_calls, 6);
    }

    #[tokio::test]
    async fn test_low_accuracy_triggers_one_revision() {
        let provider = scripted(
            "Accuracy: 0.4\nThere is an issue with the cited founding date.",
            "No bias found.",
        );
        let outcome = orchestrator(provider.clone())
            .run_research(QUESTION, DEFAULT_MAX_ITERATIONS)
            .await
            .unwrap();

        assert!(outcome.revised);
        assert_eq!(outcome.report.fact_accuracy(), 0.4);
        assert_eq!(outcome.answer, "Paris is the capital and largest city of France.");
        assert_ne!(outcome.answer, ANSWER);
        assert_eq!(outcome.draft.revision_count, 1);
        assert_eq!(provider.calls(), 7);
        assert_eq!(provider.calls_matching("Please revise"), 1);

        let revise_prompt = provider
            .prompts()
            .into_iter()
            .find(|p| p.contains("Please revise"))
            .unwrap();
        assert!(revise_prompt.contains(
            "Feedback:\nThere is an issue with the cited founding date.\nConsider adding a source."
        ));
    }

    #[tokio::test]
    async fn test_bias_triggers_revision() {
        let provider = scripted("Accuracy: 0.95", "Bias detected in paragraph 2.");
        let outcome = orchestrator(provider.clone())
            .run_research(QUESTION, DEFAULT_MAX_ITERATIONS)
            .await
            .unwrap();

        assert!(outcome.revised);
        assert!(outcome.report.bias_detected());
        assert_eq!(provider.calls_matching("Please revise"), 1);
    }

    #[tokio::test]
    async fn test_into_parts() {
        let outcome = orchestrator(scripted("Accuracy: 0.9", "No bias found."))
            .run_research(QUESTION, 1)
            .await
            .unwrap();

        assert_eq!(outcome.draft.research_state.iteration_count(), 1);
        let (answer, report) = outcome.into_parts();
        assert_eq!(answer, ANSWER);
        assert_eq!(report.readability_score(), 0.8);
    }

    #[tokio::test]
    async fn test_empty_question_rejected_before_calls() {
        let provider = scripted("Accuracy: 0.9", "No bias found.");
        let orchestrator = orchestrator(provider.clone());

        for question in ["", " \n\t"] {
            let err = orchestrator.run_research(question, 3).await.unwrap_err();
            assert!(err.is_invalid_input(), "unexpected error: {}", err);
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_iterations_rejected() {
        let provider = scripted("Accuracy: 0.9", "No bias found.");
        let err = orchestrator(provider.clone())
            .run_research(QUESTION, 0)
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_fails_run() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .on("Current research question", ANSWER)
                .fail_on("create a comprehensive answer")
                .fallback("0.9"),
        );

        let err = orchestrator(provider.clone())
            .run_research(QUESTION, 3)
            .await
            .unwrap_err();

        assert!(matches!(err, RuntimeError::Agent(AgentError::Upstream(_))));
        assert_eq!(provider.calls_matching("factual accuracy"), 0);
    }

    #[tokio::test]
    async fn test_search_failure_does_not_fail_run() {
        let provider = scripted("Accuracy: 0.9", "No bias found.");
        let orchestrator = ResearchOrchestrator::builder()
            .provider(provider.clone())
            .search(Arc::new(FailingSearch))
            .build()
            .unwrap();

        let outcome = orchestrator.run_research(QUESTION, 3).await.unwrap();
        assert_eq!(outcome.answer, ANSWER);
        assert!(provider.prompts()[0].contains("Error in web search"));
    }

    #[tokio::test]
    async fn test_token_budget_fails_run() {
        let provider = scripted("Accuracy: 0.9", "No bias found.");
        let orchestrator = ResearchOrchestrator::builder()
            .provider(provider.clone())
            .search(Arc::new(StaticSearch::with_hit("France", "Paris")))
            .token_budget(Some(10))
            .build()
            .unwrap();

        let err = orchestrator.run_research(QUESTION, 3).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Agent(AgentError::Upstream(ProviderError::BudgetExceeded { .. }))
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_usage_split_by_agent() {
        let provider = scripted("Accuracy: 0.9", "No bias found.");
        let orchestrator = orchestrator(provider);
        orchestrator.run_research(QUESTION, 3).await.unwrap();

        let tracker = orchestrator.usage_tracker();
        assert_eq!(tracker.for_agent(AgentKind::Research).llm_calls, 2);
        assert_eq!(tracker.for_agent(AgentKind::Draft).llm_calls, 1);
        assert_eq!(tracker.for_agent(AgentKind::Quality).llm_calls, 3);
    }

    #[tokio::test]
    async fn test_revise_answer_directly() {
        let provider = scripted("Accuracy: 0.9", "No bias found.");
        let revised = orchestrator(provider)
            .revise_answer("Paris.", "Consider more detail")
            .await
            .unwrap();
        assert_eq!(revised, "Paris is the capital and largest city of France.");
    }

    #[test]
    fn test_builder_requires_provider_and_search() {
        let err = ResearchOrchestrator::builder().build().err().unwrap();
        assert!(matches!(err, RuntimeError::ProviderNotConfigured(_)));

        let err = ResearchOrchestrator::builder()
            .provider(Arc::new(ScriptedProvider::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RuntimeError::SearchNotConfigured(_)));
    }

    #[test]
    fn test_builder_from_config() {
        let config = KaironConfig::from_yaml_str(
            "quality:\n  accuracy_threshold: 0.9\nresearch:\n  run_timeout: 2m",
        )
        .unwrap();
        let builder = ResearchOrchestratorBuilder::from_config(&config);
        assert_eq!(builder.revision.accuracy_threshold, 0.9);
        assert_eq!(builder.run_timeout, Some(Duration::from_secs(120)));
    }

    struct StalledProvider;

    #[async_trait]
    impl LlmProvider for StalledProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Timeout(Duration::from_secs(3600)))
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_timeout() {
        let orchestrator = ResearchOrchestrator::builder()
            .provider(Arc::new(StalledProvider))
            .search(Arc::new(StaticSearch::with_hit("France", "Paris")))
            .run_timeout(Some(Duration::from_secs(5)))
            .build()
            .unwrap();

        let err = orchestrator.run_research(QUESTION, 3).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Timeout(d) if d == Duration::from_secs(5)));
    }
}
