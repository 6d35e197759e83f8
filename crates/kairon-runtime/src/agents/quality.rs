//! Quality checks over a finished draft.

use std::sync::Arc;

use kairon_core::heuristics::{
    detects_bias, extract_issues, extract_labeled_score, extract_score, extract_suggestions,
};
use kairon_core::{Finding, QualityReport};

use super::{generate, AgentError};
use crate::prompts::{bias_check_prompt, fact_check_prompt, readability_prompt};
use crate::providers::{CompletionConfig, LlmProvider};

/// Scores a draft with three independent model calls.
///
/// The responses are read with the literal heuristics in
/// [`kairon_core::heuristics`]:
///
/// | Field | Source response | Rule |
/// |-------|-----------------|------|
/// | `fact_accuracy` | fact check | first numeral, clamped, default 0.5 |
/// | `consistency_score` | fact check | numeral after "consistency", else `fact_accuracy` |
/// | `bias_detected` | bias check | contains "bias detected" |
/// | `readability_score` | readability | first numeral, clamped, default 0.5 |
/// | `issues` | fact check | keyword lines |
/// | `suggestions` | readability | keyword lines |
pub struct QualityAgent {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
}

impl QualityAgent {
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

    pub async fn check_content(
        &self,
        content: &str,
        sources: &[Finding],
    ) -> Result<QualityReport, AgentError> {
        let provider = self.provider.as_ref();

        let fact_check =
            generate(provider, &self.config, None, fact_check_prompt(content, sources)).await?;
        let bias_check =
            generate(provider, &self.config, None, bias_check_prompt(content)).await?;
        let readability =
            generate(provider, &self.config, None, readability_prompt(content)).await?;

        let fact_accuracy = extract_score(&fact_check);
        let consistency_score =
            extract_labeled_score(&fact_check, "consistency").unwrap_or(fact_accuracy);

        let report = QualityReport::new(
            fact_accuracy,
            consistency_score,
            detects_bias(&bias_check),
            extract_score(&readability),
            extract_issues(&fact_check),
            extract_suggestions(&readability),
        )?;

        tracing::info!(
            fact_accuracy = report.fact_accuracy(),
            consistency = report.consistency_score(),
            bias_detected = report.bias_detected(),
            readability = report.readability_score(),
            issues = report.issues().len(),
            suggestions = report.suggestions().len(),
            "Quality check complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;

    fn sources() -> Vec<Finding> {
        vec![Finding::new("capital of France", "Paris")]
    }

    #[tokio::test]
    async fn test_report_from_three_responses() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .on(
                    "factual accuracy",
                    "Accuracy: 0.87 overall\nConsistency: 0.9\nOne issue: the founding date is unsupported.",
                )
                .on("potential biases", "No bias found.")
                .on(
                    "Evaluate the readability",
                    "Readability: 0.8\nConsider shorter sentences.\nWell organized.",
                ),
        );
        let agent = QualityAgent::new(provider.clone());

        let report = agent
            .check_content("Paris is the capital of France.", &sources())
            .await
            .unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(report.fact_accuracy(), 0.87);
        assert_eq!(report.consistency_score(), 0.9);
        assert!(!report.bias_detected());
        assert_eq!(report.readability_score(), 0.8);
        assert_eq!(
            report.issues(),
            ["One issue: the founding date is unsupported.".to_string()]
        );
        assert_eq!(report.suggestions(), ["Consider shorter sentences.".to_string()]);
    }

    #[tokio::test]
    async fn test_bias_phrase_and_defaults() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .on("factual accuracy", "Looks right to me.")
                .on("potential biases", "Bias detected in paragraph 2.")
                .on("Evaluate the readability", "Score: 5"),
        );

        let report = QualityAgent::new(provider)
            .check_content("draft", &sources())
            .await
            .unwrap();

        assert_eq!(report.fact_accuracy(), 0.5);
        assert_eq!(report.consistency_score(), 0.5);
        assert!(report.bias_detected());
        assert_eq!(report.readability_score(), 1.0);
        assert!(report.issues().is_empty());
    }

    #[tokio::test]
    async fn test_sources_are_sent_with_fact_check_only() {
        let provider = Arc::new(ScriptedProvider::new().fallback("0.9"));
        QualityAgent::new(provider.clone())
            .check_content("draft text", &sources())
            .await
            .unwrap();

        let prompts = provider.prompts();
        assert!(prompts[0].contains("Research Sources:"));
        assert!(!prompts[1].contains("Research Sources:"));
        assert!(!prompts[2].contains("Research Sources:"));
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_checks() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .on("factual accuracy", "0.9")
                .fail_on("potential biases")
                .fallback("0.9"),
        );

        let err = QualityAgent::new(provider.clone())
            .check_content("draft", &sources())
            .await
            .unwrap_err();

        assert!(err.is_upstream());
        assert_eq!(provider.calls(), 2);
    }
}
