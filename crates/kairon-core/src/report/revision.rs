//! Revision policy: decides whether a draft gets its single revision pass.
//!
//! The rule is fixed:
//! 1. If fact accuracy is below the threshold, revise
//! 2. Else if bias was detected, revise
//! 3. Else keep the draft
//!
//! Feedback for the revision is the report's issues followed by its
//! suggestions, one per line.

use serde::{Deserialize, Serialize};

use super::QualityReport;

/// Accuracy below this triggers a revision.
pub const DEFAULT_ACCURACY_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevisionPolicy {
    pub accuracy_threshold: f64,
}

impl Default for RevisionPolicy {
    fn default() -> Self {
        Self {
            accuracy_threshold: DEFAULT_ACCURACY_THRESHOLD,
        }
    }
}

impl RevisionPolicy {
    pub fn new(accuracy_threshold: f64) -> Self {
        Self { accuracy_threshold }
    }

    /// Whether the report calls for a revision pass.
    pub fn needs_revision(&self, report: &QualityReport) -> bool {
        report.fact_accuracy() < self.accuracy_threshold || report.bias_detected()
    }

    /// Feedback text handed verbatim to the reviser.
    pub fn feedback(&self, report: &QualityReport) -> String {
        report
            .issues()
            .iter()
            .chain(report.suggestions().iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(accuracy: f64, bias: bool) -> QualityReport {
        QualityReport::new(
            accuracy,
            accuracy,
            bias,
            0.8,
            vec!["Issue A".to_string(), "Issue B".to_string()],
            vec!["Suggest C".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_threshold_is_strict() {
        let policy = RevisionPolicy::default();
        assert!(policy.needs_revision(&report(0.4, false)));
        assert!(policy.needs_revision(&report(0.69, false)));
        assert!(!policy.needs_revision(&report(0.7, false)));
        assert!(!policy.needs_revision(&report(0.95, false)));
    }

    #[test]
    fn test_bias_forces_revision() {
        assert!(RevisionPolicy::default().needs_revision(&report(0.95, true)));
    }

    #[test]
    fn test_custom_threshold() {
        let policy = RevisionPolicy::new(0.9);
        assert!(policy.needs_revision(&report(0.85, false)));
    }

    #[test]
    fn test_feedback_issues_then_suggestions() {
        let feedback = RevisionPolicy::default().feedback(&report(0.4, false));
        assert_eq!(feedback, "Issue A\nIssue B\nSuggest C");
    }

    #[test]
    fn test_feedback_empty_when_nothing_extracted() {
        let empty = QualityReport::new(0.2, 0.2, false, 0.5, vec![], vec![]).unwrap();
        assert_eq!(RevisionPolicy::default().feedback(&empty), "");
    }
}
