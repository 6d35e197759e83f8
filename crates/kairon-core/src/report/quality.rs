//! The quality report produced after drafting.

use serde::{Deserialize, Serialize};

use super::schema::validate_report_schema;
use crate::InputError;

/// Accuracy, consistency, bias, and readability signals for one draft.
///
/// Fields are private: a report is validated once at construction and is
/// never mutated afterwards. Deserialization goes through the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQualityReport")]
pub struct QualityReport {
    fact_accuracy: f64,
    consistency_score: f64,
    bias_detected: bool,
    readability_score: f64,
    issues: Vec<String>,
    suggestions: Vec<String>,
}

/// Unchecked wire form of [`QualityReport`].
#[derive(Deserialize)]
struct RawQualityReport {
    fact_accuracy: f64,
    consistency_score: f64,
    bias_detected: bool,
    readability_score: f64,
    issues: Vec<String>,
    suggestions: Vec<String>,
}

impl TryFrom<RawQualityReport> for QualityReport {
    type Error = InputError;

    fn try_from(raw: RawQualityReport) -> Result<Self, Self::Error> {
        Self::new(
            raw.fact_accuracy,
            raw.consistency_score,
            raw.bias_detected,
            raw.readability_score,
            raw.issues,
            raw.suggestions,
        )
    }
}

impl QualityReport {
    /// Build a report, rejecting any score outside [0, 1] or not finite.
    pub fn new(
        fact_accuracy: f64,
        consistency_score: f64,
        bias_detected: bool,
        readability_score: f64,
        issues: Vec<String>,
        suggestions: Vec<String>,
    ) -> Result<Self, InputError> {
        check_score("fact_accuracy", fact_accuracy)?;
        check_score("consistency_score", consistency_score)?;
        check_score("readability_score", readability_score)?;

        Ok(Self {
            fact_accuracy,
            consistency_score,
            bias_detected,
            readability_score,
            issues,
            suggestions,
        })
    }

    /// Parse a serialized report, validating it against the schema first.
    pub fn from_json(json: &str) -> Result<Self, InputError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| InputError::InvalidReport(e.to_string()))?;

        validate_report_schema(&value)
            .map_err(|errors| InputError::InvalidReport(errors.join("; ")))?;

        serde_json::from_value(value).map_err(|e| InputError::InvalidReport(e.to_string()))
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, InputError> {
        serde_json::to_string_pretty(self).map_err(|e| InputError::InvalidReport(e.to_string()))
    }

    pub fn fact_accuracy(&self) -> f64 {
        self.fact_accuracy
    }

    pub fn consistency_score(&self) -> f64 {
        self.consistency_score
    }

    pub fn bias_detected(&self) -> bool {
        self.bias_detected
    }

    pub fn readability_score(&self) -> f64 {
        self.readability_score
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

fn check_score(field: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(InputError::InvalidScore { field, value })
    }
}
