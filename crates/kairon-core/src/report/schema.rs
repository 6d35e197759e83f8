//! JSON Schema validation for serialized quality reports.
//!
//! Reports written by one run (for example with `kairon --format json`) can
//! be read back by tooling. They are checked against
//! `schema/quality_report.schema.json` first so that out-of-range scores or
//! missing fields are reported field by field.

use std::sync::OnceLock;

/// Embedded report schema (loaded at compile time).
const REPORT_SCHEMA_JSON: &str = include_str!("../../schema/quality_report.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(REPORT_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(|e| e.clone())
}

/// Validate a report JSON value against the schema.
///
/// Returns every violation, each with its instance path.
pub fn validate_report_schema(report_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(report_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> serde_json::Value {
        serde_json::json!({
            "fact_accuracy": 0.9,
            "consistency_score": 0.85,
            "bias_detected": false,
            "readability_score": 0.8,
            "issues": [],
            "suggestions": ["Test suggestion"]
        })
    }

    #[test]
    fn test_valid_report_passes_schema() {
        assert!(validate_report_schema(&valid()).is_ok());
    }

    #[test]
    fn test_out_of_range_score_fails() {
        let mut value = valid();
        value["fact_accuracy"] = serde_json::json!(1.5);
        let errors = validate_report_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("fact_accuracy")));
    }

    #[test]
    fn test_missing_field_fails() {
        let value = serde_json::json!({
            "fact_accuracy": 0.9,
            "bias_detected": false
        });
        let errors = validate_report_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_unknown_field_fails() {
        let mut value = valid();
        value["verdict"] = serde_json::json!("great");
        assert!(validate_report_schema(&value).is_err());
    }
}
