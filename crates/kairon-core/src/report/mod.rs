//! Quality reports and the revision policy.
//!
//! A report is produced once per run by the quality stage and validated
//! at construction. Serialized reports are validated against an embedded
//! JSON Schema before they are accepted back.

mod quality;
mod revision;
mod schema;

pub use quality::QualityReport;
pub use revision::{RevisionPolicy, DEFAULT_ACCURACY_THRESHOLD};
pub use schema::validate_report_schema;
