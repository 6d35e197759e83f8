//! # kairon-core
//!
//! Deterministic building blocks for the Kairon research pipeline.
//!
//! The pipeline answers a free-text question in three stages:
//! research, draft, and quality check, with at most one revision pass.
//! This crate holds everything about that pipeline that does not touch
//! the network:
//!
//! - The data passed between stages (`ResearchState`, `Finding`,
//!   `DraftState`, `QualityReport`)
//! - Question validation
//! - The literal text heuristics used to read quality-check responses
//! - The pluggable research policies and the fixed revision policy
//!
//! ## Key Guarantees
//!
//! 1. **No network calls**: every function here is pure or in-memory
//! 2. **Clamped scores**: a `QualityReport` never holds a score outside [0, 1]
//! 3. **Aligned counters**: `ResearchState::findings().len()` always equals
//!    `ResearchState::iteration_count()`
//!
//! ## Example
//!
//! ```rust
//! use kairon_core::{heuristics, QualityReport, RevisionPolicy};
//!
//! let accuracy = heuristics::extract_score("Accuracy: 0.4 overall");
//! let report = QualityReport::new(accuracy, accuracy, false, 0.8, vec![], vec![]).unwrap();
//!
//! assert!(RevisionPolicy::default().needs_revision(&report));
//! ```

pub mod draft;
pub mod heuristics;
pub mod policy;
pub mod report;
pub mod research;

pub use draft::{format_findings, DraftState};
pub use policy::{FocusStrategy, MinFindings, SufficiencyPolicy, UnchangedFocus};
pub use report::{QualityReport, RevisionPolicy, DEFAULT_ACCURACY_THRESHOLD};
pub use research::{Finding, Question, ResearchState};

use thiserror::Error;

/// Errors raised before any external call is made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Score '{field}' out of range [0, 1]: {value}")]
    InvalidScore { field: &'static str, value: f64 },

    #[error("Invalid quality report: {0}")]
    InvalidReport(String),
}

impl InputError {
    /// Whether this error was raised by question or argument validation.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, InputError::InvalidInput(_))
    }

    /// Whether this error was raised because there was nothing to work from.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, InputError::EmptyInput(_))
    }
}
