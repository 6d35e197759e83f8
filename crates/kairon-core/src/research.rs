//! Research state accumulated by the research stage.

use serde::{Deserialize, Serialize};

use crate::InputError;

/// A validated research question.
///
/// Absent, empty, and whitespace-only text are rejected before any
/// network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Question(String);

impl TryFrom<String> for Question {
    type Error = InputError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::new(text)
    }
}

impl Question {
    /// Validate and wrap a question.
    pub fn new(text: impl Into<String>) -> Result<Self, InputError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(InputError::InvalidInput(
                "question must be a non-empty string".to_string(),
            ));
        }
        Ok(Self(text))
    }

    /// Validate a question that may be missing entirely.
    pub fn from_optional(text: Option<impl Into<String>>) -> Result<Self, InputError> {
        match text {
            Some(text) => Self::new(text),
            None => Err(InputError::InvalidInput(
                "question is required".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Question {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One (query, result) pair produced by a research iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// The composite query issued for this iteration
    pub query: String,

    /// What came back, or an inline error description
    pub result: String,
}

impl Finding {
    pub fn new(query: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            result: result.into(),
        }
    }
}

/// State for one research run.
///
/// Created at the start of a run and mutated only through [`record`] and
/// [`set_focus`]. Once handed back to the caller it is treated as
/// read-only.
///
/// [`record`]: ResearchState::record
/// [`set_focus`]: ResearchState::set_focus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResearchState")]
pub struct ResearchState {
    question: Question,
    findings: Vec<Finding>,
    current_focus: String,
    iteration_count: usize,
}

#[derive(Deserialize)]
struct RawResearchState {
    question: Question,
    findings: Vec<Finding>,
    #[serde(default)]
    current_focus: String,
    iteration_count: usize,
}

impl TryFrom<RawResearchState> for ResearchState {
    type Error = InputError;

    fn try_from(raw: RawResearchState) -> Result<Self, Self::Error> {
        if raw.findings.len() != raw.iteration_count {
            return Err(InputError::InvalidInput(format!(
                "iteration_count {} does not match {} findings",
                raw.iteration_count,
                raw.findings.len()
            )));
        }
        Ok(Self {
            question: raw.question,
            findings: raw.findings,
            current_focus: raw.current_focus,
            iteration_count: raw.iteration_count,
        })
    }
}

impl ResearchState {
    pub fn new(question: Question) -> Self {
        Self {
            question,
            findings: Vec::new(),
            current_focus: String::new(),
            iteration_count: 0,
        }
    }

    /// Build a state from findings collected elsewhere.
    pub fn with_findings(question: Question, findings: Vec<Finding>) -> Self {
        let iteration_count = findings.len();
        Self {
            question,
            findings,
            current_focus: String::new(),
            iteration_count,
        }
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn current_focus(&self) -> &str {
        &self.current_focus
    }

    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    /// Composite query for the next iteration.
    ///
    /// The question alone while the focus is empty, otherwise the question
    /// and the focus separated by one space.
    pub fn query_for_next_iteration(&self) -> String {
        let focus = self.current_focus.trim();
        if focus.is_empty() {
            self.question.as_str().to_string()
        } else {
            format!("{} {}", self.question, focus)
        }
    }

    /// Append a finding and advance the iteration counter together.
    pub fn record(&mut self, finding: Finding) {
        self.findings.push(finding);
        self.iteration_count += 1;
    }

    pub fn set_focus(&mut self, focus: impl Into<String>) {
        self.current_focus = focus.into();
    }

    /// The result text of the most recent finding.
    pub fn latest_result(&self) -> Option<&str> {
        self.findings.last().map(|f| f.result.as_str())
    }
}
