//! Draft bookkeeping and findings formatting.

use serde::{Deserialize, Serialize};

use crate::research::{Finding, ResearchState};

/// Header placed above the formatted findings block.
pub const FINDINGS_HEADER: &str = "Research Findings:";

/// Render findings as one labeled block, in collection order.
///
/// ```text
/// Research Findings:
///
/// Query: ...
/// Result: ...
///
/// ```
pub fn format_findings(findings: &[Finding]) -> String {
    let mut formatted = format!("{}\n\n", FINDINGS_HEADER);
    for finding in findings {
        formatted.push_str(&format!("Query: {}\n", finding.query));
        formatted.push_str(&format!("Result: {}\n\n", finding.result));
    }
    formatted
}

/// Record of what the draft stage produced. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftState {
    pub research_state: ResearchState,
    pub current_draft: String,
    pub revision_count: u32,
}

impl DraftState {
    pub fn new(research_state: ResearchState, draft: impl Into<String>) -> Self {
        Self {
            research_state,
            current_draft: draft.into(),
            revision_count: 0,
        }
    }

    /// Replace the draft with a revised version.
    pub fn revise(&mut self, revised: impl Into<String>) {
        self.current_draft = revised.into();
        self.revision_count += 1;
    }
}
