//! Pluggable research policies.
//!
//! The research loop asks two questions after every iteration: what to
//! focus on next, and whether enough has been collected. Both answers come
//! from strategy objects so they can be replaced without touching the loop.

use crate::research::ResearchState;

/// Decides the focus hint for the next research iteration.
pub trait FocusStrategy: Send + Sync {
    /// Compute the next focus from the state and the latest result.
    ///
    /// An empty string means "search the question as-is".
    fn next_focus(&self, state: &ResearchState, latest_result: &str) -> String;

    /// Name for logging.
    fn name(&self) -> &str {
        "focus"
    }
}

/// Decides when the research loop may stop before its iteration cap.
pub trait SufficiencyPolicy: Send + Sync {
    fn is_sufficient(&self, state: &ResearchState) -> bool;

    /// Name for logging.
    fn name(&self) -> &str {
        "sufficiency"
    }
}

/// Focus that never moves off the original question.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnchangedFocus;

impl FocusStrategy for UnchangedFocus {
    fn next_focus(&self, _state: &ResearchState, _latest_result: &str) -> String {
        String::new()
    }

    fn name(&self) -> &str {
        "unchanged"
    }
}

/// Sufficient once at least `n` findings are collected, whatever they say.
#[derive(Debug, Clone, Copy)]
pub struct MinFindings(pub usize);

impl Default for MinFindings {
    fn default() -> Self {
        Self(2)
    }
}

impl SufficiencyPolicy for MinFindings {
    fn is_sufficient(&self, state: &ResearchState) -> bool {
        state.findings().len() >= self.0
    }

    fn name(&self) -> &str {
        "min_findings"
    }
}
