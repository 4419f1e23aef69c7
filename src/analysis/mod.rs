//! Deterministic analysis over the scenario catalog.
//!
//! - [`ScenarioInference`]: free-text query to scenario key
//! - [`HypothesisResolver`]: first-match rule table to a [`Hypothesis`]
//! - [`EvidenceCollector`]: ordered [`Evidence`] for the active sources
//!
//! Every operation here is pure and total: unknown scenarios and malformed
//! toggles produce neutral results, never errors.

mod evidence;
mod hypothesis;
mod inference;

pub use evidence::*;
pub use hypothesis::*;
pub use inference::*;

use serde::{Deserialize, Serialize};

/// Final synthesis revealed at the end of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub hypothesis: Hypothesis,
    pub evidence: Vec<Evidence>,
}
