//! Timed replay of the analyst's reasoning trace.
//!
//! This module provides:
//! - [`ActionSequencer`]: state machine on a virtual clock
//! - [`SequencerHandle`]: tokio driver firing steps in real time
//! - [`AgentAction`] and [`SequencerSnapshot`]: what consumers observe
//!
//! Work is scheduled as [`Step`]s tagged with the epoch they were created
//! under. `start` and `reset` bump the epoch, so anything still queued from an
//! earlier run is dropped when it comes due.

mod action;
mod driver;
mod machine;
mod queue;
mod step;

pub use action::*;
pub use driver::*;
pub use machine::*;
pub use queue::{ScheduledTask, TaskQueue};
pub use step::{advance, PlannedCheck, RunPlan, Step, StepContext, StepOutcome, NO_DATA, NO_FINDINGS};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::AnalysisOutcome;

/// Sequencer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerState {
    #[default]
    Idle,
    Intro,
    SourceCheck,
    Correlate,
    Complete,
}

impl SequencerState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SequencerState::Idle => "idle",
            SequencerState::Intro => "intro",
            SequencerState::SourceCheck => "source_check",
            SequencerState::Correlate => "correlate",
            SequencerState::Complete => "complete",
        }
    }
}

impl std::fmt::Display for SequencerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable copy of the sequencer handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub epoch: u64,
    pub state: SequencerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_key: Option<String>,
    pub actions: Vec<AgentAction>,
    pub revealed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<AnalysisOutcome>,
}
