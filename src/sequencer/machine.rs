use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::queue::TaskQueue;
use super::step::{advance, RunPlan, Step, StepContext, StepOutcome};
use super::{AgentAction, SequencerSnapshot, SequencerState};
use crate::analysis::AnalysisOutcome;
use crate::catalog::{ScenarioCatalog, SourceAvailability, SourceRecordStore};
use crate::config::SequencerConfig;

/// Identity and plan of the current run.
#[derive(Debug, Clone)]
struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    plan: RunPlan,
}

/// Replays the reasoning trace for one scenario on a virtual clock.
///
/// The sequencer never sleeps. Callers move the clock with
/// [`advance_by`](Self::advance_by) or [`advance_to`](Self::advance_to), and
/// every task that comes due fires in `(due, insertion)` order. See
/// [`SequencerHandle`](super::SequencerHandle) for a real-time driver.
pub struct ActionSequencer {
    catalog: Arc<ScenarioCatalog>,
    records: Arc<dyn SourceRecordStore>,
    config: SequencerConfig,
    now: Duration,
    epoch: u64,
    state: SequencerState,
    run: Option<RunContext>,
    actions: Vec<AgentAction>,
    outcome: Option<AnalysisOutcome>,
    queue: TaskQueue,
}

impl std::fmt::Debug for ActionSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSequencer")
            .field("now", &self.now)
            .field("epoch", &self.epoch)
            .field("state", &self.state)
            .field("actions", &self.actions.len())
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl ActionSequencer {
    /// Create a sequencer reading records from the catalog itself.
    pub fn new(catalog: Arc<ScenarioCatalog>, config: SequencerConfig) -> Self {
        let records: Arc<dyn SourceRecordStore> = catalog.clone();
        Self::with_records(catalog, records, config)
    }

    /// Create a sequencer with a separate record store.
    pub fn with_records(
        catalog: Arc<ScenarioCatalog>,
        records: Arc<dyn SourceRecordStore>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            catalog,
            records,
            config,
            now: Duration::ZERO,
            epoch: 0,
            state: SequencerState::Idle,
            run: None,
            actions: Vec::new(),
            outcome: None,
            queue: TaskQueue::new(),
        }
    }

    /// Start a run, resetting any run in progress.
    ///
    /// Unknown scenario keys still run with neutral narration and no sources.
    pub fn start(&mut self, scenario_key: &str, active: &SourceAvailability) {
        if self.state != SequencerState::Idle {
            info!(
                previous = ?self.run.as_ref().map(|r| r.plan.scenario_key.as_str()),
                state = %self.state,
                "Restarting sequencer"
            );
        }
        self.clear();

        let definition = self.catalog.get(scenario_key);
        let plan = RunPlan::new(scenario_key, definition, active, &self.config);
        let run_id = Uuid::new_v4();

        info!(
            run_id = %run_id,
            scenario = %scenario_key,
            known = definition.is_some(),
            checks = plan.checks.len(),
            epoch = self.epoch,
            "Sequencer started"
        );

        self.run = Some(RunContext {
            run_id,
            started_at: Utc::now(),
            plan,
        });
        self.state = SequencerState::Intro;
        self.queue
            .schedule(self.now + self.config.step_delay, self.epoch, Step::Intro(0));
    }

    /// Abandon the current run and return to idle. Safe from any state.
    pub fn reset(&mut self) {
        let was = self.state;
        self.clear();
        info!(epoch = self.epoch, from = %was, "Sequencer reset");
    }

    fn clear(&mut self) {
        self.epoch += 1;
        self.state = SequencerState::Idle;
        self.run = None;
        self.actions.clear();
        self.outcome = None;
    }

    /// Move the virtual clock forward by `delta`.
    pub fn advance_by(&mut self, delta: Duration) {
        self.advance_to(self.now + delta);
    }

    /// Move the virtual clock to `target`, firing every task due by then.
    ///
    /// A target in the past leaves the clock where it is.
    pub fn advance_to(&mut self, target: Duration) {
        while let Some(task) = self.queue.pop_due(target) {
            if task.epoch != self.epoch {
                debug!(
                    step = ?task.step,
                    task_epoch = task.epoch,
                    epoch = self.epoch,
                    "Dropping stale task"
                );
                continue;
            }
            if task.due > self.now {
                self.now = task.due;
            }

            let outcome = {
                let Some(run) = self.run.as_ref() else {
                    continue;
                };
                let ctx = StepContext {
                    plan: &run.plan,
                    definition: self.catalog.get(&run.plan.scenario_key),
                    records: self.records.as_ref(),
                    config: &self.config,
                    now: self.now,
                };
                advance(&ctx, task.step)
            };

            debug!(
                step = ?task.step,
                at_ms = self.now.as_millis() as u64,
                actions = outcome.actions.len(),
                "Fired step"
            );
            self.apply(outcome);
        }

        if target > self.now {
            self.now = target;
        }
    }

    fn apply(&mut self, outcome: StepOutcome) {
        self.actions.extend(outcome.actions);
        if let Some(state) = outcome.enter {
            self.state = state;
        }
        if let Some(revealed) = outcome.reveal {
            if let Some(run) = &self.run {
                info!(
                    run_id = %run.run_id,
                    scenario = %run.plan.scenario_key,
                    level = %revealed.hypothesis.confidence.level,
                    percent = revealed.hypothesis.confidence.percent,
                    actions = self.actions.len(),
                    "Analysis complete"
                );
            }
            self.outcome = Some(revealed);
        }
        if let Some((delay, step)) = outcome.next {
            self.queue.schedule(self.now + delay, self.epoch, step);
        }
    }

    /// Fire every queued task regardless of its due time.
    pub fn run_until_complete(&mut self) -> SequencerSnapshot {
        while let Some(due) = self.queue.next_due() {
            self.advance_to(due);
        }
        self.snapshot()
    }

    /// Due time of the earliest queued task, stale or not.
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.next_due()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            run_id: self.run.as_ref().map(|r| r.run_id),
            started_at: self.run.as_ref().map(|r| r.started_at),
            epoch: self.epoch,
            state: self.state,
            scenario_key: self.run.as_ref().map(|r| r.plan.scenario_key.clone()),
            actions: self.actions.clone(),
            revealed: self.outcome.is_some(),
            outcome: self.outcome.clone(),
        }
    }

    pub fn actions(&self) -> &[AgentAction] {
        &self.actions
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_revealed(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }
}
