//! Pure step function of the reasoning trace.
//!
//! Firing a [`Step`] never touches the sequencer; it returns the actions to
//! append, an optional state transition, and the next step with its delay.

use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use super::{ActionKind, AgentAction, SequencerState};
use crate::analysis::{collect_definition, resolve_definition, AnalysisOutcome};
use crate::catalog::{ScenarioDefinition, SourceAvailability, SourceKey, SourceRecordStore};
use crate::config::SequencerConfig;

/// Warning text for an active source outside the relevance table.
pub const NO_FINDINGS: &str = "Source checked but no significant findings for this scenario.";

/// Warning text for a relevant source without a record.
pub const NO_DATA: &str = "Source checked but no data was available for this scenario.";

/// One source to inspect during the source-check phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedCheck {
    pub source: SourceKey,
    /// Whether the source is in the scenario's relevance table.
    pub relevant: bool,
}

/// Inputs fixed for the lifetime of one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub scenario_key: String,
    pub active: SourceAvailability,
    /// Ordered sources for the source-check phase.
    pub checks: Vec<PlannedCheck>,
}

impl RunPlan {
    /// Plan a run: active relevant sources in canonical order, then (if
    /// enabled) active irrelevant ones in global source order.
    pub fn new(
        scenario_key: &str,
        definition: Option<&ScenarioDefinition>,
        active: &SourceAvailability,
        config: &SequencerConfig,
    ) -> Self {
        let mut checks = Vec::new();
        if let Some(definition) = definition {
            checks.extend(
                definition
                    .relevant_active(active)
                    .into_iter()
                    .map(|source| PlannedCheck {
                        source,
                        relevant: true,
                    }),
            );
            if config.check_irrelevant_sources {
                checks.extend(
                    definition
                        .irrelevant_active(active)
                        .into_iter()
                        .map(|source| PlannedCheck {
                            source,
                            relevant: false,
                        }),
                );
            }
        }

        Self {
            scenario_key: scenario_key.to_string(),
            active: active.clone(),
            checks,
        }
    }
}

/// A unit of scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Intro action 0..4: parse, identify, determine, thought.
    Intro(usize),
    /// Enter the source-check phase.
    BeginSources,
    /// Announce the check of planned source `i`.
    Check(usize),
    /// Emit the finding or warning for planned source `i`.
    Inspect(usize),
    /// Interpret the finding of planned source `i`.
    Interpret(usize),
    /// Enter the correlate phase and correlate.
    Correlate,
    /// State the hypothesis.
    Hypothesize,
    /// Publish the outcome and complete.
    Reveal,
}

/// Everything a step may read.
pub struct StepContext<'a> {
    pub plan: &'a RunPlan,
    pub definition: Option<&'a ScenarioDefinition>,
    pub records: &'a dyn SourceRecordStore,
    pub config: &'a SequencerConfig,
    /// Virtual time at which the step fires.
    pub now: Duration,
}

/// Result of firing one step.
#[derive(Debug, Default)]
pub struct StepOutcome {
    pub actions: Vec<AgentAction>,
    pub enter: Option<SequencerState>,
    pub reveal: Option<AnalysisOutcome>,
    pub next: Option<(Duration, Step)>,
}

impl StepOutcome {
    fn action(mut self, action: AgentAction) -> Self {
        self.actions.push(action);
        self
    }

    fn enter(mut self, state: SequencerState) -> Self {
        self.enter = Some(state);
        self
    }

    fn then(mut self, delay: Duration, step: Step) -> Self {
        self.next = Some((delay, step));
        self
    }
}

/// Fire a step.
pub fn advance(ctx: &StepContext<'_>, step: Step) -> StepOutcome {
    let step_delay = ctx.config.step_delay;
    let phase_delay = ctx.config.phase_delay;

    match step {
        Step::Intro(i) => {
            let (kind, content) = intro_line(ctx, i);
            let outcome = StepOutcome::default().action(AgentAction::new(kind, content, ctx.now));
            if i + 1 < 4 {
                outcome.then(step_delay, Step::Intro(i + 1))
            } else {
                outcome.then(phase_delay, Step::BeginSources)
            }
        }
        Step::BeginSources => {
            let outcome = StepOutcome::default().enter(SequencerState::SourceCheck);
            if ctx.plan.checks.is_empty() {
                outcome.then(phase_delay, Step::Correlate)
            } else {
                outcome.then(step_delay, Step::Check(0))
            }
        }
        Step::Check(i) => {
            let Some(check) = ctx.plan.checks.get(i) else {
                return StepOutcome::default().then(phase_delay, Step::Correlate);
            };
            let content = match ctx.definition.and_then(|d| d.profile(check.source)) {
                Some(profile) if check.relevant => profile.check.clone(),
                _ => format!("Looking for signals related to {}", scenario_title(ctx)),
            };
            StepOutcome::default()
                .action(AgentAction::for_source(
                    ActionKind::Check,
                    check.source,
                    content,
                    ctx.now,
                ))
                .then(step_delay, Step::Inspect(i))
        }
        Step::Inspect(i) => {
            let Some(check) = ctx.plan.checks.get(i) else {
                return StepOutcome::default().then(phase_delay, Step::Correlate);
            };
            let finding = if check.relevant {
                let evidence_id = ctx
                    .definition
                    .and_then(|d| d.profile(check.source))
                    .map(|p| p.evidence_id)
                    .unwrap_or(0);
                let record = ctx
                    .records
                    .record(&ctx.plan.scenario_key, check.source, evidence_id);
                if record.is_none() {
                    warn!(
                        scenario = %ctx.plan.scenario_key,
                        source = %check.source,
                        evidence_id,
                        "Relevant source has no record, reporting a warning instead"
                    );
                }
                record
            } else {
                None
            };

            match finding {
                Some(record) => StepOutcome::default()
                    .action(AgentAction::for_source(
                        ActionKind::Finding,
                        check.source,
                        record.summary,
                        ctx.now,
                    ))
                    .then(step_delay, Step::Interpret(i)),
                None => {
                    let text = if check.relevant { NO_DATA } else { NO_FINDINGS };
                    let outcome = StepOutcome::default().action(AgentAction::for_source(
                        ActionKind::Warning,
                        check.source,
                        text,
                        ctx.now,
                    ));
                    after_source(ctx, i, outcome)
                }
            }
        }
        Step::Interpret(i) => {
            let Some(check) = ctx.plan.checks.get(i) else {
                return StepOutcome::default().then(phase_delay, Step::Correlate);
            };
            let mut outcome = StepOutcome::default();
            if let Some(profile) = ctx.definition.and_then(|d| d.profile(check.source)) {
                outcome = outcome.action(AgentAction::for_source(
                    ActionKind::Thought,
                    check.source,
                    profile.interpretation.clone(),
                    ctx.now,
                ));
            }
            after_source(ctx, i, outcome)
        }
        Step::Correlate => {
            let content = match ctx.definition {
                Some(d) => d.matching_rule(&ctx.plan.active).correlation.clone(),
                None => "No relevant sources are available to correlate.".to_string(),
            };
            StepOutcome::default()
                .enter(SequencerState::Correlate)
                .action(AgentAction::new(ActionKind::Correlate, content, ctx.now))
                .then(step_delay, Step::Hypothesize)
        }
        Step::Hypothesize => {
            let hypothesis = resolve_definition(ctx.definition, &ctx.plan.active);
            StepOutcome::default()
                .action(AgentAction::new(
                    ActionKind::Hypothesis,
                    hypothesis.narrate(),
                    ctx.now,
                ))
                .then(step_delay, Step::Reveal)
        }
        Step::Reveal => {
            let outcome = AnalysisOutcome {
                hypothesis: resolve_definition(ctx.definition, &ctx.plan.active),
                evidence: collect_definition(ctx.definition, &ctx.plan.active, ctx.records),
            };
            StepOutcome {
                reveal: Some(outcome),
                ..StepOutcome::default()
            }
            .enter(SequencerState::Complete)
        }
    }
}

fn after_source(ctx: &StepContext<'_>, i: usize, outcome: StepOutcome) -> StepOutcome {
    if i + 1 < ctx.plan.checks.len() {
        outcome.then(ctx.config.step_delay, Step::Check(i + 1))
    } else {
        outcome.then(ctx.config.phase_delay, Step::Correlate)
    }
}

fn scenario_title(ctx: &StepContext<'_>) -> String {
    ctx.definition
        .map(|d| d.scenario.title.clone())
        .unwrap_or_else(|| ctx.plan.scenario_key.clone())
}

fn intro_line(ctx: &StepContext<'_>, i: usize) -> (ActionKind, String) {
    let kinds = [
        ActionKind::Parse,
        ActionKind::Identify,
        ActionKind::Determine,
        ActionKind::Thought,
    ];
    let kind = kinds[i.min(3)];

    let content = match ctx.definition {
        Some(d) => match kind {
            ActionKind::Parse => d.intro.parse.clone(),
            ActionKind::Identify => d.intro.identify.clone(),
            ActionKind::Determine => d.intro.determine.clone(),
            _ => d.intro.thought.clone(),
        },
        None => match kind {
            ActionKind::Parse => format!(
                "No recognizable key terms for scenario '{}'",
                ctx.plan.scenario_key
            ),
            ActionKind::Identify => "KPI: unknown".to_string(),
            ActionKind::Determine => "Time window: unknown".to_string(),
            _ => "This scenario is not in the catalog, so there are no sources to check."
                .to_string(),
        },
    };
    (kind, content)
}
