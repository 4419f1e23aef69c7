use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::SourceKey;

/// Kind of reasoning-trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Restates detected key terms.
    Parse,
    /// Names the KPI.
    Identify,
    /// Names the time window.
    Determine,
    /// Interpretation or direction.
    Thought,
    /// Starts looking at a source.
    Check,
    /// A source produced a relevant record.
    Finding,
    /// A source produced nothing usable.
    Warning,
    /// Cross-source correlation.
    Correlate,
    /// Closing statement.
    Hypothesis,
}

impl ActionKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Parse => "parse",
            ActionKind::Identify => "identify",
            ActionKind::Determine => "determine",
            ActionKind::Thought => "thought",
            ActionKind::Check => "check",
            ActionKind::Finding => "finding",
            ActionKind::Warning => "warning",
            ActionKind::Correlate => "correlate",
            ActionKind::Hypothesis => "hypothesis",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One appended entry of the reasoning trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub label: String,
    pub content: String,
    /// Virtual time since the sequencer clock origin.
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceKey>,
}

impl AgentAction {
    /// Create an action not tied to a source.
    pub fn new(kind: ActionKind, content: impl Into<String>, at: Duration) -> Self {
        let label = match kind {
            ActionKind::Parse => "Parsing query",
            ActionKind::Identify => "Identifying KPI",
            ActionKind::Determine => "Determining time window",
            ActionKind::Thought => "Thinking",
            ActionKind::Check => "Checking source",
            ActionKind::Finding => "Finding",
            ActionKind::Warning => "No findings",
            ActionKind::Correlate => "Correlating evidence",
            ActionKind::Hypothesis => "Forming hypothesis",
        };
        Self {
            kind,
            label: label.to_string(),
            content: content.into(),
            timestamp_ms: at.as_millis() as u64,
            source: None,
        }
    }

    /// Create an action about a specific source.
    pub fn for_source(
        kind: ActionKind,
        source: SourceKey,
        content: impl Into<String>,
        at: Duration,
    ) -> Self {
        let mut action = Self::new(kind, content, at);
        let name = source.display_name();
        match kind {
            ActionKind::Check => action.label = format!("Checking {}", name),
            ActionKind::Finding => action.label = format!("Finding from {}", name),
            ActionKind::Warning => action.label = format!("No findings from {}", name),
            _ => {}
        }
        action.source = Some(source);
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let at = Duration::from_millis(1600);
        let action = AgentAction::new(ActionKind::Identify, "KPI: x", at);
        assert_eq!(action.label, "Identifying KPI");
        assert_eq!(action.timestamp_ms, 1600);
        assert!(action.source.is_none());

        let action = AgentAction::for_source(ActionKind::Check, SourceKey::Releases, "looking", at);
        assert_eq!(action.label, "Checking Release Logs");
        assert_eq!(action.source, Some(SourceKey::Releases));

        let action = AgentAction::for_source(ActionKind::Thought, SourceKey::Support, "hmm", at);
        assert_eq!(action.label, "Thinking");
    }

    #[test]
    fn test_serializes_type_field() {
        let action = AgentAction::for_source(
            ActionKind::Finding,
            SourceKey::Analytics,
            "drop",
            Duration::from_millis(5),
        );
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "finding");
        assert_eq!(value["source"], "analytics");
        assert_eq!(value["timestamp_ms"], 5);
    }
}
