//! Raw source records backing each piece of evidence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SourceKey;

/// The raw data a source holds for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// One-line summary, surfaced as the agent's finding.
    pub summary: String,
    pub title: String,
    pub description: String,
    /// Type-specific body.
    #[serde(flatten)]
    pub payload: RecordPayload,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Record body, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordPayload {
    /// A time series.
    Chart { points: Vec<ChartPoint> },
    /// Free text such as a release note or chat log.
    Text { content: String },
    /// A list of items such as tickets or reviews.
    List { items: Vec<String> },
}

impl RecordPayload {
    /// The payload kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordPayload::Chart { .. } => "chart",
            RecordPayload::Text { .. } => "text",
            RecordPayload::List { .. } => "list",
        }
    }
}

/// One point of a chart payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

impl SourceRecord {
    /// Create a record with an empty metadata map.
    pub fn new(
        summary: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        payload: RecordPayload,
    ) -> Self {
        Self {
            summary: summary.into(),
            title: title.into(),
            description: description.into(),
            payload,
            metadata: BTreeMap::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Lookup of raw source records.
///
/// Implemented by [`super::ScenarioCatalog`]; the sequencer only depends on
/// this trait so record availability can be faked in tests.
#[cfg_attr(test, mockall::automock)]
pub trait SourceRecordStore: Send + Sync {
    /// Get the record for `(scenario, source, evidence_id)`, if any.
    fn record(&self, scenario_key: &str, source: SourceKey, evidence_id: usize)
        -> Option<SourceRecord>;
}
