//! Data types for scenario definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{SourceAvailability, SourceKey, SourceRecord};

/// Public scenario metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique scenario key (e.g., "checkout-drop").
    pub key: String,
    pub title: String,
    /// The canned operator question.
    pub query: String,
    pub description: String,
}

/// Ordered confidence levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    None,
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Get the level label
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::None => "None",
            ConfidenceLevel::VeryLow => "Very Low",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        }
    }

    /// Adverb used when phrasing a hypothesis at this level.
    pub fn adverb(&self) -> Option<&'static str> {
        match self {
            ConfidenceLevel::High => Some("strongly"),
            ConfidenceLevel::Medium => Some("moderately"),
            ConfidenceLevel::Low => Some("weakly"),
            ConfidenceLevel::VeryLow | ConfidenceLevel::None => None,
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConfidenceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "none" => Ok(ConfidenceLevel::None),
            "very low" | "verylow" => Ok(ConfidenceLevel::VeryLow),
            "low" => Ok(ConfidenceLevel::Low),
            "medium" => Ok(ConfidenceLevel::Medium),
            "high" => Ok(ConfidenceLevel::High),
            _ => Err(format!("Unknown confidence level: {}", s)),
        }
    }
}

/// The four framing actions emitted before any source is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroScript {
    /// Restates the detected key terms.
    pub parse: String,
    /// Names the KPI under investigation.
    pub identify: String,
    /// Names the time window.
    pub determine: String,
    /// Initial hypothesis direction.
    pub thought: String,
}

/// A source that matters for a scenario, with its narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub source: SourceKey,
    /// Static evidence summary shown with the final hypothesis.
    pub evidence: String,
    /// What the agent is looking for in this source.
    pub check: String,
    /// Interpretation emitted after a finding.
    pub interpretation: String,
    /// Which record backs the evidence item.
    #[serde(default)]
    pub evidence_id: usize,
}

/// One row of a scenario's hypothesis table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisRule {
    /// Relevant sources that must all be active. Empty for the fallback.
    #[serde(default)]
    pub requires: Vec<SourceKey>,
    pub conclusion: String,
    pub level: ConfidenceLevel,
    pub percent: u8,
    /// Caveat naming what is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Narrative used when correlating this combination of sources.
    pub correlation: String,
}

impl HypothesisRule {
    /// Whether every required source is active.
    pub fn matches(&self, active: &SourceAvailability) -> bool {
        self.requires.iter().all(|s| active.is_active(*s))
    }
}

/// Everything the core needs to analyze one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    #[serde(flatten)]
    pub scenario: Scenario,
    /// Lower-case keywords for query inference.
    pub keywords: Vec<String>,
    /// Relevance table in canonical evidence order.
    pub sources: Vec<SourceProfile>,
    pub intro: IntroScript,
    /// Most specific first.
    pub rules: Vec<HypothesisRule>,
    /// Applies when no rule matches.
    pub fallback: HypothesisRule,
    /// Raw records per source, indexed by evidence id.
    #[serde(default)]
    pub records: BTreeMap<SourceKey, Vec<SourceRecord>>,
}

impl ScenarioDefinition {
    pub fn key(&self) -> &str {
        &self.scenario.key
    }

    /// Profile for a source, if it is relevant to this scenario.
    pub fn profile(&self, source: SourceKey) -> Option<&SourceProfile> {
        self.sources.iter().find(|p| p.source == source)
    }

    /// Whether the source is in the relevance table.
    pub fn is_relevant(&self, source: SourceKey) -> bool {
        self.profile(source).is_some()
    }

    /// Relevant sources in canonical order.
    pub fn relevant_sources(&self) -> Vec<SourceKey> {
        self.sources.iter().map(|p| p.source).collect()
    }

    /// Sources both active and relevant, in canonical order.
    pub fn relevant_active(&self, active: &SourceAvailability) -> Vec<SourceKey> {
        self.sources
            .iter()
            .map(|p| p.source)
            .filter(|s| active.is_active(*s))
            .collect()
    }

    /// Active sources outside the relevance table, in global source order.
    pub fn irrelevant_active(&self, active: &SourceAvailability) -> Vec<SourceKey> {
        active
            .active()
            .into_iter()
            .filter(|s| !self.is_relevant(*s))
            .collect()
    }

    /// Default toggles: every relevant source on.
    pub fn default_availability(&self) -> SourceAvailability {
        let mut availability = SourceAvailability::none();
        for source in SourceKey::ALL {
            availability.set(source, self.is_relevant(source));
        }
        availability
    }

    /// Restrict toggles to the relevance table.
    pub fn relevant_view(&self, active: &SourceAvailability) -> SourceAvailability {
        SourceAvailability::with_active(self.relevant_active(active))
    }

    /// First matching rule, else the fallback.
    pub fn matching_rule(&self, active: &SourceAvailability) -> &HypothesisRule {
        let relevant = self.relevant_view(active);
        self.rules
            .iter()
            .find(|rule| rule.matches(&relevant))
            .unwrap_or(&self.fallback)
    }

    /// Look up a raw record.
    pub fn record(&self, source: SourceKey, evidence_id: usize) -> Option<&SourceRecord> {
        self.records.get(&source).and_then(|r| r.get(evidence_id))
    }

    /// Check the authoring invariants of the definition.
    pub fn validate(&self) -> Result<(), String> {
        let key = self.key();
        if key.trim().is_empty() {
            return Err("Scenario key is required".to_string());
        }
        if self.scenario.title.trim().is_empty() || self.scenario.query.trim().is_empty() {
            return Err("Scenario title and query are required".to_string());
        }
        if self.sources.is_empty() {
            return Err("At least one relevant source is required".to_string());
        }

        for (i, profile) in self.sources.iter().enumerate() {
            if self.sources[..i].iter().any(|p| p.source == profile.source) {
                return Err(format!("Source '{}' listed twice", profile.source));
            }
            if [&profile.evidence, &profile.check, &profile.interpretation]
                .iter()
                .any(|s| s.trim().is_empty())
            {
                return Err(format!("Source '{}' is missing narration", profile.source));
            }
        }

        // Keywords match as substrings, so a short bare word fires inside
        // unrelated words ("api" in "rapidly").
        if let Some(keyword) = self.keywords.iter().find(|k| {
            k.trim().is_empty() || (k.chars().count() < 4 && k.chars().all(char::is_alphabetic))
        }) {
            return Err(format!("Keyword '{}' is too short to match reliably", keyword));
        }

        let intro = &self.intro;
        if [&intro.parse, &intro.identify, &intro.determine, &intro.thought]
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err("All four intro strings are required".to_string());
        }

        if !self.fallback.requires.is_empty() {
            return Err("Fallback rule cannot require sources".to_string());
        }

        let table: Vec<&HypothesisRule> =
            self.rules.iter().chain(std::iter::once(&self.fallback)).collect();

        for (i, rule) in table.iter().enumerate() {
            if rule.percent > 100 {
                return Err(format!("Rule {} has percent {} above 100", i, rule.percent));
            }
            if rule.conclusion.trim().is_empty() || rule.correlation.trim().is_empty() {
                return Err(format!("Rule {} is missing conclusion or correlation", i));
            }
            if let Some(source) = rule.requires.iter().find(|s| !self.is_relevant(**s)) {
                return Err(format!(
                    "Rule {} requires '{}' which is not relevant",
                    i, source
                ));
            }

            for (j, earlier) in table[..i].iter().enumerate() {
                // Rows run from most to least confident; this keeps supersets
                // of active sources from ever scoring lower.
                if earlier.percent < rule.percent || earlier.level < rule.level {
                    return Err(format!(
                        "Rule {} ({} {}%) outranks earlier rule {} ({} {}%)",
                        i, rule.level, rule.percent, j, earlier.level, earlier.percent
                    ));
                }
                if earlier.requires.iter().all(|s| rule.requires.contains(s)) {
                    return Err(format!("Rule {} is shadowed by earlier rule {}", i, j));
                }
            }
        }

        Ok(())
    }
}
