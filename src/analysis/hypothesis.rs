use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{
    ConfidenceLevel, HypothesisRule, ScenarioCatalog, ScenarioDefinition, SourceAvailability,
};

/// Confidence attached to a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confidence {
    pub level: ConfidenceLevel,
    /// 0-100, fixed per rule.
    pub percent: u8,
}

/// Best-guess conclusion for a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub conclusion: String,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Hypothesis {
    /// Neutral result for scenarios the catalog does not know.
    pub fn unable_to_analyze() -> Self {
        Self {
            conclusion: "Unable to analyze this scenario with available data.".to_string(),
            confidence: Confidence {
                level: ConfidenceLevel::None,
                percent: 0,
            },
            note: None,
        }
    }

    /// Phrase the hypothesis as the agent's closing statement.
    pub fn narrate(&self) -> String {
        let conclusion = self.conclusion.to_lowercase();
        match self.confidence.level.adverb() {
            Some(adverb) => format!("Evidence {} suggests {}", adverb, conclusion),
            None => format!("Evidence suggests {}", conclusion),
        }
    }
}

impl From<&HypothesisRule> for Hypothesis {
    fn from(rule: &HypothesisRule) -> Self {
        Self {
            conclusion: rule.conclusion.clone(),
            confidence: Confidence {
                level: rule.level,
                percent: rule.percent,
            },
            note: rule.note.clone(),
        }
    }
}

/// Resolve a hypothesis for a known or unknown scenario.
///
/// Only sources in the scenario's relevance table take part in matching.
pub fn resolve_definition(
    definition: Option<&ScenarioDefinition>,
    active: &SourceAvailability,
) -> Hypothesis {
    match definition {
        Some(d) => Hypothesis::from(d.matching_rule(active)),
        None => Hypothesis::unable_to_analyze(),
    }
}

/// Maps `(scenario, active sources)` to a hypothesis.
#[derive(Debug, Clone)]
pub struct HypothesisResolver {
    catalog: Arc<ScenarioCatalog>,
}

impl HypothesisResolver {
    pub fn new(catalog: Arc<ScenarioCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve the hypothesis. Never fails.
    pub fn resolve(&self, scenario_key: &str, active: &SourceAvailability) -> Hypothesis {
        resolve_definition(self.catalog.get(scenario_key), active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceKey::{self, *};

    fn resolver() -> HypothesisResolver {
        HypothesisResolver::new(Arc::new(ScenarioCatalog::new()))
    }

    fn on(sources: &[SourceKey]) -> SourceAvailability {
        SourceAvailability::with_active(sources.iter().copied())
    }

    #[test]
    fn test_checkout_full_sources() {
        let hypothesis = resolver().resolve("checkout-drop", &on(&[Analytics, Support, Releases]));
        assert_eq!(
            hypothesis.conclusion,
            "Release v2.5.1 caused checkout button failure on mobile devices due to event handler changes."
        );
        assert_eq!(hypothesis.confidence.level, ConfidenceLevel::High);
        assert_eq!(hypothesis.confidence.percent, 90);
        assert!(hypothesis.note.is_none());
    }

    #[test]
    fn test_checkout_table() {
        let r = resolver();
        let cases: [(&[SourceKey], ConfidenceLevel, u8); 5] = [
            (&[Analytics, Support], ConfidenceLevel::Medium, 65),
            (&[Analytics, Releases], ConfidenceLevel::Medium, 60),
            (&[Analytics], ConfidenceLevel::Low, 30),
            (&[Support, Releases], ConfidenceLevel::VeryLow, 20),
            (&[], ConfidenceLevel::VeryLow, 20),
        ];
        for (sources, level, percent) in cases {
            let h = r.resolve("checkout-drop", &on(sources));
            assert_eq!((h.confidence.level, h.confidence.percent), (level, percent), "{:?}", sources);
            assert!(h.note.is_some());
        }
    }

    #[test]
    fn test_api_analytics_only() {
        let mut active = on(&[Analytics]);
        active.set(Internal, false);
        active.set(Infrastructure, false);

        let h = resolver().resolve("api-error-spike", &active);
        assert_eq!(h.confidence.level, ConfidenceLevel::Low);
        assert_eq!(h.confidence.percent, 25);
        assert_eq!(h.note.as_deref(), Some("Insufficient data to determine root cause."));
    }

    #[test]
    fn test_api_table() {
        let r = resolver();
        let h = r.resolve("api-error-spike", &on(&[Analytics, Internal, Infrastructure]));
        assert_eq!(h.confidence.percent, 95);
        let h = r.resolve("api-error-spike", &on(&[Analytics, Infrastructure]));
        assert_eq!(h.confidence.percent, 70);
        let h = r.resolve("api-error-spike", &on(&[Analytics, Internal]));
        assert_eq!(h.confidence.percent, 65);
        let h = r.resolve("api-error-spike", &on(&[Internal, Infrastructure]));
        assert_eq!(h.confidence.level, ConfidenceLevel::VeryLow);
        assert_eq!(h.confidence.percent, 15);
    }

    #[test]
    fn test_irrelevant_sources_do_not_change_the_match() {
        let r = resolver();
        let base = r.resolve("checkout-drop", &on(&[Analytics]));
        let noisy = r.resolve(
            "checkout-drop",
            &on(&[Analytics, Internal, Infrastructure, AppStore]),
        );
        assert_eq!(base, noisy);
    }

    #[test]
    fn test_unknown_scenario_is_neutral() {
        let h = resolver().resolve("nope", &on(&[Analytics]));
        assert_eq!(h, Hypothesis::unable_to_analyze());
        assert_eq!(h.confidence.level, ConfidenceLevel::None);
        assert_eq!(h.confidence.percent, 0);
    }

    #[test]
    fn test_narrate_uses_level_adverb() {
        let h = resolver().resolve("checkout-drop", &on(&[Analytics, Support, Releases]));
        assert_eq!(
            h.narrate(),
            "Evidence strongly suggests release v2.5.1 caused checkout button failure on mobile devices due to event handler changes."
        );

        let h = resolver().resolve("checkout-drop", &on(&[]));
        assert_eq!(
            h.narrate(),
            "Evidence suggests insufficient data to determine root cause of checkout completion drop."
        );
    }

    #[test]
    fn test_serializes_level_labels() {
        let h = resolver().resolve("api-error-spike", &on(&[]));
        let value = serde_json::to_value(&h).unwrap();
        assert_eq!(value["confidence"]["level"], "Very Low");
        assert_eq!(value["confidence"]["percent"], 15);
    }
}
