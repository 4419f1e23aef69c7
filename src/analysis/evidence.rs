use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{
    ScenarioCatalog, ScenarioDefinition, SourceAvailability, SourceKey, SourceRecordStore,
};

/// One source-attributed finding supporting a hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: SourceKey,
    pub text: String,
    /// Whether a raw record backs this item.
    pub has_data: bool,
    pub evidence_id: usize,
}

/// Collect evidence for a known or unknown scenario.
///
/// Items follow the scenario's relevance table order, one per active
/// relevant source.
pub fn collect_definition(
    definition: Option<&ScenarioDefinition>,
    active: &SourceAvailability,
    records: &dyn SourceRecordStore,
) -> Vec<Evidence> {
    let Some(definition) = definition else {
        return Vec::new();
    };

    definition
        .sources
        .iter()
        .filter(|profile| active.is_active(profile.source))
        .map(|profile| Evidence {
            source: profile.source,
            text: profile.evidence.clone(),
            has_data: records
                .record(definition.key(), profile.source, profile.evidence_id)
                .is_some(),
            evidence_id: profile.evidence_id,
        })
        .collect()
}

/// Maps `(scenario, active sources)` to ordered evidence.
#[derive(Debug, Clone)]
pub struct EvidenceCollector {
    catalog: Arc<ScenarioCatalog>,
}

impl EvidenceCollector {
    pub fn new(catalog: Arc<ScenarioCatalog>) -> Self {
        Self { catalog }
    }

    /// Collect evidence. Never fails; unknown scenarios yield nothing.
    pub fn collect(&self, scenario_key: &str, active: &SourceAvailability) -> Vec<Evidence> {
        collect_definition(
            self.catalog.get(scenario_key),
            active,
            self.catalog.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MockSourceRecordStore;
    use SourceKey::*;

    fn collector() -> EvidenceCollector {
        EvidenceCollector::new(Arc::new(ScenarioCatalog::new()))
    }

    #[test]
    fn test_checkout_evidence_in_canonical_order() {
        let active = SourceAvailability::with_active([Releases, Support, Analytics]);
        let evidence = collector().collect("checkout-drop", &active);

        let sources: Vec<SourceKey> = evidence.iter().map(|e| e.source).collect();
        assert_eq!(sources, vec![Analytics, Support, Releases]);
        assert_eq!(
            evidence[0].text,
            "Checkout completion rate dropped from 85% to 70% at 14:00 on May 5th."
        );
        assert!(evidence.iter().all(|e| e.has_data && e.evidence_id == 0));
    }

    #[test]
    fn test_irrelevant_active_sources_are_skipped() {
        let active = SourceAvailability::with_active([Analytics, Internal, AppStore]);
        let evidence = collector().collect("checkout-drop", &active);

        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].source, Analytics);
    }

    #[test]
    fn test_api_evidence() {
        let active = SourceAvailability::with_active([Infrastructure, Internal]);
        let evidence = collector().collect("api-error-spike", &active);

        let sources: Vec<SourceKey> = evidence.iter().map(|e| e.source).collect();
        assert_eq!(sources, vec![Internal, Infrastructure]);
        assert_eq!(
            evidence[1].text,
            "Database connection pool reached 100% utilization during the incident period."
        );
    }

    #[test]
    fn test_unknown_scenario_yields_nothing() {
        let evidence = collector().collect("nope", &SourceAvailability::with_active(SourceKey::ALL));
        assert!(evidence.is_empty());
    }

    #[test]
    fn test_has_data_follows_record_store() {
        let catalog = ScenarioCatalog::new();
        let mut records = MockSourceRecordStore::new();
        records
            .expect_record()
            .returning(|_, source, _| match source {
                SourceKey::Analytics => None,
                _ => ScenarioCatalog::new().record("checkout-drop", source, 0),
            });

        let evidence = collect_definition(
            catalog.get("checkout-drop"),
            &SourceAvailability::with_active([Analytics, Support]),
            &records,
        );

        assert!(!evidence[0].has_data);
        assert!(evidence[1].has_data);
    }
}
