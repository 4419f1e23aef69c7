//! Property tests for hypothesis resolution and evidence collection
//!
//! Every subset of the six sources is evaluated for every built-in scenario.

use std::sync::Arc;

use insight_flow::analysis::{EvidenceCollector, HypothesisResolver};
use insight_flow::catalog::{ConfidenceLevel, ScenarioCatalog, SourceAvailability, SourceKey};
use pretty_assertions::assert_eq;

fn subsets() -> Vec<SourceAvailability> {
    (0u32..64)
        .map(|mask| {
            SourceAvailability::with_active(
                SourceKey::ALL
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, s)| s),
            )
        })
        .collect()
}

fn is_subset(a: &SourceAvailability, b: &SourceAvailability) -> bool {
    a.active().iter().all(|s| b.is_active(*s))
}

fn setup() -> (Arc<ScenarioCatalog>, HypothesisResolver, EvidenceCollector) {
    let catalog = Arc::new(ScenarioCatalog::new());
    (
        catalog.clone(),
        HypothesisResolver::new(catalog.clone()),
        EvidenceCollector::new(catalog),
    )
}

#[test]
fn test_resolution_is_deterministic() {
    let (catalog, resolver, collector) = setup();
    for definition in catalog.scenarios() {
        for active in subsets() {
            assert_eq!(
                resolver.resolve(definition.key(), &active),
                resolver.resolve(definition.key(), &active)
            );
            assert_eq!(
                collector.collect(definition.key(), &active),
                collector.collect(definition.key(), &active)
            );
        }
    }
}

#[test]
fn test_superset_never_lowers_confidence() {
    let (catalog, resolver, _) = setup();
    let all = subsets();
    for definition in catalog.scenarios() {
        for small in &all {
            let low = resolver.resolve(definition.key(), small);
            for big in all.iter().filter(|big| is_subset(small, big)) {
                let high = resolver.resolve(definition.key(), big);
                assert!(
                    high.confidence.percent >= low.confidence.percent,
                    "{}: {:?} -> {}% but {:?} -> {}%",
                    definition.key(),
                    small.active(),
                    low.confidence.percent,
                    big.active(),
                    high.confidence.percent
                );
                assert!(high.confidence.level >= low.confidence.level);
            }
        }
    }
}

#[test]
fn test_irrelevant_sources_never_change_result() {
    let (catalog, resolver, collector) = setup();
    for definition in catalog.scenarios() {
        for active in subsets() {
            let relevant = definition.relevant_view(&active);
            assert_eq!(
                resolver.resolve(definition.key(), &active),
                resolver.resolve(definition.key(), &relevant)
            );
            assert_eq!(
                collector.collect(definition.key(), &active),
                collector.collect(definition.key(), &relevant)
            );
        }
    }
}

#[test]
fn test_evidence_follows_canonical_order() {
    let (catalog, _, collector) = setup();
    for definition in catalog.scenarios() {
        let canonical = definition.relevant_sources();
        for active in subsets() {
            let sources: Vec<SourceKey> = collector
                .collect(definition.key(), &active)
                .iter()
                .map(|e| e.source)
                .collect();
            let expected: Vec<SourceKey> = canonical
                .iter()
                .copied()
                .filter(|s| active.is_active(*s))
                .collect();
            assert_eq!(sources, expected);
        }
    }
}

#[test]
fn test_checkout_scenario_concrete_results() {
    use SourceKey::*;
    let (_, resolver, _) = setup();

    let h = resolver.resolve(
        "checkout-drop",
        &SourceAvailability::with_active([Analytics, Support, Releases]),
    );
    assert_eq!(h.confidence.level, ConfidenceLevel::High);
    assert_eq!(h.confidence.percent, 90);
    assert!(h.note.is_none());

    let h = resolver.resolve(
        "checkout-drop",
        &SourceAvailability::with_active([Analytics, Releases]),
    );
    assert_eq!(h.confidence.level, ConfidenceLevel::Medium);
    assert_eq!(h.confidence.percent, 60);
    assert_eq!(
        h.conclusion,
        "Release v2.5.1 coincides with checkout completion drop."
    );
    assert_eq!(
        h.note.as_deref(),
        Some("Support ticket data missing for user impact details.")
    );

    // Support and releases without analytics fall through to the fallback.
    let h = resolver.resolve(
        "checkout-drop",
        &SourceAvailability::with_active([Support, Releases]),
    );
    assert_eq!(h.confidence.level, ConfidenceLevel::VeryLow);
    assert_eq!(h.confidence.percent, 20);
}

#[test]
fn test_api_scenario_concrete_results() {
    use SourceKey::*;
    let (_, resolver, _) = setup();

    let h = resolver.resolve(
        "api-error-spike",
        &SourceAvailability::with_active([Analytics, Infrastructure, Support]),
    );
    assert_eq!(h.confidence.percent, 70);
    assert_eq!(
        h.conclusion,
        "Database connection pool saturation caused API errors."
    );

    let h = resolver.resolve("api-error-spike", &SourceAvailability::with_active([Analytics]));
    assert_eq!(h.confidence.level, ConfidenceLevel::Low);
    assert_eq!(h.confidence.percent, 25);
}

#[test]
fn test_percent_stays_in_range() {
    let (catalog, resolver, _) = setup();
    for definition in catalog.scenarios() {
        for active in subsets() {
            assert!(resolver.resolve(definition.key(), &active).confidence.percent <= 100);
        }
    }
}
