//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use crate::analysis::{EvidenceCollector, HypothesisResolver, ScenarioInference};
use crate::catalog::{ScenarioCatalog, SourceAvailability};
use crate::config::Config;
use crate::sequencer::{ActionSequencer, SequencerHandle};

/// Application state shared across handlers.
///
/// Holds the read-only catalog with the analysis helpers built on it, plus
/// the live session driven in real time.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Registered scenarios.
    pub catalog: Arc<ScenarioCatalog>,
    /// Query to scenario mapping.
    pub inference: ScenarioInference,
    /// Rule table evaluation.
    pub resolver: HypothesisResolver,
    /// Evidence listing.
    pub collector: EvidenceCollector,
    /// Live reasoning-trace session.
    pub session: SequencerHandle,
}

impl AppState {
    /// Create new application state.
    ///
    /// Spawns the session pump, so this must run inside a tokio runtime.
    pub fn new(config: Config, catalog: ScenarioCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let inference =
            ScenarioInference::new(catalog.clone(), config.scenarios.default_scenario.clone());
        let resolver = HypothesisResolver::new(catalog.clone());
        let collector = EvidenceCollector::new(catalog.clone());
        let session = SequencerHandle::spawn(ActionSequencer::new(
            catalog.clone(),
            config.sequencer.clone(),
        ));

        info!(
            scenarios = catalog.len(),
            default_scenario = %inference.default_key(),
            step_delay_ms = config.sequencer.step_delay.as_millis() as u64,
            phase_delay_ms = config.sequencer.phase_delay.as_millis() as u64,
            "AppState initialized"
        );

        Self {
            config,
            catalog,
            inference,
            resolver,
            collector,
            session,
        }
    }

    /// Pick the scenario for a request: explicit key, else inferred from the
    /// query, else the default.
    pub fn target_scenario(&self, scenario: Option<&str>, query: Option<&str>) -> String {
        match (scenario, query) {
            (Some(key), _) if !key.trim().is_empty() => key.trim().to_string(),
            (_, Some(query)) => self.inference.infer(query).to_string(),
            _ => self.inference.default_key().to_string(),
        }
    }

    /// Scenario defaults with optional user toggles laid over them.
    pub fn availability(
        &self,
        scenario_key: &str,
        toggles: Option<&Map<String, Value>>,
    ) -> SourceAvailability {
        let defaults = self.catalog.default_availability(scenario_key);
        match toggles {
            Some(toggles) => defaults.merged(&SourceAvailability::from_json_toggles(toggles)),
            None => defaults,
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceKey;
    use serde_json::json;

    fn state() -> AppState {
        AppState::new(Config::default(), ScenarioCatalog::new())
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let state = state();
        assert_eq!(state.catalog.len(), 3);
        assert_eq!(state.inference.default_key(), "checkout-drop");
    }

    #[tokio::test]
    async fn test_target_scenario_precedence() {
        let state = state();
        assert_eq!(
            state.target_scenario(Some("api-error-spike"), Some("checkout")),
            "api-error-spike"
        );
        assert_eq!(
            state.target_scenario(None, Some("why so many 5xx?")),
            "api-error-spike"
        );
        assert_eq!(state.target_scenario(Some("  "), None), "checkout-drop");
        assert_eq!(state.target_scenario(None, None), "checkout-drop");
        // Unknown explicit keys are passed through and analysed neutrally.
        assert_eq!(state.target_scenario(Some("nope"), None), "nope");
    }

    #[tokio::test]
    async fn test_availability_merges_toggles() {
        let state = state();
        let toggles = json!({"support": false, "internal": true, "bogus": true, "releases": "yes"});
        let availability = state.availability("checkout-drop", toggles.as_object());

        assert_eq!(
            availability.active(),
            vec![SourceKey::Analytics, SourceKey::Internal]
        );
    }

    #[tokio::test]
    async fn test_availability_defaults() {
        let state = state();
        assert_eq!(
            state.availability("api-error-spike", None).active(),
            vec![
                SourceKey::Analytics,
                SourceKey::Internal,
                SourceKey::Infrastructure
            ]
        );
        assert_eq!(
            state.availability("nope", None).active(),
            vec![SourceKey::Analytics]
        );
    }
}
