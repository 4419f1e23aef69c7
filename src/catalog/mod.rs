//! Scenario catalog.
//!
//! This module provides:
//! - [`ScenarioCatalog`]: read-only registry of scenario definitions
//! - [`SourceKey`] and [`SourceAvailability`]: evidence channels and toggles
//! - [`SourceRecordStore`]: raw record lookup used by the sequencer
//! - Built-in scenarios (`checkout-drop`, `api-error-spike`, `app-rating-drop`)
//!
//! Extra scenarios can be loaded from a JSON file holding an array of
//! [`ScenarioDefinition`]s. Every definition is validated on registration.

pub mod builtins;
mod record;
mod source;
mod types;

pub use record::*;
pub use source::*;
pub use types::*;

use std::collections::HashMap;
use std::path::Path;

use tracing::{error, info};

use crate::error::{CatalogError, CatalogResult};

/// Registry of scenario definitions.
///
/// Registration order is the inference priority order.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Vec<ScenarioDefinition>,
    index: HashMap<String, usize>,
}

impl ScenarioCatalog {
    /// Create a catalog holding the built-in scenarios.
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        for definition in builtins::all() {
            let key = definition.key().to_string();
            if let Err(e) = catalog.register(definition) {
                error!(
                    scenario = %key,
                    error = %e,
                    "Failed to register builtin scenario - this indicates a programming error"
                );
            }
        }
        catalog
    }

    /// Create a catalog with no scenarios.
    pub fn empty() -> Self {
        Self {
            scenarios: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a scenario.
    ///
    /// # Errors
    /// Returns error if the key is taken or the definition is invalid.
    pub fn register(&mut self, definition: ScenarioDefinition) -> CatalogResult<()> {
        let key = definition.key().to_string();
        if self.index.contains_key(&key) {
            return Err(CatalogError::DuplicateScenario { key });
        }
        definition
            .validate()
            .map_err(|reason| CatalogError::InvalidScenario {
                key: key.clone(),
                reason,
            })?;

        self.index.insert(key, self.scenarios.len());
        self.scenarios.push(definition);
        Ok(())
    }

    /// Register every scenario in a JSON file.
    ///
    /// Returns the number of scenarios added. Nothing is registered if any
    /// definition is rejected.
    pub fn load_file(&mut self, path: &Path) -> CatalogResult<usize> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let definitions: Vec<ScenarioDefinition> = serde_json::from_str(&raw)?;

        let mut staged = self.clone();
        for definition in definitions {
            staged.register(definition)?;
        }
        let added = staged.len() - self.len();
        *self = staged;

        info!(path = %path.display(), added, "Loaded scenario file");
        Ok(added)
    }

    /// Get a scenario definition by key.
    pub fn get(&self, key: &str) -> Option<&ScenarioDefinition> {
        self.index.get(key).map(|&i| &self.scenarios[i])
    }

    /// Whether a scenario is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// All scenario definitions in priority order.
    pub fn scenarios(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }

    /// Default source toggles for a scenario.
    ///
    /// Unknown scenarios default to analytics only.
    pub fn default_availability(&self, key: &str) -> SourceAvailability {
        match self.get(key) {
            Some(definition) => definition.default_availability(),
            None => {
                let mut availability = SourceAvailability::none();
                for source in SourceKey::ALL {
                    availability.set(source, source == SourceKey::Analytics);
                }
                availability
            }
        }
    }

    /// Get the number of registered scenarios.
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRecordStore for ScenarioCatalog {
    fn record(
        &self,
        scenario_key: &str,
        source: SourceKey,
        evidence_id: usize,
    ) -> Option<SourceRecord> {
        self.get(scenario_key)
            .and_then(|d| d.record(source, evidence_id))
            .cloned()
    }
}
