use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::ScenarioCatalog;
use crate::config::DEFAULT_SCENARIO_KEY;

/// Keyword-based scenario inference.
///
/// Scenarios are tried in catalog order; the first one with a keyword
/// contained in the query wins.
#[derive(Debug, Clone)]
pub struct ScenarioInference {
    catalog: Arc<ScenarioCatalog>,
    default_key: String,
}

impl ScenarioInference {
    /// Create an inference helper with the given fallback scenario.
    ///
    /// A fallback that the catalog does not know is replaced by the first
    /// registered scenario.
    pub fn new(catalog: Arc<ScenarioCatalog>, default_key: impl Into<String>) -> Self {
        let requested = default_key.into();
        let default_key = if catalog.contains(&requested) {
            requested
        } else {
            let replacement = catalog
                .scenarios()
                .first()
                .map(|d| d.key().to_string())
                .unwrap_or_else(|| DEFAULT_SCENARIO_KEY.to_string());
            warn!(
                requested = %requested,
                replacement = %replacement,
                "Default scenario not in catalog"
            );
            replacement
        };
        Self {
            catalog,
            default_key,
        }
    }

    /// Map a free-text query to a scenario key.
    pub fn infer(&self, query: &str) -> &str {
        let query = query.to_lowercase();
        let hit = self.catalog.scenarios().iter().find(|definition| {
            definition
                .keywords
                .iter()
                .any(|keyword| !keyword.is_empty() && query.contains(&keyword.to_lowercase()))
        });

        match hit {
            Some(definition) => {
                debug!(scenario = %definition.key(), "Inferred scenario from query");
                definition.key()
            }
            None => {
                debug!(scenario = %self.default_key, "No keyword hit, using default scenario");
                &self.default_key
            }
        }
    }

    /// The fallback scenario key.
    pub fn default_key(&self) -> &str {
        &self.default_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inference() -> ScenarioInference {
        ScenarioInference::new(Arc::new(ScenarioCatalog::new()), "checkout-drop")
    }

    #[test]
    fn test_infers_canned_queries() {
        let inference = inference();
        assert_eq!(
            inference.infer("Why did checkout completion drop on May 5th?"),
            "checkout-drop"
        );
        assert_eq!(
            inference.infer("What caused the API error spike on May 6th?"),
            "api-error-spike"
        );
        assert_eq!(
            inference.infer("Why did our app store rating drop on May 8th?"),
            "app-rating-drop"
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(inference().infer("DATABASE TIMEOUTS everywhere"), "api-error-spike");
    }

    #[test]
    fn test_priority_follows_catalog_order() {
        // Matches both checkout ("checkout") and api ("timeout").
        assert_eq!(inference().infer("checkout timeout on mobile"), "checkout-drop");
    }

    #[test]
    fn test_api_keyword_does_not_fire_inside_words() {
        let inference = inference();
        assert_eq!(
            inference.infer("Why did our app store rating drop so rapidly?"),
            "app-rating-drop"
        );
        assert_eq!(
            inference.infer("Why did app store reviews from Capital One users fall?"),
            "app-rating-drop"
        );
        assert_eq!(inference.infer("Our API is returning errors"), "api-error-spike");
    }

    #[test]
    fn test_no_hit_uses_default() {
        let inference = inference();
        assert_eq!(inference.infer("why is the sky blue"), "checkout-drop");
        assert_eq!(inference.infer(""), "checkout-drop");
    }

    #[test]
    fn test_stable() {
        let inference = inference();
        let query = "latency went up";
        assert_eq!(inference.infer(query), inference.infer(query));
    }

    #[test]
    fn test_unknown_default_is_replaced() {
        let inference = ScenarioInference::new(Arc::new(ScenarioCatalog::new()), "missing");
        assert_eq!(inference.default_key(), "checkout-drop");
        assert_eq!(inference.infer("nothing relevant"), "checkout-drop");
    }

    #[test]
    fn test_configured_default() {
        let inference = ScenarioInference::new(Arc::new(ScenarioCatalog::new()), "api-error-spike");
        assert_eq!(inference.infer("nothing relevant"), "api-error-spike");
    }
}
