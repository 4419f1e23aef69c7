//! Evidence source keys and per-run source availability.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A named evidence channel.
///
/// Variant order is the global canonical source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKey {
    /// Product analytics dashboards.
    Analytics,
    /// Customer support tickets.
    Support,
    /// Release and deployment logs.
    Releases,
    /// Internal team chat.
    Internal,
    /// Infrastructure and database metrics.
    Infrastructure,
    /// App store ratings and reviews.
    #[serde(rename = "appstore")]
    AppStore,
}

impl SourceKey {
    /// Every source in canonical order.
    pub const ALL: [SourceKey; 6] = [
        SourceKey::Analytics,
        SourceKey::Support,
        SourceKey::Releases,
        SourceKey::Internal,
        SourceKey::Infrastructure,
        SourceKey::AppStore,
    ];

    /// Get the source key as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKey::Analytics => "analytics",
            SourceKey::Support => "support",
            SourceKey::Releases => "releases",
            SourceKey::Internal => "internal",
            SourceKey::Infrastructure => "infrastructure",
            SourceKey::AppStore => "appstore",
        }
    }

    /// Human-readable source name.
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKey::Analytics => "Product Analytics",
            SourceKey::Support => "Support Tickets",
            SourceKey::Releases => "Release Logs",
            SourceKey::Internal => "Internal Comms",
            SourceKey::Infrastructure => "Infrastructure Status",
            SourceKey::AppStore => "App Store Reviews",
        }
    }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "analytics" => Ok(SourceKey::Analytics),
            "support" => Ok(SourceKey::Support),
            "releases" => Ok(SourceKey::Releases),
            "internal" => Ok(SourceKey::Internal),
            "infrastructure" => Ok(SourceKey::Infrastructure),
            "appstore" | "app_store" => Ok(SourceKey::AppStore),
            _ => Err(format!("Unknown source: {}", s)),
        }
    }
}

/// Which sources are switched on for one analysis run.
///
/// Sources without an entry are off. Relevance to a scenario is decided by
/// the scenario's relevance table, never by this map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceAvailability {
    toggles: BTreeMap<SourceKey, bool>,
}

impl SourceAvailability {
    /// Availability with nothing switched on.
    pub fn none() -> Self {
        Self::default()
    }

    /// Availability with exactly the given sources switched on.
    pub fn with_active<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = SourceKey>,
    {
        Self {
            toggles: sources.into_iter().map(|s| (s, true)).collect(),
        }
    }

    /// Build availability from loosely-typed toggles.
    ///
    /// Unknown keys are dropped and anything other than a JSON `true` counts
    /// as off.
    pub fn from_json_toggles(toggles: &serde_json::Map<String, Value>) -> Self {
        let mut availability = Self::none();
        for (key, value) in toggles {
            match key.parse::<SourceKey>() {
                Ok(source) => availability.set(source, value.as_bool().unwrap_or(false)),
                Err(_) => debug!(source = %key, "Ignoring unknown source toggle"),
            }
        }
        availability
    }

    /// Overlay user toggles on top of these defaults.
    pub fn merged(&self, overrides: &SourceAvailability) -> Self {
        let mut merged = self.clone();
        for (source, on) in &overrides.toggles {
            merged.set(*source, *on);
        }
        merged
    }

    /// Whether the source is switched on.
    pub fn is_active(&self, source: SourceKey) -> bool {
        self.toggles.get(&source).copied().unwrap_or(false)
    }

    /// Switch a source on or off.
    pub fn set(&mut self, source: SourceKey, on: bool) {
        self.toggles.insert(source, on);
    }

    /// Active sources in canonical order.
    pub fn active(&self) -> Vec<SourceKey> {
        SourceKey::ALL
            .into_iter()
            .filter(|s| self.is_active(*s))
            .collect()
    }
}
