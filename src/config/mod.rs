use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Scenario key used when inference finds no keyword hit.
pub const DEFAULT_SCENARIO_KEY: &str = "checkout-drop";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub sequencer: SequencerConfig,
    pub scenarios: ScenarioConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Pacing of the replayed reasoning trace
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    /// Delay between consecutive actions inside a phase.
    pub step_delay: Duration,
    /// Delay before a phase transition (intro → sources, sources → correlate).
    pub phase_delay: Duration,
    /// Also check sources that are toggled on but not relevant to the scenario.
    pub check_irrelevant_sources: bool,
}

/// Scenario catalog configuration
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub default_scenario: String,
    /// Optional JSON file with additional scenario definitions.
    pub scenario_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let defaults = SequencerConfig::default();
        let sequencer = SequencerConfig {
            step_delay: env::var("SEQUENCER_STEP_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.step_delay),
            phase_delay: env::var("SEQUENCER_PHASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.phase_delay),
            check_irrelevant_sources: match env::var("SEQUENCER_CHECK_IRRELEVANT") {
                Ok(value) => parse_flag("SEQUENCER_CHECK_IRRELEVANT", &value)?,
                Err(_) => defaults.check_irrelevant_sources,
            },
        };

        let default_scenario = env::var("DEFAULT_SCENARIO")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SCENARIO_KEY.to_string());

        let scenarios = ScenarioConfig {
            default_scenario,
            scenario_file: env::var("SCENARIO_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        Ok(Config {
            logging,
            sequencer,
            scenarios,
        })
    }
}

fn parse_flag(name: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config {
            message: format!("{} must be a boolean, got '{}'", name, other),
        }),
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(800),
            phase_delay: Duration::from_millis(1500),
            check_irrelevant_sources: false,
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            default_scenario: DEFAULT_SCENARIO_KEY.to_string(),
            scenario_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            sequencer: SequencerConfig::default(),
            scenarios: ScenarioConfig::default(),
        }
    }
}
