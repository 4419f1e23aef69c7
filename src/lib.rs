//! # Insight Flow
//!
//! A simulated root-cause analysis agent. Given an incident scenario and the
//! set of data sources an analyst has switched on, it produces a confidence-
//! rated hypothesis, an ordered list of evidence, and a paced, cancelable
//! reasoning trace that narrates how the conclusion was reached.
//!
//! ## Features
//!
//! - **Deterministic analysis**: first-match rule tables per scenario
//! - **Scenario inference**: keyword matching from free-text questions
//! - **Reasoning trace**: epoch-checked sequencer on a virtual clock, with a
//!   tokio driver for real-time playback
//! - **Data-driven scenarios**: built-ins plus validated JSON scenario files
//! - **MCP server**: all of the above as tools over JSON-RPC on stdio
//!
//! ## Architecture
//!
//! ```text
//! MCP Client / CLI → Server (Rust) → Analysis + Sequencer
//!                                           ↓
//!                                   Scenario Catalog (in memory)
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use insight_flow::catalog::ScenarioCatalog;
//! use insight_flow::config::SequencerConfig;
//! use insight_flow::sequencer::ActionSequencer;
//!
//! let catalog = Arc::new(ScenarioCatalog::new());
//! let active = catalog.default_availability("checkout-drop");
//! let mut sequencer = ActionSequencer::new(catalog, SequencerConfig::default());
//! sequencer.start("checkout-drop", &active);
//! let snapshot = sequencer.run_until_complete();
//! assert!(snapshot.revealed);
//! ```

/// Deterministic hypothesis, evidence and inference over the catalog.
pub mod analysis;
/// Scenario definitions, sources and raw records.
pub mod catalog;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Timed, cancelable replay of the reasoning trace.
pub mod sequencer;
/// MCP server implementation and request handling.
pub mod server;

pub use analysis::{
    AnalysisOutcome, Evidence, EvidenceCollector, Hypothesis, HypothesisResolver,
    ScenarioInference,
};
pub use catalog::{ScenarioCatalog, SourceAvailability, SourceKey};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use sequencer::{ActionSequencer, AgentAction, SequencerHandle, SequencerSnapshot};
pub use server::{AppState, McpServer, SharedState};
