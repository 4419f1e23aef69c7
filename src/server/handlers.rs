use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::SharedState;
use crate::analysis::AnalysisOutcome;
use crate::catalog::{Scenario, SourceKey, SourceRecordStore};
use crate::error::{McpError, McpResult, ToolError};
use crate::sequencer::{ActionSequencer, AgentAction};

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        // Catalog
        "rca_list_scenarios" => handle_list_scenarios(state),
        "rca_infer_scenario" => handle_infer_scenario(state, arguments),
        "rca_source_record" => handle_source_record(state, arguments),
        // Analysis
        "rca_resolve_hypothesis" => handle_resolve_hypothesis(state, arguments),
        "rca_collect_evidence" => handle_collect_evidence(state, arguments),
        "rca_analyze" => handle_analyze(state, arguments),
        // Live session
        "rca_session_start" => handle_session_start(state, arguments).await,
        "rca_session_status" => handle_session_status(state),
        "rca_session_reset" => handle_session_reset(state).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Parameter and response types
// ============================================================================

/// Parameters for rca_infer_scenario
#[derive(Debug, Deserialize)]
pub struct InferParams {
    /// Free-text question.
    pub query: String,
}

/// Parameters for tools evaluating one scenario
#[derive(Debug, Deserialize)]
pub struct ScenarioParams {
    /// Scenario key.
    pub scenario: String,
    /// Source toggles laid over the scenario defaults.
    #[serde(default)]
    pub sources: Option<Map<String, Value>>,
}

/// Parameters for rca_source_record
#[derive(Debug, Deserialize)]
pub struct RecordParams {
    /// Scenario key.
    pub scenario: String,
    /// Source key.
    pub source: String,
    /// Record index within the source.
    #[serde(default)]
    pub evidence_id: usize,
}

/// Parameters for rca_analyze and rca_session_start
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeParams {
    /// Scenario key; takes precedence over `query`.
    #[serde(default)]
    pub scenario: Option<String>,
    /// Free-text question used to infer the scenario.
    #[serde(default)]
    pub query: Option<String>,
    /// Source toggles laid over the scenario defaults.
    #[serde(default)]
    pub sources: Option<Map<String, Value>>,
}

/// One scenario as listed by rca_list_scenarios
#[derive(Debug, Serialize)]
pub struct ScenarioSummary {
    /// Scenario identity.
    #[serde(flatten)]
    pub scenario: Scenario,
    /// Relevant sources in canonical order.
    pub relevant_sources: Vec<SourceKey>,
    /// Inference keywords.
    pub keywords: Vec<String>,
}

/// Response for rca_list_scenarios
#[derive(Debug, Serialize)]
pub struct ScenarioListResponse {
    /// Registered scenarios in priority order.
    pub scenarios: Vec<ScenarioSummary>,
    /// Number of scenarios.
    pub count: usize,
    /// Scenario used when inference finds nothing.
    pub default_scenario: String,
}

/// Response for rca_infer_scenario
#[derive(Debug, Serialize)]
pub struct InferResponse {
    /// Inferred scenario key.
    pub scenario_key: String,
    /// Scenario details, absent if the key is not registered.
    pub scenario: Option<Scenario>,
}

/// Response for rca_analyze
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Analysed scenario key.
    pub scenario_key: String,
    /// Sources that were switched on.
    pub active_sources: Vec<SourceKey>,
    /// Full reasoning trace.
    pub actions: Vec<AgentAction>,
    /// Revealed hypothesis and evidence.
    pub outcome: Option<AnalysisOutcome>,
    /// Virtual time the trace took.
    pub duration_ms: u64,
}

// ============================================================================
// Catalog handlers
// ============================================================================

/// Handle rca_list_scenarios tool call
fn handle_list_scenarios(state: &SharedState) -> McpResult<Value> {
    let scenarios: Vec<ScenarioSummary> = state
        .catalog
        .scenarios()
        .iter()
        .map(|definition| ScenarioSummary {
            scenario: definition.scenario.clone(),
            relevant_sources: definition.relevant_sources(),
            keywords: definition.keywords.clone(),
        })
        .collect();

    let response = ScenarioListResponse {
        count: scenarios.len(),
        scenarios,
        default_scenario: state.inference.default_key().to_string(),
    };

    serde_json::to_value(response).map_err(McpError::Json)
}

/// Handle rca_infer_scenario tool call
fn handle_infer_scenario(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: InferParams = parse_arguments("rca_infer_scenario", arguments)?;

    let scenario_key = state.inference.infer(&params.query).to_string();
    let scenario = state
        .catalog
        .get(&scenario_key)
        .map(|definition| definition.scenario.clone());

    info!(scenario = %scenario_key, "Inferred scenario");

    serde_json::to_value(InferResponse {
        scenario_key,
        scenario,
    })
    .map_err(McpError::Json)
}

/// Handle rca_source_record tool call
fn handle_source_record(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: RecordParams = parse_arguments("rca_source_record", arguments)?;

    let source: SourceKey = params.source.parse().map_err(|_| ToolError::Validation {
        field: "source".to_string(),
        reason: format!("unknown source '{}'", params.source),
    })?;

    let record = state
        .catalog
        .record(&params.scenario, source, params.evidence_id)
        .ok_or_else(|| ToolError::NotFound {
            what: format!(
                "record {} for source '{}' in scenario '{}'",
                params.evidence_id, source, params.scenario
            ),
        })?;

    debug!(
        scenario = %params.scenario,
        source = %source,
        kind = record.payload.kind(),
        "Serving source record"
    );
    serde_json::to_value(record).map_err(McpError::Json)
}

// ============================================================================
// Analysis handlers
// ============================================================================

/// Handle rca_resolve_hypothesis tool call
fn handle_resolve_hypothesis(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ScenarioParams = parse_arguments("rca_resolve_hypothesis", arguments)?;
    let active = state.availability(&params.scenario, params.sources.as_ref());

    let hypothesis = state.resolver.resolve(&params.scenario, &active);
    info!(
        scenario = %params.scenario,
        level = %hypothesis.confidence.level,
        percent = hypothesis.confidence.percent,
        "Resolved hypothesis"
    );

    serde_json::to_value(hypothesis).map_err(McpError::Json)
}

/// Handle rca_collect_evidence tool call
fn handle_collect_evidence(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ScenarioParams = parse_arguments("rca_collect_evidence", arguments)?;
    let active = state.availability(&params.scenario, params.sources.as_ref());

    let evidence = state.collector.collect(&params.scenario, &active);
    serde_json::to_value(evidence).map_err(McpError::Json)
}

/// Handle rca_analyze tool call
///
/// Replays the whole trace on a private virtual clock and returns at once.
fn handle_analyze(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: AnalyzeParams = parse_optional_arguments("rca_analyze", arguments)?;
    let scenario_key = state.target_scenario(params.scenario.as_deref(), params.query.as_deref());
    let active = state.availability(&scenario_key, params.sources.as_ref());

    let mut sequencer =
        ActionSequencer::new(state.catalog.clone(), state.config.sequencer.clone());
    sequencer.start(&scenario_key, &active);
    let snapshot = sequencer.run_until_complete();

    let response = AnalyzeResponse {
        scenario_key,
        active_sources: active.active(),
        actions: snapshot.actions,
        outcome: snapshot.outcome,
        duration_ms: sequencer.now().as_millis() as u64,
    };

    serde_json::to_value(response).map_err(McpError::Json)
}

// ============================================================================
// Session handlers
// ============================================================================

/// Handle rca_session_start tool call
async fn handle_session_start(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: AnalyzeParams = parse_optional_arguments("rca_session_start", arguments)?;
    let scenario_key = state.target_scenario(params.scenario.as_deref(), params.query.as_deref());
    let active = state.availability(&scenario_key, params.sources.as_ref());

    let snapshot = state.session.start(&scenario_key, &active).await;
    serde_json::to_value(snapshot).map_err(McpError::Json)
}

/// Handle rca_session_status tool call
fn handle_session_status(state: &SharedState) -> McpResult<Value> {
    serde_json::to_value(state.session.snapshot()).map_err(McpError::Json)
}

/// Handle rca_session_reset tool call
async fn handle_session_reset(state: &SharedState) -> McpResult<Value> {
    let snapshot = state.session.reset().await;
    serde_json::to_value(snapshot).map_err(McpError::Json)
}

// ============================================================================
// Helper functions
// ============================================================================

/// Helper to parse arguments with consistent error handling
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

/// Like [`parse_arguments`], but missing arguments mean all defaults.
fn parse_optional_arguments<T: serde::de::DeserializeOwned + Default>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        None | Some(Value::Null) => Ok(T::default()),
        some => parse_arguments(tool_name, some),
    }
}
