//! Line-delimited JSON-RPC 2.0 transport for the `rca_*` tools.
//!
//! One message per line. Requests without an `id` are notifications and get
//! no reply. [`tool_definitions`] is the catalogue returned by `tools/list`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_tool_call, SharedState};

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// Incoming message; `id: None` marks a notification.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Anything other than `"2.0"` is answered with -32600.
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Reply line. Exactly one of `result` and `error` is set.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    /// `null` for parse errors, where no id could be read.
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Protocol-level failure. Tool failures are not reported here; they come
/// back as a [`ToolCallResult`] with `isError` set.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// -32700 parse, -32600 bad request, -32601 unknown method,
    /// -32602 bad params, -32603 internal.
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Package name and version, sent in the `initialize` reply.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Only tools are advertised.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub tools: ToolCapabilities,
}

#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    /// Always false: the nine tools are fixed at build time.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// `initialize` reply.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Capabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// One entry of the `tools/list` catalogue.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// `rca_*` name routed by [`super::handle_tool_call`].
    pub name: String,
    pub description: String,
    /// Object schema; every tool rejects unknown properties.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// `tools/call` params. `arguments` is handed to the tool as-is.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Tool output is always a single text item holding pretty-printed JSON,
/// or `Error: ...` on failure.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolResultContent>,
    /// Set only when the tool failed.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Serves the `rca_*` tools against one shared [`super::AppState`].
pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve stdin/stdout until the client closes stdin.
    pub async fn run(&self) -> std::io::Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Insight Flow MCP server starting...");

        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        -32700,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            // Notifications get no response
            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Dispatch one message; `None` means nothing is written back.
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        if request.jsonrpc != "2.0" {
            return if is_notification {
                None
            } else {
                Some(JsonRpcResponse::error(
                    request.id,
                    -32600,
                    format!("Invalid request: unsupported jsonrpc version '{}'", request.jsonrpc),
                ))
            };
        }

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" => {
                debug!("Received initialized notification");
                None
            }
            "notifications/cancelled" => {
                debug!("Received cancelled notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            method => {
                if is_notification {
                    debug!(method = %method, "Unknown notification, ignoring");
                    None
                } else {
                    error!(method = %method, "Unknown method");
                    Some(JsonRpcResponse::error(
                        request.id,
                        -32601,
                        format!("Method not found: {}", method),
                    ))
                }
            }
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: "2024-11-05".to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling tools/list request");

        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "tools": tool_definitions()
            }),
        )
    }

    /// Run a tool. Tool errors are wrapped as `isError` results; only
    /// malformed params produce a JSON-RPC error.
    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e));
                }
            },
            None => {
                return JsonRpcResponse::error(id, -32602, "Missing params");
            }
        };

        info!(tool = %params.name, "Handling tool call");

        let (content, is_error) =
            match handle_tool_call(&self.state, &params.name, params.arguments).await {
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                        error!(error = %e, "Failed to serialize tool result");
                        format!("{{\"error\": \"Serialization failed: {}\"}}", e)
                    });
                    (
                        ToolResultContent {
                            content_type: "text".to_string(),
                            text,
                        },
                        None,
                    )
                }
                Err(e) => {
                    error!(tool = %params.name, error = %e, "Tool call failed");
                    (
                        ToolResultContent {
                            content_type: "text".to_string(),
                            text: format!("Error: {}", e),
                        },
                        Some(true),
                    )
                }
            };

        let tool_result = ToolCallResult {
            content: vec![content],
            is_error,
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }
}

/// All tools advertised by tools/list, in display order.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        // Catalog
        get_list_scenarios_tool(),
        get_infer_scenario_tool(),
        get_source_record_tool(),
        // Analysis
        get_resolve_hypothesis_tool(),
        get_collect_evidence_tool(),
        get_analyze_tool(),
        // Live session
        get_session_start_tool(),
        get_session_status_tool(),
        get_session_reset_tool(),
    ]
}

fn sources_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "description": "Source toggles laid over the scenario defaults, e.g. {\"releases\": false}. Keys: analytics, support, releases, internal, infrastructure, appstore. Non-boolean values count as off.",
        "additionalProperties": true
    })
}

fn get_list_scenarios_tool() -> Tool {
    Tool {
        name: "rca_list_scenarios".to_string(),
        description: "List the incident scenarios the agent can analyze, with their relevant data sources and inference keywords.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

fn get_infer_scenario_tool() -> Tool {
    Tool {
        name: "rca_infer_scenario".to_string(),
        description: "Map a free-text question to a scenario key by keyword. Falls back to the default scenario when nothing matches.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question being asked, e.g. 'Why did checkout completion drop?'"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

fn get_source_record_tool() -> Tool {
    Tool {
        name: "rca_source_record".to_string(),
        description: "Fetch the raw record (chart, text or list) behind a piece of evidence.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "scenario": {
                    "type": "string",
                    "description": "Scenario key"
                },
                "source": {
                    "type": "string",
                    "enum": ["analytics", "support", "releases", "internal", "infrastructure", "appstore"],
                    "description": "Data source"
                },
                "evidence_id": {
                    "type": "integer",
                    "minimum": 0,
                    "default": 0,
                    "description": "Record index within the source"
                }
            },
            "required": ["scenario", "source"],
            "additionalProperties": false
        }),
    }
}

fn get_resolve_hypothesis_tool() -> Tool {
    Tool {
        name: "rca_resolve_hypothesis".to_string(),
        description: "Resolve the root-cause hypothesis and confidence for a scenario given which data sources are available.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "scenario": {
                    "type": "string",
                    "description": "Scenario key"
                },
                "sources": sources_schema()
            },
            "required": ["scenario"],
            "additionalProperties": false
        }),
    }
}

fn get_collect_evidence_tool() -> Tool {
    Tool {
        name: "rca_collect_evidence".to_string(),
        description: "List the evidence supporting a scenario's hypothesis, one item per available relevant source.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "scenario": {
                    "type": "string",
                    "description": "Scenario key"
                },
                "sources": sources_schema()
            },
            "required": ["scenario"],
            "additionalProperties": false
        }),
    }
}

fn get_analyze_tool() -> Tool {
    Tool {
        name: "rca_analyze".to_string(),
        description: "Run a complete analysis instantly: the full reasoning trace with virtual timestamps, the hypothesis and the evidence. Give a scenario key or a query; neither means the default scenario.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "scenario": {
                    "type": "string",
                    "description": "Scenario key (takes precedence over query)"
                },
                "query": {
                    "type": "string",
                    "description": "Free-text question used to infer the scenario"
                },
                "sources": sources_schema()
            },
            "additionalProperties": false
        }),
    }
}

fn get_session_start_tool() -> Tool {
    Tool {
        name: "rca_session_start".to_string(),
        description: "Start (or restart) the live analysis session. Actions then appear in real time; poll rca_session_status to follow progress.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "scenario": {
                    "type": "string",
                    "description": "Scenario key (takes precedence over query)"
                },
                "query": {
                    "type": "string",
                    "description": "Free-text question used to infer the scenario"
                },
                "sources": sources_schema()
            },
            "additionalProperties": false
        }),
    }
}

fn get_session_status_tool() -> Tool {
    Tool {
        name: "rca_session_status".to_string(),
        description: "Get a snapshot of the live session: state, actions so far and, once revealed, the outcome.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

fn get_session_reset_tool() -> Tool {
    Tool {
        name: "rca_session_reset".to_string(),
        description: "Cancel the live session and clear its trace. Nothing from the cancelled run appears afterwards.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}
