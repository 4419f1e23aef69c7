//! Integration tests for MCP protocol handling
//!
//! Drives a full server over an in-memory line stream.

use std::sync::Arc;

use insight_flow::catalog::ScenarioCatalog;
use insight_flow::config::Config;
use insight_flow::server::{AppState, McpServer};
use serde_json::{json, Value};

/// Verify JSON-RPC 2.0 response structure
fn assert_valid_jsonrpc_response(response: &Value) {
    assert_eq!(response["jsonrpc"], "2.0", "Invalid JSON-RPC version");
    assert!(
        response.get("result").is_some() || response.get("error").is_some(),
        "Response must have result or error"
    );
}

/// Feed requests to a fresh server and collect the responses.
async fn exchange(requests: &[Value]) -> Vec<Value> {
    let mut input = String::new();
    for request in requests {
        input.push_str(&request.to_string());
        input.push('\n');
    }

    let state = Arc::new(AppState::new(Config::default(), ScenarioCatalog::new()));
    let server = McpServer::new(state);
    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

/// Decode the JSON text payload of a tool result.
fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_handshake_and_tool_listing() {
    let responses = exchange(&[
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            }
        }),
        json!({"jsonrpc": "2.0", "method": "initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}),
    ])
    .await;

    assert_eq!(responses.len(), 3);
    for response in &responses {
        assert_valid_jsonrpc_response(response);
    }

    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "insight-flow");

    let tools = responses[1]["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "rca_list_scenarios",
            "rca_infer_scenario",
            "rca_source_record",
            "rca_resolve_hypothesis",
            "rca_collect_evidence",
            "rca_analyze",
            "rca_session_start",
            "rca_session_status",
            "rca_session_reset",
        ]
    );
    assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));

    assert_eq!(responses[2]["id"], 3);
    assert_eq!(responses[2]["result"], json!({}));
}

#[tokio::test]
async fn test_infer_then_analyze() {
    let responses = exchange(&[
        tool_call(
            1,
            "rca_infer_scenario",
            json!({"query": "What caused the API error spike on May 6th?"}),
        ),
        tool_call(
            2,
            "rca_analyze",
            json!({"scenario": "api-error-spike", "sources": {"internal": false}}),
        ),
    ])
    .await;

    let inferred = tool_payload(&responses[0]);
    assert_eq!(inferred["scenario_key"], "api-error-spike");

    let analysis = tool_payload(&responses[1]);
    assert_eq!(
        analysis["active_sources"],
        json!(["analytics", "infrastructure"])
    );
    let hypothesis = &analysis["outcome"]["hypothesis"];
    assert_eq!(hypothesis["confidence"]["level"], "Medium");
    assert_eq!(hypothesis["confidence"]["percent"], 70);
    assert_eq!(
        hypothesis["note"],
        "Internal communication data missing for attribution."
    );

    let actions = analysis["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 12);
    assert_eq!(actions[0]["type"], "parse");
    assert_eq!(actions[11]["type"], "hypothesis");
    assert_eq!(actions[11]["label"], "Forming hypothesis");
}

#[tokio::test]
async fn test_record_drill_down() {
    let responses = exchange(&[
        tool_call(
            1,
            "rca_source_record",
            json!({"scenario": "api-error-spike", "source": "infrastructure"}),
        ),
        tool_call(
            2,
            "rca_source_record",
            json!({"scenario": "api-error-spike", "source": "infrastructure", "evidence_id": 4}),
        ),
    ])
    .await;

    let record = tool_payload(&responses[0]);
    assert_eq!(record["type"], "chart");
    assert_eq!(record["points"].as_array().unwrap().len(), 8);
    assert_eq!(record["points"][3]["value"], 100.0);

    assert_eq!(responses[1]["result"]["isError"], true);
}

#[tokio::test]
async fn test_invalid_arguments_are_reported_as_tool_errors() {
    let responses = exchange(&[tool_call(1, "rca_resolve_hypothesis", json!({"sources": {}}))]).await;

    assert_eq!(responses[0]["result"]["isError"], true);
    let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Error: Invalid parameters for rca_resolve_hypothesis"));
}

#[tokio::test]
async fn test_parse_error_keeps_server_alive() {
    let state = Arc::new(AppState::new(Config::default(), ScenarioCatalog::new()));
    let server = McpServer::new(state);
    let input = "{broken\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n";
    let mut output = Vec::new();

    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let text = String::from_utf8(output).unwrap();
    let responses: Vec<Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["id"], 9);
}
