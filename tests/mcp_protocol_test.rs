//! Integration tests for MCP protocol handling
//!
//! Drives the server through raw JSON-RPC lines with a scripted completion
//! client in place of Langbase.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use mcp_deliberative_inquiry::config::{
    Config, InquiryConfig, LangbaseConfig, LogFormat, LoggingConfig, PipeConfig, RequestConfig,
};
use mcp_deliberative_inquiry::error::LangbaseResult;
use mcp_deliberative_inquiry::inquiry::{CompletionClient, CompletionRequest};
use mcp_deliberative_inquiry::prompts::PromptKind;
use mcp_deliberative_inquiry::server::{AppState, McpServer, PROTOCOL_VERSION, SERVER_NAME};

/// Answers every stage with a fixed reply
struct ScriptedCompletion;

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> LangbaseResult<String> {
        Ok(match request.kind {
            PromptKind::Inquiry => json!({
                "node": "Should cities ban cars?",
                "children": [
                    {"node": "Who bears the cost?", "children": []},
                    {"node": "What did past bans achieve?", "children": []}
                ]
            })
            .to_string(),
            PromptKind::Contextual => json!({
                "responses": [
                    {"label": "Ethical", "text": "e"},
                    {"label": "Historical", "text": "h"},
                    {"label": "Critical", "text": "c"}
                ]
            })
            .to_string(),
            PromptKind::Adaptive => "[]".to_string(),
        })
    }
}

fn test_config() -> Config {
    Config {
        langbase: LangbaseConfig {
            api_key: "test-key".to_string(),
            base_url: "http://localhost".to_string(),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        },
        request: RequestConfig::default(),
        pipes: PipeConfig::default(),
        inquiry: InquiryConfig::default(),
    }
}

fn test_server() -> McpServer {
    McpServer::new(Arc::new(AppState::new(
        test_config(),
        Arc::new(ScriptedCompletion),
    )))
}

/// Send one request and return the serialized response
async fn call(server: &McpServer, request: Value) -> Value {
    let response = server
        .handle_line(&request.to_string())
        .await
        .expect("request should produce a response");
    serde_json::to_value(response).expect("response should serialize")
}

/// Call a tool and parse the JSON text it returned
async fn call_tool(server: &McpServer, id: u64, name: &str, arguments: Value) -> Value {
    let response = call(
        server,
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        }),
    )
    .await;
    assert_valid_jsonrpc_response(&response);
    assert!(
        response["result"].get("isError").is_none(),
        "{} failed: {}",
        name,
        response["result"]["content"][0]["text"]
    );
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("tool result should be text");
    serde_json::from_str(text).expect("tool result should be JSON")
}

/// Verify JSON-RPC 2.0 response structure
fn assert_valid_jsonrpc_response(response: &Value) {
    assert_eq!(response["jsonrpc"], "2.0", "Invalid JSON-RPC version");
    assert!(
        response.get("result").is_some() || response.get("error").is_some(),
        "Response must have result or error"
    );
}

#[cfg(test)]
mod initialize_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_response_structure() {
        let server = test_server();
        let response = call(
            &server,
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
        )
        .await;

        assert_valid_jsonrpc_response(&response);
        let result = &response["result"];
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_ping() {
        let server = test_server();
        let response = call(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;
        assert_eq!(response["id"], "p");
        assert_eq!(response["result"], json!({}));
    }
}

#[cfg(test)]
mod tools_list_tests {
    use super::*;

    #[tokio::test]
    async fn test_tools_list_advertises_inquiry_tools() {
        let server = test_server();
        let response = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 12);
        for tool in tools {
            assert!(tool["name"].as_str().unwrap().starts_with("inquiry_"));
            assert!(tool["inputSchema"].is_object());
        }
    }
}

#[cfg(test)]
mod tool_call_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_session_over_json_rpc() {
        let server = test_server();

        let created = call_tool(
            &server,
            1,
            "inquiry_session_create",
            json!({"question": "Should cities ban cars?", "mode": "guided"}),
        )
        .await;
        let session_id = created["session_id"].as_str().unwrap().to_string();
        assert_eq!(created["mode"], "guided");

        let tree = call_tool(&server, 2, "inquiry_generate_tree", json!({"session_id": session_id})).await;
        assert_eq!(tree["node_count"], 3);

        let responses = call_tool(
            &server,
            3,
            "inquiry_generate_responses",
            json!({"session_id": session_id}),
        )
        .await;
        assert_eq!(responses["responses"].as_object().unwrap().len(), 3);

        let suggestions = call_tool(
            &server,
            4,
            "inquiry_suggest_reformulations",
            json!({"session_id": session_id}),
        )
        .await;
        assert_eq!(suggestions["suggestions"], json!([]));

        call_tool(
            &server,
            5,
            "inquiry_set_node_state",
            json!({"session_id": session_id, "node": "Who bears the cost?", "state": "disputed"}),
        )
        .await;

        let score = call_tool(
            &server,
            6,
            "inquiry_score",
            json!({"session_id": session_id, "variant": "extended"}),
        )
        .await;
        assert_eq!(score["variant"], "extended");
        assert_eq!(score["dispute_robustness"], 1.0);

        let exported = call_tool(&server, 7, "inquiry_export", json!({"session_id": session_id})).await;
        let mut keys: Vec<&str> = exported
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["feedback", "focus", "inquiry", "node_states", "responses", "root", "steps", "times"]
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_tool_errors() {
        let server = test_server();
        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 9,
                "method": "tools/call",
                "params": {"name": "inquiry_session_create", "arguments": {"mode": "guided"}}
            }),
        )
        .await;

        assert_eq!(response["result"]["isError"], true);
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Invalid parameters for inquiry_session_create"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_tool_error() {
        let server = test_server();
        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 10,
                "method": "tools/call",
                "params": {"name": "inquiry_unknown", "arguments": {}}
            }),
        )
        .await;

        assert_eq!(response["result"]["isError"], true);
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Unknown tool"));
    }
}

#[cfg(test)]
mod stream_tests {
    use super::*;

    #[tokio::test]
    async fn test_serve_skips_notifications_and_blank_lines() {
        let server = test_server();
        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}).to_string(),
            json!({"jsonrpc": "2.0", "method": "initialized"}).to_string(),
            String::new(),
            "garbage".to_string(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}).to_string(),
        ]
        .join("\n")
            + "\n";

        let mut output = Vec::new();
        server
            .serve(input.as_bytes(), &mut output)
            .await
            .expect("serve should finish at EOF");

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["error"]["code"], -32700);
        assert_eq!(responses[2]["id"], 2);
    }
}
