//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! This module provides the core MCP server implementation including:
//! - JSON-RPC 2.0 request/response handling
//! - Tool definitions and schemas
//! - Stdio-based server communication

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_tool_call, SharedState};

/// Name reported in the initialize handshake.
pub const SERVER_NAME: &str = "mcp-deliberative-inquiry";

/// MCP protocol revision implemented by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier (null for parse errors, always serialized).
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP server information returned during initialization.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// The server name identifier.
    pub name: String,
    /// The server version string.
    pub version: String,
}

/// MCP server capabilities advertised to clients.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change dynamically.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Result of the MCP initialize handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    /// The MCP protocol version supported.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: Capabilities,
    /// Server identification information.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// Unique tool name (used in tool calls).
    pub name: String,
    /// Human-readable description of the tool.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// The name of the tool to invoke.
    pub name: String,
    /// Optional arguments for the tool.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    /// The content type (e.g., "text").
    #[serde(rename = "type")]
    pub content_type: String,
    /// The text content of the result.
    pub text: String,
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    /// The result content items.
    pub content: Vec<ToolResultContent>,
    /// Whether the result represents an error.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
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

/// MCP Server running over stdio.
///
/// Handles JSON-RPC 2.0 messages over stdin/stdout for MCP protocol
/// communication with clients.
pub struct McpServer {
    /// Shared application state.
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server using async stdio
    pub async fn run(&self) -> std::io::Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC messages until `reader` hits EOF
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(server = SERVER_NAME, "MCP server loop starting");

        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            // EOF reached
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            // Only send response if not a notification (per JSON-RPC 2.0 spec)
            if let Some(response) = self.handle_line(&line).await {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle one raw message line.
    ///
    /// Returns `None` for blank lines and notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        debug!(request = %trimmed, "Received request");

        match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                error!(error = %e, "Failed to parse request");
                Some(JsonRpcResponse::error(
                    None,
                    -32700,
                    format!("Parse error: {}", e),
                ))
            }
        }
    }

    /// Handle a single JSON-RPC request
    /// Returns None for notifications (requests without id) per JSON-RPC 2.0 spec
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Check if this is a notification (no id = no response required)
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" => {
                // Notification - no response per JSON-RPC 2.0
                debug!("Received initialized notification");
                None
            }
            "notifications/cancelled" => {
                // Notification - no response
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
                // For unknown methods, only respond if it's a request (has id)
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

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
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

    /// Handle tools/list request
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling tools/list request");

        let tools = all_tools();

        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "tools": tools
            }),
        )
    }

    /// Handle tools/call request
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
                Err(e) => (
                    ToolResultContent {
                        content_type: "text".to_string(),
                        text: format!("Error: {}", e),
                    },
                    Some(true),
                ),
            };

        let tool_result = ToolCallResult {
            content: vec![content],
            is_error,
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id.clone(), -32603, format!("Internal error: {}", e))
            }
        }
    }
}


/// Every tool advertised by `tools/list`
pub fn all_tools() -> Vec<Tool> {
    vec![
        get_session_create_tool(),
        get_generate_tree_tool(),
        get_generate_responses_tool(),
        get_suggest_reformulations_tool(),
        get_run_tool(),
        get_render_tool(),
        get_record_event_tool(),
        get_feedback_tool(),
        get_set_node_state_tool(),
        get_score_tool(),
        get_export_tool(),
        get_metrics_tool(),
    ]
}

fn session_id_property() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "Session ID returned by inquiry_session_create"
    })
}

fn mode_property() -> Value {
    serde_json::json!({
        "type": "string",
        "enum": ["assisted", "guided", "exploratory"],
        "description": "User level; defaults to the session's mode"
    })
}

fn variant_property() -> Value {
    serde_json::json!({
        "type": "string",
        "enum": ["basic", "extended"],
        "description": "Score variant"
    })
}

/// Schema for tools taking only a session and an optional mode
fn stage_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "session_id": session_id_property(),
            "mode": mode_property()
        },
        "required": ["session_id"]
    })
}

fn get_session_create_tool() -> Tool {
    Tool {
        name: "inquiry_session_create".to_string(),
        description: "Start a deliberative inquiry session for a root question. Returns the session ID used by every other inquiry tool.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The root question to examine"
                },
                "mode": mode_property()
            },
            "required": ["question"]
        }),
    }
}

fn get_generate_tree_tool() -> Tool {
    Tool {
        name: "inquiry_generate_tree".to_string(),
        description: "Decompose the session's root question into a hierarchy of sub-questions. Replaces any previous tree.".to_string(),
        input_schema: stage_schema(),
    }
}

fn get_generate_responses_tool() -> Tool {
    Tool {
        name: "inquiry_generate_responses".to_string(),
        description: "Generate ethical, historical and critical perspective answers for every node of the session's tree.".to_string(),
        input_schema: stage_schema(),
    }
}

fn get_suggest_reformulations_tool() -> Tool {
    Tool {
        name: "inquiry_suggest_reformulations".to_string(),
        description: "Suggest up to two reformulations for ambiguous or under-explored questions in the tree.".to_string(),
        input_schema: stage_schema(),
    }
}

fn get_run_tool() -> Tool {
    Tool {
        name: "inquiry_run".to_string(),
        description: "Run tree generation, perspective responses and reformulations in one call, then score the result. Uses an existing session or creates one from a question.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "question": {
                    "type": "string",
                    "description": "Root question for a new session (not allowed together with session_id)"
                },
                "mode": mode_property(),
                "variant": variant_property()
            }
        }),
    }
}

fn get_render_tool() -> Tool {
    Tool {
        name: "inquiry_render".to_string(),
        description: "Render the session as an HTML report, a Graphviz digraph, an indented outline or a nested HTML list.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "format": {
                    "type": "string",
                    "enum": ["report", "dot", "outline", "html_list"],
                    "description": "Output format (default: report)"
                },
                "variant": variant_property()
            },
            "required": ["session_id"]
        }),
    }
}

fn get_record_event_tool() -> Tool {
    Tool {
        name: "inquiry_record_event".to_string(),
        description: "Append a step (selection, justification, note) to the session's reasoning log.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "event_type": {
                    "type": "string",
                    "description": "Kind of step, e.g. selection or justification"
                },
                "content": {
                    "description": "Step content, stored verbatim"
                },
                "context": {
                    "type": "object",
                    "description": "Extra fields such as framework or parent_node"
                }
            },
            "required": ["session_id", "event_type", "content"]
        }),
    }
}

fn get_feedback_tool() -> Tool {
    Tool {
        name: "inquiry_feedback".to_string(),
        description: "Attach a comment to a node of the inquiry tree.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "node": {
                    "type": "string",
                    "description": "Label of the node commented on"
                },
                "comment": {
                    "type": "string",
                    "description": "The comment text"
                },
                "author": {
                    "type": "string",
                    "description": "Author name (default: Anonymous)"
                },
                "kind": {
                    "type": "string",
                    "enum": ["Human", "AI"],
                    "description": "Who wrote the comment (default: Human)"
                }
            },
            "required": ["session_id", "node", "comment"]
        }),
    }
}

fn get_set_node_state_tool() -> Tool {
    Tool {
        name: "inquiry_set_node_state".to_string(),
        description: "Mark a node as open, resolved, disputed or suspended.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "node": {
                    "type": "string",
                    "description": "Label of the node"
                },
                "state": {
                    "type": "string",
                    "enum": ["open", "resolved", "disputed", "suspended"],
                    "description": "New state (case-insensitive)"
                }
            },
            "required": ["session_id", "node", "state"]
        }),
    }
}

fn get_score_tool() -> Tool {
    Tool {
        name: "inquiry_score".to_string(),
        description: "Compute the epistemic balance score of the session (depth, plurality, reversibility; extended adds traceability and dispute robustness).".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "variant": variant_property()
            },
            "required": ["session_id"]
        }),
    }
}

fn get_export_tool() -> Tool {
    Tool {
        name: "inquiry_export".to_string(),
        description: "Export the full reasoning log of a session as JSON.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property()
            },
            "required": ["session_id"]
        }),
    }
}

fn get_metrics_tool() -> Tool {
    Tool {
        name: "inquiry_metrics".to_string(),
        description: "Usage counters since the server started: sessions, feedback and generated nodes.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}
