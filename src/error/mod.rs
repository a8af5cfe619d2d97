use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("Inquiry error: {0}")]
    Inquiry(#[from] InquiryError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Langbase API errors.
///
/// Any of these aborts the pipeline stage that issued the completion call.
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised while turning completion text into inquiry data
#[derive(Debug, Error)]
pub enum InquiryError {
    #[error("Malformed inquiry tree: {message}")]
    MalformedTree { message: String },

    #[error("Inquiry tree exceeds maximum depth of {max_depth}")]
    DepthExceeded { max_depth: usize },

    #[error("Malformed {stage} reply: {message}")]
    MalformedResponse { stage: String, message: String },

    #[error("No inquiry tree recorded for this session")]
    MissingTree,
}

/// Reasoning tracker errors
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Invalid node state '{state}' (expected one of: open, resolved, disputed, suspended)")]
    InvalidState { state: String },

    #[error("Export failed: {0}")]
    Export(#[from] serde_json::Error),
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for inquiry parsing
pub type InquiryResult<T> = Result<T, InquiryError>;

/// Result type alias for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
