use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::SharedState;
use crate::error::{McpError, McpResult, TrackerError};
use crate::inquiry::{
    render_html, BalanceScore, FeedbackKind, InquiryNode, ReasoningLog, ReformulationSuggestion,
    ResponseMap, ScoreVariant,
};
use crate::prompts::UserMode;

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        // Session lifecycle
        "inquiry_session_create" => handle_session_create(state, arguments).await,
        // Generation stages
        "inquiry_generate_tree" => handle_generate_tree(state, arguments).await,
        "inquiry_generate_responses" => handle_generate_responses(state, arguments).await,
        "inquiry_suggest_reformulations" => {
            handle_suggest_reformulations(state, arguments).await
        }
        "inquiry_run" => handle_run(state, arguments).await,
        // Tracking
        "inquiry_record_event" => handle_record_event(state, arguments).await,
        "inquiry_feedback" => handle_feedback(state, arguments).await,
        "inquiry_set_node_state" => handle_set_node_state(state, arguments).await,
        // Views
        "inquiry_render" => handle_render(state, arguments).await,
        "inquiry_score" => handle_score(state, arguments).await,
        "inquiry_export" => handle_export(state, arguments).await,
        "inquiry_metrics" => handle_metrics(state).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Parameter and result types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SessionCreateParams {
    question: String,
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StageParams {
    session_id: String,
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunParams {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    variant: Option<ScoreVariant>,
}

#[derive(Debug, Deserialize)]
struct SessionParams {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct RecordEventParams {
    session_id: String,
    event_type: String,
    content: Value,
    #[serde(default)]
    context: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct FeedbackParams {
    session_id: String,
    node: String,
    comment: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    kind: Option<FeedbackKind>,
}

#[derive(Debug, Deserialize)]
struct NodeStateParams {
    session_id: String,
    node: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct ScoreParams {
    session_id: String,
    #[serde(default)]
    variant: ScoreVariant,
}

/// Views of a session accepted by `inquiry_render`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RenderFormat {
    #[default]
    Report,
    Dot,
    Outline,
    HtmlList,
}

#[derive(Debug, Deserialize)]
struct RenderParams {
    session_id: String,
    #[serde(default)]
    format: RenderFormat,
    #[serde(default)]
    variant: Option<ScoreVariant>,
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: String,
    root: String,
    mode: UserMode,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct TreeGenerated {
    session_id: String,
    tree: InquiryNode,
    depth: usize,
    node_count: usize,
    edges: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
struct ResponsesGenerated {
    session_id: String,
    responses: ResponseMap,
}

#[derive(Debug, Serialize)]
struct ReformulationsSuggested {
    session_id: String,
    suggestions: Vec<ReformulationSuggestion>,
}

#[derive(Debug, Serialize)]
struct RunCompleted {
    session_id: String,
    tree: InquiryNode,
    responses: ResponseMap,
    suggestions: Vec<ReformulationSuggestion>,
    score: BalanceScore,
}

// ============================================================================
// Session lifecycle and generation stages
// ============================================================================

/// Handle inquiry_session_create - start a session for a root question
async fn handle_session_create(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionCreateParams = parse_arguments("inquiry_session_create", arguments)?;
    let mode = resolve_mode(
        "inquiry_session_create",
        params.mode.as_deref(),
        state.config.inquiry.default_mode,
    )?;

    let (session_id, handle) = state.sessions.create(params.question.as_str(), mode).await;
    state.metrics.lock().await.new_session(params.question.as_str());

    let session = handle.lock().await;
    info!(session_id = %session_id, mode = %mode, "Inquiry session created");

    serde_json::to_value(SessionCreated {
        session_id,
        root: session.log.root().to_string(),
        mode,
        created_at: session.created_at.to_rfc3339(),
    })
    .map_err(McpError::Json)
}

/// Handle inquiry_generate_tree - decompose the root question
async fn handle_generate_tree(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: StageParams = parse_arguments("inquiry_generate_tree", arguments)?;
    let handle = state.sessions.get(&params.session_id).await?;
    let mut session = handle.lock().await;
    let mode = resolve_mode("inquiry_generate_tree", params.mode.as_deref(), session.mode)?;

    let tree = state.pipeline.generate_tree(&mut session.log, mode).await?;
    state.metrics.lock().await.add_nodes(tree.node_count());

    serde_json::to_value(TreeGenerated {
        session_id: params.session_id,
        depth: tree.depth(),
        node_count: tree.node_count(),
        edges: tree
            .edges()
            .map(|(parent, child)| (parent.to_string(), child.to_string()))
            .collect(),
        tree,
    })
    .map_err(McpError::Json)
}

/// Handle inquiry_generate_responses - perspectives for every node
async fn handle_generate_responses(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    let params: StageParams = parse_arguments("inquiry_generate_responses", arguments)?;
    let handle = state.sessions.get(&params.session_id).await?;
    let mut session = handle.lock().await;
    let mode = resolve_mode("inquiry_generate_responses", params.mode.as_deref(), session.mode)?;

    let responses = state
        .pipeline
        .generate_responses(&mut session.log, mode)
        .await?;

    serde_json::to_value(ResponsesGenerated {
        session_id: params.session_id,
        responses,
    })
    .map_err(McpError::Json)
}

/// Handle inquiry_suggest_reformulations - reformulate ambiguous nodes
async fn handle_suggest_reformulations(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    let params: StageParams = parse_arguments("inquiry_suggest_reformulations", arguments)?;
    let handle = state.sessions.get(&params.session_id).await?;
    let mut session = handle.lock().await;
    let mode = resolve_mode(
        "inquiry_suggest_reformulations",
        params.mode.as_deref(),
        session.mode,
    )?;

    let suggestions = state
        .pipeline
        .suggest_reformulations(&mut session.log, mode)
        .await?;

    serde_json::to_value(ReformulationsSuggested {
        session_id: params.session_id,
        suggestions,
    })
    .map_err(McpError::Json)
}

/// Handle inquiry_run - all three stages, on an existing or new session
async fn handle_run(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: RunParams = parse_arguments("inquiry_run", arguments)?;

    let (session_id, handle, created) = match (params.session_id, params.question) {
        (Some(_), Some(_)) => {
            return Err(McpError::InvalidParameters {
                tool_name: "inquiry_run".to_string(),
                message: "session_id and question are mutually exclusive".to_string(),
            })
        }
        (Some(session_id), None) => {
            let handle = state.sessions.get(&session_id).await?;
            (session_id, handle, false)
        }
        (None, Some(question)) => {
            let mode = resolve_mode(
                "inquiry_run",
                params.mode.as_deref(),
                state.config.inquiry.default_mode,
            )?;
            state.metrics.lock().await.new_session(question.as_str());
            let (session_id, handle) = state.sessions.create(question, mode).await;
            (session_id, handle, true)
        }
        (None, None) => {
            return Err(McpError::InvalidParameters {
                tool_name: "inquiry_run".to_string(),
                message: "Either session_id or question is required".to_string(),
            })
        }
    };

    let mut session = handle.lock().await;
    let mode = resolve_mode("inquiry_run", params.mode.as_deref(), session.mode)?;

    // A session created here stays registered, so the caller needs its id
    // to inspect or retry it.
    let summary = match state.pipeline.run(&mut session.log, mode).await {
        Ok(summary) => summary,
        Err(e) if created => {
            warn!(session_id = %session_id, error = %e, "Inquiry run failed");
            return Err(McpError::ExecutionFailed {
                message: format!("{} (session_id: {})", e, session_id),
            });
        }
        Err(e) => return Err(e.into()),
    };
    state.metrics.lock().await.add_nodes(summary.tree.node_count());

    let score = BalanceScore::compute(&session.log, params.variant.unwrap_or_default());
    info!(session_id = %session_id, score = score.score, "Inquiry run completed");

    serde_json::to_value(RunCompleted {
        session_id,
        tree: summary.tree,
        responses: summary.responses,
        suggestions: summary.suggestions,
        score,
    })
    .map_err(McpError::Json)
}

// ============================================================================
// Tracking
// ============================================================================

/// Handle inquiry_record_event - append a step to the session log
async fn handle_record_event(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: RecordEventParams = parse_arguments("inquiry_record_event", arguments)?;
    let handle = state.sessions.get(&params.session_id).await?;
    let mut session = handle.lock().await;

    session
        .log
        .record_event(params.event_type.as_str(), params.content, params.context);

    Ok(serde_json::json!({
        "session_id": params.session_id,
        "event_type": params.event_type,
        "step_count": session.log.steps().len(),
    }))
}

/// Handle inquiry_feedback - attach a comment to a node
async fn handle_feedback(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: FeedbackParams = parse_arguments("inquiry_feedback", arguments)?;
    let handle = state.sessions.get(&params.session_id).await?;
    let mut session = handle.lock().await;

    session.log.record_feedback(
        params.node.as_str(),
        params.comment,
        params.author,
        params.kind,
    );
    state.metrics.lock().await.add_feedback();

    let count = session
        .log
        .feedback()
        .get(&params.node)
        .map(Vec::len)
        .unwrap_or(0);

    Ok(serde_json::json!({
        "session_id": params.session_id,
        "node": params.node,
        "feedback_count": count,
    }))
}

/// Handle inquiry_set_node_state - mark a node open, resolved, disputed or suspended
async fn handle_set_node_state(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: NodeStateParams = parse_arguments("inquiry_set_node_state", arguments)?;
    let handle = state.sessions.get(&params.session_id).await?;
    let mut session = handle.lock().await;

    let node_state = session
        .log
        .set_node_state(params.node.as_str(), &params.state)
        .map_err(|e| match e {
            TrackerError::InvalidState { .. } => McpError::InvalidParameters {
                tool_name: "inquiry_set_node_state".to_string(),
                message: e.to_string(),
            },
            other => McpError::ExecutionFailed {
                message: other.to_string(),
            },
        })?;

    Ok(serde_json::json!({
        "session_id": params.session_id,
        "node": params.node,
        "state": node_state,
    }))
}

// ============================================================================
// Views
// ============================================================================

/// Handle inquiry_render - report, Graphviz, outline or nested list
async fn handle_render(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: RenderParams = parse_arguments("inquiry_render", arguments)?;
    let handle = state.sessions.get(&params.session_id).await?;
    let session = handle.lock().await;

    let content = match params.format {
        RenderFormat::Report => {
            let score = params
                .variant
                .map(|variant| BalanceScore::compute(&session.log, variant));
            render_html(&session.log, score.as_ref())
        }
        format => render_tree(&session.log, format)?,
    };

    Ok(serde_json::json!({
        "session_id": params.session_id,
        "content": content,
    }))
}

/// Handle inquiry_score - epistemic balance of the current log
async fn handle_score(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ScoreParams = parse_arguments("inquiry_score", arguments)?;
    let handle = state.sessions.get(&params.session_id).await?;
    let session = handle.lock().await;

    serde_json::to_value(BalanceScore::compute(&session.log, params.variant))
        .map_err(McpError::Json)
}

/// Handle inquiry_export - the full log as JSON
async fn handle_export(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("inquiry_export", arguments)?;
    let handle = state.sessions.get(&params.session_id).await?;
    let session = handle.lock().await;

    let exported = session.log.export().map_err(|e| McpError::ExecutionFailed {
        message: e.to_string(),
    })?;
    serde_json::from_str(&exported).map_err(McpError::Json)
}

/// Handle inquiry_metrics - usage counters
async fn handle_metrics(state: &SharedState) -> McpResult<Value> {
    let metrics = state.metrics.lock().await.clone();
    serde_json::to_value(metrics).map_err(McpError::Json)
}

// ============================================================================
// Helpers
// ============================================================================

fn render_tree(log: &ReasoningLog, format: RenderFormat) -> McpResult<String> {
    let tree = log.inquiry().ok_or_else(|| McpError::ExecutionFailed {
        message: "No inquiry tree recorded for this session".to_string(),
    })?;

    Ok(match format {
        RenderFormat::Dot => tree.to_dot(),
        RenderFormat::Outline => tree
            .outline()
            .map(|(level, label)| format!("{}- {}", "  ".repeat(level), label))
            .collect::<Vec<_>>()
            .join("\n"),
        RenderFormat::HtmlList => format!("<ul>{}</ul>", tree.to_html_list()),
        RenderFormat::Report => render_html(log, None),
    })
}

/// Resolve an optional mode name, falling back to `default`
fn resolve_mode(tool_name: &str, mode: Option<&str>, default: UserMode) -> McpResult<UserMode> {
    match mode {
        Some(raw) => raw.parse().map_err(|e: String| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e,
        }),
        None => Ok(default),
    }
}

/// Parse tool arguments into a typed struct
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
