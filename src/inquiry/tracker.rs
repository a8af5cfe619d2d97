//! Reasoning tracker: the append-only record of one inquiry session.
//!
//! `steps`, `feedback` and `focus` only ever grow. `inquiry`, `responses`
//! and `node_states` hold the latest value written. Every field lands in
//! [`ReasoningLog::export`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{serialize_for_log, InquiryNode, ReformulationSuggestion, ResponseMap};
use crate::error::{TrackerError, TrackerResult};

/// Step type appended by [`ReasoningLog::set_node_state`].
pub const NODE_STATE_CHANGE_EVENT: &str = "node_state_change";
/// Step type appended by [`ReasoningLog::record_focus`].
pub const FOCUS_CHANGE_EVENT: &str = "focus_change";

const RESERVED_STEP_KEYS: [&str; 3] = ["timestamp", "event_type", "content"];

/// Epistemic status a user assigns to a sub-question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Open,
    Resolved,
    Disputed,
    Suspended,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Open => write!(f, "Open"),
            NodeState::Resolved => write!(f, "Resolved"),
            NodeState::Disputed => write!(f, "Disputed"),
            NodeState::Suspended => write!(f, "Suspended"),
        }
    }
}

impl std::str::FromStr for NodeState {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(NodeState::Open),
            "resolved" => Ok(NodeState::Resolved),
            "disputed" => Ok(NodeState::Disputed),
            "suspended" => Ok(NodeState::Suspended),
            _ => Err(TrackerError::InvalidState {
                state: s.to_string(),
            }),
        }
    }
}

/// Latest state of a node and when it was set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStateRecord {
    pub state: NodeState,
    pub timestamp: DateTime<Utc>,
}

/// Who wrote a feedback comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackKind {
    #[default]
    Human,
    #[serde(rename = "AI")]
    Ai,
}

/// A comment attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub comment: String,
    pub author: String,
    pub kind: FeedbackKind,
    pub timestamp: DateTime<Utc>,
}

/// One entry of the append-only step log.
///
/// Context fields (e.g. `framework`, `parent_node`) are stored flat
/// alongside the fixed keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub content: Value,
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

/// Pipeline stage stamped into the time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedStage {
    Inquiry,
    Responses,
    Focus,
}

/// When a stage's result was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeMarker {
    pub stage: TrackedStage,
    pub timestamp: DateTime<Utc>,
}

/// Everything recorded during one inquiry session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningLog {
    root: String,
    inquiry: Option<InquiryNode>,
    responses: ResponseMap,
    focus: Vec<ReformulationSuggestion>,
    steps: Vec<ReasoningEvent>,
    feedback: BTreeMap<String, Vec<FeedbackEntry>>,
    node_states: BTreeMap<String, NodeStateRecord>,
    times: Vec<TimeMarker>,
}

impl ReasoningLog {
    /// Start an empty log for a root question
    pub fn new(root_question: impl Into<String>) -> Self {
        Self {
            root: root_question.into(),
            inquiry: None,
            responses: ResponseMap::new(),
            focus: Vec::new(),
            steps: Vec::new(),
            feedback: BTreeMap::new(),
            node_states: BTreeMap::new(),
            times: Vec::new(),
        }
    }

    /// Rebuild a log from [`export`](Self::export) output
    pub fn from_export(json: &str) -> TrackerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn inquiry(&self) -> Option<&InquiryNode> {
        self.inquiry.as_ref()
    }

    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    pub fn focus(&self) -> &[ReformulationSuggestion] {
        &self.focus
    }

    pub fn steps(&self) -> &[ReasoningEvent] {
        &self.steps
    }

    pub fn feedback(&self) -> &BTreeMap<String, Vec<FeedbackEntry>> {
        &self.feedback
    }

    pub fn node_states(&self) -> &BTreeMap<String, NodeStateRecord> {
        &self.node_states
    }

    pub fn times(&self) -> &[TimeMarker] {
        &self.times
    }

    /// Replace the inquiry tree
    pub fn record_inquiry(&mut self, tree: InquiryNode) {
        debug!(root = %tree.label, nodes = tree.node_count(), "Recording inquiry tree");
        self.inquiry = Some(tree);
        self.stamp(TrackedStage::Inquiry);
    }

    /// Replace the per-node responses
    pub fn record_responses(&mut self, responses: ResponseMap) {
        debug!(nodes = responses.len(), "Recording perspective responses");
        self.responses = responses;
        self.stamp(TrackedStage::Responses);
    }

    /// Append reformulation suggestions.
    ///
    /// Also appends a [`FOCUS_CHANGE_EVENT`] step carrying the suggestions.
    pub fn record_focus<I>(&mut self, suggestions: I)
    where
        I: IntoIterator<Item = ReformulationSuggestion>,
    {
        let added: Vec<ReformulationSuggestion> = suggestions.into_iter().collect();
        let content = serialize_for_log(&added, FOCUS_CHANGE_EVENT);
        self.focus.extend(added);
        self.stamp(TrackedStage::Focus);
        self.record_event(FOCUS_CHANGE_EVENT, content, None);
    }

    /// Append a step. `content` is stored verbatim.
    ///
    /// Context keys named `timestamp`, `event_type` or `content` are dropped.
    pub fn record_event(
        &mut self,
        event_type: impl Into<String>,
        content: Value,
        context: Option<Map<String, Value>>,
    ) {
        let mut context = context.unwrap_or_default();
        for key in RESERVED_STEP_KEYS {
            if context.remove(key).is_some() {
                warn!(key = key, "Dropping reserved key from step context");
            }
        }

        self.steps.push(ReasoningEvent {
            timestamp: Utc::now(),
            event_type: event_type.into(),
            content,
            context,
        });
    }

    /// Append a feedback comment to a node
    pub fn record_feedback(
        &mut self,
        node: impl Into<String>,
        comment: impl Into<String>,
        author: Option<String>,
        kind: Option<FeedbackKind>,
    ) {
        self.feedback
            .entry(node.into())
            .or_default()
            .push(FeedbackEntry {
                comment: comment.into(),
                author: author.unwrap_or_else(|| "Anonymous".to_string()),
                kind: kind.unwrap_or_default(),
                timestamp: Utc::now(),
            });
    }

    /// Set a node's state from its name.
    ///
    /// Unknown names fail with [`TrackerError::InvalidState`] and leave the
    /// log untouched.
    pub fn set_node_state(&mut self, node: impl Into<String>, state: &str) -> TrackerResult<NodeState> {
        let state: NodeState = state.parse()?;
        self.apply_node_state(node, state);
        Ok(state)
    }

    /// Set a node's state, overwriting any earlier one.
    ///
    /// Also appends a [`NODE_STATE_CHANGE_EVENT`] step.
    pub fn apply_node_state(&mut self, node: impl Into<String>, state: NodeState) {
        let node = node.into();
        let previous = self
            .node_states
            .insert(
                node.clone(),
                NodeStateRecord {
                    state,
                    timestamp: Utc::now(),
                },
            )
            .map(|r| r.state);

        self.record_event(
            NODE_STATE_CHANGE_EVENT,
            serde_json::json!({
                "node": node,
                "state": state,
                "previous": previous,
            }),
            None,
        );
    }

    /// Number of nodes in the current tree, 0 without one
    pub fn node_count(&self) -> usize {
        self.inquiry.as_ref().map(InquiryNode::node_count).unwrap_or(0)
    }

    /// Number of nodes currently marked disputed
    pub fn disputed_count(&self) -> usize {
        self.node_states
            .values()
            .filter(|r| r.state == NodeState::Disputed)
            .count()
    }

    /// Number of focus or node-state change steps
    pub fn state_or_focus_change_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.event_type == NODE_STATE_CHANGE_EVENT || s.event_type == FOCUS_CHANGE_EVENT)
            .count()
    }

    /// Serialize the whole log as pretty-printed JSON
    pub fn export(&self) -> TrackerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn stamp(&mut self, stage: TrackedStage) {
        self.times.push(TimeMarker {
            stage,
            timestamp: Utc::now(),
        });
    }
}
