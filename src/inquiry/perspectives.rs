//! Multi-perspective responses and reformulation suggestions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{extract_json_from_completion, CompletionClient, CompletionRequest, InquiryNode};
use crate::error::{InquiryError, InquiryResult, LangbaseResult};
use crate::prompts::{build_prompt, PromptKind, PromptParams, UserMode};

/// Reformulations kept per suggestion entry.
pub const MAX_SUGGESTIONS_PER_ENTRY: usize = 2;

/// One labeled argumentative answer for a node (e.g. "Ethical").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerspectiveResponse {
    /// Framework the answer is argued from.
    pub label: String,
    /// The answer itself.
    pub text: String,
}

impl PerspectiveResponse {
    /// Create a response
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Responses keyed by node label, in pre-order of first appearance.
///
/// Nodes sharing a label share an entry; the later node in pre-order wins
/// but the entry keeps its first position.
pub type ResponseMap = IndexMap<String, Vec<PerspectiveResponse>>;

/// Alternative phrasings proposed for an ambiguous question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReformulationSuggestion {
    /// The question or node being reformulated.
    pub original: String,
    /// At most [`MAX_SUGGESTIONS_PER_ENTRY`] reformulations.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ReformulationSuggestion {
    /// Create a suggestion, truncating to [`MAX_SUGGESTIONS_PER_ENTRY`]
    pub fn new(original: impl Into<String>, mut suggestions: Vec<String>) -> Self {
        suggestions.truncate(MAX_SUGGESTIONS_PER_ENTRY);
        Self {
            original: original.into(),
            suggestions,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContextualReply {
    Wrapped {
        #[serde(default)]
        responses: Vec<PerspectiveResponse>,
    },
    Bare(Vec<PerspectiveResponse>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AdaptiveReply {
    Many(Vec<ReformulationSuggestion>),
    One(ReformulationSuggestion),
}

/// Parse a contextual reply into its `responses` array.
///
/// A reply without a `responses` key yields an empty list.
pub fn parse_node_responses(raw: &str) -> InquiryResult<Vec<PerspectiveResponse>> {
    let malformed = |message: String| InquiryError::MalformedResponse {
        stage: PromptKind::Contextual.to_string(),
        message,
    };

    let json = extract_json_from_completion(raw).map_err(malformed)?;
    let reply: ContextualReply =
        serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;

    Ok(match reply {
        ContextualReply::Wrapped { responses } => responses,
        ContextualReply::Bare(responses) => responses,
    })
}

/// Parse an adaptive reply into reformulation suggestions.
pub fn parse_reformulations(raw: &str) -> InquiryResult<Vec<ReformulationSuggestion>> {
    let malformed = |message: String| InquiryError::MalformedResponse {
        stage: PromptKind::Adaptive.to_string(),
        message,
    };

    let json = extract_json_from_completion(raw).map_err(malformed)?;
    let reply: AdaptiveReply = serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;

    let suggestions = match reply {
        AdaptiveReply::Many(list) => list,
        AdaptiveReply::One(single) => vec![single],
    };

    Ok(suggestions
        .into_iter()
        .map(|s| ReformulationSuggestion::new(s.original, s.suggestions))
        .collect())
}

/// Generate perspective responses for every node, in pre-order.
///
/// One contextual completion per node, issued sequentially. A reply that
/// does not parse leaves that node with an empty list and the traversal
/// continues; a service error aborts the whole pass.
pub async fn generate_perspective_responses(
    root: &InquiryNode,
    mode: UserMode,
    completion: &dyn CompletionClient,
) -> LangbaseResult<ResponseMap> {
    let mut responses = ResponseMap::new();
    let mut degraded = 0usize;

    for node in root.preorder() {
        let prompt = build_prompt(
            PromptKind::Contextual,
            &PromptParams::new(node.label.as_str(), mode),
        );
        let raw = completion
            .complete(CompletionRequest::new(PromptKind::Contextual, prompt))
            .await?;

        let parsed = match parse_node_responses(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(node = %node.label, error = %e, "Discarding malformed perspective reply");
                degraded += 1;
                Vec::new()
            }
        };

        debug!(node = %node.label, responses = parsed.len(), "Perspectives generated");

        if responses.insert(node.label.clone(), parsed).is_some() {
            warn!(
                node = %node.label,
                "Duplicate node label, earlier responses overwritten"
            );
        }
    }

    info!(
        nodes = responses.len(),
        degraded = degraded,
        "Perspective generation completed"
    );

    Ok(responses)
}
