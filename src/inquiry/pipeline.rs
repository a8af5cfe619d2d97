//! Inquiry stages wired to a completion client.
//!
//! Each stage reads what it needs from the session's [`ReasoningLog`] and
//! writes its result back only after the completion reply has been accepted,
//! so a failed stage leaves the log as it found it.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    generate_perspective_responses, parse_reformulations, parse_tree_with_limit,
    serialize_for_log, CompletionClient, CompletionRequest, InquiryNode, ReasoningLog,
    ReformulationSuggestion, ResponseMap,
};
use crate::config::InquiryConfig;
use crate::error::{AppError, AppResult, InquiryError};
use crate::prompts::{build_prompt, PromptKind, PromptParams, UserMode};

/// Step type appended once a tree has been accepted.
pub const INQUIRY_GENERATED_EVENT: &str = "inquiry_generated";

/// Everything one full pass produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tree: InquiryNode,
    pub responses: ResponseMap,
    pub suggestions: Vec<ReformulationSuggestion>,
}

/// Runs the generation stages against a [`CompletionClient`].
#[derive(Clone)]
pub struct InquiryPipeline {
    completion: Arc<dyn CompletionClient>,
    max_depth: usize,
}

impl InquiryPipeline {
    /// Create a pipeline using the configured depth limit
    pub fn new(completion: Arc<dyn CompletionClient>, config: &InquiryConfig) -> Self {
        Self {
            completion,
            max_depth: config.max_depth,
        }
    }

    /// Override the depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Decompose the root question into a tree.
    ///
    /// Service and parse errors are returned unchanged and nothing is
    /// recorded. On success the tree replaces any previous one and an
    /// [`INQUIRY_GENERATED_EVENT`] step is appended.
    pub async fn generate_tree(
        &self,
        log: &mut ReasoningLog,
        mode: UserMode,
    ) -> AppResult<InquiryNode> {
        let prompt = build_prompt(PromptKind::Inquiry, &PromptParams::new(log.root(), mode));
        let raw = self
            .completion
            .complete(CompletionRequest::new(PromptKind::Inquiry, prompt))
            .await?;

        let tree = parse_tree_with_limit(&raw, self.max_depth)?;

        info!(
            root = %tree.label,
            nodes = tree.node_count(),
            depth = tree.depth(),
            "Inquiry tree generated"
        );

        let content = serialize_for_log(&tree, INQUIRY_GENERATED_EVENT);
        let mut context = serde_json::Map::new();
        context.insert("mode".to_string(), serde_json::json!(mode.as_str()));

        log.record_inquiry(tree.clone());
        log.record_event(INQUIRY_GENERATED_EVENT, content, Some(context));

        Ok(tree)
    }

    /// Generate perspective responses for every node of the recorded tree
    pub async fn generate_responses(
        &self,
        log: &mut ReasoningLog,
        mode: UserMode,
    ) -> AppResult<ResponseMap> {
        let tree = log.inquiry().ok_or(InquiryError::MissingTree)?;
        let responses =
            generate_perspective_responses(tree, mode, self.completion.as_ref()).await?;

        log.record_responses(responses.clone());
        Ok(responses)
    }

    /// Ask for reformulations of ambiguous nodes.
    ///
    /// A reply that does not parse counts as "no suggestions".
    pub async fn suggest_reformulations(
        &self,
        log: &mut ReasoningLog,
        mode: UserMode,
    ) -> AppResult<Vec<ReformulationSuggestion>> {
        let tree = log.inquiry().ok_or(InquiryError::MissingTree)?;
        let tree_json = serde_json::to_string(tree).map_err(|e| AppError::Internal {
            message: format!("Failed to serialize inquiry tree: {}", e),
        })?;

        let params = PromptParams::new(log.root(), mode).with_tree_json(tree_json);
        let prompt = build_prompt(PromptKind::Adaptive, &params);
        let raw = self
            .completion
            .complete(CompletionRequest::new(PromptKind::Adaptive, prompt))
            .await?;

        let suggestions = match parse_reformulations(&raw) {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!(error = %e, "Discarding malformed reformulation reply");
                Vec::new()
            }
        };

        info!(suggestions = suggestions.len(), "Reformulations suggested");

        log.record_focus(suggestions.clone());
        Ok(suggestions)
    }

    /// Run tree generation, responses and reformulations in order
    pub async fn run(&self, log: &mut ReasoningLog, mode: UserMode) -> AppResult<RunSummary> {
        let tree = self.generate_tree(log, mode).await?;
        let responses = self.generate_responses(log, mode).await?;
        let suggestions = self.suggest_reformulations(log, mode).await?;

        Ok(RunSummary {
            tree,
            responses,
            suggestions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LangbaseError;
    use crate::inquiry::{BalanceScore, MockCompletionClient, ScoreVariant};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TREE_REPLY: &str =
        r#"{"node":"Is X ethical?","children":[{"node":"A","children":[]},{"node":"B","children":[]}]}"#;

    fn three_perspectives(node: &str) -> String {
        format!(
            r#"{{"node":"{}","responses":[{{"label":"Ethical","text":"e"}},{{"label":"Historical","text":"h"}},{{"label":"Critical","text":"c"}}]}}"#,
            node
        )
    }

    fn node_of(prompt: &str) -> &str {
        ["Is X ethical?", "A", "B"]
            .into_iter()
            .find(|label| prompt.contains(&format!("Inquiry node: \"{}\"", label)))
            .unwrap_or("unknown")
    }

    fn pipeline(mock: MockCompletionClient) -> InquiryPipeline {
        InquiryPipeline::new(Arc::new(mock), &InquiryConfig::default())
    }

    #[tokio::test]
    async fn test_run_end_to_end() {
        let contextual_calls = Arc::new(AtomicUsize::new(0));
        let counter = contextual_calls.clone();

        let mut mock = MockCompletionClient::new();
        mock.expect_complete().returning(move |req| match req.kind {
            PromptKind::Inquiry => Ok(TREE_REPLY.to_string()),
            PromptKind::Contextual => {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(three_perspectives(node_of(&req.prompt)))
            }
            PromptKind::Adaptive => Ok("[]".to_string()),
        });

        let mut log = ReasoningLog::new("Is X ethical?");
        let summary = pipeline(mock)
            .run(&mut log, UserMode::Assisted)
            .await
            .unwrap();

        assert_eq!(summary.tree.depth(), 2);
        assert_eq!(contextual_calls.load(Ordering::SeqCst), 3);
        assert_eq!(log.responses().len(), 3);
        assert!(log.responses().values().all(|r| r.len() == 3));
        assert!(summary.suggestions.is_empty());

        let score = BalanceScore::compute(&log, ScoreVariant::Basic);
        assert_eq!(score.depth, 0.4);
        assert_eq!(score.plurality, 1.0);
        assert_eq!(score.reversibility, 0.0);
        assert_eq!(score.score, 0.467);
    }

    #[tokio::test]
    async fn test_responses_follow_tree_order() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().returning(|req| match req.kind {
            PromptKind::Inquiry => Ok(
                r#"{"node":"Zulu?","children":[{"node":"Mike","children":[]},{"node":"Alpha","children":[]}]}"#
                    .to_string(),
            ),
            _ => Ok(r#"{"responses":[{"label":"Ethical","text":"e"}]}"#.to_string()),
        });
        let pipeline = pipeline(mock);

        let mut log = ReasoningLog::new("Zulu?");
        pipeline.generate_tree(&mut log, UserMode::Guided).await.unwrap();
        pipeline
            .generate_responses(&mut log, UserMode::Guided)
            .await
            .unwrap();

        let labels: Vec<&str> = log.responses().keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["Zulu?", "Mike", "Alpha"]);

        let exported = log.export().unwrap();
        let responses_at = exported.find("\"responses\"").unwrap();
        let section = &exported[responses_at..];
        let zulu = section.find("\"Zulu?\"").unwrap();
        let mike = section.find("\"Mike\"").unwrap();
        let alpha = section.find("\"Alpha\"").unwrap();
        assert!(zulu < mike && mike < alpha);

        let reloaded = ReasoningLog::from_export(&exported).unwrap();
        let labels: Vec<&str> = reloaded.responses().keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["Zulu?", "Mike", "Alpha"]);
    }

    #[tokio::test]
    async fn test_generate_tree_records_step() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Ok(TREE_REPLY.to_string()));

        let mut log = ReasoningLog::new("Is X ethical?");
        pipeline(mock)
            .generate_tree(&mut log, UserMode::Guided)
            .await
            .unwrap();

        assert_eq!(log.node_count(), 3);
        let step = &log.steps()[0];
        assert_eq!(step.event_type, INQUIRY_GENERATED_EVENT);
        assert_eq!(step.context["mode"], "guided");
        assert_eq!(step.content["node"], "Is X ethical?");
    }

    #[tokio::test]
    async fn test_malformed_tree_leaves_log_untouched() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Ok("not json".to_string()));

        let mut log = ReasoningLog::new("Is X ethical?");
        let before = log.clone();
        let err = pipeline(mock)
            .generate_tree(&mut log, UserMode::Assisted)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Inquiry(InquiryError::MalformedTree { .. })
        ));
        assert!(log.inquiry().is_none());
        assert_eq!(log, before);
    }

    #[tokio::test]
    async fn test_depth_limit_applies() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .returning(|_| Ok(TREE_REPLY.to_string()));

        let mut log = ReasoningLog::new("Is X ethical?");
        let err = pipeline(mock)
            .with_max_depth(1)
            .generate_tree(&mut log, UserMode::Assisted)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Inquiry(InquiryError::DepthExceeded { max_depth: 1 })
        ));
        assert!(log.inquiry().is_none());
    }

    #[tokio::test]
    async fn test_responses_degrade_per_node() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().returning(|req| {
            Ok(match node_of(&req.prompt) {
                "A" => "Sorry, I cannot answer that".to_string(),
                other => three_perspectives(other),
            })
        });

        let mut log = ReasoningLog::new("Is X ethical?");
        log.record_inquiry(parse_tree_with_limit(TREE_REPLY, 12).unwrap());

        let responses = pipeline(mock)
            .generate_responses(&mut log, UserMode::Assisted)
            .await
            .unwrap();

        assert!(responses["A"].is_empty());
        assert_eq!(responses["B"].len(), 3);
        assert_eq!(responses["Is X ethical?"].len(), 3);
        assert_eq!(log.responses(), &responses);
    }

    #[tokio::test]
    async fn test_service_error_aborts_responses() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().returning(|req| {
            if node_of(&req.prompt) == "B" {
                Err(LangbaseError::Unavailable {
                    message: "down".to_string(),
                    retries: 0,
                })
            } else {
                Ok(three_perspectives(node_of(&req.prompt)))
            }
        });

        let mut log = ReasoningLog::new("Is X ethical?");
        log.record_inquiry(parse_tree_with_limit(TREE_REPLY, 12).unwrap());
        let before = log.clone();

        let err = pipeline(mock)
            .generate_responses(&mut log, UserMode::Assisted)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Langbase(LangbaseError::Unavailable { .. })));
        assert_eq!(log, before);
    }

    #[tokio::test]
    async fn test_stages_require_tree() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().times(0);
        let pipeline = pipeline(mock);

        let mut log = ReasoningLog::new("q");
        let err = pipeline
            .generate_responses(&mut log, UserMode::Assisted)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Inquiry(InquiryError::MissingTree)));

        let err = pipeline
            .suggest_reformulations(&mut log, UserMode::Assisted)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Inquiry(InquiryError::MissingTree)));
    }

    #[tokio::test]
    async fn test_reformulations_are_recorded() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().times(1).returning(|req| {
            assert!(req.prompt.contains("\"node\":\"Is X ethical?\""));
            Ok(r#"[{"original":"A","suggestions":["A1","A2","A3"]}]"#.to_string())
        });

        let mut log = ReasoningLog::new("Is X ethical?");
        log.record_inquiry(parse_tree_with_limit(TREE_REPLY, 12).unwrap());

        let suggestions = pipeline(mock)
            .suggest_reformulations(&mut log, UserMode::Exploratory)
            .await
            .unwrap();

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].suggestions, vec!["A1", "A2"]);
        assert_eq!(log.focus(), suggestions.as_slice());
        assert_eq!(log.state_or_focus_change_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_reformulations_recover() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .returning(|_| Ok("nothing to add".to_string()));

        let mut log = ReasoningLog::new("Is X ethical?");
        log.record_inquiry(InquiryNode::leaf("Is X ethical?"));

        let suggestions = pipeline(mock)
            .suggest_reformulations(&mut log, UserMode::Assisted)
            .await
            .unwrap();

        assert!(suggestions.is_empty());
        assert!(log.focus().is_empty());
    }
}
