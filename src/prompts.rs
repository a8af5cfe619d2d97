//! Centralized prompt definitions for the inquiry stages
//!
//! Every completion call goes through [`build_prompt`]. Templates are plain
//! `&'static str` constants with `{placeholder}` slots so they can be tested
//! and versioned independently of the code that fills them.

use serde::{Deserialize, Serialize};

/// User level that tunes how deep and technical the generated material is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserMode {
    /// Basic level: short, concrete sub-questions.
    #[default]
    Assisted,
    /// Intermediate level.
    Guided,
    /// Advanced level: open-ended, theory-heavy exploration.
    Exploratory,
}

impl UserMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            UserMode::Assisted => "assisted",
            UserMode::Guided => "guided",
            UserMode::Exploratory => "exploratory",
        }
    }

    /// Human-readable description inserted into prompts
    pub fn describe(&self) -> &'static str {
        match self {
            UserMode::Assisted => "assisted (basic)",
            UserMode::Guided => "guided (intermediate)",
            UserMode::Exploratory => "exploratory (advanced)",
        }
    }
}

impl std::fmt::Display for UserMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "assisted" | "basic" => Ok(UserMode::Assisted),
            "guided" | "intermediate" => Ok(UserMode::Guided),
            "exploratory" | "advanced" => Ok(UserMode::Exploratory),
            _ => Err(format!("Unknown user mode: {}", s)),
        }
    }
}

/// The three prompt shapes sent to the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Decompose a root question into a sub-question tree.
    Inquiry,
    /// Multi-perspective answers for a single tree node.
    Contextual,
    /// Reformulation suggestions for ambiguous nodes.
    Adaptive,
}

impl PromptKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Inquiry => "inquiry",
            PromptKind::Contextual => "contextual",
            PromptKind::Adaptive => "adaptive",
        }
    }

    /// Completion token budget for this stage.
    pub fn max_tokens(&self) -> u32 {
        match self {
            PromptKind::Inquiry => 600,
            PromptKind::Contextual => 800,
            PromptKind::Adaptive => 300,
        }
    }

    /// Sampling temperature for this stage.
    pub fn temperature(&self) -> f64 {
        0.7
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Values substituted into a prompt template.
#[derive(Debug, Clone, Default)]
pub struct PromptParams {
    /// Root question (inquiry) or node label (contextual).
    pub subject: String,
    /// User level.
    pub mode: UserMode,
    /// Serialized inquiry tree, used by the adaptive prompt.
    pub tree_json: Option<String>,
}

impl PromptParams {
    /// Create params for a subject and mode
    pub fn new(subject: impl Into<String>, mode: UserMode) -> Self {
        Self {
            subject: subject.into(),
            mode,
            tree_json: None,
        }
    }

    /// Attach the serialized tree
    pub fn with_tree_json(mut self, tree_json: impl Into<String>) -> Self {
        self.tree_json = Some(tree_json.into());
        self
    }
}

/// System prompt for decomposing a root question into sub-questions.
pub const INQUIRY_PROMPT: &str = r#"You generate sub-questions that encourage critical thinking.
Root question: "{subject}"
User level: {mode}

1. Identify 3-5 relevant sub-questions that broaden, deepen or diversify the analysis.
2. Organize them hierarchically (question -> sub-question).
3. Respond ONLY with valid JSON in this exact format:
{"node": "root question", "children": [{"node": "sub-question", "children": []}]}

Always respond with valid JSON only, no other text."#;

/// System prompt for multi-perspective answers on a single node.
pub const CONTEXTUAL_PROMPT: &str = r#"You are a contextual generator for deliberative reasoning.
Inquiry node: "{subject}"
User level: {mode}

Give three argued answers to this question from distinct frameworks:
1. An ethical perspective (deontological or utilitarian).
2. A historical or contextual perspective.
3. A critical or alternative perspective.

Respond ONLY with valid JSON in this exact format:
{"node": "{subject}", "responses": [
  {"label": "Ethical", "text": "..."},
  {"label": "Historical", "text": "..."},
  {"label": "Critical", "text": "..."}
]}"#;

/// System prompt for reformulating ambiguous questions.
pub const ADAPTIVE_PROMPT: &str = r#"You are an adaptive dialogue engine for deliberative reasoning.
You have processed this inquiry tree (JSON):
{tree_json}

User level: {mode}

1. Identify nodes that are ambiguous or insufficiently explored.
2. If needed, suggest up to two reformulations of the root question or of sub-questions.
3. Respond ONLY with a valid JSON list:
[{"original": "original question or node", "suggestions": ["Reformulation 1", "Reformulation 2"]}]
If there are no suggestions, respond with []."#;

/// Get the template for a prompt kind.
pub fn template_for(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Inquiry => INQUIRY_PROMPT,
        PromptKind::Contextual => CONTEXTUAL_PROMPT,
        PromptKind::Adaptive => ADAPTIVE_PROMPT,
    }
}

/// Build the prompt text for a stage.
///
/// Pure and deterministic; a missing `tree_json` renders as an empty list.
/// Slots are filled in one scan of the template, so inserted text is never
/// itself searched for placeholders.
pub fn build_prompt(kind: PromptKind, params: &PromptParams) -> String {
    let mut rest = template_for(kind);
    let mut out = String::with_capacity(rest.len() + params.subject.len());

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match slot_at(tail, params) {
            Some((value, token_len)) => {
                out.push_str(value);
                rest = &tail[token_len..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Value and token length of the placeholder `tail` starts with, if any
fn slot_at<'a>(tail: &str, params: &'a PromptParams) -> Option<(&'a str, usize)> {
    let slots = [
        ("{subject}", params.subject.as_str()),
        ("{mode}", params.mode.describe()),
        ("{tree_json}", params.tree_json.as_deref().unwrap_or("[]")),
    ];
    slots
        .into_iter()
        .find(|(token, _)| tail.starts_with(token))
        .map(|(token, value)| (value, token.len()))
}
