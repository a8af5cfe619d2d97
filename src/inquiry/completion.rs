//! Completion seam between the inquiry core and the text-completion service.

use async_trait::async_trait;
use tracing::debug;

use crate::config::PipeConfig;
use crate::error::LangbaseResult;
use crate::langbase::{LangbaseClient, PipeRequest};
use crate::prompts::PromptKind;

/// One prompt sent to the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Which stage the prompt belongs to.
    pub kind: PromptKind,
    /// Fully rendered prompt text.
    pub prompt: String,
    /// Completion token budget.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl CompletionRequest {
    /// Create a request with the stage's default budget and temperature
    pub fn new(kind: PromptKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            max_tokens: kind.max_tokens(),
            temperature: kind.temperature(),
        }
    }
}

/// Text-completion capability consumed by the inquiry pipeline.
///
/// The returned text is not guaranteed to be valid JSON even when the call
/// succeeds; callers parse it and decide how to handle malformed replies.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a prompt and return the raw completion text.
    async fn complete(&self, request: CompletionRequest) -> LangbaseResult<String>;
}

/// [`CompletionClient`] backed by one Langbase pipe per prompt stage.
#[derive(Clone)]
pub struct PipeCompletion {
    langbase: LangbaseClient,
    pipes: PipeConfig,
}

impl PipeCompletion {
    /// Create a completion client over the given Langbase client and pipe names
    pub fn new(langbase: LangbaseClient, pipes: PipeConfig) -> Self {
        Self { langbase, pipes }
    }

    /// Pipe name serving a prompt stage
    pub fn pipe_for(&self, kind: PromptKind) -> &str {
        match kind {
            PromptKind::Inquiry => &self.pipes.inquiry,
            PromptKind::Contextual => &self.pipes.contextual,
            PromptKind::Adaptive => &self.pipes.adaptive,
        }
    }

    /// Upsert the three stage pipes with their token budgets and temperature
    pub async fn ensure_pipes(&self) -> LangbaseResult<()> {
        for kind in [PromptKind::Inquiry, PromptKind::Contextual, PromptKind::Adaptive] {
            self.langbase
                .ensure_stage_pipe(self.pipe_for(kind), kind, &self.pipes.model)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CompletionClient for PipeCompletion {
    async fn complete(&self, request: CompletionRequest) -> LangbaseResult<String> {
        let pipe = self.pipe_for(request.kind).to_string();
        debug!(
            pipe = %pipe,
            stage = %request.kind,
            max_tokens = request.max_tokens,
            prompt_chars = request.prompt.len(),
            "Requesting completion"
        );

        let response = self
            .langbase
            .call_pipe(PipeRequest::with_system_prompt(pipe, request.prompt))
            .await?;

        Ok(response.completion)
    }
}
