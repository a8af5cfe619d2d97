//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - The session registry and shared application state

mod handlers;
mod mcp;
mod sessions;

pub use handlers::*;
pub use mcp::*;
pub use sessions::*;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::inquiry::{CompletionClient, InquiryPipeline, UsageMetrics};

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Generation stages bound to the completion client.
    pub pipeline: InquiryPipeline,
    /// Live inquiry sessions.
    pub sessions: SessionRegistry,
    /// Usage counters since process start.
    pub metrics: Mutex<UsageMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, completion: Arc<dyn CompletionClient>) -> Self {
        tracing::info!(
            inquiry_pipe = %config.pipes.inquiry,
            contextual_pipe = %config.pipes.contextual,
            adaptive_pipe = %config.pipes.adaptive,
            max_depth = config.inquiry.max_depth,
            "AppState initializing with pipe configuration"
        );

        let pipeline = InquiryPipeline::new(completion, &config.inquiry);

        Self {
            config,
            pipeline,
            sessions: SessionRegistry::new(),
            metrics: Mutex::new(UsageMetrics::new()),
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
