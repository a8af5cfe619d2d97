//! # MCP Deliberative Inquiry Server
//!
//! A Model Context Protocol (MCP) server that scaffolds critical-thinking
//! exercises by delegating text generation to Langbase Pipes.
//!
//! ## Features
//!
//! - **Inquiry trees**: decompose a root question into a hierarchy of sub-questions
//! - **Perspectives**: ethical, historical and critical answers for every node
//! - **Reformulations**: alternative phrasings for ambiguous questions
//! - **Reasoning log**: append-only record of steps, feedback and node states
//! - **Balance score**: a heuristic for how deep and plural the inquiry went
//! - **Reports**: HTML, Graphviz and outline renderings of a session
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (Rust) → Langbase Pipes (HTTP)
//!                    ↓
//!          In-memory sessions (ReasoningLog)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcp_deliberative_inquiry::{Config, AppState, McpServer};
//! use mcp_deliberative_inquiry::inquiry::PipeCompletion;
//! use mcp_deliberative_inquiry::langbase::LangbaseClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let langbase = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let completion = PipeCompletion::new(langbase, config.pipes.clone());
//!     completion.ensure_pipes().await?;
//!     let state = Arc::new(AppState::new(config, Arc::new(completion)));
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

/// Command-line interface definitions.
pub mod cli;
/// Configuration management for the MCP server.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Inquiry trees, perspectives, tracking, scoring and reports.
pub mod inquiry;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// Prompt templates for the Langbase pipes.
pub mod prompts;
/// MCP server implementation and request handling.
pub mod server;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
