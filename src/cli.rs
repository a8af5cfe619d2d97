//! Command-line interface.
//!
//! `serve` (the default) runs the MCP server on stdio. `run` executes the
//! whole pipeline once for a question and writes the result.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use crate::error::AppResult;
use crate::inquiry::{render_html, BalanceScore, InquiryPipeline, ReasoningLog, ScoreVariant};
use crate::prompts::UserMode;

/// Top-level arguments.
#[derive(Parser, Debug)]
#[command(name = "mcp-deliberative-inquiry")]
#[command(about = "Deliberative inquiry MCP server backed by Langbase Pipes", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the MCP server over stdio
    Serve,

    /// Run one inquiry end to end and write the result
    Run {
        /// Root question to examine
        #[arg(long, short)]
        question: String,

        /// User level: assisted, guided or exploratory
        #[arg(long, short)]
        mode: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Score variant included in the report
        #[arg(long, value_enum, default_value_t = VariantArg::Basic)]
        variant: VariantArg,
    },
}

/// Output format for `run`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The exported reasoning log
    Json,
    /// The HTML report
    Html,
}

/// Score variant flag.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantArg {
    Basic,
    Extended,
}

impl From<VariantArg> for ScoreVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Basic => ScoreVariant::Basic,
            VariantArg::Extended => ScoreVariant::Extended,
        }
    }
}

/// Run every stage for `question` and render the session.
///
/// Returns the rendered text and the log it was rendered from.
pub async fn run_inquiry(
    pipeline: &InquiryPipeline,
    question: &str,
    mode: UserMode,
    format: OutputFormat,
    variant: ScoreVariant,
) -> AppResult<(String, ReasoningLog)> {
    let mut log = ReasoningLog::new(question);
    let summary = pipeline.run(&mut log, mode).await?;
    let score = BalanceScore::compute(&log, variant);

    info!(
        nodes = summary.tree.node_count(),
        suggestions = summary.suggestions.len(),
        score = score.score,
        "Inquiry completed"
    );

    let rendered = match format {
        OutputFormat::Json => log.export()?,
        OutputFormat::Html => render_html(&log, Some(&score)),
    };

    Ok((rendered, log))
}
