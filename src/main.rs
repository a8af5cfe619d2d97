use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcp_deliberative_inquiry::{
    cli::{run_inquiry, Cli, Commands},
    config::{Config, LogFormat},
    inquiry::{InquiryPipeline, PipeCompletion},
    langbase::LangbaseClient,
    prompts::UserMode,
    server::{AppState, McpServer},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "MCP Deliberative Inquiry starting..."
    );

    // Initialize Langbase client
    let langbase = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    // Ensure the stage pipes exist with their token budgets
    let completion = PipeCompletion::new(langbase, config.pipes.clone());
    info!("Ensuring required Langbase pipes exist...");
    if let Err(e) = completion.ensure_pipes().await {
        error!(error = %e, "Failed to ensure stage pipes exist");
        return Err(e.into());
    }
    let completion = Arc::new(completion);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let state = Arc::new(AppState::new(config, completion));
            let server = McpServer::new(state);

            info!("Server ready, waiting for requests on stdin...");

            if let Err(e) = server.run().await {
                error!(error = %e, "Server error");
                return Err(e.into());
            }

            info!("Server shutdown complete");
        }
        Commands::Run {
            question,
            mode,
            format,
            output,
            variant,
        } => {
            let mode = match mode {
                Some(raw) => raw.parse::<UserMode>().map_err(anyhow::Error::msg)?,
                None => config.inquiry.default_mode,
            };
            let pipeline = InquiryPipeline::new(completion, &config.inquiry);

            let (rendered, _) =
                run_inquiry(&pipeline, &question, mode, format, variant.into()).await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    info!(path = %path.display(), "Report written");
                }
                None => println!("{}", rendered),
            }
        }
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
