use std::env;

use crate::error::AppError;
use crate::prompts::UserMode;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
    pub inquiry: InquiryConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Langbase pipe names, one per prompt stage
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub inquiry: String,
    pub contextual: String,
    pub adaptive: String,
    /// Model used when the pipes are created or upserted
    pub model: String,
}

/// Inquiry tree limits and defaults
#[derive(Debug, Clone)]
pub struct InquiryConfig {
    /// Deepest tree accepted from the completion service
    pub max_depth: usize,
    /// Mode used when a caller does not name one
    pub default_mode: UserMode,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        let defaults = PipeConfig::default();
        let pipes = PipeConfig {
            inquiry: env::var("PIPE_INQUIRY").unwrap_or(defaults.inquiry),
            contextual: env::var("PIPE_CONTEXTUAL").unwrap_or(defaults.contextual),
            adaptive: env::var("PIPE_ADAPTIVE").unwrap_or(defaults.adaptive),
            model: env::var("COMPLETION_MODEL").unwrap_or(defaults.model),
        };

        let default_mode = match env::var("DEFAULT_USER_MODE") {
            Ok(raw) => raw.parse().map_err(|e: String| AppError::Config { message: e })?,
            Err(_) => UserMode::default(),
        };

        let inquiry = InquiryConfig {
            max_depth: env::var("INQUIRY_MAX_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|d: &usize| *d > 0)
                .unwrap_or(InquiryConfig::default().max_depth),
            default_mode,
        };

        Ok(Config {
            langbase,
            logging,
            request,
            pipes,
            inquiry,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            inquiry: "inquiry-decomposition-v1".to_string(),
            contextual: "contextual-perspectives-v1".to_string(),
            adaptive: "adaptive-reformulation-v1".to_string(),
            model: "openai:gpt-4o-mini".to_string(),
        }
    }
}

impl Default for InquiryConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            default_mode: UserMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_config_default() {
        let config = RequestConfig::default();
        assert_eq!(config.timeout_ms, 30000);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_delay_ms, 1000);
    }

    #[test]
    fn test_pipe_config_default_names_are_distinct() {
        let pipes = PipeConfig::default();
        assert_ne!(pipes.inquiry, pipes.contextual);
        assert_ne!(pipes.contextual, pipes.adaptive);
        assert_ne!(pipes.inquiry, pipes.adaptive);
    }

    #[test]
    fn test_inquiry_config_default() {
        let config = InquiryConfig::default();
        assert_eq!(config.max_depth, 12);
        assert_eq!(config.default_mode, UserMode::Assisted);
    }
}
