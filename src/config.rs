//! Environment-driven configuration

use crate::engine::Credentials;
use crate::pipeline::DEFAULT_RENDER_DEPTH;
use thiserror::Error;

const DEFAULT_LOG_FILTER: &str = "clint=info";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CLINT_MARKDOWN_DEPTH must be between 1 and 6, got {0:?}")]
    InvalidRenderDepth(String),
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClintConfig {
    /// API key forwarded to the engine
    pub credentials: Option<Credentials>,
    /// Heading depth for rendered notes and diagnoses
    pub render_depth: usize,
    /// `tracing` filter directive
    pub log_filter: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for ClintConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            render_depth: DEFAULT_RENDER_DEPTH,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            json_logs: false,
        }
    }
}

impl ClintConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let credentials = lookup("CLINT_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .map(Credentials::new)
            .filter(|c| !c.is_empty());

        let render_depth = match lookup("CLINT_MARKDOWN_DEPTH") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(depth @ 1..=6) => depth,
                _ => return Err(ConfigError::InvalidRenderDepth(raw)),
            },
            None => DEFAULT_RENDER_DEPTH,
        };

        let log_filter = lookup("CLINT_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let json_logs = lookup("CLINT_LOG_JSON")
            .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes"));

        Ok(Self {
            credentials,
            render_depth,
            log_filter,
            json_logs,
        })
    }
}
