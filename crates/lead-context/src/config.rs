//! Tuning knobs for the context optimizer.
//!
//! [`OptimizerConfig`] holds every threshold the optimizer uses. The defaults
//! match production behavior; override through the `with_*` builders or load
//! a partial JSON file where missing fields keep their defaults.
//!
//! ```ignore
//! let config = OptimizerConfig::default()
//!     .with_max_history_tokens(8000)
//!     .with_cache_ttl_secs(600);
//!
//! let config = OptimizerConfig::from_json_file("optimizer.json")?;
//! ```

use std::path::Path;

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

use crate::ConversationMessage;
use crate::context::cache::DEFAULT_TTL_SECS;
use crate::context::summarizer::SummarizerConfig;

/// Errors raised while loading configuration or input files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

/// Parse a conversation: a JSON array of `{"role", "content"}` objects.
pub fn conversation_from_json(json: &str) -> Result<Vec<ConversationMessage>, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

/// Configuration for [`ContextOptimizer`](crate::context::optimizer::ContextOptimizer).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Freshness window for cached prefixes, in seconds. Default: `1800`.
    pub cache_ttl_secs: i64,
    /// Conversations with at most this many messages are never cached. Default: `5`.
    pub cache_min_messages: usize,
    /// Conversations with more than this many messages get summarized. Default: `6`.
    pub summarize_after: usize,
    /// Messages kept verbatim when summarizing. Default: `4`.
    pub recent_window: usize,
    /// Messages appended to a cached prefix on a hit. Default: `3`.
    pub cache_hit_tail: usize,
    /// Upper bound on conversation messages stored in a cached prefix. Default: `5`.
    pub cache_prefix_max: usize,
    /// A summary is kept only if it costs less than this fraction of the
    /// history budget. Default: `0.3`.
    pub summary_budget_fraction: f64,
    /// History budget used when the caller does not pass one. Default: `4000`.
    pub max_history_tokens: usize,
    /// Keyword summarizer settings.
    pub summarizer: SummarizerConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_TTL_SECS,
            cache_min_messages: 5,
            summarize_after: 6,
            recent_window: 4,
            cache_hit_tail: 3,
            cache_prefix_max: 5,
            summary_budget_fraction: 0.3,
            max_history_tokens: 4000,
            summarizer: SummarizerConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the optimizer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs < 0 || Duration::try_seconds(self.cache_ttl_secs).is_none() {
            return Err(ConfigError::OutOfRange {
                field: "cache_ttl_secs",
                value: self.cache_ttl_secs.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.summary_budget_fraction) {
            return Err(ConfigError::OutOfRange {
                field: "summary_budget_fraction",
                value: self.summary_budget_fraction.to_string(),
            });
        }
        Ok(())
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// The cache freshness window as a duration, saturating at the largest
    /// representable span.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_seconds(self.cache_ttl_secs).unwrap_or(Duration::MAX)
    }

    pub fn with_cache_ttl_secs(mut self, secs: i64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    pub fn with_max_history_tokens(mut self, tokens: usize) -> Self {
        self.max_history_tokens = tokens;
        self
    }

    pub fn with_summary_budget_fraction(mut self, fraction: f64) -> Self {
        self.summary_budget_fraction = fraction;
        self
    }

    pub fn with_summarizer(mut self, summarizer: SummarizerConfig) -> Self {
        self.summarizer = summarizer;
        self
    }
}
