//! Bounded, model-ready context from an unbounded conversation.
//!
//! Every request is assembled in one of three ways:
//!
//! 1. **Cache hit**: a fresh prefix exists for `(session, system prompt)`.
//!    The last few messages are appended to it; nothing older is re-read.
//! 2. **Verbatim**: short conversations are sent whole after the system
//!    prompt.
//! 3. **Summarized**: long conversations keep a recency window verbatim and
//!    collapse everything before it into a keyword digest, provided the digest
//!    fits the summary budget.
//!
//! Conversations past the caching cutoff then refresh their cached prefix so
//! the next turn can take path 1. Cache writes are best-effort.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::OptimizerConfig;
use crate::context::budget::{HistoryBudget, estimate_messages, estimate_parts, estimate_tokens};
use crate::context::cache::{CacheEntry, ConversationCache, InMemoryCache};
use crate::context::summarizer::Summarizer;
use crate::{ConversationMessage, MessagePart};

/// The part list handed to the model-completion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedContent {
    pub message_parts: Vec<MessagePart>,
    pub estimated_tokens: usize,
    pub used_cache: bool,
    /// The digest of older turns, when one was included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl OptimizedContent {
    /// Just the system prompt.
    fn system_only(system_prompt: &str) -> Self {
        Self {
            message_parts: vec![MessagePart::system(system_prompt)],
            estimated_tokens: estimate_tokens(system_prompt),
            used_cache: false,
            summary: None,
        }
    }
}

/// How a given call assembled its output. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assembly {
    CacheHit,
    Verbatim,
    Summarized,
}

impl Assembly {
    fn as_str(self) -> &'static str {
        match self {
            Assembly::CacheHit => "cache_hit",
            Assembly::Verbatim => "verbatim",
            Assembly::Summarized => "summarized",
        }
    }
}

/// Orchestrates the cache and summarizer into bounded context.
///
/// Construct one per process and share it; all methods take `&self`.
pub struct ContextOptimizer {
    cache: Arc<dyn ConversationCache>,
    summarizer: Summarizer,
    config: OptimizerConfig,
}

impl std::fmt::Debug for ContextOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextOptimizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContextOptimizer {
    pub fn new(cache: Arc<dyn ConversationCache>, config: OptimizerConfig) -> Self {
        Self {
            cache,
            summarizer: Summarizer::new(config.summarizer.clone()),
            config,
        }
    }

    /// An optimizer with its own in-memory cache on the system clock.
    pub fn with_config(config: OptimizerConfig) -> Self {
        let cache = Arc::new(InMemoryCache::new(config.cache_ttl()));
        Self::new(cache, config)
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// The shared cache, e.g. for handing to [`spawn_sweeper`](crate::context::cache::spawn_sweeper).
    pub fn cache(&self) -> &Arc<dyn ConversationCache> {
        &self.cache
    }

    /// Build the part list for one model call.
    ///
    /// `max_history_tokens` defaults to the configured budget. Never fails:
    /// an empty history yields the system prompt alone.
    pub fn optimize(
        &self,
        messages: &[ConversationMessage],
        system_prompt: &str,
        session_id: &str,
        max_history_tokens: Option<usize>,
    ) -> OptimizedContent {
        if messages.is_empty() {
            return OptimizedContent::system_only(system_prompt);
        }
        let max_tokens = max_history_tokens.unwrap_or(self.config.max_history_tokens);

        let (content, assembly) = match self.cache.get(session_id, system_prompt) {
            Some(entry) => (self.extend_cached(&entry, messages), Assembly::CacheHit),
            None => self.assemble(messages, system_prompt, max_tokens),
        };

        if messages.len() > self.config.cache_min_messages {
            self.store_prefix(messages, system_prompt, session_id);
        }

        debug!(
            session = session_id,
            path = assembly.as_str(),
            messages = messages.len(),
            parts = content.message_parts.len(),
            "{}",
            HistoryBudget::new(content.estimated_tokens, max_tokens).to_log_string()
        );
        content
    }

    /// Append the most recent messages to a cached prefix.
    fn extend_cached(&self, entry: &CacheEntry, messages: &[ConversationMessage]) -> OptimizedContent {
        let start = messages.len().saturating_sub(self.config.cache_hit_tail);
        let tail = &messages[start..];

        let mut parts = entry.content.clone();
        parts.extend(tail.iter().map(MessagePart::from));

        OptimizedContent {
            message_parts: parts,
            estimated_tokens: entry.estimated_tokens + estimate_messages(tail),
            used_cache: true,
            summary: None,
        }
    }

    /// Assemble from scratch: system prompt, optional digest, recent turns.
    fn assemble(
        &self,
        messages: &[ConversationMessage],
        system_prompt: &str,
        max_tokens: usize,
    ) -> (OptimizedContent, Assembly) {
        let mut parts = vec![MessagePart::system(system_prompt)];

        if messages.len() <= self.config.summarize_after {
            parts.extend(messages.iter().map(MessagePart::from));
            let estimated_tokens = estimate_parts(&parts);
            let content = OptimizedContent {
                message_parts: parts,
                estimated_tokens,
                used_cache: false,
                summary: None,
            };
            return (content, Assembly::Verbatim);
        }

        let split = messages.len().saturating_sub(self.config.recent_window);
        let (older, recent) = messages.split_at(split);

        let digest = self.summarizer.summarize_span(older);
        let digest_tokens = estimate_tokens(&digest);
        let summary = if HistoryBudget::fits_fraction(
            max_tokens,
            digest_tokens,
            self.config.summary_budget_fraction,
        ) {
            parts.push(MessagePart::summary(&digest));
            Some(digest)
        } else {
            trace!(digest_tokens, max_tokens, "summary over budget, dropped");
            None
        };

        parts.extend(recent.iter().map(MessagePart::from));
        let estimated_tokens = estimate_parts(&parts);
        let content = OptimizedContent {
            message_parts: parts,
            estimated_tokens,
            used_cache: false,
            summary,
        };
        (content, Assembly::Summarized)
    }

    /// Refresh the cached prefix: system prompt plus the earliest messages.
    fn store_prefix(&self, messages: &[ConversationMessage], system_prompt: &str, session_id: &str) {
        let prefix_len = self
            .config
            .cache_prefix_max
            .min(messages.len().saturating_sub(self.config.cache_hit_tail));

        let mut parts = Vec::with_capacity(prefix_len + 1);
        parts.push(MessagePart::system(system_prompt));
        parts.extend(messages[..prefix_len].iter().map(MessagePart::from));
        let tokens = estimate_parts(&parts);

        if let Err(e) = self.cache.put(session_id, system_prompt, parts, tokens) {
            debug!(session = session_id, "cache write dropped: {e}");
        }
    }
}
