//! Conversation context management: estimation, caching, summarization.
//!
//! The model only ever sees what this module assembles:
//!
//! 1. **[`budget`]**: [`estimate_tokens`] approximates cost as
//!    `ceil(chars / 4)`; every size decision goes through it.
//!
//! 2. **[`cache`]**: [`InMemoryCache`] keeps an assembled prefix per
//!    `(session, system prompt)` for 30 minutes so later turns skip
//!    re-assembly.
//!
//! 3. **[`summarizer`]**: keyword digest of older turns. No model call.
//!
//! 4. **[`optimizer`]**: [`ContextOptimizer`] ties the three together and
//!    produces [`OptimizedContent`].

pub mod budget;
pub mod cache;
pub mod optimizer;
pub mod summarizer;

pub use budget::{HistoryBudget, estimate_messages, estimate_parts, estimate_tokens};
pub use cache::{CacheEntry, CacheKey, CacheWriteError, ConversationCache, InMemoryCache, spawn_sweeper};
pub use optimizer::{ContextOptimizer, OptimizedContent};
pub use summarizer::{Summarizer, SummarizerConfig, TopicGroup};
