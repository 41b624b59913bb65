//! Convenience re-exports for common `lead-context` types.
//!
//! ```ignore
//! use lead_context::prelude::*;
//! ```
//!
//! Covers the conversation types, the optimizer with its cache and config,
//! and the lead assessment entry points. Summarizer internals and the
//! catalogue types live in their modules.

// ── Conversation types ──────────────────────────────────────────────
pub use crate::{ConversationMessage, MessagePart, MessageRole, PartRole};

// ── Context optimization ────────────────────────────────────────────
pub use crate::config::{ConfigError, OptimizerConfig};
pub use crate::context::{
    ContextOptimizer, ConversationCache, InMemoryCache, OptimizedContent, estimate_tokens,
    spawn_sweeper,
};

// ── Lead intelligence ───────────────────────────────────────────────
pub use crate::intel::{
    ConversationIntent, ConversationStage, LeadAssessment, RoleDetector, RoleResult, RoleSignal,
    StaticSuggestionEngine, SuggestionEngine, ToolSuggestion, assess_lead, detect_role,
};

// ── Time ────────────────────────────────────────────────────────────
pub use crate::clock::{Clock, ManualClock, SystemClock};
