//! Conversation context optimization and lead intelligence for chat assistants.
//!
//! `lead-context` sits between a website's chat endpoint and the generative
//! model it forwards to. It answers two questions on every turn:
//!
//! - **What history should the model see?** The
//!   [`ContextOptimizer`](context::optimizer::ContextOptimizer) turns an
//!   unbounded conversation into a bounded list of role-tagged
//!   [`MessagePart`]s. Short conversations pass through verbatim, long ones
//!   have their older turns collapsed into a keyword digest, and a
//!   per-session [`InMemoryCache`](context::cache::InMemoryCache) lets later
//!   turns reuse an assembled prefix instead of recomputing it.
//!
//! - **Who is the visitor and what should we offer them?** The
//!   [`RoleDetector`](intel::role::RoleDetector) infers a professional role
//!   from research signals, the intent classifier labels the latest message,
//!   and a [`SuggestionEngine`](intel::suggestions::SuggestionEngine) ranks
//!   next steps. [`assess_lead`](intel::assess_lead) runs all three.
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//! use lead_context::prelude::*;
//!
//! let cache = Arc::new(InMemoryCache::new(OptimizerConfig::default().cache_ttl()));
//! let optimizer = ContextOptimizer::new(cache, OptimizerConfig::default());
//!
//! let history = vec![
//!     ConversationMessage::user("Hi, we're a logistics company."),
//!     ConversationMessage::assistant("Great! How can I help?"),
//! ];
//! let content = optimizer.optimize(&history, "You are a consulting assistant.", "sess-1", None);
//! assert!(!content.used_cache);
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | Token estimation, prefix cache, summarizer, optimizer |
//! | [`intel`] | Role detection, intent classification, stages, tool suggestions |
//! | [`config`] | [`OptimizerConfig`](config::OptimizerConfig) knobs and JSON loading |
//! | [`clock`] | Injectable time source used by the cache |

pub mod clock;
pub mod config;
pub mod context;
pub mod intel;
pub mod prelude;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Constants ──────────────────────────────────────────────────────

/// Label prepended to the synthetic summary part.
pub const SUMMARY_PREFIX: &str = "Previous conversation summary: ";

// ── Conversation types ─────────────────────────────────────────────

/// Who authored a conversation turn.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of a conversation, as stored by the chat frontend.
///
/// Messages are never mutated once created; a conversation is an ordered
/// slice of them, oldest first.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: None,
        }
    }

    /// Attach the time the message was sent.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

// ── Model-ready parts ──────────────────────────────────────────────

/// Role tag on a part handed to the model-completion collaborator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PartRole {
    System,
    User,
    Assistant,
}

impl From<MessageRole> for PartRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => PartRole::User,
            MessageRole::Assistant => PartRole::Assistant,
        }
    }
}

impl std::fmt::Display for PartRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartRole::System => write!(f, "system"),
            PartRole::User => write!(f, "user"),
            PartRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A role-tagged text part in the order the model should read it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MessagePart {
    pub role: PartRole,
    pub text: String,
}

impl MessagePart {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: PartRole::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: PartRole::User,
            text: text.into(),
        }
    }

    /// The synthetic user part that carries a digest of older turns.
    pub fn summary(summary: &str) -> Self {
        Self::user(format!("{SUMMARY_PREFIX}{summary}"))
    }

    /// Whether this part is the synthetic summary produced by [`MessagePart::summary`].
    pub fn is_summary(&self) -> bool {
        self.role == PartRole::User && self.text.starts_with(SUMMARY_PREFIX)
    }
}

impl From<&ConversationMessage> for MessagePart {
    fn from(msg: &ConversationMessage) -> Self {
        Self {
            role: msg.role.into(),
            text: msg.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_role_serializes_lowercase() {
        let json = serde_json::to_string(&ConversationMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn message_deserializes_with_timestamp() {
        let json = r#"{"role":"user","content":"hello","timestamp":"2026-01-05T10:00:00Z"}"#;
        let msg: ConversationMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, MessageRole::User);
        assert!(msg.timestamp.is_some());
    }

    #[test]
    fn part_from_message_keeps_role_and_text() {
        let part = MessagePart::from(&ConversationMessage::user("pricing?"));
        assert_eq!(part.role, PartRole::User);
        assert_eq!(part.text, "pricing?");
    }

    #[test]
    fn summary_part_is_recognized() {
        let part = MessagePart::summary("Discussed topics: business.");
        assert!(part.is_summary());
        assert!(!MessagePart::user("hello").is_summary());
        assert!(!MessagePart::system(format!("{SUMMARY_PREFIX}x")).is_summary());
    }
}
