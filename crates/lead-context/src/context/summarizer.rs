//! Keyword digest of older conversation turns.
//!
//! When a conversation outgrows the verbatim window, the optimizer replaces
//! its older turns with a one-line digest: which topics came up and which
//! short questions the visitor asked. It is a heuristic, not a précis. Its
//! only job is to keep the model oriented about stale history at near-zero
//! token cost, with no model call.

use serde::Deserialize;

use crate::{ConversationMessage, MessageRole};

/// Fallback label when no topic group matched.
const GENERAL_TOPIC: &str = "general conversation";

/// A topic label and the lower-case keywords that imply it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicGroup {
    pub label: String,
    pub keywords: Vec<String>,
}

impl TopicGroup {
    pub fn new(label: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            label: label.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// The built-in topic groups.
pub fn default_topics() -> Vec<TopicGroup> {
    vec![
        TopicGroup::new("business", &["business", "company"]),
        TopicGroup::new("analysis", &["analysis", "analyze", "analyse"]),
        TopicGroup::new("documents", &["document", "pdf", "file"]),
        TopicGroup::new("images", &["image", "photo", "picture"]),
        TopicGroup::new("assistance", &["help", "assist", "support"]),
    ]
}

/// Configuration for the keyword summarizer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Topic groups tested against every summarized message, in order.
    pub topics: Vec<TopicGroup>,
    /// Most recent messages [`Summarizer::summarize`] leaves out.
    pub keep_recent: usize,
    /// Maximum key questions quoted in the digest.
    pub max_questions: usize,
    /// A user message must be shorter than this to count as a key question.
    pub question_source_limit: usize,
    /// Key questions are cut to this many characters.
    pub question_max_chars: usize,
    /// Hard cap on the digest, ellipsis included.
    pub max_summary_chars: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            keep_recent: 4,
            max_questions: 2,
            question_source_limit: 100,
            question_max_chars: 80,
            max_summary_chars: 200,
        }
    }
}

/// Deterministic keyword summarizer.
#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(config: SummarizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Digest everything except the most recent `keep_recent` messages.
    pub fn summarize(&self, messages: &[ConversationMessage]) -> String {
        let end = messages.len().saturating_sub(self.config.keep_recent);
        self.summarize_span(&messages[..end])
    }

    /// Digest every message in `span`.
    ///
    /// The result never exceeds `max_summary_chars` characters.
    pub fn summarize_span(&self, span: &[ConversationMessage]) -> String {
        let mut topics: Vec<&str> = Vec::new();
        let mut questions: Vec<String> = Vec::new();

        for msg in span {
            let lowered = msg.content.to_lowercase();
            for group in &self.config.topics {
                if group.matches(&lowered) && !topics.contains(&group.label.as_str()) {
                    topics.push(&group.label);
                }
            }

            if questions.len() < self.config.max_questions && self.is_key_question(msg) {
                questions.push(take_chars(msg.content.trim(), self.config.question_max_chars));
            }
        }

        let topic_list = if topics.is_empty() {
            GENERAL_TOPIC.to_string()
        } else {
            topics.join(", ")
        };

        let mut summary = format!("Discussed topics: {topic_list}.");
        if !questions.is_empty() {
            summary.push_str(" Key questions: ");
            summary.push_str(&questions.join("; "));
        }

        cap_with_ellipsis(&summary, self.config.max_summary_chars)
    }

    fn is_key_question(&self, msg: &ConversationMessage) -> bool {
        msg.role == MessageRole::User
            && msg.content.contains('?')
            && msg.content.chars().count() < self.config.question_source_limit
    }
}

/// First `max` characters of `text`.
fn take_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// `text` unchanged if it fits in `max` characters, otherwise cut and
/// terminated with `...` so the total is exactly `max`.
fn cap_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut capped = take_chars(text, max.saturating_sub(3));
    capped.push_str("...");
    capped
}
