//! Token estimation and history budget snapshots.
//!
//! Every budgeting decision in this crate goes through [`estimate_tokens`].
//! It is deliberately crude: one token per four characters, rounded up. The
//! same rule is applied to system prompts, conversation turns and synthetic
//! parts, so relative comparisons stay consistent even though the absolute
//! number will not match the model provider's billing.

use crate::{ConversationMessage, MessagePart};

/// Characters per token used by [`estimate_tokens`].
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token cost of `text` as `ceil(chars / 4)`.
///
/// Characters are Unicode scalar values, not bytes. Never fails; the empty
/// string costs zero.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Sum of per-message estimates.
pub fn estimate_messages(messages: &[ConversationMessage]) -> usize {
    messages.iter().map(|m| estimate_tokens(&m.content)).sum()
}

/// Sum of per-part estimates.
///
/// Summing per part (rather than estimating the concatenation) keeps a cache
/// entry's recorded cost equal to the sum of its parts.
pub fn estimate_parts(parts: &[MessagePart]) -> usize {
    parts.iter().map(|p| estimate_tokens(&p.text)).sum()
}

/// Snapshot of how much of a history budget a part list consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryBudget {
    /// Estimated tokens consumed.
    pub estimated_tokens: usize,
    /// Budget the caller asked for.
    pub max_tokens: usize,
    /// Usage as a fraction (0.0 to 1.0+).
    pub usage_pct: f64,
}

impl HistoryBudget {
    pub fn new(estimated_tokens: usize, max_tokens: usize) -> Self {
        let usage_pct = if max_tokens > 0 {
            estimated_tokens as f64 / max_tokens as f64
        } else {
            1.0
        };
        Self {
            estimated_tokens,
            max_tokens,
            usage_pct,
        }
    }

    /// Whether `tokens` fits strictly under `fraction` of this budget.
    pub fn fits_fraction(max_tokens: usize, tokens: usize, fraction: f64) -> bool {
        (tokens as f64) < max_tokens as f64 * fraction
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "history: ~{} tokens ({:.0}% of {})",
            self.estimated_tokens,
            self.usage_pct * 100.0,
            self.max_tokens,
        )
    }
}
