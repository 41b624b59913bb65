//! Conversational intent and stage.
//!
//! Intent is read from the visitor's latest message by keyword groups, first
//! match wins. Stage is read from how many turns the visitor has taken.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ConversationMessage, MessageRole};

/// What the visitor appears to be after.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConversationIntent {
    PricingInquiry,
    WorkshopInterest,
    RoiAnalysis,
    ConsultingRequest,
    TechnicalQuestion,
    General,
}

/// Keyword groups checked in order. Pricing comes before workshops so that
/// "how much is the workshop" reads as a pricing question.
const INTENT_PATTERNS: &[(ConversationIntent, &[&str])] = &[
    (
        ConversationIntent::PricingInquiry,
        &["price", "pricing", "cost", "how much", "budget", "quote"],
    ),
    (
        ConversationIntent::WorkshopInterest,
        &["workshop", "training", "course", "bootcamp", "upskill", "team session"],
    ),
    (
        ConversationIntent::RoiAnalysis,
        &["roi", "return on investment", "save time", "savings", "business case", "payback"],
    ),
    (
        ConversationIntent::ConsultingRequest,
        &[
            "consult",
            "strategy",
            "strategic",
            "roadmap",
            "book a call",
            "schedul",
            "meeting",
            "talk to",
        ],
    ),
    (
        ConversationIntent::TechnicalQuestion,
        &[
            "api",
            "integration",
            "integrate",
            "model",
            "fine-tun",
            "rag",
            "deploy",
            "architecture",
        ],
    ),
];

/// Endings a single-word keyword may carry and still count, e.g. "costs",
/// "consulting", "deployment".
const INFLECTIONS: &[&str] = &[
    "", "s", "es", "e", "d", "ed", "ing", "er", "ers", "ment", "ments", "ant", "ants", "ancy",
    "ation", "ations",
];

/// Label a single message.
pub fn classify_intent(text: &str) -> ConversationIntent {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();
    let spaced = format!(" {} ", words.join(" "));

    for (intent, keywords) in INTENT_PATTERNS {
        if let Some(hit) = keywords.iter().find(|k| keyword_hit(&spaced, &words, k)) {
            debug!(?intent, keyword = hit, "intent detected");
            return *intent;
        }
    }
    ConversationIntent::General
}

/// Keywords only match at word starts, so "model" never fires on "remodel".
/// Short keywords (three letters or fewer) must be the whole word; longer ones
/// may carry an ending from [`INFLECTIONS`], so "consult" covers "consulting"
/// but "cost" not "costume". Phrases match whole words in `spaced`, the
/// message's words joined by single spaces and padded at both ends.
fn keyword_hit(spaced: &str, words: &[&str], keyword: &str) -> bool {
    if keyword.contains(' ') {
        return spaced.contains(&format!(" {keyword} "));
    }
    if keyword.len() <= 3 {
        return words.contains(&keyword);
    }
    words.iter().any(|word| {
        word.strip_prefix(keyword)
            .is_some_and(|rest| INFLECTIONS.contains(&rest))
    })
}

/// Label a conversation by its latest visitor message.
pub fn latest_intent(messages: &[ConversationMessage]) -> ConversationIntent {
    messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .map(|m| classify_intent(&m.content))
        .unwrap_or(ConversationIntent::General)
}

/// How far along the conversation is.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    Discovery,
    Exploration,
    Decision,
}

impl ConversationStage {
    /// Stage from the number of visitor turns: 0-1 discovery, 2-4
    /// exploration, 5+ decision.
    pub fn from_turns(user_turns: usize) -> Self {
        match user_turns {
            0..=1 => ConversationStage::Discovery,
            2..=4 => ConversationStage::Exploration,
            _ => ConversationStage::Decision,
        }
    }

    pub fn of(messages: &[ConversationMessage]) -> Self {
        Self::from_turns(messages.iter().filter(|m| m.role == MessageRole::User).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_takes_precedence_over_workshops() {
        assert_eq!(
            classify_intent("How much does the AI workshop cost?"),
            ConversationIntent::PricingInquiry
        );
    }

    #[test]
    fn workshop_interest() {
        assert_eq!(
            classify_intent("Do you run training for marketing teams?"),
            ConversationIntent::WorkshopInterest
        );
    }

    #[test]
    fn roi_needs_whole_word() {
        assert_eq!(
            classify_intent("What ROI can we expect?"),
            ConversationIntent::RoiAnalysis
        );
        assert_eq!(
            classify_intent("That was a heroic effort"),
            ConversationIntent::General
        );
    }

    #[test]
    fn consulting_matches_inflections() {
        assert_eq!(
            classify_intent("We need consulting on our AI roadmap"),
            ConversationIntent::ConsultingRequest
        );
    }

    #[test]
    fn technical_short_keywords_are_word_bounded() {
        assert_eq!(
            classify_intent("Can you build a RAG pipeline?"),
            ConversationIntent::TechnicalQuestion
        );
        assert_eq!(
            classify_intent("We sell cold storage units"),
            ConversationIntent::General
        );
    }

    #[test]
    fn keywords_match_whole_words_with_endings() {
        assert_eq!(
            classify_intent("We want to remodel the office"),
            ConversationIntent::General
        );
        assert_eq!(
            classify_intent("Our costume shop needs a website"),
            ConversationIntent::General
        );
        assert_eq!(
            classify_intent("What do the costs look like?"),
            ConversationIntent::PricingInquiry
        );
        assert_eq!(
            classify_intent("Is your consultancy open to startups"),
            ConversationIntent::ConsultingRequest
        );
        assert_eq!(
            classify_intent("Can we start fine-tuning our models?"),
            ConversationIntent::TechnicalQuestion
        );
    }

    #[test]
    fn phrases_respect_word_boundaries() {
        assert_eq!(
            classify_intent("How much, roughly?"),
            ConversationIntent::PricingInquiry
        );
        assert_eq!(
            classify_intent("Can I talk to someone?"),
            ConversationIntent::ConsultingRequest
        );
        assert_eq!(
            classify_intent("I'd like to talk today"),
            ConversationIntent::General
        );
    }

    #[test]
    fn latest_user_message_decides() {
        let messages = vec![
            ConversationMessage::user("What does a workshop look like?"),
            ConversationMessage::assistant("It depends on your pricing tier."),
            ConversationMessage::user("Could we book a call next week?"),
        ];
        assert_eq!(latest_intent(&messages), ConversationIntent::ConsultingRequest);
        assert_eq!(latest_intent(&[]), ConversationIntent::General);
    }

    #[test]
    fn stage_thresholds() {
        assert_eq!(ConversationStage::from_turns(0), ConversationStage::Discovery);
        assert_eq!(ConversationStage::from_turns(1), ConversationStage::Discovery);
        assert_eq!(ConversationStage::from_turns(2), ConversationStage::Exploration);
        assert_eq!(ConversationStage::from_turns(4), ConversationStage::Exploration);
        assert_eq!(ConversationStage::from_turns(5), ConversationStage::Decision);
    }

    #[test]
    fn stage_counts_only_user_turns() {
        let messages = vec![
            ConversationMessage::user("hi"),
            ConversationMessage::assistant("hello"),
            ConversationMessage::assistant("anything else?"),
        ];
        assert_eq!(ConversationStage::of(&messages), ConversationStage::Discovery);
    }
}
