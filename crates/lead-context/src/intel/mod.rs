//! Lead intelligence: who the visitor is and what to offer them next.
//!
//! - [`role`] infers a professional role from enrichment data.
//! - [`intent`] labels the conversation and its stage.
//! - [`suggestions`] ranks next steps from the two.
//!
//! [`assess_lead`] runs all three in one pass.

pub mod intent;
pub mod role;
pub mod suggestions;

pub use intent::{ConversationIntent, ConversationStage, classify_intent, latest_intent};
pub use role::{
    RoleDetector, RoleFamily, RoleResult, RoleRule, RoleSignal, canonical_role, detect_role,
    normalize_title,
};
pub use suggestions::{
    StaticSuggestionEngine, SuggestionContext, SuggestionEngine, SuggestionTemplate,
    ToolSuggestion, default_catalogue,
};

use serde::Serialize;
use tracing::debug;

use crate::ConversationMessage;

/// Everything known about a visitor after one assessment.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LeadAssessment {
    pub role: RoleResult,
    pub intent: ConversationIntent,
    pub stage: ConversationStage,
    pub suggestions: Vec<ToolSuggestion>,
}

/// Assess a visitor with the default role cascade.
pub fn assess_lead(
    signal: Option<&RoleSignal>,
    messages: &[ConversationMessage],
    engine: &dyn SuggestionEngine,
) -> LeadAssessment {
    assess_lead_with(&RoleDetector::default(), signal, messages, engine)
}

/// Assess a visitor with a caller-supplied role detector.
pub fn assess_lead_with(
    detector: &RoleDetector,
    signal: Option<&RoleSignal>,
    messages: &[ConversationMessage],
    engine: &dyn SuggestionEngine,
) -> LeadAssessment {
    let ctx = SuggestionContext {
        intent: latest_intent(messages),
        role: detector.detect(signal),
        stage: ConversationStage::of(messages),
    };
    let suggestions = engine.suggest(&ctx);

    debug!(
        role = %ctx.role.role,
        confidence = ctx.role.confidence,
        intent = ?ctx.intent,
        stage = ?ctx.stage,
        suggestions = suggestions.len(),
        "lead assessed"
    );

    LeadAssessment {
        role: ctx.role,
        intent: ctx.intent,
        stage: ctx.stage,
        suggestions,
    }
}
