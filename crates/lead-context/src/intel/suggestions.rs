//! Ranked next-step suggestions for a visitor.
//!
//! The [`SuggestionEngine`] trait is the seam: callers hand over what is known
//! about the visitor (intent, role, stage) and get back a short ranked list.
//! [`StaticSuggestionEngine`] is the bundled lookup-table implementation.

use serde::{Deserialize, Serialize};

use crate::intel::intent::{ConversationIntent, ConversationStage};
use crate::intel::role::{RoleFamily, RoleResult};

/// Score for matching the visitor's intent.
const INTENT_WEIGHT: f64 = 1.0;
/// Score for matching the role family, scaled by role confidence.
const ROLE_WEIGHT: f64 = 0.5;
/// Score for matching the conversation stage.
const STAGE_WEIGHT: f64 = 0.25;

/// Everything an engine may use to rank suggestions.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuggestionContext {
    pub intent: ConversationIntent,
    pub role: RoleResult,
    pub stage: ConversationStage,
}

/// One actionable next step.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolSuggestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub score: f64,
}

/// Produces ranked suggestions for a visitor.
pub trait SuggestionEngine: Send + Sync {
    fn suggest(&self, ctx: &SuggestionContext) -> Vec<ToolSuggestion>;
}

/// A catalogue entry and the circumstances it suits.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuggestionTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub intents: Vec<ConversationIntent>,
    pub families: Vec<RoleFamily>,
    pub stages: Vec<ConversationStage>,
}

impl SuggestionTemplate {
    fn score(&self, ctx: &SuggestionContext) -> f64 {
        let mut score = 0.0;
        if self.intents.contains(&ctx.intent) {
            score += INTENT_WEIGHT;
        }
        if self.families.contains(&RoleFamily::of(&ctx.role.role)) {
            score += ROLE_WEIGHT * ctx.role.confidence;
        }
        if self.stages.contains(&ctx.stage) {
            score += STAGE_WEIGHT;
        }
        score
    }
}

fn template(
    id: &str,
    title: &str,
    description: &str,
    intents: &[ConversationIntent],
    families: &[RoleFamily],
    stages: &[ConversationStage],
) -> SuggestionTemplate {
    SuggestionTemplate {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        intents: intents.to_vec(),
        families: families.to_vec(),
        stages: stages.to_vec(),
    }
}

/// The built-in catalogue.
pub fn default_catalogue() -> Vec<SuggestionTemplate> {
    use ConversationIntent::*;
    use ConversationStage::*;
    use RoleFamily::*;

    vec![
        template(
            "roi-calculator",
            "ROI Calculator",
            "Estimate time and cost savings from automating a workflow.",
            &[RoiAnalysis, PricingInquiry],
            &[Executive, Business],
            &[Exploration, Decision],
        ),
        template(
            "pricing-overview",
            "Pricing Overview",
            "Compare engagement packages and workshop pricing.",
            &[PricingInquiry],
            &[Executive, Business],
            &[Exploration, Decision],
        ),
        template(
            "workshop-catalog",
            "Workshop Catalog",
            "Browse hands-on AI workshops for teams.",
            &[WorkshopInterest, General],
            &[Business, Technical],
            &[Discovery, Exploration],
        ),
        template(
            "book-consultation",
            "Book a Consultation",
            "Schedule a strategy call with a consultant.",
            &[ConsultingRequest, PricingInquiry, RoiAnalysis],
            &[Executive],
            &[Decision],
        ),
        template(
            "technical-deep-dive",
            "Technical Deep Dive",
            "Walk through integration patterns and reference architectures.",
            &[TechnicalQuestion],
            &[Technical],
            &[Exploration, Decision],
        ),
        template(
            "readiness-assessment",
            "AI Readiness Assessment",
            "A short questionnaire that scores your organization's AI readiness.",
            &[ConsultingRequest, General],
            &[Executive, Business, Technical],
            &[Discovery],
        ),
        template(
            "case-studies",
            "Case Studies",
            "See results from similar companies.",
            &[General, RoiAnalysis],
            &[Business, Executive, Unknown],
            &[Discovery, Exploration],
        ),
    ]
}

/// Lookup-table [`SuggestionEngine`].
///
/// Each template scores intent match (1.0), role family match (0.5 × role
/// confidence) and stage match (0.25). Templates at or above `min_score` are
/// returned best first, ties broken by id.
#[derive(Debug, Clone)]
pub struct StaticSuggestionEngine {
    catalogue: Vec<SuggestionTemplate>,
    max_suggestions: usize,
    min_score: f64,
}

impl Default for StaticSuggestionEngine {
    fn default() -> Self {
        Self {
            catalogue: default_catalogue(),
            max_suggestions: 3,
            min_score: 0.5,
        }
    }
}

impl StaticSuggestionEngine {
    pub fn new(catalogue: Vec<SuggestionTemplate>) -> Self {
        Self {
            catalogue,
            ..Self::default()
        }
    }

    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    pub fn with_min_score(mut self, min: f64) -> Self {
        self.min_score = min;
        self
    }

    /// Add a template to the catalogue.
    pub fn with_template(mut self, template: SuggestionTemplate) -> Self {
        self.catalogue.push(template);
        self
    }
}

impl SuggestionEngine for StaticSuggestionEngine {
    fn suggest(&self, ctx: &SuggestionContext) -> Vec<ToolSuggestion> {
        let mut ranked: Vec<ToolSuggestion> = self
            .catalogue
            .iter()
            .map(|t| (t, t.score(ctx)))
            .filter(|(_, score)| *score >= self.min_score)
            .map(|(t, score)| ToolSuggestion {
                id: t.id.clone(),
                title: t.title.clone(),
                description: t.description.clone(),
                score,
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        ranked.truncate(self.max_suggestions);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(intent: ConversationIntent, role: RoleResult, stage: ConversationStage) -> SuggestionContext {
        SuggestionContext {
            intent,
            role,
            stage,
        }
    }

    fn ids(suggestions: &[ToolSuggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn technical_question_from_cto() {
        let engine = StaticSuggestionEngine::default();
        let out = engine.suggest(&ctx(
            ConversationIntent::TechnicalQuestion,
            RoleResult::new("CTO", 0.9),
            ConversationStage::Exploration,
        ));
        assert_eq!(out[0].id, "technical-deep-dive");
        assert!((out[0].score - 1.7).abs() < 1e-9);
    }

    #[test]
    fn pricing_from_founder_at_decision() {
        let engine = StaticSuggestionEngine::default();
        let out = engine.suggest(&ctx(
            ConversationIntent::PricingInquiry,
            RoleResult::new("Founder", 0.9),
            ConversationStage::Decision,
        ));
        // All three score 1.0 + 0.45 + 0.25; ties break by id.
        assert_eq!(
            ids(&out),
            vec!["book-consultation", "pricing-overview", "roi-calculator"]
        );
    }

    #[test]
    fn results_are_sorted_and_bounded() {
        let engine = StaticSuggestionEngine::default().with_max_suggestions(2);
        let out = engine.suggest(&ctx(
            ConversationIntent::General,
            RoleResult::fallback(),
            ConversationStage::Discovery,
        ));
        assert_eq!(out.len(), 2);
        assert!(out[0].score >= out[1].score);
    }

    #[test]
    fn nothing_clears_a_high_threshold() {
        let engine = StaticSuggestionEngine::default().with_min_score(10.0);
        let out = engine.suggest(&ctx(
            ConversationIntent::General,
            RoleResult::unknown(),
            ConversationStage::Discovery,
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn custom_template_is_ranked() {
        let engine = StaticSuggestionEngine::new(Vec::new()).with_template(template(
            "compliance-checklist",
            "Compliance Checklist",
            "AI governance checklist.",
            &[ConversationIntent::ConsultingRequest],
            &[RoleFamily::Executive],
            &[ConversationStage::Decision],
        ));
        let out = engine.suggest(&ctx(
            ConversationIntent::ConsultingRequest,
            RoleResult::new("CEO", 0.6),
            ConversationStage::Exploration,
        ));
        assert_eq!(ids(&out), vec!["compliance-checklist"]);
        assert!((out[0].score - 1.3).abs() < 1e-9);
    }
}
