//! Professional role inference from research signals.
//!
//! The research collaborator hands over whatever it found about a visitor: a
//! stated job title, a seniority label, a blurb about their company. The
//! [`RoleDetector`] runs an ordered list of [`RoleRule`]s over that snapshot
//! and returns the first rule's answer:
//!
//! | Rule | Source | Confidence |
//! |------|--------|------------|
//! | `direct_title` | stated title, trusted even if unrecognized | 0.9 |
//! | `keyword_match` | title keywords in seniority + company summary | 0.6 |
//! | fallback | nothing matched | 0.2 |
//!
//! An absent or entirely empty signal is not a visitor we know anything
//! about and yields `Unknown` with zero confidence.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DIRECT_CONFIDENCE: f64 = 0.9;
pub const KEYWORD_CONFIDENCE: f64 = 0.6;
pub const FALLBACK_CONFIDENCE: f64 = 0.2;

pub const FALLBACK_ROLE: &str = "Business Professional";
pub const UNKNOWN_ROLE: &str = "Unknown";

/// Canonical role labels and the (case-insensitive) phrases that map to them.
/// Order matters: the first entry whose phrase occurs wins.
const CANONICAL_TITLES: &[(&str, &str)] = &[
    ("CTO", r"chief technology officer|cto"),
    ("CEO", r"chief executive officer|ceo"),
    ("Founder", r"co-?founder|founder"),
    (
        "VP Engineering",
        r"vp,? (?:of )?engineering|vice president,? (?:of )?engineering",
    ),
    ("Head of Engineering", r"head of engineering"),
    ("Head of AI", r"head of ai"),
    ("Head of ML", r"head of (?:ml|machine learning)"),
    ("Product Manager", r"product manager"),
    ("Data Scientist", r"data scientist"),
    ("ML Engineer", r"ml engineer|machine learning engineer"),
    ("Software Engineer", r"software (?:engineer|developer)|developer"),
    ("Architect", r"architect"),
    ("Marketing", r"marketing"),
    ("Sales", r"sales"),
    ("Operations", r"operations"),
];

struct TitleVocabulary {
    /// Any canonical phrase, for locating the first title in free text.
    any: Regex,
    canonical: Vec<(&'static str, Regex)>,
}

static TITLES: LazyLock<TitleVocabulary> = LazyLock::new(|| {
    let word = |pattern: &str| format!(r"(?i)\b(?:{pattern})\b");
    let alternation = CANONICAL_TITLES
        .iter()
        .map(|(_, pattern)| *pattern)
        .collect::<Vec<_>>()
        .join("|");
    TitleVocabulary {
        any: Regex::new(&word(&alternation)).expect("valid title alternation"),
        canonical: CANONICAL_TITLES
            .iter()
            .map(|(label, pattern)| (*label, Regex::new(&word(*pattern)).expect("valid title pattern")))
            .collect(),
    }
});

/// Map free text to a canonical role label, if any canonical phrase occurs
/// in it on word boundaries.
pub fn canonical_role(text: &str) -> Option<&'static str> {
    TITLES
        .canonical
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(label, _)| *label)
}

/// Normalize a stated title: canonical label when recognized, otherwise the
/// trimmed input unchanged.
pub fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    canonical_role(trimmed)
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

/// Read-only research snapshot about a visitor.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_role_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_seniority: Option<String>,
}

impl RoleSignal {
    /// Whether every field is absent or blank.
    pub fn is_empty(&self) -> bool {
        [
            &self.company_summary,
            &self.company_industry,
            &self.person_role_text,
            &self.person_seniority,
        ]
        .iter()
        .all(|field| non_blank(field).is_none())
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A detected role and how much to trust it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RoleResult {
    pub role: String,
    pub confidence: f64,
}

impl RoleResult {
    pub fn new(role: impl Into<String>, confidence: f64) -> Self {
        Self {
            role: role.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ROLE, 0.0)
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_ROLE, FALLBACK_CONFIDENCE)
    }
}

/// Extracts a role label from a signal, or declines with `None`.
pub type RoleExtractor = Box<dyn Fn(&RoleSignal) -> Option<String> + Send + Sync>;

/// One step of the detection cascade.
pub struct RoleRule {
    pub name: String,
    pub confidence: f64,
    extract: RoleExtractor,
}

impl std::fmt::Debug for RoleRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRule")
            .field("name", &self.name)
            .field("confidence", &self.confidence)
            .finish_non_exhaustive()
    }
}

impl RoleRule {
    pub fn new(
        name: impl Into<String>,
        confidence: f64,
        extract: impl Fn(&RoleSignal) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            extract: Box::new(extract),
        }
    }

    /// Stated title, normalized when recognized and passed through otherwise.
    pub fn direct_title() -> Self {
        Self::new("direct_title", DIRECT_CONFIDENCE, |signal| {
            non_blank(&signal.person_role_text).map(normalize_title)
        })
    }

    /// First title keyword in seniority + company summary. Only canonical
    /// labels are returned.
    pub fn keyword_match() -> Self {
        Self::new("keyword_match", KEYWORD_CONFIDENCE, |signal| {
            let text = [&signal.person_seniority, &signal.company_summary]
                .into_iter()
                .filter_map(non_blank)
                .collect::<Vec<_>>()
                .join(" ");
            let found = TITLES.any.find(&text)?;
            canonical_role(found.as_str()).map(str::to_string)
        })
    }

    fn apply(&self, signal: &RoleSignal) -> Option<RoleResult> {
        (self.extract)(signal).map(|role| RoleResult::new(role, self.confidence))
    }
}

/// Ordered rule cascade with a fixed fallback.
#[derive(Debug)]
pub struct RoleDetector {
    rules: Vec<RoleRule>,
    fallback: RoleResult,
}

impl Default for RoleDetector {
    fn default() -> Self {
        Self {
            rules: vec![RoleRule::direct_title(), RoleRule::keyword_match()],
            fallback: RoleResult::fallback(),
        }
    }
}

impl RoleDetector {
    /// A detector with no rules; everything falls through to the fallback.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            fallback: RoleResult::fallback(),
        }
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, rule: RoleRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_fallback(mut self, fallback: RoleResult) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn rules(&self) -> &[RoleRule] {
        &self.rules
    }

    /// Run the cascade. The first rule that yields a role wins.
    pub fn detect(&self, signal: Option<&RoleSignal>) -> RoleResult {
        let Some(signal) = signal.filter(|s| !s.is_empty()) else {
            return RoleResult::unknown();
        };

        for rule in &self.rules {
            if let Some(result) = rule.apply(signal) {
                debug!(rule = %rule.name, role = %result.role, "role detected");
                return result;
            }
        }
        self.fallback.clone()
    }
}

/// Detect a role with the default cascade.
pub fn detect_role(signal: Option<&RoleSignal>) -> RoleResult {
    RoleDetector::default().detect(signal)
}

/// Coarse grouping of role labels, used to tailor suggestions.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleFamily {
    Technical,
    Executive,
    Business,
    Unknown,
}

impl RoleFamily {
    pub fn of(role: &str) -> Self {
        match canonical_role(role) {
            Some("CTO" | "VP Engineering" | "Head of Engineering" | "Head of AI" | "Head of ML")
            | Some("Data Scientist" | "ML Engineer" | "Software Engineer" | "Architect") => {
                RoleFamily::Technical
            }
            Some("CEO" | "Founder") => RoleFamily::Executive,
            Some(_) => RoleFamily::Business,
            None if role == UNKNOWN_ROLE => RoleFamily::Unknown,
            None => RoleFamily::Business,
        }
    }
}
