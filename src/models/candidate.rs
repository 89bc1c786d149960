use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Program metadata as stored alongside its vector in the search index
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProgramDetails {
    #[serde(default)]
    pub program_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub skills_required: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

impl ProgramDetails {
    /// Whether the program runs during the given 1-based month
    ///
    /// Walks the actual months of the span instead of comparing month
    /// numbers, so spans crossing a year boundary are handled correctly.
    /// Unparseable dates count as available.
    pub fn runs_in_month(&self, month: u32) -> bool {
        let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        let (start, end) = match (parse(&self.start_date), parse(&self.end_date)) {
            (Some(s), Some(e)) if s <= e => (s, e),
            _ => return true,
        };

        let span_months =
            (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
        if span_months >= 11 {
            return true;
        }

        let (mut y, mut m) = (start.year(), start.month());
        loop {
            if m == month {
                return true;
            }
            if (y, m) == (end.year(), end.month()) {
                return false;
            }
            m += 1;
            if m > 12 {
                m = 1;
                y += 1;
            }
        }
    }
}

/// Urgency attached to an explanation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

/// Generated justification text carried by every final recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Explanation {
    pub reason: String,
    pub skills_gained: String,
    pub career_impact: String,
    #[serde(default)]
    pub urgency: Urgency,
}

/// Which signal produced a candidate, with the metadata that source
/// guarantees
///
/// The rank ordering is the engine's central policy: signals derived from
/// the user's own confirmed behavior outrank stated preferences, which
/// outrank other users' behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RecommendationSource {
    ProgramSimilarity {
        similar_to_id: String,
        similar_to_title: String,
    },
    ProfileBased,
    LlmPowered,
    ProfileMatch,
    Collaborative {
        users_registered: i64,
    },
}

impl RecommendationSource {
    /// Fixed merge tier; lower sorts first
    pub fn priority_rank(&self) -> u8 {
        match self {
            RecommendationSource::ProgramSimilarity { .. } => 1,
            RecommendationSource::LlmPowered | RecommendationSource::ProfileBased => 2,
            RecommendationSource::ProfileMatch => 3,
            RecommendationSource::Collaborative { .. } => 4,
        }
    }

    /// Snake-case tag, matching the wire form
    pub fn tag(&self) -> &'static str {
        match self {
            RecommendationSource::ProgramSimilarity { .. } => "program_similarity",
            RecommendationSource::ProfileBased => "profile_based",
            RecommendationSource::LlmPowered => "llm_powered",
            RecommendationSource::ProfileMatch => "profile_match",
            RecommendationSource::Collaborative { .. } => "collaborative",
        }
    }

    /// Human-readable source label used in enrichment prompts
    pub fn label(&self) -> &'static str {
        match self {
            RecommendationSource::ProgramSimilarity { .. } => "program similarity",
            RecommendationSource::ProfileBased => "profile matching",
            RecommendationSource::LlmPowered => "ai analysis",
            RecommendationSource::ProfileMatch => "profile matching",
            RecommendationSource::Collaborative { .. } => "collaborative filtering",
        }
    }
}

/// A recommendation candidate, constructed fresh per request
///
/// Only `LlmPowered` candidates arrive with an explanation; everything else
/// is enriched after the final selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgramCandidate {
    #[serde(flatten)]
    pub details: ProgramDetails,
    pub score: f64,
    #[serde(flatten)]
    pub source: RecommendationSource,
    pub explanation: Option<Explanation>,
}

impl ProgramCandidate {
    pub fn new(details: ProgramDetails, score: f64, source: RecommendationSource) -> Self {
        Self {
            details,
            score,
            source,
            explanation: None,
        }
    }

    pub fn program_id(&self) -> &str {
        &self.details.program_id
    }
}
