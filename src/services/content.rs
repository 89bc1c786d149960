/// Content-based recommendations from profile text
///
/// The profile's free-text fields are folded into one composite query,
/// embedded, and matched against program descriptions in the vector index.
/// The same pipeline backs three operations with different knobs: the
/// always-active profile stream, the profile-match fallback for users with
/// no registrations, and the explicit-parameter search operation.
use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{parse_month, ProgramCandidate, RecommendationSource, UserProfile},
    services::providers::{EmbedInput, SearchFilter, SearchMatch, TextEmbedder, VectorIndex},
};

/// Inclusion threshold for free-text query matches
pub const PROFILE_SCORE_THRESHOLD: f64 = 0.6;
/// Cap on the profile stream, leaving output slots for the other sources
pub const PROFILE_CAP: usize = 3;
const PROFILE_TOP_K: usize = 8;

const FALLBACK_THRESHOLD: f64 = 0.65;
const FALLBACK_CAP: usize = 2;
const FALLBACK_TOP_K: usize = 25;

const QUERY_TOP_K: usize = 10;
const QUERY_CAP: usize = 5;

/// Explicit profile-like parameters for the search operation
///
/// Fields default to empty so an absent field surfaces as a validation
/// failure rather than a deserialization one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub interest: String,
    pub role: String,
    pub skill_level: String,
    pub skills: String,
    pub target_month: String,
    pub max_budget: Option<f64>,
}

impl QueryParams {
    /// Rejects missing fields and unparseable month names before any
    /// external call is made
    pub fn validate(&self) -> AppResult<()> {
        let required = [
            ("interest", &self.interest),
            ("role", &self.role),
            ("skill_level", &self.skill_level),
            ("skills", &self.skills),
            ("target_month", &self.target_month),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::InvalidInput(format!("Missing required field: {name}")));
            }
        }

        parse_month(&self.target_month)
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid month: {}", self.target_month)))?;

        Ok(())
    }

    fn query_text(&self) -> String {
        format!(
            "{}. Role: {}. Skills to learn: {}. Level: {}. Available in: {}.",
            self.interest, self.role, self.skills, self.skill_level, self.target_month,
        )
    }
}

#[derive(Clone)]
pub struct ContentRecommender {
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<dyn VectorIndex>,
}

impl ContentRecommender {
    pub fn new(embedder: Arc<dyn TextEmbedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Raw vector-search matches for a stored profile, budget filter applied
    pub async fn search_matches(
        &self,
        profile: &UserProfile,
        top_k: usize,
    ) -> AppResult<Vec<SearchMatch>> {
        let vector = self
            .embedder
            .embed(&profile.search_text(), EmbedInput::SearchQuery)
            .await?;
        let filter = SearchFilter::budget(profile.budget_cap());

        self.index.query(&vector, top_k, &filter).await
    }

    /// The `profile_based` candidate stream
    pub async fn profile_based(
        &self,
        profile: &UserProfile,
        registered_ids: &HashSet<String>,
    ) -> AppResult<Vec<ProgramCandidate>> {
        if !profile.has_preferences() {
            tracing::debug!(user_id = %profile.id, "Profile carries no searchable preferences");
            return Ok(Vec::new());
        }

        let matches = self.search_matches(profile, PROFILE_TOP_K).await?;

        let candidates: Vec<ProgramCandidate> = matches
            .into_iter()
            .filter(|m| !registered_ids.contains(&m.program_id))
            .filter(|m| m.score > PROFILE_SCORE_THRESHOLD)
            .take(PROFILE_CAP)
            .map(|m| {
                ProgramCandidate::new(m.details, m.score, RecommendationSource::ProfileBased)
            })
            .collect();

        tracing::info!(candidates = candidates.len(), "Profile-based stream computed");

        Ok(candidates)
    }

    /// The `profile_match` fallback stream for users with no registrations
    pub async fn profile_match_fallback(
        &self,
        profile: &UserProfile,
        registered_ids: &HashSet<String>,
        excluded_ids: &HashSet<String>,
    ) -> AppResult<Vec<ProgramCandidate>> {
        if !profile.has_preferences() {
            return Ok(Vec::new());
        }

        let matches = self.search_matches(profile, FALLBACK_TOP_K).await?;

        let candidates: Vec<ProgramCandidate> = matches
            .into_iter()
            .filter(|m| {
                !registered_ids.contains(&m.program_id) && !excluded_ids.contains(&m.program_id)
            })
            .filter(|m| m.score > FALLBACK_THRESHOLD)
            .take(FALLBACK_CAP)
            .map(|m| ProgramCandidate::new(m.details, m.score, RecommendationSource::ProfileMatch))
            .collect();

        Ok(candidates)
    }

    /// The explicit-parameter search operation
    pub async fn search(
        &self,
        params: &QueryParams,
        registered_ids: &HashSet<String>,
    ) -> AppResult<Vec<ProgramCandidate>> {
        params.validate()?;

        let vector = self
            .embedder
            .embed(&params.query_text(), EmbedInput::SearchQuery)
            .await?;
        let filter = SearchFilter::budget(params.max_budget);
        let matches = self.index.query(&vector, QUERY_TOP_K, &filter).await?;

        let mut candidates: Vec<ProgramCandidate> = matches
            .into_iter()
            .filter(|m| !registered_ids.contains(&m.program_id))
            .filter(|m| m.score > PROFILE_SCORE_THRESHOLD)
            .map(|m| ProgramCandidate::new(m.details, m.score, RecommendationSource::ProfileBased))
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(QUERY_CAP);

        Ok(candidates)
    }
}
