/// Advisor-picked recommendations
///
/// The generative advisor chooses from a wide vector-search sweep rather
/// than generating program ids freely; picks that don't correspond to a
/// search result are discarded. These candidates arrive with their
/// explanation built in, so the enricher leaves them untouched.
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{ProgramCandidate, RecommendationSource, Registration, UserProfile},
    services::{
        content::ContentRecommender,
        providers::{Advisor, SearchMatch},
    },
};

const LLM_SEARCH_TOP_K: usize = 15;
const LLM_CAP: usize = 3;

pub struct LlmRecommender {
    content: ContentRecommender,
    advisor: Arc<dyn Advisor>,
}

impl LlmRecommender {
    pub fn new(content: ContentRecommender, advisor: Arc<dyn Advisor>) -> Self {
        Self { content, advisor }
    }

    /// Computes the `llm_powered` candidate stream
    pub async fn recommend(
        &self,
        profile: &UserProfile,
        registrations: &[Registration],
        registered_ids: &HashSet<String>,
    ) -> AppResult<Vec<ProgramCandidate>> {
        let matches = self.content.search_matches(profile, LLM_SEARCH_TOP_K).await?;
        if matches.is_empty() {
            tracing::debug!("No search results to offer the advisor");
            return Ok(Vec::new());
        }

        let picks = self
            .advisor
            .select_programs(profile, registrations, &matches)
            .await?;

        Ok(Self::join_picks(picks, &matches, registered_ids))
    }

    /// Joins advisor picks back to the search results they were drawn from
    fn join_picks(
        picks: Vec<crate::services::providers::LlmPick>,
        matches: &[SearchMatch],
        registered_ids: &HashSet<String>,
    ) -> Vec<ProgramCandidate> {
        let by_id: std::collections::HashMap<&str, &SearchMatch> =
            matches.iter().map(|m| (m.program_id.as_str(), m)).collect();

        let mut candidates = Vec::new();
        for pick in picks {
            let Some(source_match) = by_id.get(pick.program_id.as_str()) else {
                tracing::warn!(
                    program_id = %pick.program_id,
                    "Advisor picked a program outside the search results, discarding"
                );
                continue;
            };
            if registered_ids.contains(&pick.program_id) {
                continue;
            }

            let mut candidate = ProgramCandidate::new(
                source_match.details.clone(),
                pick.score,
                RecommendationSource::LlmPowered,
            );
            candidate.explanation = Some(pick.explanation);
            candidates.push(candidate);

            if candidates.len() == LLM_CAP {
                break;
            }
        }

        candidates
    }
}
