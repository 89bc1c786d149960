/// Item-to-item recommendations from registered programs
///
/// Each registered program's own stored vector seeds a nearest-neighbour
/// query; matches are labelled with the program they resemble. The score
/// threshold is stricter than the free-text streams since item-to-item
/// similarity is the more reliable signal.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    models::{ProgramCandidate, RecommendationSource, Registration},
    services::providers::VectorIndex,
};

/// Inclusion threshold for item-to-item matches
pub const SIMILARITY_THRESHOLD: f64 = 0.7;
const SIMILAR_TOP_K: usize = 8;
const SIMILARITY_CAP: usize = 3;

pub struct RegistrationSimilarityRecommender {
    index: Arc<dyn VectorIndex>,
}

impl RegistrationSimilarityRecommender {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Computes the `program_similarity` candidate stream
    ///
    /// A seed program missing from the index, or a failed query, drops that
    /// seed only. Across seeds the highest-scoring match per program wins.
    pub async fn recommend(
        &self,
        registrations: &[Registration],
        registered_ids: &HashSet<String>,
        excluded_ids: &HashSet<String>,
    ) -> Vec<ProgramCandidate> {
        let mut best: HashMap<String, ProgramCandidate> = HashMap::new();

        for registration in registrations {
            let stored = match self.index.fetch(&registration.program_id).await {
                Ok(Some(stored)) => stored,
                Ok(None) => {
                    tracing::debug!(
                        program_id = %registration.program_id,
                        "Registered program has no stored vector, skipping seed"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        program_id = %registration.program_id,
                        error = %e,
                        "Vector fetch failed, skipping seed"
                    );
                    continue;
                }
            };

            let matches = match self
                .index
                .query(&stored.vector, SIMILAR_TOP_K, &Default::default())
                .await
            {
                Ok(matches) => matches,
                Err(e) => {
                    tracing::warn!(
                        program_id = %registration.program_id,
                        error = %e,
                        "Similarity query failed, skipping seed"
                    );
                    continue;
                }
            };

            for m in matches {
                if m.program_id == registration.program_id
                    || registered_ids.contains(&m.program_id)
                    || excluded_ids.contains(&m.program_id)
                    || m.score <= SIMILARITY_THRESHOLD
                {
                    continue;
                }

                let candidate = ProgramCandidate::new(
                    m.details,
                    m.score,
                    RecommendationSource::ProgramSimilarity {
                        similar_to_id: registration.program_id.clone(),
                        similar_to_title: registration.program_title.clone(),
                    },
                );

                match best.get(&m.program_id) {
                    Some(existing) if existing.score >= candidate.score => {}
                    _ => {
                        best.insert(m.program_id, candidate);
                    }
                }
            }
        }

        let mut candidates: Vec<ProgramCandidate> = best.into_values().collect();
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.details.program_id.cmp(&b.details.program_id))
        });
        candidates.truncate(SIMILARITY_CAP);

        tracing::info!(candidates = candidates.len(), "Program-similarity stream computed");

        candidates
    }
}
