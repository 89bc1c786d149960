/// Collaborative filtering over profile-similar peers
///
/// Programs registered for by similar employees accumulate the registering
/// peer's similarity weight; the requester's own registrations never score.
/// Accumulated weights are divided by an empirical scale constant so the
/// exposed scores are comparable in magnitude to cosine-similarity scores.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    db::{ProfileStore, RegistrationStore},
    models::{ProgramCandidate, ProgramDetails, RecommendationSource, Registration, UserProfile},
    services::{peer_similarity::score_peers, providers::VectorIndex},
};

/// Peer scan cap; bounds the per-peer registration fetches
pub const MAX_PEERS: usize = 20;
const SCORE_SCALE: f64 = 10.0;

/// A program's accumulated collaborative weight before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct CollaborativeScore {
    pub program_id: String,
    pub program_title: String,
    pub weight: u32,
}

/// Folds weighted peer registrations into per-program scores
///
/// Ties are broken by program id so the ranking is stable across runs.
pub fn accumulate(
    own_ids: &HashSet<&str>,
    weighted_registrations: &[(u32, Vec<Registration>)],
) -> Vec<CollaborativeScore> {
    let mut weights: HashMap<String, u32> = HashMap::new();
    let mut titles: HashMap<String, String> = HashMap::new();

    for (weight, registrations) in weighted_registrations {
        for registration in registrations {
            if own_ids.contains(registration.program_id.as_str()) {
                continue;
            }
            *weights.entry(registration.program_id.clone()).or_default() += weight;
            titles
                .entry(registration.program_id.clone())
                .or_insert_with(|| registration.program_title.clone());
        }
    }

    let mut scores: Vec<CollaborativeScore> = weights
        .into_iter()
        .map(|(program_id, weight)| CollaborativeScore {
            program_title: titles.remove(&program_id).unwrap_or_default(),
            program_id,
            weight,
        })
        .collect();

    scores.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.program_id.cmp(&b.program_id))
    });
    scores
}

/// Produces the collaborative candidate stream for one request
pub struct CollaborativeAggregator {
    profiles: Arc<dyn ProfileStore>,
    registrations: Arc<dyn RegistrationStore>,
    index: Arc<dyn VectorIndex>,
}

impl CollaborativeAggregator {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        registrations: Arc<dyn RegistrationStore>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            profiles,
            registrations,
            index,
        }
    }

    /// Computes up to `limit` collaborative candidates
    ///
    /// Every failure mode is soft: an unavailable profile store yields an
    /// empty stream, a failed peer fetch omits that peer, a program missing
    /// from the index degrades to the registration title.
    pub async fn recommend(
        &self,
        user: &UserProfile,
        own_registrations: &[Registration],
        limit: usize,
    ) -> Vec<ProgramCandidate> {
        let others = match self.profiles.list_others(user.id).await {
            Ok(others) => others,
            Err(e) => {
                tracing::warn!(error = %e, "Profile scan failed, skipping collaborative stream");
                return Vec::new();
            }
        };

        let peers = score_peers(user, &others);
        let peers = &peers[..peers.len().min(MAX_PEERS)];

        let mut weighted = Vec::with_capacity(peers.len());
        for peer in peers {
            match self.registrations.list_for(peer.user_id).await {
                Ok(registrations) => weighted.push((peer.score, registrations)),
                Err(e) => {
                    tracing::warn!(
                        peer = %peer.user_id,
                        error = %e,
                        "Peer registration fetch failed, omitting peer"
                    );
                }
            }
        }

        let own_ids: HashSet<&str> = own_registrations
            .iter()
            .map(|r| r.program_id.as_str())
            .collect();
        let scores = accumulate(&own_ids, &weighted);

        let mut candidates = Vec::new();
        for score in scores.into_iter().take(limit) {
            let details = match self.index.fetch(&score.program_id).await {
                Ok(Some(stored)) => stored.details,
                Ok(None) => Self::fallback_details(&score),
                Err(e) => {
                    tracing::warn!(
                        program_id = %score.program_id,
                        error = %e,
                        "Program detail fetch failed, using registration title"
                    );
                    Self::fallback_details(&score)
                }
            };

            let users_registered = self
                .registrations
                .count_for(&score.program_id)
                .await
                .unwrap_or(0);

            candidates.push(ProgramCandidate::new(
                details,
                f64::from(score.weight) / SCORE_SCALE,
                RecommendationSource::Collaborative { users_registered },
            ));
        }

        tracing::info!(peers = peers.len(), candidates = candidates.len(), "Collaborative stream computed");

        candidates
    }

    fn fallback_details(score: &CollaborativeScore) -> ProgramDetails {
        ProgramDetails {
            program_id: score.program_id.clone(),
            title: score.program_title.clone(),
            ..Default::default()
        }
    }
}
