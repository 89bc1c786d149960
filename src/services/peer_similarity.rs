/// Peer similarity scoring for collaborative filtering
///
/// Similarity between two employees is a small integer: +3 for a shared
/// role, +2 for a shared skill level, plus one point per word their
/// interests have in common. Deliberately coarse; the weights only have to
/// rank peers, not measure them.
use std::collections::HashSet;

use uuid::Uuid;

use crate::models::UserProfile;

const ROLE_WEIGHT: u32 = 3;
const SKILL_LEVEL_WEIGHT: u32 = 2;

/// Another user and how similar their profile is to the requester's
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSimilarity {
    pub user_id: Uuid,
    pub score: u32,
}

fn interest_words(interests: &str) -> HashSet<String> {
    interests
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect()
}

/// Scores a single peer against the requesting profile
fn score_peer(current: &UserProfile, peer: &UserProfile) -> u32 {
    let mut score = 0;

    // Empty fields carry no signal; two unfinished profiles are not peers
    if !current.role.is_empty() && current.role.eq_ignore_ascii_case(&peer.role) {
        score += ROLE_WEIGHT;
    }

    if !current.skill_level.is_empty()
        && current.skill_level.eq_ignore_ascii_case(&peer.skill_level)
    {
        score += SKILL_LEVEL_WEIGHT;
    }

    let common_words = interest_words(&current.interests)
        .intersection(&interest_words(&peer.interests))
        .count();
    score += common_words as u32;

    score
}

/// Scores every other profile against the requester's, excluding zero
/// scores, sorted descending
///
/// Ties are broken by user id so the peer ordering is stable across runs.
pub fn score_peers(current: &UserProfile, others: &[UserProfile]) -> Vec<PeerSimilarity> {
    let mut peers: Vec<PeerSimilarity> = others
        .iter()
        .filter(|peer| peer.id != current.id)
        .map(|peer| PeerSimilarity {
            user_id: peer.id,
            score: score_peer(current, peer),
        })
        .filter(|peer| peer.score > 0)
        .collect();

    peers.sort_by(|a, b| b.score.cmp(&a.score).then(a.user_id.cmp(&b.user_id)));
    peers
}
