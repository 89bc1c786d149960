/// The hybrid merge: one deterministic policy over four candidate streams
///
/// Candidates are ranked by source tier first and score second. The tier
/// order trusts behavioral evidence (programs similar to what the user
/// already chose) over declared evidence (profile text) over borrowed
/// evidence (what similar users chose). Deduplication keeps the first
/// survivor in that order, a redundant registration check backstops the
/// upstream filters, and the result is truncated to the output budget.
use std::collections::HashSet;

use crate::models::ProgramCandidate;

/// Output budget for one recommendation response
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Merges candidate streams into the final ordered selection
///
/// Deterministic: the sort is stable, float comparison is total, and equal
/// (rank, score) pairs keep their concatenation order.
pub fn merge(
    streams: Vec<Vec<ProgramCandidate>>,
    registered_ids: &HashSet<String>,
) -> Vec<ProgramCandidate> {
    let mut merged: Vec<ProgramCandidate> = streams.into_iter().flatten().collect();

    merged.sort_by(|a, b| {
        a.source
            .priority_rank()
            .cmp(&b.source.priority_rank())
            .then_with(|| b.score.total_cmp(&a.score))
    });

    let mut seen: HashSet<String> = HashSet::new();
    let mut selected: Vec<ProgramCandidate> = Vec::with_capacity(MAX_RECOMMENDATIONS);

    for candidate in merged {
        if registered_ids.contains(candidate.program_id()) {
            continue;
        }
        if !seen.insert(candidate.program_id().to_string()) {
            continue;
        }
        selected.push(candidate);
        if selected.len() == MAX_RECOMMENDATIONS {
            break;
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProgramDetails, RecommendationSource};

    fn candidate(program_id: &str, score: f64, source: RecommendationSource) -> ProgramCandidate {
        ProgramCandidate::new(
            ProgramDetails {
                program_id: program_id.to_string(),
                title: format!("Program {program_id}"),
                ..Default::default()
            },
            score,
            source,
        )
    }

    fn similarity(program_id: &str, score: f64) -> ProgramCandidate {
        candidate(
            program_id,
            score,
            RecommendationSource::ProgramSimilarity {
                similar_to_id: "seed".to_string(),
                similar_to_title: "Seed Program".to_string(),
            },
        )
    }

    fn profile_based(program_id: &str, score: f64) -> ProgramCandidate {
        candidate(program_id, score, RecommendationSource::ProfileBased)
    }

    fn collaborative(program_id: &str, score: f64) -> ProgramCandidate {
        candidate(
            program_id,
            score,
            RecommendationSource::Collaborative { users_registered: 1 },
        )
    }

    #[test]
    fn test_orders_content_before_collaborative_by_tier() {
        // A user with no registrations: 3 content items above threshold and
        // 2 collaborative items fill the budget exactly
        let content = vec![
            profile_based("c1", 0.8),
            profile_based("c2", 0.9),
            profile_based("c3", 0.7),
        ];
        let collab = vec![collaborative("k1", 0.5), collaborative("k2", 0.6)];

        let merged = merge(vec![content, collab], &HashSet::new());

        let ids: Vec<&str> = merged.iter().map(|c| c.program_id()).collect();
        assert_eq!(ids, vec!["c2", "c1", "c3", "k2", "k1"]);
    }

    #[test]
    fn test_duplicate_resolves_to_higher_priority_source() {
        // The same program surfaced by both the similarity stream (0.85)
        // and the content stream (0.65) survives once, as the former
        let merged = merge(
            vec![
                vec![similarity("p2", 0.85)],
                vec![profile_based("p2", 0.65), profile_based("p3", 0.8)],
            ],
            &HashSet::new(),
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].program_id(), "p2");
        assert_eq!(merged[0].score, 0.85);
        assert!(matches!(
            merged[0].source,
            RecommendationSource::ProgramSimilarity { .. }
        ));
        assert_eq!(merged[1].program_id(), "p3");
    }

    #[test]
    fn test_single_surviving_stream_passes_through() {
        // All search-backed streams failed soft; collaborative alone
        let collab = vec![
            collaborative("k1", 0.9),
            collaborative("k2", 0.7),
            collaborative("k3", 0.5),
            collaborative("k4", 0.3),
        ];

        let merged = merge(vec![vec![], vec![], collab], &HashSet::new());
        assert_eq!(merged.len(), 4);
        let ids: Vec<&str> = merged.iter().map(|c| c.program_id()).collect();
        assert_eq!(ids, vec!["k1", "k2", "k3", "k4"]);
    }

    #[test]
    fn test_truncates_to_output_budget() {
        let stream: Vec<ProgramCandidate> = (0..8)
            .map(|i| profile_based(&format!("p{i}"), 0.9 - i as f64 * 0.01))
            .collect();

        let merged = merge(vec![stream], &HashSet::new());
        assert_eq!(merged.len(), MAX_RECOMMENDATIONS);
    }

    #[test]
    fn test_registered_programs_never_leak_through() {
        let registered: HashSet<String> = ["p1".to_string()].into_iter().collect();
        let merged = merge(
            vec![vec![profile_based("p1", 0.95), profile_based("p2", 0.6)]],
            &registered,
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].program_id(), "p2");
    }

    #[test]
    fn test_full_tier_ordering() {
        let merged = merge(
            vec![
                vec![collaborative("k1", 0.99)],
                vec![candidate("m1", 0.99, RecommendationSource::ProfileMatch)],
                vec![candidate("l1", 0.5, RecommendationSource::LlmPowered)],
                vec![similarity("s1", 0.1)],
            ],
            &HashSet::new(),
        );

        let ids: Vec<&str> = merged.iter().map(|c| c.program_id()).collect();
        assert_eq!(ids, vec!["s1", "l1", "m1", "k1"]);
    }

    #[test]
    fn test_merge_is_deterministic_for_identical_inputs() {
        let streams = || {
            vec![
                vec![similarity("s1", 0.8), similarity("s2", 0.8)],
                vec![profile_based("p1", 0.8), profile_based("p2", 0.8)],
                vec![collaborative("k1", 0.8)],
            ]
        };

        let first = merge(streams(), &HashSet::new());
        let second = merge(streams(), &HashSet::new());
        assert_eq!(first, second);

        // Exact (rank, score) ties keep concatenation order
        let ids: Vec<&str> = first.iter().map(|c| c.program_id()).collect();
        assert_eq!(ids, vec!["s1", "s2", "p1", "p2", "k1"]);
    }

    #[test]
    fn test_result_ids_are_pairwise_distinct() {
        let merged = merge(
            vec![
                vec![similarity("p1", 0.9), similarity("p2", 0.8)],
                vec![profile_based("p1", 0.7), profile_based("p2", 0.95)],
                vec![collaborative("p1", 0.3)],
            ],
            &HashSet::new(),
        );

        let mut ids: Vec<&str> = merged.iter().map(|c| c.program_id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), merged.len());
    }
}
