/// Request orchestration for the recommendation engine
///
/// One request runs the candidate streams sequentially, merges them under
/// the hybrid policy, and enriches only the final selection. Every stream
/// fails soft to an empty list; only a missing profile aborts the request.
use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{ProfileStore, RegistrationStore},
    error::{AppError, AppResult},
    models::{ProgramCandidate, Registration, UserProfile},
    services::{
        content::QueryParams, hybrid, CollaborativeAggregator, ContentRecommender, Enricher,
        LlmRecommender, RegistrationSimilarityRecommender,
    },
};

const COLLABORATIVE_LIMIT: usize = 5;

pub struct RecommendationService {
    profiles: Arc<dyn ProfileStore>,
    registrations: Arc<dyn RegistrationStore>,
    content: ContentRecommender,
    similarity: RegistrationSimilarityRecommender,
    collaborative: CollaborativeAggregator,
    llm: Option<LlmRecommender>,
    enricher: Enricher,
}

impl RecommendationService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        registrations: Arc<dyn RegistrationStore>,
        content: ContentRecommender,
        similarity: RegistrationSimilarityRecommender,
        collaborative: CollaborativeAggregator,
        llm: Option<LlmRecommender>,
        enricher: Enricher,
    ) -> Self {
        Self {
            profiles,
            registrations,
            content,
            similarity,
            collaborative,
            llm,
            enricher,
        }
    }

    /// The "get recommendations for user" operation
    pub async fn recommend_for_user(&self, user_id: Uuid) -> AppResult<Vec<ProgramCandidate>> {
        let profile = self
            .profiles
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile not found for user {user_id}")))?;

        let registrations = match self.registrations.list_for(user_id).await {
            Ok(registrations) => registrations,
            Err(e) => {
                tracing::warn!(error = %e, "Registration read failed, proceeding without");
                Vec::new()
            }
        };
        let registered_ids: HashSet<String> = registrations
            .iter()
            .map(|r| r.program_id.clone())
            .collect();

        let preference_stream = self
            .preference_stream(&profile, &registrations, &registered_ids)
            .await;

        let behavioral_stream = if registrations.is_empty() {
            Vec::new()
        } else {
            self.similarity
                .recommend(&registrations, &registered_ids, &HashSet::new())
                .await
        };

        let fallback_stream = if registrations.is_empty() {
            let excluded: HashSet<String> = preference_stream
                .iter()
                .map(|c| c.program_id().to_string())
                .collect();
            Self::soften(
                self.content
                    .profile_match_fallback(&profile, &registered_ids, &excluded)
                    .await,
                "profile_match",
            )
        } else {
            Vec::new()
        };

        let collaborative_stream = self
            .collaborative
            .recommend(&profile, &registrations, COLLABORATIVE_LIMIT)
            .await;

        let merged = hybrid::merge(
            vec![
                behavioral_stream,
                preference_stream,
                fallback_stream,
                collaborative_stream,
            ],
            &registered_ids,
        );

        let enriched = self.enricher.enrich(&profile, merged).await;

        tracing::info!(
            user_id = %user_id,
            recommendations = enriched.len(),
            "Recommendation set computed"
        );

        Ok(enriched)
    }

    /// The stated-preference stream: advisor-picked when configured,
    /// falling back to plain profile search on advisor failure
    async fn preference_stream(
        &self,
        profile: &UserProfile,
        registrations: &[Registration],
        registered_ids: &HashSet<String>,
    ) -> Vec<ProgramCandidate> {
        if let Some(llm) = &self.llm {
            match llm.recommend(profile, registrations, registered_ids).await {
                Ok(candidates) => return candidates,
                Err(e) => {
                    tracing::warn!(error = %e, "Advisor stream failed, falling back to profile search");
                }
            }
        }

        Self::soften(
            self.content.profile_based(profile, registered_ids).await,
            "profile_based",
        )
    }

    /// The "search/query recommendations" operation with explicit
    /// profile-like parameters
    pub async fn search_programs(
        &self,
        user_id: Uuid,
        params: &QueryParams,
    ) -> AppResult<Vec<ProgramCandidate>> {
        params.validate()?;

        let registered_ids: HashSet<String> = match self.registrations.list_for(user_id).await {
            Ok(registrations) => registrations
                .into_iter()
                .map(|r| r.program_id)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Registration read failed, proceeding without");
                HashSet::new()
            }
        };

        self.content.search(params, &registered_ids).await
    }

    fn soften(result: AppResult<Vec<ProgramCandidate>>, stream: &str) -> Vec<ProgramCandidate> {
        match result {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(stream, error = %e, "Candidate stream failed, degrading to empty");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockProfileStore, MockRegistrationStore};
    use crate::models::{ProgramDetails, RecommendationSource};
    use crate::services::providers::{
        MockTextEmbedder, MockVectorIndex, SearchMatch, VectorIndex,
    };

    fn profile(user_id: Uuid) -> UserProfile {
        let mut p = UserProfile::new(
            user_id,
            "amara@example.com".to_string(),
            "Amara Okafor".to_string(),
        );
        p.role = "QA Engineer".to_string();
        p.skill_level = "intermediate".to_string();
        p.interests = "test automation".to_string();
        p.max_budget = Some(150000.0);
        p
    }

    fn peer(role: &str) -> UserProfile {
        let mut p = UserProfile::new(
            Uuid::new_v4(),
            "peer@example.com".to_string(),
            "Peer".to_string(),
        );
        p.role = role.to_string();
        p
    }

    fn search_match(program_id: &str, score: f64) -> SearchMatch {
        SearchMatch {
            program_id: program_id.to_string(),
            score,
            details: ProgramDetails {
                program_id: program_id.to_string(),
                title: format!("Program {program_id}"),
                ..Default::default()
            },
        }
    }

    struct Fixture {
        profiles: MockProfileStore,
        registrations: MockRegistrationStore,
        embedder: MockTextEmbedder,
        index: MockVectorIndex,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                profiles: MockProfileStore::new(),
                registrations: MockRegistrationStore::new(),
                embedder: MockTextEmbedder::new(),
                index: MockVectorIndex::new(),
            }
        }

        fn into_service(self) -> RecommendationService {
            let profiles: Arc<dyn ProfileStore> = Arc::new(self.profiles);
            let registrations: Arc<dyn RegistrationStore> = Arc::new(self.registrations);
            let index: Arc<dyn VectorIndex> = Arc::new(self.index);
            let content = ContentRecommender::new(Arc::new(self.embedder), index.clone());

            RecommendationService::new(
                profiles.clone(),
                registrations.clone(),
                content,
                RegistrationSimilarityRecommender::new(index.clone()),
                CollaborativeAggregator::new(profiles, registrations, index),
                None,
                Enricher::new(None),
            )
        }
    }

    #[tokio::test]
    async fn test_missing_profile_is_fatal() {
        let mut fixture = Fixture::new();
        fixture.profiles.expect_get().returning(|_| Ok(None));

        let service = fixture.into_service();
        let result = service.recommend_for_user(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_content_and_collaborative_fill_the_budget() {
        let user_id = Uuid::new_v4();
        let similar_peer = peer("qa engineer");
        let peer_id = similar_peer.id;

        let mut fixture = Fixture::new();
        fixture
            .profiles
            .expect_get()
            .returning(move |id| Ok(Some(profile(id))));
        fixture
            .profiles
            .expect_list_others()
            .returning(move |_| Ok(vec![similar_peer.clone()]));

        // Requester has no registrations; the similar peer has two
        fixture.registrations.expect_list_for().returning(move |id| {
            if id == peer_id {
                Ok(vec![
                    Registration::new(peer_id, "k1".to_string(), "Peer Pick One".to_string()),
                    Registration::new(peer_id, "k2".to_string(), "Peer Pick Two".to_string()),
                ])
            } else {
                Ok(vec![])
            }
        });
        fixture
            .registrations
            .expect_count_for()
            .returning(|_| Ok(1));

        fixture
            .embedder
            .expect_embed()
            .returning(|_, _| Ok(vec![0.5; 4]));
        fixture.index.expect_query().returning(|_, _, _| {
            Ok(vec![
                search_match("c1", 0.92),
                search_match("c2", 0.81),
                search_match("c3", 0.74),
            ])
        });
        fixture.index.expect_fetch().returning(|_| Ok(None));

        let service = fixture.into_service();
        let recommendations = service.recommend_for_user(user_id).await.unwrap();

        assert_eq!(recommendations.len(), 5);
        let ids: Vec<&str> = recommendations.iter().map(|c| c.program_id()).collect();
        // Content items first in score order, then collaborative
        assert_eq!(ids, vec!["c1", "c2", "c3", "k1", "k2"]);
        assert!(recommendations.iter().all(|c| c.explanation.is_some()));
    }

    #[tokio::test]
    async fn test_all_searches_failing_leaves_collaborative_only() {
        let user_id = Uuid::new_v4();
        let similar_peer = peer("qa engineer");
        let peer_id = similar_peer.id;

        let mut fixture = Fixture::new();
        fixture
            .profiles
            .expect_get()
            .returning(move |id| Ok(Some(profile(id))));
        fixture
            .profiles
            .expect_list_others()
            .returning(move |_| Ok(vec![similar_peer.clone()]));

        fixture.registrations.expect_list_for().returning(move |id| {
            if id == peer_id {
                Ok(vec![
                    Registration::new(peer_id, "k1".to_string(), "One".to_string()),
                    Registration::new(peer_id, "k2".to_string(), "Two".to_string()),
                    Registration::new(peer_id, "k3".to_string(), "Three".to_string()),
                    Registration::new(peer_id, "k4".to_string(), "Four".to_string()),
                ])
            } else {
                Ok(vec![])
            }
        });
        fixture
            .registrations
            .expect_count_for()
            .returning(|_| Ok(1));

        // Embedding service is down: both search-backed streams degrade
        fixture
            .embedder
            .expect_embed()
            .returning(|_, _| Err(AppError::ExternalApi("embedder down".to_string())));
        fixture.index.expect_fetch().returning(|_| Ok(None));

        let service = fixture.into_service();
        let recommendations = service.recommend_for_user(user_id).await.unwrap();

        assert_eq!(recommendations.len(), 4);
        assert!(recommendations
            .iter()
            .all(|c| matches!(c.source, RecommendationSource::Collaborative { .. })));
    }

    #[tokio::test]
    async fn test_registration_read_failure_is_soft() {
        let mut fixture = Fixture::new();
        fixture
            .profiles
            .expect_get()
            .returning(move |id| Ok(Some(profile(id))));
        fixture
            .profiles
            .expect_list_others()
            .returning(|_| Ok(vec![]));
        fixture
            .registrations
            .expect_list_for()
            .returning(|_| Err(AppError::Internal("db down".to_string())));

        fixture
            .embedder
            .expect_embed()
            .returning(|_, _| Ok(vec![0.5; 4]));
        fixture
            .index
            .expect_query()
            .returning(|_, _, _| Ok(vec![search_match("c1", 0.9)]));

        let service = fixture.into_service();
        let recommendations = service.recommend_for_user(Uuid::new_v4()).await.unwrap();

        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].program_id(), "c1");
    }

    #[tokio::test]
    async fn test_search_programs_validates_before_touching_stores() {
        // No expectations on any mock: validation must reject first
        let service = Fixture::new().into_service();

        let params = QueryParams {
            interest: "cloud".to_string(),
            role: "engineer".to_string(),
            skill_level: "advanced".to_string(),
            skills: "kubernetes".to_string(),
            target_month: "Smarch".to_string(),
            max_budget: None,
        };

        let result = service.search_programs(Uuid::new_v4(), &params).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_search_programs_filters_registered() {
        let user_id = Uuid::new_v4();

        let mut fixture = Fixture::new();
        fixture.registrations.expect_list_for().returning(move |_| {
            Ok(vec![Registration::new(
                user_id,
                "p1".to_string(),
                "Taken".to_string(),
            )])
        });
        fixture
            .embedder
            .expect_embed()
            .returning(|_, _| Ok(vec![0.5; 4]));
        fixture.index.expect_query().returning(|_, _, _| {
            Ok(vec![search_match("p1", 0.9), search_match("p2", 0.8)])
        });

        let service = fixture.into_service();
        let params = QueryParams {
            interest: "cloud".to_string(),
            role: "engineer".to_string(),
            skill_level: "advanced".to_string(),
            skills: "kubernetes".to_string(),
            target_month: "March".to_string(),
            max_budget: None,
        };

        let results = service.search_programs(user_id, &params).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].program_id(), "p2");
    }
}
