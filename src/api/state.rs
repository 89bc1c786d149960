use std::sync::Arc;

use crate::{
    db::{ProfileStore, RegistrationStore},
    services::{
        providers::{Advisor, TextEmbedder, VectorIndex},
        CollaborativeAggregator, ContentRecommender, Enricher, LlmRecommender,
        RecommendationService, RegistrationSimilarityRecommender,
    },
};

/// Shared application state
///
/// Every external collaborator enters through here as an explicit
/// dependency object; there is no ambient global state.
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
    pub profiles: Arc<dyn ProfileStore>,
    pub registrations: Arc<dyn RegistrationStore>,
}

impl AppState {
    /// Wires the recommendation engine from its collaborators
    ///
    /// The advisor is optional: without it the preference stream is plain
    /// profile search and enrichment uses the deterministic templates.
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        registrations: Arc<dyn RegistrationStore>,
        embedder: Arc<dyn TextEmbedder>,
        index: Arc<dyn VectorIndex>,
        advisor: Option<Arc<dyn Advisor>>,
    ) -> Self {
        let content = ContentRecommender::new(embedder, index.clone());
        let similarity = RegistrationSimilarityRecommender::new(index.clone());
        let collaborative =
            CollaborativeAggregator::new(profiles.clone(), registrations.clone(), index);
        let llm = advisor
            .clone()
            .map(|advisor| LlmRecommender::new(content.clone(), advisor));
        let enricher = Enricher::new(advisor);

        let recommendations = Arc::new(RecommendationService::new(
            profiles.clone(),
            registrations.clone(),
            content,
            similarity,
            collaborative,
            llm,
            enricher,
        ));

        Self {
            recommendations,
            profiles,
            registrations,
        }
    }
}
