pub mod collaborative;
pub mod content;
pub mod enrichment;
pub mod hybrid;
pub mod llm;
pub mod peer_similarity;
pub mod program_similarity;
pub mod providers;
pub mod recommendations;

pub use collaborative::CollaborativeAggregator;
pub use content::{ContentRecommender, QueryParams};
pub use enrichment::Enricher;
pub use llm::LlmRecommender;
pub use program_similarity::RegistrationSimilarityRecommender;
pub use recommendations::RecommendationService;
