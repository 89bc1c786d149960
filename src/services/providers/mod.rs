/// External collaborator abstractions
///
/// The recommendation engine talks to three out-of-process services: the
/// vector index holding program embeddings, the text-embedding model, and
/// the generative advisor. Each sits behind a trait so the engine can be
/// exercised against mocks and so exactly one canonical backend exists per
/// concern.
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{Explanation, ProgramDetails, Registration, UserProfile},
};

pub mod groq;
pub mod nomic;
pub mod pinecone;

pub use groq::GroqAdvisor;
pub use nomic::NomicEmbedder;
pub use pinecone::PineconeIndex;

/// A nearest-neighbour match returned by the vector index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMatch {
    pub program_id: String,
    pub score: f64,
    pub details: ProgramDetails,
}

/// A program's stored vector and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProgram {
    pub vector: Vec<f32>,
    pub details: ProgramDetails,
}

/// Structured constraints applied server-side by the index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub max_cost: Option<f64>,
}

impl SearchFilter {
    /// Budget constraint; non-positive caps are treated as unset
    pub fn budget(max_cost: Option<f64>) -> Self {
        Self {
            max_cost: max_cost.filter(|c| *c > 0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max_cost.is_none()
    }
}

/// How a text is embedded; queries and documents are prefixed differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedInput {
    SearchQuery,
    SearchDocument,
}

impl EmbedInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedInput::SearchQuery => "search_query",
            EmbedInput::SearchDocument => "search_document",
        }
    }
}

/// A program picked by the generative advisor, with its integral reasoning
#[derive(Debug, Clone, PartialEq)]
pub struct LlmPick {
    pub program_id: String,
    pub score: f64,
    pub explanation: Explanation,
}

/// Vector query and point-fetch against the program index
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> AppResult<Vec<SearchMatch>>;

    async fn fetch(&self, program_id: &str) -> AppResult<Option<StoredProgram>>;
}

/// Text-embedding model
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str, input: EmbedInput) -> AppResult<Vec<f32>>;
}

/// Generative back end: program selection and per-candidate enhancement
///
/// Implementations must tolerate malformed model output; callers handle the
/// error by falling back, they never see partial garbage.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Advisor: Send + Sync {
    async fn select_programs(
        &self,
        profile: &UserProfile,
        registrations: &[Registration],
        search_results: &[SearchMatch],
    ) -> AppResult<Vec<LlmPick>>;

    async fn enhance(
        &self,
        profile: &UserProfile,
        program: &ProgramDetails,
        source_label: &str,
    ) -> AppResult<Explanation>;
}
