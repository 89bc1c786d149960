/// Nomic-style text-embedding provider
///
/// Texts are prefixed with the input type (`search_query:` / `search_document:`)
/// before embedding, matching how the program vectors were built.
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    services::providers::{EmbedInput, TextEmbedder},
};

const EMBED_MODEL: &str = "nomic-embed-text-v1.5";

#[derive(Clone)]
pub struct NomicEmbedder {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl NomicEmbedder {
    pub fn new(http_client: HttpClient, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
        }
    }

    fn prefixed(text: &str, input: EmbedInput) -> String {
        format!("{}: {}", input.as_str(), text)
    }
}

#[async_trait::async_trait]
impl TextEmbedder for NomicEmbedder {
    async fn embed(&self, text: &str, input: EmbedInput) -> AppResult<Vec<f32>> {
        let request = EmbedRequest {
            model: EMBED_MODEL,
            texts: vec![Self::prefixed(text, input)],
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Embedding API returned status {}: {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await?;

        embed_response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::ExternalApi("Embedding API returned no vector".to_string()))
    }
}
