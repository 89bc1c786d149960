/// Pinecone-style vector index provider
///
/// Data-plane API: POST /query for nearest-neighbour search and
/// GET /vectors/fetch for point lookups. Vectors are stored under ids of
/// the form `program-<program_id>` with the program metadata attached.
use std::collections::HashMap;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::ProgramDetails,
    services::providers::{SearchFilter, SearchMatch, StoredProgram, VectorIndex},
};

#[derive(Clone)]
pub struct PineconeIndex {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

#[derive(Serialize)]
struct QueryRequest {
    vector: Vec<f32>,
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ApiMatch>,
}

#[derive(Deserialize)]
struct ApiMatch {
    id: String,
    score: f64,
    metadata: Option<ProgramDetails>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, ApiVector>,
}

#[derive(Deserialize)]
struct ApiVector {
    #[serde(default)]
    values: Vec<f32>,
    metadata: Option<ProgramDetails>,
}

impl PineconeIndex {
    pub fn new(http_client: HttpClient, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
        }
    }

    /// Index-side vector id for a program
    fn vector_id(program_id: &str) -> String {
        format!("program-{program_id}")
    }

    /// Server-side filter expression, or None when unconstrained
    fn filter_expression(filter: &SearchFilter) -> Option<serde_json::Value> {
        filter
            .max_cost
            .map(|max_cost| json!({ "cost": { "$lte": max_cost } }))
    }

    fn convert_match(m: ApiMatch) -> SearchMatch {
        let details = m.metadata.unwrap_or_default();
        let program_id = if details.program_id.is_empty() {
            m.id.strip_prefix("program-").unwrap_or(&m.id).to_string()
        } else {
            details.program_id.clone()
        };

        SearchMatch {
            program_id,
            score: m.score,
            details,
        }
    }
}

#[async_trait::async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> AppResult<Vec<SearchMatch>> {
        let url = format!("{}/query", self.api_url);

        let request = QueryRequest {
            vector: vector.to_vec(),
            top_k,
            include_metadata: true,
            filter: Self::filter_expression(filter),
        };

        let response = self
            .http_client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Vector index returned status {}: {}",
                status, body
            )));
        }

        let query_response: QueryResponse = response.json().await?;
        let matches: Vec<SearchMatch> = query_response
            .matches
            .into_iter()
            .map(Self::convert_match)
            .collect();

        tracing::debug!(
            top_k,
            results = matches.len(),
            provider = "pinecone",
            "Vector query completed"
        );

        Ok(matches)
    }

    async fn fetch(&self, program_id: &str) -> AppResult<Option<StoredProgram>> {
        let url = format!("{}/vectors/fetch", self.api_url);
        let vector_id = Self::vector_id(program_id);

        let response = self
            .http_client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .query(&[("ids", vector_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Vector index returned status {}: {}",
                status, body
            )));
        }

        let mut fetch_response: FetchResponse = response.json().await?;

        let stored = fetch_response.vectors.remove(&vector_id).map(|v| {
            let mut details = v.metadata.unwrap_or_default();
            if details.program_id.is_empty() {
                details.program_id = program_id.to_string();
            }
            StoredProgram {
                vector: v.values,
                details,
            }
        });

        if stored.is_none() {
            tracing::debug!(program_id = %program_id, "Program not present in vector index");
        }

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_expression_with_budget() {
        let filter = SearchFilter::budget(Some(1500.0));
        let expression = PineconeIndex::filter_expression(&filter).unwrap();
        assert_eq!(expression, json!({ "cost": { "$lte": 1500.0 } }));
    }

    #[test]
    fn test_filter_expression_empty() {
        assert_eq!(
            PineconeIndex::filter_expression(&SearchFilter::default()),
            None
        );
        assert_eq!(
            PineconeIndex::filter_expression(&SearchFilter::budget(Some(0.0))),
            None
        );
    }

    #[test]
    fn test_convert_match_prefers_metadata_program_id() {
        let api_match = ApiMatch {
            id: "program-xyz".to_string(),
            score: 0.82,
            metadata: Some(ProgramDetails {
                program_id: "prog-42".to_string(),
                title: "Advanced Kubernetes".to_string(),
                ..Default::default()
            }),
        };

        let converted = PineconeIndex::convert_match(api_match);
        assert_eq!(converted.program_id, "prog-42");
        assert_eq!(converted.score, 0.82);
        assert_eq!(converted.details.title, "Advanced Kubernetes");
    }

    #[test]
    fn test_convert_match_strips_vector_id_prefix_without_metadata() {
        let api_match = ApiMatch {
            id: "program-xyz".to_string(),
            score: 0.5,
            metadata: None,
        };

        let converted = PineconeIndex::convert_match(api_match);
        assert_eq!(converted.program_id, "xyz");
    }

    #[test]
    fn test_query_response_deserialization() {
        let body = r#"{
            "matches": [
                {
                    "id": "program-1",
                    "score": 0.91,
                    "metadata": {
                        "program_id": "1",
                        "title": "Cloud Architecture",
                        "category": "Infrastructure",
                        "skills_required": "aws, terraform",
                        "cost": 1200.0,
                        "start_date": "2026-03-01",
                        "end_date": "2026-04-30"
                    }
                }
            ]
        }"#;

        let response: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.matches[0].score, 0.91);
        assert_eq!(
            response.matches[0].metadata.as_ref().unwrap().category,
            "Infrastructure"
        );
    }

    #[test]
    fn test_fetch_response_deserialization() {
        let body = r#"{
            "vectors": {
                "program-1": {
                    "id": "program-1",
                    "values": [0.1, 0.2],
                    "metadata": { "program_id": "1", "title": "Cloud Architecture" }
                }
            }
        }"#;

        let response: FetchResponse = serde_json::from_str(body).unwrap();
        let vector = response.vectors.get("program-1").unwrap();
        assert_eq!(vector.values, vec![0.1, 0.2]);
    }
}
