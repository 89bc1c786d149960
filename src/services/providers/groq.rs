/// Groq-style generative advisor
///
/// Uses an OpenAI-compatible chat-completions endpoint for two jobs: picking
/// programs from vector-search results and enhancing individual candidates
/// with justification text. The model is instructed to answer with bare
/// JSON; responses wrapped in code fences or prose are salvaged before
/// parsing, and anything beyond that surfaces as an error the caller
/// recovers from.
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::{Explanation, ProgramDetails, Registration, Urgency, UserProfile},
    services::providers::{Advisor, LlmPick, SearchMatch},
};

const TEMPERATURE: f64 = 0.3;
/// How many search results the selection prompt carries
const PROMPT_RESULT_LIMIT: usize = 10;
const DEFAULT_PICK_SCORE: f64 = 0.8;

#[derive(Clone)]
pub struct GroqAdvisor {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// One entry of the selection response array
#[derive(Debug, Deserialize)]
struct SelectionItem {
    program_id: String,
    #[serde(default)]
    recommendation_score: Option<f64>,
    #[serde(default)]
    recommendation_reason: String,
    #[serde(default)]
    skills_gained: String,
    #[serde(default)]
    career_impact: String,
    #[serde(default)]
    urgency: Option<String>,
}

/// The enhancement response object
#[derive(Debug, Deserialize)]
struct EnhancementItem {
    #[serde(default)]
    recommendation_reason: String,
    #[serde(default)]
    skills_gained: String,
    #[serde(default)]
    career_impact: String,
    #[serde(default)]
    urgency: Option<String>,
}

impl GroqAdvisor {
    pub fn new(http_client: HttpClient, api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            model,
        }
    }

    async fn complete(&self, prompt: String) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_url);

        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Advisor API returned status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response.json().await?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::ExternalApi("Advisor returned no completion".to_string()))
    }

    /// Salvages a JSON value from model output that may carry code fences
    /// or leading prose
    fn extract_json(content: &str) -> AppResult<serde_json::Value> {
        let trimmed = content.trim();
        if let Ok(value) = serde_json::from_str(trimmed) {
            return Ok(value);
        }

        let start = trimmed
            .find(['[', '{'])
            .ok_or_else(|| AppError::ExternalApi("Advisor output contains no JSON".to_string()))?;
        let end = trimmed
            .rfind([']', '}'])
            .filter(|e| *e >= start)
            .ok_or_else(|| AppError::ExternalApi("Advisor output contains no JSON".to_string()))?;

        serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| AppError::ExternalApi(format!("Malformed advisor output: {}", e)))
    }

    fn parse_urgency(raw: Option<String>) -> Urgency {
        match raw.as_deref().map(str::trim) {
            Some(u) if u.eq_ignore_ascii_case("high") => Urgency::High,
            Some(u) if u.eq_ignore_ascii_case("low") => Urgency::Low,
            _ => Urgency::Medium,
        }
    }

    fn selection_prompt(
        profile: &UserProfile,
        registrations: &[Registration],
        search_results: &[SearchMatch],
    ) -> String {
        let registered = if registrations.is_empty() {
            "None".to_string()
        } else {
            registrations
                .iter()
                .map(|r| format!("- {} (ID: {})", r.program_title, r.program_id))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let results = serde_json::to_string_pretty(
            &search_results
                .iter()
                .take(PROMPT_RESULT_LIMIT)
                .collect::<Vec<_>>(),
        )
        .unwrap_or_default();

        format!(
            "You are an expert learning and development advisor. Recommend the most \
             suitable learning programs for this employee.\n\n\
             EMPLOYEE PROFILE:\n\
             - Name: {}\n- Role: {}\n- Skill Level: {}\n- Interests: {}\n\
             - Preferred Skills: {}\n- Budget: {}\n- Preferred Month: {}\n\n\
             CURRENTLY REGISTERED PROGRAMS:\n{}\n\n\
             AVAILABLE PROGRAMS FROM SEARCH:\n{}\n\n\
             INSTRUCTIONS:\n\
             1. Match programs to the employee's role, skill level, and interests\n\
             2. Respect budget and timing preferences\n\
             3. Never recommend a program they are already registered for\n\
             4. Provide diversity across categories and skills\n\n\
             Return a JSON array of exactly 3 recommendations shaped as:\n\
             [{{\"program_id\": \"...\", \"title\": \"...\", \"recommendation_score\": 0.95, \
             \"recommendation_reason\": \"...\", \"skills_gained\": \"...\", \
             \"career_impact\": \"...\", \"urgency\": \"high|medium|low\"}}]\n\
             Only return valid JSON, no additional text.",
            profile.full_name,
            profile.role,
            profile.skill_level,
            profile.interests,
            profile.preferred_skills,
            profile
                .max_budget
                .map(|b| format!("${b}"))
                .unwrap_or_else(|| "Not specified".to_string()),
            profile.preferred_month.as_deref().unwrap_or("Not specified"),
            registered,
            results,
        )
    }

    fn enhancement_prompt(
        profile: &UserProfile,
        program: &ProgramDetails,
        source_label: &str,
    ) -> String {
        format!(
            "You are a learning advisor. Enhance this {source_label} recommendation \
             with detailed insights for the employee.\n\n\
             EMPLOYEE PROFILE:\n\
             - Role: {}\n- Skill Level: {}\n- Interests: {}\n- Preferred Skills: {}\n\n\
             PROGRAM:\n\
             - Title: {}\n- Category: {}\n- Skills Required: {}\n\n\
             Return JSON shaped as:\n\
             {{\"recommendation_reason\": \"...\", \"skills_gained\": \"...\", \
             \"career_impact\": \"...\", \"urgency\": \"high|medium|low\"}}\n\
             Only return valid JSON, no additional text.",
            profile.role,
            profile.skill_level,
            profile.interests,
            profile.preferred_skills,
            program.title,
            program.category,
            program.skills_required,
        )
    }
}

#[async_trait::async_trait]
impl Advisor for GroqAdvisor {
    async fn select_programs(
        &self,
        profile: &UserProfile,
        registrations: &[Registration],
        search_results: &[SearchMatch],
    ) -> AppResult<Vec<LlmPick>> {
        let prompt = Self::selection_prompt(profile, registrations, search_results);
        let content = self.complete(prompt).await?;

        let value = Self::extract_json(&content)?;
        let items: Vec<SelectionItem> = serde_json::from_value(value)
            .map_err(|e| AppError::ExternalApi(format!("Malformed advisor output: {}", e)))?;

        let picks = items
            .into_iter()
            .map(|item| LlmPick {
                program_id: item.program_id,
                score: item.recommendation_score.unwrap_or(DEFAULT_PICK_SCORE),
                explanation: Explanation {
                    reason: item.recommendation_reason,
                    skills_gained: item.skills_gained,
                    career_impact: item.career_impact,
                    urgency: Self::parse_urgency(item.urgency),
                },
            })
            .collect();

        Ok(picks)
    }

    async fn enhance(
        &self,
        profile: &UserProfile,
        program: &ProgramDetails,
        source_label: &str,
    ) -> AppResult<Explanation> {
        let prompt = Self::enhancement_prompt(profile, program, source_label);
        let content = self.complete(prompt).await?;

        let value = Self::extract_json(&content)?;
        let item: EnhancementItem = serde_json::from_value(value)
            .map_err(|e| AppError::ExternalApi(format!("Malformed advisor output: {}", e)))?;

        Ok(Explanation {
            reason: item.recommendation_reason,
            skills_gained: item.skills_gained,
            career_impact: item.career_impact,
            urgency: Self::parse_urgency(item.urgency),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_bare() {
        let value = GroqAdvisor::extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_json_with_code_fence() {
        let content = "```json\n[{\"program_id\": \"p1\"}]\n```";
        let value = GroqAdvisor::extract_json(content).unwrap();
        assert_eq!(value[0]["program_id"], "p1");
    }

    #[test]
    fn test_extract_json_with_leading_prose() {
        let content = "Here are the recommendations:\n[{\"program_id\": \"p1\"}]";
        let value = GroqAdvisor::extract_json(content).unwrap();
        assert_eq!(value[0]["program_id"], "p1");
    }

    #[test]
    fn test_extract_json_unrecoverable() {
        assert!(GroqAdvisor::extract_json("no structured output here").is_err());
        assert!(GroqAdvisor::extract_json("{not json at all]").is_err());
    }

    #[test]
    fn test_parse_urgency_tolerates_case_and_garbage() {
        assert_eq!(GroqAdvisor::parse_urgency(Some("HIGH".to_string())), Urgency::High);
        assert_eq!(GroqAdvisor::parse_urgency(Some(" low ".to_string())), Urgency::Low);
        assert_eq!(GroqAdvisor::parse_urgency(Some("urgent!!".to_string())), Urgency::Medium);
        assert_eq!(GroqAdvisor::parse_urgency(None), Urgency::Medium);
    }

    #[test]
    fn test_selection_item_deserialization_with_defaults() {
        let value = GroqAdvisor::extract_json(
            r#"[{"program_id": "p1", "recommendation_reason": "fits the role"}]"#,
        )
        .unwrap();
        let items: Vec<SelectionItem> = serde_json::from_value(value).unwrap();
        assert_eq!(items[0].program_id, "p1");
        assert_eq!(items[0].recommendation_score, None);
        assert_eq!(items[0].recommendation_reason, "fits the role");
    }

    #[test]
    fn test_chat_response_deserialization() {
        let body = r#"{
            "choices": [{ "message": { "role": "assistant", "content": "[]" } }]
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content, "[]");
    }
}
