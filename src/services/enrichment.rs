/// Late-bound enrichment of the final selection
///
/// Runs after the merge so the number of generative calls is bounded by the
/// output budget, never by the candidate-pool size. Candidates that already
/// carry an explanation pass through untouched.
use std::sync::Arc;

use crate::{
    models::{Explanation, ProgramCandidate, Urgency, UserProfile},
    services::providers::Advisor,
};

pub struct Enricher {
    advisor: Option<Arc<dyn Advisor>>,
}

impl Enricher {
    pub fn new(advisor: Option<Arc<dyn Advisor>>) -> Self {
        Self { advisor }
    }

    /// Attaches an explanation to every candidate, falling back to a
    /// deterministic template when the advisor is unavailable or returns
    /// garbage
    pub async fn enrich(
        &self,
        profile: &UserProfile,
        mut candidates: Vec<ProgramCandidate>,
    ) -> Vec<ProgramCandidate> {
        for candidate in &mut candidates {
            if candidate.explanation.is_some() {
                continue;
            }

            let label = candidate.source.label();
            let explanation = match &self.advisor {
                Some(advisor) => match advisor.enhance(profile, &candidate.details, label).await {
                    Ok(explanation) => explanation,
                    Err(e) => {
                        tracing::warn!(
                            program_id = %candidate.program_id(),
                            error = %e,
                            "Enrichment failed, using template"
                        );
                        Self::fallback(label)
                    }
                },
                None => Self::fallback(label),
            };

            candidate.explanation = Some(explanation);
        }

        candidates
    }

    fn fallback(source_label: &str) -> Explanation {
        Explanation {
            reason: format!(
                "This {source_label} recommendation aligns with your role and interests"
            ),
            skills_gained: "Relevant professional skills".to_string(),
            career_impact: "Will contribute to your career advancement".to_string(),
            urgency: Urgency::Medium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{ProgramDetails, RecommendationSource};
    use crate::services::providers::MockAdvisor;
    use uuid::Uuid;

    fn profile() -> UserProfile {
        UserProfile::new(
            Uuid::new_v4(),
            "amara@example.com".to_string(),
            "Amara Okafor".to_string(),
        )
    }

    fn candidate(program_id: &str, source: RecommendationSource) -> ProgramCandidate {
        ProgramCandidate::new(
            ProgramDetails {
                program_id: program_id.to_string(),
                ..Default::default()
            },
            0.8,
            source,
        )
    }

    fn explanation(reason: &str) -> Explanation {
        Explanation {
            reason: reason.to_string(),
            skills_gained: "skills".to_string(),
            career_impact: "impact".to_string(),
            urgency: Urgency::High,
        }
    }

    #[tokio::test]
    async fn test_pre_enriched_candidates_untouched() {
        // The advisor mock has no expectations; calling it would panic
        let enricher = Enricher::new(Some(Arc::new(MockAdvisor::new())));

        let mut pre_enriched = candidate("p1", RecommendationSource::LlmPowered);
        pre_enriched.explanation = Some(explanation("integral"));

        let enriched = enricher.enrich(&profile(), vec![pre_enriched]).await;
        assert_eq!(enriched[0].explanation.as_ref().unwrap().reason, "integral");
    }

    #[tokio::test]
    async fn test_enhances_with_source_label() {
        let mut advisor = MockAdvisor::new();
        advisor
            .expect_enhance()
            .withf(|_, _, label| label == "collaborative filtering")
            .returning(|_, _, _| Ok(explanation("peers chose it")));

        let enricher = Enricher::new(Some(Arc::new(advisor)));
        let enriched = enricher
            .enrich(
                &profile(),
                vec![candidate(
                    "p1",
                    RecommendationSource::Collaborative { users_registered: 3 },
                )],
            )
            .await;

        assert_eq!(
            enriched[0].explanation.as_ref().unwrap().reason,
            "peers chose it"
        );
    }

    #[tokio::test]
    async fn test_advisor_failure_falls_back_to_template() {
        let mut advisor = MockAdvisor::new();
        advisor
            .expect_enhance()
            .returning(|_, _, _| Err(AppError::ExternalApi("malformed".to_string())));

        let enricher = Enricher::new(Some(Arc::new(advisor)));
        let enriched = enricher
            .enrich(
                &profile(),
                vec![candidate("p1", RecommendationSource::ProfileMatch)],
            )
            .await;

        let explanation = enriched[0].explanation.as_ref().unwrap();
        assert_eq!(
            explanation.reason,
            "This profile matching recommendation aligns with your role and interests"
        );
        assert_eq!(explanation.urgency, Urgency::Medium);
    }

    #[tokio::test]
    async fn test_no_advisor_configured_uses_template_everywhere() {
        let enricher = Enricher::new(None);
        let enriched = enricher
            .enrich(
                &profile(),
                vec![
                    candidate(
                        "p1",
                        RecommendationSource::ProgramSimilarity {
                            similar_to_id: "p0".to_string(),
                            similar_to_title: "Seed".to_string(),
                        },
                    ),
                    candidate("p2", RecommendationSource::ProfileBased),
                ],
            )
            .await;

        assert!(enriched.iter().all(|c| c.explanation.is_some()));
        assert!(enriched[0]
            .explanation
            .as_ref()
            .unwrap()
            .reason
            .contains("program similarity"));
    }
}
