use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An employee profile as stored in the profile table
///
/// Free-text fields (`interests`, `preferred_skills`) are empty strings until
/// onboarding fills them in; `max_budget` and `preferred_month` stay unset
/// when the employee has no constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub skill_level: String,
    pub interests: String,
    pub preferred_skills: String,
    pub max_budget: Option<f64>,
    pub preferred_month: Option<String>,
}

impl UserProfile {
    /// Creates a bare profile as written at onboarding, before the
    /// preference fields are filled in
    pub fn new(id: Uuid, email: String, full_name: String) -> Self {
        Self {
            id,
            email,
            full_name,
            role: String::new(),
            skill_level: String::new(),
            interests: String::new(),
            preferred_skills: String::new(),
            max_budget: None,
            preferred_month: None,
        }
    }

    /// Whether the profile carries enough signal to drive a vector search
    pub fn has_preferences(&self) -> bool {
        !self.interests.is_empty() || !self.role.is_empty() || !self.preferred_skills.is_empty()
    }

    /// Budget cap for search filters; `None` when unset or non-positive
    pub fn budget_cap(&self) -> Option<f64> {
        self.max_budget.filter(|b| *b > 0.0)
    }

    /// The composite natural-language query matched against program
    /// descriptions by the vector index
    pub fn search_text(&self) -> String {
        format!(
            "{}. Role: {}. Skills to learn: {}. Level: {}. Available in: {}.",
            self.interests,
            self.role,
            self.preferred_skills,
            self.skill_level,
            self.preferred_month.as_deref().unwrap_or_default(),
        )
    }
}

/// Fields a profile-update operation may change; absent fields keep their
/// stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub skill_level: Option<String>,
    pub interests: Option<String>,
    pub preferred_skills: Option<String>,
    pub max_budget: Option<f64>,
    pub preferred_month: Option<String>,
}

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parses a month name ("January") or three-letter abbreviation ("jan")
/// into its 1-based number
pub fn parse_month(name: &str) -> Option<u32> {
    let lower = name.trim().to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }

    MONTH_NAMES
        .iter()
        .position(|full| **full == lower || (lower.len() == 3 && full[..3] == lower))
        .map(|i| i as u32 + 1)
}
