use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's registration for a program
///
/// At most one row exists per (user, program) pair; the registration table's
/// composite primary key enforces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Registration {
    pub user_id: Uuid,
    pub program_id: String,
    pub program_title: String,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(user_id: Uuid, program_id: String, program_title: String) -> Self {
        Self {
            user_id,
            program_id,
            program_title,
            registered_at: Utc::now(),
        }
    }
}
