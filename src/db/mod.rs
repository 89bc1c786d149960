use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ProfileUpdate, Registration, UserProfile};

pub mod postgres;

pub use postgres::{create_pool, PgProfileStore, PgRegistrationStore};

/// Read/write access to employee profiles
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<UserProfile>>;

    async fn create(&self, user_id: Uuid, email: &str, full_name: &str) -> AppResult<UserProfile>;

    async fn update(&self, user_id: Uuid, update: ProfileUpdate) -> AppResult<UserProfile>;

    /// Every profile except the given user's, for the peer scan
    async fn list_others(&self, user_id: Uuid) -> AppResult<Vec<UserProfile>>;
}

/// Read/write access to program registrations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn list_for(&self, user_id: Uuid) -> AppResult<Vec<Registration>>;

    /// Atomically inserts a registration; returns false when the
    /// (user, program) pair already exists
    async fn insert(
        &self,
        user_id: Uuid,
        program_id: &str,
        program_title: &str,
    ) -> AppResult<bool>;

    async fn delete(&self, user_id: Uuid, program_id: &str) -> AppResult<()>;

    async fn count_for(&self, program_id: &str) -> AppResult<i64>;

    async fn list_all(&self) -> AppResult<Vec<Registration>>;
}
