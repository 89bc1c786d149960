use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    db::{ProfileStore, RegistrationStore},
    error::{AppError, AppResult},
    models::{ProfileUpdate, Registration, UserProfile},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

const PROFILE_COLUMNS: &str = "id, email, full_name, role, skill_level, interests, \
                               preferred_skills, max_budget, preferred_month";

/// Profile store backed by the user_profiles table
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn create(&self, user_id: Uuid, email: &str, full_name: &str) -> AppResult<UserProfile> {
        // Upsert so a replayed onboarding call stays idempotent
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "INSERT INTO user_profiles (id, email, full_name) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, \
             full_name = EXCLUDED.full_name \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(email)
        .bind(full_name)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user_id, "Profile created");

        Ok(profile)
    }

    async fn update(&self, user_id: Uuid, update: ProfileUpdate) -> AppResult<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "UPDATE user_profiles SET \
             full_name = COALESCE($2, full_name), \
             role = COALESCE($3, role), \
             skill_level = COALESCE($4, skill_level), \
             interests = COALESCE($5, interests), \
             preferred_skills = COALESCE($6, preferred_skills), \
             max_budget = COALESCE($7, max_budget), \
             preferred_month = COALESCE($8, preferred_month) \
             WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(update.full_name)
        .bind(update.role)
        .bind(update.skill_level)
        .bind(update.interests)
        .bind(update.preferred_skills)
        .bind(update.max_budget)
        .bind(update.preferred_month)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile not found for user {user_id}")))?;

        Ok(profile)
    }

    async fn list_others(&self, user_id: Uuid) -> AppResult<Vec<UserProfile>> {
        let profiles = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id <> $1"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }
}

/// Registration store backed by the program_registrations table
#[derive(Clone)]
pub struct PgRegistrationStore {
    pool: PgPool,
}

impl PgRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn list_for(&self, user_id: Uuid) -> AppResult<Vec<Registration>> {
        let registrations = sqlx::query_as::<_, Registration>(
            "SELECT user_id, program_id, program_title, registered_at \
             FROM program_registrations WHERE user_id = $1 \
             ORDER BY registered_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    async fn insert(
        &self,
        user_id: Uuid,
        program_id: &str,
        program_title: &str,
    ) -> AppResult<bool> {
        // The composite primary key makes concurrent duplicate inserts
        // collapse to a single row; the loser sees rows_affected == 0
        let result = sqlx::query(
            "INSERT INTO program_registrations (user_id, program_id, program_title) \
             VALUES ($1, $2, $3) ON CONFLICT (user_id, program_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(program_id)
        .bind(program_title)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() == 1;
        tracing::info!(
            user_id = %user_id,
            program_id = %program_id,
            inserted,
            "Registration insert"
        );

        Ok(inserted)
    }

    async fn delete(&self, user_id: Uuid, program_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM program_registrations WHERE user_id = $1 AND program_id = $2")
            .bind(user_id)
            .bind(program_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_for(&self, program_id: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM program_registrations WHERE program_id = $1",
        )
        .bind(program_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_all(&self) -> AppResult<Vec<Registration>> {
        let registrations = sqlx::query_as::<_, Registration>(
            "SELECT user_id, program_id, program_title, registered_at \
             FROM program_registrations",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }
}
