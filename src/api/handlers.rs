use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{parse_month, ProfileUpdate, ProgramCandidate, Registration, UserProfile};
use crate::services::QueryParams;

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<ProgramCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub params: QueryParams,
}

#[derive(Debug, Serialize)]
pub struct SearchResultEntry {
    #[serde(flatten)]
    pub candidate: ProgramCandidate,
    /// Whether the program's span covers the requested month; advisory,
    /// matches outside it are still returned
    pub available_in_target_month: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub recommendations: Vec<SearchResultEntry>,
}

#[derive(Debug, Serialize)]
pub struct RegistrationsResponse {
    pub registrations: Vec<Registration>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub program_id: String,
    pub program_title: String,
}

#[derive(Debug, Serialize)]
pub struct RegistrationCountResponse {
    pub program_id: String,
    pub count: i64,
}

// Handlers

/// Create a profile at onboarding
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    if request.email.trim().is_empty() {
        return Err(AppError::InvalidInput("email must not be empty".to_string()));
    }

    let profile = state
        .profiles
        .create(request.user_id, &request.email, &request.full_name)
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Fetch a stored profile
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserProfile>> {
    let profile = state
        .profiles
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile not found for user {user_id}")))?;

    Ok(Json(profile))
}

/// Update profile preference fields
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<UserProfile>> {
    if update.max_budget.is_some_and(|b| b < 0.0) {
        return Err(AppError::InvalidInput(
            "max_budget must be non-negative".to_string(),
        ));
    }
    if let Some(month) = update.preferred_month.as_deref().filter(|m| !m.is_empty()) {
        parse_month(month)
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid month: {month}")))?;
    }

    let profile = state.profiles.update(user_id, update).await?;
    Ok(Json(profile))
}

/// Personalized recommendations from the stored profile
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<RecommendationsResponse>> {
    let recommendations = state.recommendations.recommend_for_user(user_id).await?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

/// Recommendations from explicit profile-like parameters
pub async fn search_recommendations(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> AppResult<Json<SearchResponse>> {
    let candidates = state
        .recommendations
        .search_programs(request.user_id, &request.params)
        .await?;

    // Validation has already established the month parses
    let target_month = parse_month(&request.params.target_month);

    let recommendations = candidates
        .into_iter()
        .map(|candidate| SearchResultEntry {
            available_in_target_month: target_month
                .map(|month| candidate.details.runs_in_month(month))
                .unwrap_or(true),
            candidate,
        })
        .collect();

    Ok(Json(SearchResponse { recommendations }))
}

/// List the user's registrations
pub async fn list_registrations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<RegistrationsResponse>> {
    let registrations = state.registrations.list_for(user_id).await?;
    Ok(Json(RegistrationsResponse { registrations }))
}

/// Register the user for a program
pub async fn register(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    if request.program_id.trim().is_empty() || request.program_title.trim().is_empty() {
        return Err(AppError::InvalidInput("Missing program details".to_string()));
    }

    let inserted = state
        .registrations
        .insert(user_id, &request.program_id, &request.program_title)
        .await?;

    if !inserted {
        return Err(AppError::AlreadyRegistered(format!(
            "Already registered for program {}",
            request.program_id
        )));
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Successfully registered for program" })),
    ))
}

/// Remove the user's registration for a program
pub async fn unregister(
    State(state): State<AppState>,
    Path((user_id, program_id)): Path<(Uuid, String)>,
) -> AppResult<Json<Value>> {
    state.registrations.delete(user_id, &program_id).await?;

    Ok(Json(
        json!({ "success": true, "message": "Successfully unregistered from program" }),
    ))
}

/// How many users are registered for a program
pub async fn registration_count(
    State(state): State<AppState>,
    Path(program_id): Path<String>,
) -> AppResult<Json<RegistrationCountResponse>> {
    let count = state.registrations.count_for(&program_id).await?;
    Ok(Json(RegistrationCountResponse { program_id, count }))
}
