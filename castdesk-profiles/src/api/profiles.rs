//! Profile endpoints
//!
//! GET returns the read-model (questionnaire answers promoted to top-level
//! fields). POST and PATCH take an unseparated JSON object of profile
//! columns and questionnaire answers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use castdesk_common::ProfileRecord;
use serde_json::Value;

use super::ApiError;
use crate::partition::into_payload;
use crate::reconciler::ProfileView;
use crate::AppState;

/// GET /api/profiles/:subject_id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    state
        .reconciler
        .get_profile(&subject_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("profile for subject {}", subject_id)))
}

/// POST /api/profiles/:subject_id
///
/// Creates the profile. A subject that already has one gets the body merged
/// into it instead of a second row.
pub async fn create_profile(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ProfileRecord>), ApiError> {
    let payload = into_payload(body)?;
    let record = state.reconciler.create_profile(&subject_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PATCH /api/profiles/:subject_id
pub async fn update_profile(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let payload = into_payload(body)?;
    let record = state.reconciler.update_profile(&subject_id, &payload).await?;
    Ok(Json(record))
}
