//! Questionnaire document endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use castdesk_common::{Error, QuestionnaireDocument};
use serde_json::Value;

use super::ApiError;
use crate::AppState;

/// GET /api/profiles/:subject_id/questionnaire
///
/// Always an object; `{}` when nothing has been recorded.
pub async fn get_questionnaire(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<QuestionnaireDocument>, ApiError> {
    let document = state
        .reconciler
        .get_questionnaire_responses(&subject_id)
        .await?;
    Ok(Json(document))
}

/// PUT /api/profiles/:subject_id/questionnaire
///
/// Merges the body (namespace -> field -> answer) into the stored document,
/// creating the profile on first save.
pub async fn save_questionnaire(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let responses: QuestionnaireDocument = serde_json::from_value(body)
        .map_err(|e| Error::MalformedPayload(format!("invalid questionnaire document: {}", e)))?;

    state
        .reconciler
        .save_questionnaire_responses(&subject_id, responses)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
