//! Consult service routes (`/consult-service`).

use axum::extract::{Path, State};
use axum::response::Json;

use super::auth::AuthToken;
use crate::response::{ApiError, ApiResponse};
use crate::services::consult::{self, ConsultDetailResponse, ConsultResponse, CreateConsultDto};
use crate::state::AppState;

/// `POST /consult-service/consults`
pub async fn create_consult(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    Json(body): Json<CreateConsultDto>,
) -> Result<ApiResponse<ConsultResponse>, ApiError> {
    Ok(ApiResponse::created(consult::create_consult(&state, &token, &body).await?))
}

/// `GET /consult-service/consults`
pub async fn search_consults(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
) -> Result<ApiResponse<Vec<ConsultResponse>>, ApiError> {
    Ok(ApiResponse::ok(consult::search_consults(&state, &token).await?))
}

/// `GET /consult-service/consults/{consultId}`
pub async fn search_consult(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    Path(consult_id): Path<i64>,
) -> Result<ApiResponse<ConsultDetailResponse>, ApiError> {
    Ok(ApiResponse::ok(consult::search_consult(&state, &token, consult_id).await?))
}
