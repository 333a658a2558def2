//! Call service routes (`/call-service`).

use axum::extract::{Path, State};
use axum::response::Json;

use super::auth::AuthToken;
use crate::response::{ApiError, ApiResponse};
use crate::services::call::{self, CreateUserCallDto, UserCallResponse};
use crate::state::AppState;

/// `POST /call-service/calls/{otherUserKey}`
pub async fn create_call(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    Path(other_user_key): Path<String>,
    Json(body): Json<CreateUserCallDto>,
) -> Result<ApiResponse<UserCallResponse>, ApiError> {
    Ok(ApiResponse::created(call::create_call_info(&state, &body, &other_user_key, &token).await?))
}

/// `GET /call-service/calls`
pub async fn search_calls(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
) -> Result<ApiResponse<Vec<UserCallResponse>>, ApiError> {
    Ok(ApiResponse::ok(call::search_calls(&state, &token).await?))
}
