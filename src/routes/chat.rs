//! Chat service REST routes (`/chat-service`).

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;

use super::auth::AuthToken;
use crate::response::{ApiError, ApiResponse};
use crate::services::chat_room::{self, ChatRoomError, CreateChatRoomDto, CreateChatRoomResponse};
use crate::services::room_store::Membership;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRoomRequest {
    user_key: String,
    school_class_id: i64,
}

/// `POST /chat-service/chat-room`
pub async fn create_chat_room(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
    Json(body): Json<CreateChatRoomRequest>,
) -> Result<ApiResponse<CreateChatRoomResponse>, ApiError> {
    let dto = CreateChatRoomDto {
        login_user_token: token,
        opponent_user_key: body.user_key,
        school_class_id: body.school_class_id,
    };
    Ok(ApiResponse::created(chat_room::create_chat_room(&state, &dto).await?))
}

/// `GET /chat-service/chat-rooms`
pub async fn list_chat_rooms(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
) -> Result<ApiResponse<Vec<Membership>>, ApiError> {
    let user = state
        .users
        .search_user_info(&token)
        .await
        .map_err(ChatRoomError::from)?;
    Ok(ApiResponse::ok(chat_room::list_chat_rooms(&state, user.user_id).await?))
}
