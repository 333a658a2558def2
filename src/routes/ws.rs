//! WebSocket handler — chat room lifecycle and text relay.
//!
//! DESIGN
//! ======
//! The caller's token is resolved and the room connect (membership check,
//! unread reset, live count increment) runs before the upgrade, so a
//! non-member gets a plain HTTP error instead of a socket that closes.
//!
//! LIFECYCLE
//! =========
//! 1. `GET /chat-service/ws/{roomId}?token=` → connect → upgrade
//! 2. Client text → relay to the other live socket + unread bookkeeping
//! 3. Close → part live map → disconnect (live count decrement)

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::response::ApiError;
use crate::services::chat_room::{self, ChatRoomError};
use crate::state::AppState;

const CLIENT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = params.get("token").filter(|t| !t.is_empty()) else {
        return ApiError::unauthorized().into_response();
    };

    let user = match state.users.search_user_info(token).await {
        Ok(user) => user,
        Err(e) => return ApiError::from(ChatRoomError::from(e)).into_response(),
    };

    if let Err(e) = chat_room::connect_chat_room(&state, room_id, user.user_id).await {
        return ApiError::from(e).into_response();
    }

    let user_id = user.user_id;
    let failed_state = state.clone();
    ws.on_failed_upgrade(move |error| {
        warn!(%error, room_id, user_id, "ws: upgrade failed");
        tokio::spawn(async move {
            if let Err(e) = chat_room::disconnect(&failed_state, room_id).await {
                warn!(error = %e, room_id, "ws: disconnect after failed upgrade failed");
            }
        });
    })
    .on_upgrade(move |socket| run_ws(socket, state, room_id, user_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, room_id: i64, user_id: i64) {
    let client_id = Uuid::new_v4();
    let (client_tx, mut client_rx) = mpsc::channel::<String>(CLIENT_CHANNEL_CAPACITY);
    chat_room::join_live(&state, room_id, client_id, user_id, client_tx).await;

    info!(%client_id, room_id, user_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => handle_text(&state, room_id, client_id, user_id, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(text) = client_rx.recv() => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    chat_room::part_live(&state, room_id, client_id).await;
    if let Err(e) = chat_room::disconnect(&state, room_id).await {
        warn!(error = %e, room_id, "ws: disconnect bookkeeping failed");
    }
    info!(%client_id, room_id, "ws: client disconnected");
}

async fn handle_text(state: &AppState, room_id: i64, client_id: Uuid, user_id: i64, text: &str) {
    let delivered = chat_room::relay(state, room_id, client_id, text).await;
    match chat_room::record_message(state, room_id, user_id).await {
        Ok(bumped) => tracing::debug!(room_id, delivered, unread_bumped = bumped, "ws: message relayed"),
        Err(e) => warn!(error = %e, room_id, "ws: unread bookkeeping failed"),
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
