//! Chat room service — room creation, socket lifecycle, unread bookkeeping.
//!
//! DESIGN
//! ======
//! Rooms are deduplicated by user pair: creating a room for two users that
//! already share one returns the existing room id. Each member gets its own
//! membership row with a title rendered from the counterpart's role, so the
//! room list never needs a directory round trip.
//!
//! Live participants are counted in the [`CounterStore`] and connected
//! sockets are tracked in `AppState::live_rooms`. A relayed message bumps the
//! recipient's unread count only when the recipient has no live socket.
//!
//! [`CounterStore`]: crate::counter::CounterStore

use std::collections::HashMap;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::room_store::{Membership, NewMembership};
use crate::counter::CounterError;
use crate::directory::{DirectoryError, SchoolClassInfo, UserInfo, UserType, is_guardian_code};
use crate::response::ErrorCode;
use crate::state::{AppState, LiveClient};

const FATHER_SUFFIX: &str = " 아버지";
const MOTHER_SUFFIX: &str = " 어머니";
const STUDENT_SUFFIX: &str = " 학생";
const TEACHER_SUFFIX: &str = " 선생님";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatRoomError {
    #[error("채팅방이 존재하지 않습니다.")]
    MembershipNotFound { room_id: i64, user_id: i64 },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Counter(#[from] CounterError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for ChatRoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MembershipNotFound { .. } => "E_CHAT_ROOM_NOT_FOUND",
            Self::Directory(e) => e.error_code(),
            Self::Counter(e) => e.error_code(),
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::MembershipNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Directory(e) => e.status(),
            Self::Counter(e) => e.status(),
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Input for [`create_chat_room`].
#[derive(Debug, Clone)]
pub struct CreateChatRoomDto {
    pub login_user_token: String,
    pub opponent_user_key: String,
    pub school_class_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRoomResponse {
    pub room_id: i64,
    pub opponent_user_name: String,
    pub opponent_user_type: char,
    /// Empty unless the opponent is a guardian.
    pub opponent_users_child_name: String,
}

// =============================================================================
// CREATE
// =============================================================================

/// Create (or reuse) the room between the caller and the opponent.
///
/// # Errors
///
/// Returns a directory error if either identity or the class cannot be
/// resolved, or a database error if the room cannot be stored.
pub async fn create_chat_room(
    state: &AppState,
    dto: &CreateChatRoomDto,
) -> Result<CreateChatRoomResponse, ChatRoomError> {
    let login_user = state
        .users
        .search_user_info(&dto.login_user_token)
        .await?;
    debug!(user = %login_user.user_name, "chat room create: login user resolved");
    let opponent = state
        .users
        .search_user_info_by_user_key(&dto.opponent_user_key)
        .await?;
    debug!(user = %opponent.user_name, "chat room create: opponent resolved");

    if let Some(room_id) = state
        .rooms
        .find_room_id_by_user_pair(login_user.user_id, opponent.user_id)
        .await?
    {
        let child_name = resolve_child_name(state, dto.school_class_id, &opponent).await?;
        return Ok(CreateChatRoomResponse {
            room_id,
            opponent_user_name: opponent.user_name,
            opponent_user_type: opponent.user_type,
            opponent_users_child_name: child_name,
        });
    }

    let class_info = state
        .schools
        .search_school_class_info(dto.school_class_id)
        .await?;

    let opponent_child = resolve_child_name(state, dto.school_class_id, &opponent).await?;
    let login_child = resolve_child_name(state, dto.school_class_id, &login_user).await?;

    let login_user_room = new_membership(&class_info, login_user.user_id, &opponent, opponent_child);
    let opponent_room = new_membership(&class_info, opponent.user_id, &login_user, login_child);
    let response_child = login_user_room.child_name.clone();

    let created = state
        .rooms
        .create_room([login_user_room, opponent_room])
        .await?;
    if created.created {
        info!(room_id = created.room_id, login_user_id = login_user.user_id, opponent_id = opponent.user_id, "chat room created");
    }

    Ok(CreateChatRoomResponse {
        room_id: created.room_id,
        opponent_user_name: opponent.user_name,
        opponent_user_type: opponent.user_type,
        opponent_users_child_name: response_child,
    })
}

/// Child's name when `user` is a guardian, empty otherwise.
async fn resolve_child_name(state: &AppState, school_class_id: i64, user: &UserInfo) -> Result<String, ChatRoomError> {
    if !is_guardian_code(user.user_type) {
        return Ok(String::new());
    }
    Ok(state
        .users
        .search_child_name(school_class_id, user.user_id)
        .await?)
}

fn new_membership(class_info: &SchoolClassInfo, user_id: i64, counterpart: &UserInfo, child_name: String) -> NewMembership {
    NewMembership {
        user_id,
        opponent_user_id: counterpart.user_id,
        chat_room_title: generate_chat_room_title(&class_info.class_name, counterpart, &child_name),
        opponent_user_type: counterpart.user_type,
        child_name,
    }
}

/// Render the title a member sees for a room with `counterpart`.
///
/// Guardians are named through their child (`1학년 3반 이예리 어머니`);
/// students and everyone else by their own name.
#[must_use]
pub fn generate_chat_room_title(class_name: &str, counterpart: &UserInfo, child_name: &str) -> String {
    match UserType::from_code(counterpart.user_type) {
        Some(UserType::Father) => format!("{class_name}{child_name}{FATHER_SUFFIX}"),
        Some(UserType::Mother) => format!("{class_name}{child_name}{MOTHER_SUFFIX}"),
        Some(UserType::Student) => format!("{class_name}{}{STUDENT_SUFFIX}", counterpart.user_name),
        Some(UserType::Teacher) | None => format!("{class_name}{}{TEACHER_SUFFIX}", counterpart.user_name),
    }
}

// =============================================================================
// LIST
// =============================================================================

/// The caller's room list.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_chat_rooms(state: &AppState, user_id: i64) -> Result<Vec<Membership>, ChatRoomError> {
    Ok(state.rooms.list_memberships(user_id).await?)
}

// =============================================================================
// CONNECT / DISCONNECT
// =============================================================================

/// Enter a room: mark the caller's membership read and count them as live.
/// Returns the live count after the increment.
///
/// # Errors
///
/// Returns `MembershipNotFound` if the caller is not a member of the room;
/// the counter is left untouched in that case.
pub async fn connect_chat_room(state: &AppState, room_id: i64, user_id: i64) -> Result<i64, ChatRoomError> {
    if !state.rooms.mark_read(room_id, user_id).await? {
        return Err(ChatRoomError::MembershipNotFound { room_id, user_id });
    }
    let count = state.counter.increment(room_id).await?;
    debug!(room_id, user_id, count, "chat room connect");
    Ok(count)
}

/// Leave a room. Returns the live count after the decrement.
///
/// # Errors
///
/// Returns a counter error if the store is unreachable.
pub async fn disconnect(state: &AppState, room_id: i64) -> Result<i64, ChatRoomError> {
    let count = state.counter.decrement(room_id).await?;
    debug!(room_id, count, "chat room disconnect");
    Ok(count)
}

/// Account for a message sent by `sender_id`. Returns `true` when the other
/// member had no live socket and their unread count was bumped.
///
/// Presence is decided per user, not per socket: a sender with several tabs
/// open still leaves an absent counterpart unread.
///
/// # Errors
///
/// Returns a database error.
pub async fn record_message(state: &AppState, room_id: i64, sender_id: i64) -> Result<bool, ChatRoomError> {
    if counterpart_live(state, room_id, sender_id).await {
        return Ok(false);
    }
    let affected = state
        .rooms
        .increment_unread_except(room_id, sender_id)
        .await?;
    Ok(affected > 0)
}

/// `true` when some user other than `sender_id` has a socket in the room.
async fn counterpart_live(state: &AppState, room_id: i64, sender_id: i64) -> bool {
    state
        .live_rooms
        .read()
        .await
        .get(&room_id)
        .is_some_and(|clients| clients.values().any(|c| c.user_id != sender_id))
}

// =============================================================================
// LIVE SOCKETS
// =============================================================================

/// Register a connected socket for relaying.
pub async fn join_live(state: &AppState, room_id: i64, client_id: Uuid, user_id: i64, tx: mpsc::Sender<String>) {
    let mut rooms = state.live_rooms.write().await;
    rooms
        .entry(room_id)
        .or_insert_with(HashMap::new)
        .insert(client_id, LiveClient { user_id, tx });
}

/// Drop a socket; evicts the room entry once empty.
pub async fn part_live(state: &AppState, room_id: i64, client_id: Uuid) {
    let mut rooms = state.live_rooms.write().await;
    if let Some(clients) = rooms.get_mut(&room_id) {
        clients.remove(&client_id);
        if clients.is_empty() {
            rooms.remove(&room_id);
        }
    }
}

/// Forward `text` to every other live socket in the room. Returns the
/// number of sockets it was queued for.
pub async fn relay(state: &AppState, room_id: i64, from_client: Uuid, text: &str) -> usize {
    let rooms = state.live_rooms.read().await;
    let Some(clients) = rooms.get(&room_id) else {
        return 0;
    };
    let mut delivered = 0;
    for (client_id, client) in clients {
        if *client_id == from_client {
            continue;
        }
        match client.tx.try_send(text.to_owned()) {
            Ok(()) => delivered += 1,
            Err(e) => debug!(room_id, to_user = client.user_id, error = %e, "relay: client queue unavailable"),
        }
    }
    delivered
}

#[cfg(test)]
#[path = "chat_room_test.rs"]
mod tests;
