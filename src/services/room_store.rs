//! Room repository — persistence for chat rooms and memberships.
//!
//! DESIGN
//! ======
//! The chat room service talks to [`RoomStore`] so room orchestration can be
//! exercised without Postgres. [`PgRoomStore`] is the production backend.
//!
//! INVARIANTS
//! ==========
//! At most one room exists per unordered user pair. `create_room` takes a
//! transaction-scoped advisory lock on the pair and re-checks for an
//! existing room before inserting, so two racing creates converge on one room.

use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::db::code_char;

// =============================================================================
// TYPES
// =============================================================================

/// One member's view of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: i64,
    pub chat_room_id: i64,
    pub user_id: i64,
    pub opponent_user_id: i64,
    pub chat_room_title: String,
    pub opponent_user_type: char,
    pub unread_count: i32,
    pub is_alarm: bool,
    pub child_name: String,
}

/// Membership row to insert alongside a new room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
    pub user_id: i64,
    pub opponent_user_id: i64,
    pub chat_room_title: String,
    pub opponent_user_type: char,
    pub child_name: String,
}

/// Outcome of `create_room`: the pair's room and whether it was just made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedRoom {
    pub room_id: i64,
    pub created: bool,
}

#[async_trait::async_trait]
pub trait RoomStore: Send + Sync {
    /// Room shared by the two users, in either direction.
    async fn find_room_id_by_user_pair(&self, user_id: i64, other_user_id: i64) -> Result<Option<i64>, sqlx::Error>;

    /// Create a room with exactly these two memberships, unless the pair
    /// already has one.
    async fn create_room(&self, members: [NewMembership; 2]) -> Result<CreatedRoom, sqlx::Error>;

    #[cfg(test)]
    async fn find_membership(&self, room_id: i64, user_id: i64) -> Result<Option<Membership>, sqlx::Error>;

    /// Reset the member's unread count. Returns `false` when no row matched.
    async fn mark_read(&self, room_id: i64, user_id: i64) -> Result<bool, sqlx::Error>;

    /// Bump the unread count of every member other than `sender_id`.
    async fn increment_unread_except(&self, room_id: i64, sender_id: i64) -> Result<u64, sqlx::Error>;

    async fn list_memberships(&self, user_id: i64) -> Result<Vec<Membership>, sqlx::Error>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MEMBERSHIP_COLUMNS: &str = "id, chat_room_id, user_id, opponent_user_id, chat_room_title, \
                                  opponent_user_type, unread_count, is_alarm, child_name";

fn membership_from_row(row: &sqlx::postgres::PgRow) -> Membership {
    let opponent_user_type: String = row.get("opponent_user_type");
    Membership {
        id: row.get("id"),
        chat_room_id: row.get("chat_room_id"),
        user_id: row.get("user_id"),
        opponent_user_id: row.get("opponent_user_id"),
        chat_room_title: row.get("chat_room_title"),
        opponent_user_type: code_char(&opponent_user_type),
        unread_count: row.get("unread_count"),
        is_alarm: row.get("is_alarm"),
        child_name: row.get("child_name"),
    }
}

async fn pair_room_id<'e, E>(executor: E, user_id: i64, other_user_id: i64) -> Result<Option<i64>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        "SELECT chat_room_id FROM chat_room_users
         WHERE (user_id = $1 AND opponent_user_id = $2)
            OR (user_id = $2 AND opponent_user_id = $1)
         ORDER BY chat_room_id ASC
         LIMIT 1",
    )
    .bind(user_id)
    .bind(other_user_id)
    .fetch_optional(executor)
    .await
}

#[async_trait::async_trait]
impl RoomStore for PgRoomStore {
    async fn find_room_id_by_user_pair(&self, user_id: i64, other_user_id: i64) -> Result<Option<i64>, sqlx::Error> {
        pair_room_id(&self.pool, user_id, other_user_id).await
    }

    async fn create_room(&self, members: [NewMembership; 2]) -> Result<CreatedRoom, sqlx::Error> {
        let low = members[0].user_id.min(members[1].user_id);
        let high = members[0].user_id.max(members[1].user_id);

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("chat_room_pair:{low}:{high}"))
            .execute(&mut *tx)
            .await?;

        if let Some(room_id) = pair_room_id(&mut *tx, low, high).await? {
            tx.commit().await?;
            return Ok(CreatedRoom { room_id, created: false });
        }

        let room_id: i64 = sqlx::query_scalar("INSERT INTO chat_rooms DEFAULT VALUES RETURNING id")
            .fetch_one(&mut *tx)
            .await?;

        for member in &members {
            sqlx::query(
                "INSERT INTO chat_room_users
                     (chat_room_id, user_id, opponent_user_id, chat_room_title, opponent_user_type, child_name)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(room_id)
            .bind(member.user_id)
            .bind(member.opponent_user_id)
            .bind(&member.chat_room_title)
            .bind(member.opponent_user_type.to_string())
            .bind(&member.child_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(CreatedRoom { room_id, created: true })
    }

    #[cfg(test)]
    async fn find_membership(&self, room_id: i64, user_id: i64) -> Result<Option<Membership>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM chat_room_users WHERE chat_room_id = $1 AND user_id = $2"
        ))
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(membership_from_row))
    }

    async fn mark_read(&self, room_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE chat_room_users SET unread_count = 0 WHERE chat_room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_unread_except(&self, room_id: i64, sender_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chat_room_users SET unread_count = unread_count + 1
             WHERE chat_room_id = $1 AND user_id <> $2",
        )
        .bind(room_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_memberships(&self, user_id: i64) -> Result<Vec<Membership>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM chat_room_users WHERE user_id = $1 ORDER BY chat_room_id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(membership_from_row).collect())
    }
}

// =============================================================================
// IN-MEMORY (tests)
// =============================================================================

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use super::*;

    /// Vec-backed store mirroring the Postgres semantics.
    #[derive(Default)]
    pub struct MemoryRoomStore {
        inner: Mutex<Inner>,
    }

    #[derive(Default)]
    struct Inner {
        next_room_id: i64,
        rooms: Vec<i64>,
        memberships: Vec<Membership>,
    }

    impl MemoryRoomStore {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn room_count(&self) -> usize {
            self.inner.lock().unwrap().rooms.len()
        }

        pub fn memberships_of_room(&self, room_id: i64) -> Vec<Membership> {
            self.inner
                .lock()
                .unwrap()
                .memberships
                .iter()
                .filter(|m| m.chat_room_id == room_id)
                .cloned()
                .collect()
        }

        pub fn set_unread(&self, room_id: i64, user_id: i64, unread: i32) {
            let mut inner = self.inner.lock().unwrap();
            for m in &mut inner.memberships {
                if m.chat_room_id == room_id && m.user_id == user_id {
                    m.unread_count = unread;
                }
            }
        }
    }

    fn pair_room(inner: &Inner, a: i64, b: i64) -> Option<i64> {
        inner
            .memberships
            .iter()
            .find(|m| (m.user_id == a && m.opponent_user_id == b) || (m.user_id == b && m.opponent_user_id == a))
            .map(|m| m.chat_room_id)
    }

    #[async_trait::async_trait]
    impl RoomStore for MemoryRoomStore {
        async fn find_room_id_by_user_pair(&self, user_id: i64, other_user_id: i64) -> Result<Option<i64>, sqlx::Error> {
            Ok(pair_room(&self.inner.lock().unwrap(), user_id, other_user_id))
        }

        async fn create_room(&self, members: [NewMembership; 2]) -> Result<CreatedRoom, sqlx::Error> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(room_id) = pair_room(&inner, members[0].user_id, members[1].user_id) {
                return Ok(CreatedRoom { room_id, created: false });
            }
            inner.next_room_id += 1;
            let room_id = inner.next_room_id;
            inner.rooms.push(room_id);
            for member in members {
                let id = i64::try_from(inner.memberships.len()).unwrap() + 1;
                inner.memberships.push(Membership {
                    id,
                    chat_room_id: room_id,
                    user_id: member.user_id,
                    opponent_user_id: member.opponent_user_id,
                    chat_room_title: member.chat_room_title,
                    opponent_user_type: member.opponent_user_type,
                    unread_count: 0,
                    is_alarm: true,
                    child_name: member.child_name,
                });
            }
            Ok(CreatedRoom { room_id, created: true })
        }

        async fn find_membership(&self, room_id: i64, user_id: i64) -> Result<Option<Membership>, sqlx::Error> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .memberships
                .iter()
                .find(|m| m.chat_room_id == room_id && m.user_id == user_id)
                .cloned())
        }

        async fn mark_read(&self, room_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
            let mut inner = self.inner.lock().unwrap();
            let mut matched = false;
            for m in &mut inner.memberships {
                if m.chat_room_id == room_id && m.user_id == user_id {
                    m.unread_count = 0;
                    matched = true;
                }
            }
            Ok(matched)
        }

        async fn increment_unread_except(&self, room_id: i64, sender_id: i64) -> Result<u64, sqlx::Error> {
            let mut inner = self.inner.lock().unwrap();
            let mut affected = 0;
            for m in &mut inner.memberships {
                if m.chat_room_id == room_id && m.user_id != sender_id {
                    m.unread_count += 1;
                    affected += 1;
                }
            }
            Ok(affected)
        }

        async fn list_memberships(&self, user_id: i64) -> Result<Vec<Membership>, sqlx::Error> {
            let mut rows: Vec<Membership> = self
                .inner
                .lock()
                .unwrap()
                .memberships
                .iter()
                .filter(|m| m.user_id == user_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.chat_room_id.cmp(&a.chat_room_id));
            Ok(rows)
        }
    }
}

#[cfg(test)]
#[path = "room_store_test.rs"]
mod tests;
