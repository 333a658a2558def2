//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the database pool, the trait objects for every external dependency
//! (room repository, directories, counter store) and the map of live chat
//! sockets used for relaying.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::counter::CounterStore;
use crate::directory::{SchoolDirectory, UserDirectory};
use crate::services::room_store::RoomStore;

/// A connected chat socket.
pub struct LiveClient {
    pub user_id: i64,
    pub tx: mpsc::Sender<String>,
}

/// `room_id` -> `client_id` -> socket.
pub type LiveRooms = HashMap<i64, HashMap<Uuid, LiveClient>>;

/// Settings handlers need at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub ttl_hours: i64,
    pub cookie_secure: bool,
}

impl SessionSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self { ttl_hours: config.session_ttl_hours, cookie_secure: config.cookie_secure }
    }
}

/// Clone is required by Axum; every inner field is Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub rooms: Arc<dyn RoomStore>,
    pub users: Arc<dyn UserDirectory>,
    pub schools: Arc<dyn SchoolDirectory>,
    pub counter: Arc<dyn CounterStore>,
    pub live_rooms: Arc<RwLock<LiveRooms>>,
    pub session: SessionSettings,
}

impl AppState {
    #[must_use]
    pub fn new(
        pool: PgPool,
        rooms: Arc<dyn RoomStore>,
        users: Arc<dyn UserDirectory>,
        schools: Arc<dyn SchoolDirectory>,
        counter: Arc<dyn CounterStore>,
        session: SessionSettings,
    ) -> Self {
        Self { pool, rooms, users, schools, counter, live_rooms: Arc::new(RwLock::new(HashMap::new())), session }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
