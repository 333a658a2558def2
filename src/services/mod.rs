//! Domain services used by the HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence so route handlers can
//! stay focused on protocol translation and auth plumbing. Cross-service
//! identity and class lookups go through the directory traits on `AppState`.

pub mod call;
pub mod chat_room;
pub mod consult;
pub mod password;
pub mod room_store;
pub mod school;
pub mod session;
pub mod user;
