//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every service keeps its own path prefix so the services can later be
//! deployed apart by pointing the directory clients at other base URLs.
//! Routes here only translate HTTP to service calls.

pub mod auth;
pub mod calls;
pub mod chat;
pub mod consults;
pub mod schools;
pub mod users;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // User service
        .route("/user-service/join", post(users::join))
        .route("/user-service/login", post(users::login))
        .route("/user-service/logout", post(users::logout))
        .route("/user-service/pwd", patch(users::edit_pwd))
        .route("/user-service/pwd/reset", post(users::reset_pwd))
        .route("/user-service/email/forget", post(users::forget_email))
        .route("/user-service/withdrawal", delete(users::withdrawal))
        .route("/user-service/client/v1/user-info", get(users::user_info))
        .route("/user-service/client/v1/user-info/{user_key}", get(users::user_info_by_key))
        .route("/user-service/client/v1/child-name", get(users::child_name))
        // Chat service
        .route("/chat-service/chat-room", post(chat::create_chat_room))
        .route("/chat-service/chat-rooms", get(chat::list_chat_rooms))
        .route("/chat-service/ws/{room_id}", get(ws::handle_ws))
        // School service
        .route("/school-service/v1/schools", get(schools::search_schools))
        .route("/school-service/v1/school/{school_id}", get(schools::search_one_school))
        .route("/school-service/enroll/{user_key}", get(schools::search_my_enroll))
        .route("/school-service/classroom/{user_key}", get(schools::search_my_classroom))
        .route("/school-service/enroll/teacher/{school_class_id}", get(schools::search_enrolls))
        .route("/school-service/client/v1/school-class/{school_class_id}", get(schools::school_class_info))
        // Consult service
        .route("/consult-service/consults", get(consults::search_consults).post(consults::create_consult))
        .route("/consult-service/consults/{consult_id}", get(consults::search_consult))
        // Call service
        .route("/call-service/calls", get(calls::search_calls))
        .route("/call-service/calls/{other_user_key}", post(calls::create_call))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Serve the router on an ephemeral local port.
#[cfg(test)]
pub(crate) async fn spawn_test_server(state: AppState) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app(state))
            .await
            .expect("test server failed");
    });
    addr
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
