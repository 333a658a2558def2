//! User service routes (`/user-service`).

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::auth::{AuthToken, cleared_session_cookie, session_cookie};
use crate::directory::UserInfo;
use crate::response::{ApiError, ApiResponse};
use crate::services::user::{self, JoinUserDto, LoginResponse, UserResponse, WithdrawalResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    pwd: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPwdRequest {
    email: String,
    current_pwd: String,
    new_pwd: String,
}

#[derive(Deserialize)]
pub struct ResetPwdRequest {
    email: String,
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPwdResponse {
    temp_pwd: String,
}

#[derive(Deserialize)]
pub struct ForgetEmailRequest {
    name: String,
    birth: String,
}

#[derive(Deserialize)]
pub struct WithdrawalRequest {
    email: String,
    pwd: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildNameQuery {
    school_class_id: i64,
    parent_id: i64,
}

/// `POST /user-service/join`
pub async fn join(
    State(state): State<AppState>,
    Json(body): Json<JoinUserDto>,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    Ok(ApiResponse::created(user::join(&state.pool, &body).await?))
}

/// `POST /user-service/login` — returns the token and sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response: LoginResponse = user::login(&state.pool, &body.email, &body.pwd, state.session.ttl_hours).await?;
    let cookie = session_cookie(response.token.clone(), state.session.cookie_secure, state.session.ttl_hours);
    Ok((jar.add(cookie), ApiResponse::ok(response)))
}

/// `POST /user-service/logout` — delete the session and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    AuthToken(token): AuthToken,
) -> Result<impl IntoResponse, ApiError> {
    user::logout(&state.pool, &token).await?;
    let jar = jar.add(cleared_session_cookie(state.session.cookie_secure));
    Ok((jar, ApiResponse::ok(())))
}

/// `PATCH /user-service/pwd`
pub async fn edit_pwd(
    State(state): State<AppState>,
    Json(body): Json<EditPwdRequest>,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    let response = user::edit_pwd(&state.pool, &body.email, &body.current_pwd, &body.new_pwd).await?;
    Ok(ApiResponse::ok(response))
}

/// `POST /user-service/pwd/reset`
pub async fn reset_pwd(
    State(state): State<AppState>,
    Json(body): Json<ResetPwdRequest>,
) -> Result<ApiResponse<ResetPwdResponse>, ApiError> {
    let temp_pwd = user::reset_pwd(&state.pool, &body.email, &body.name).await?;
    Ok(ApiResponse::ok(ResetPwdResponse { temp_pwd }))
}

/// `POST /user-service/email/forget`
pub async fn forget_email(
    State(state): State<AppState>,
    Json(body): Json<ForgetEmailRequest>,
) -> Result<ApiResponse<Vec<String>>, ApiError> {
    Ok(ApiResponse::ok(user::forget_email(&state.pool, &body.name, &body.birth).await?))
}

/// `DELETE /user-service/withdrawal`
pub async fn withdrawal(
    State(state): State<AppState>,
    Json(body): Json<WithdrawalRequest>,
) -> Result<ApiResponse<WithdrawalResponse>, ApiError> {
    Ok(ApiResponse::ok(user::withdrawal(&state.pool, &body.email, &body.pwd).await?))
}

// =============================================================================
// DIRECTORY ENDPOINTS
// =============================================================================

/// `GET /user-service/client/v1/user-info`
pub async fn user_info(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
) -> Result<ApiResponse<UserInfo>, ApiError> {
    Ok(ApiResponse::ok(user::search_user_info(&state.pool, &token).await?))
}

/// `GET /user-service/client/v1/user-info/{userKey}`
pub async fn user_info_by_key(
    State(state): State<AppState>,
    Path(user_key): Path<String>,
) -> Result<ApiResponse<UserInfo>, ApiError> {
    Ok(ApiResponse::ok(user::search_user_info_by_user_key(&state.pool, &user_key).await?))
}

/// `GET /user-service/client/v1/child-name?schoolClassId=&parentId=`
pub async fn child_name(
    State(state): State<AppState>,
    Query(query): Query<ChildNameQuery>,
) -> Result<ApiResponse<String>, ApiError> {
    let name = user::search_child_name(&state.pool, query.school_class_id, query.parent_id).await?;
    Ok(ApiResponse::ok(name))
}
