//! User service — accounts, credentials and identity lookups.
//!
//! DESIGN
//! ======
//! Accounts are keyed internally by a BIGSERIAL id and publicly by a UUID
//! user key. Withdrawal is a soft delete: the row stays with `is_deleted`
//! set and every lookup filters it out. Emails are normalized (trimmed,
//! lower-cased) before every read and write so uniqueness is
//! case-insensitive.
//!
//! The identity lookups at the bottom back the user directory endpoints
//! consumed by the chat, consult and call services.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::password::{PasswordError, generate_temp_password, hash_password, verify_password};
use super::session;
use crate::db::code_char;
use crate::directory::{UserInfo, UserType};
use crate::response::ErrorCode;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("이메일 형식이 올바르지 않습니다.")]
    InvalidEmail,
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("이미 사용 중인 이메일 입니다.")]
    DuplicateEmail,
    #[error("이메일을 확인해주세요.")]
    EmailNotFound,
    #[error("현재 비밀번호가 일치하지 않습니다.")]
    PasswordMismatch,
    #[error("이메일 또는 비밀번호를 확인해주세요.")]
    LoginFailed,
    #[error("로그인이 필요합니다.")]
    InvalidSession,
    #[error("존재하지 않는 회원입니다.")]
    UserNotFound,
    #[error("자녀 정보가 없습니다.")]
    ChildNotFound,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for UserError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "E_INVALID_EMAIL",
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::DuplicateEmail => "E_DUPLICATE_EMAIL",
            Self::EmailNotFound => "E_EMAIL_NOT_FOUND",
            Self::PasswordMismatch => "E_PASSWORD_MISMATCH",
            Self::LoginFailed => "E_LOGIN_FAILED",
            Self::InvalidSession => "E_UNAUTHORIZED",
            Self::UserNotFound => "E_USER_NOT_FOUND",
            Self::ChildNotFound => "E_CHILD_NOT_FOUND",
            Self::Password(_) => "E_PASSWORD_HASH",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEmail | Self::InvalidInput(_) | Self::PasswordMismatch => StatusCode::BAD_REQUEST,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::EmailNotFound | Self::UserNotFound | Self::ChildNotFound => StatusCode::NOT_FOUND,
            Self::LoginFailed | Self::InvalidSession => StatusCode::UNAUTHORIZED,
            Self::Password(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinUserDto {
    pub user_type: char,
    pub email: String,
    pub pwd: String,
    pub name: String,
    pub birth: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub email: String,
    pub name: String,
    #[serde(rename = "type")]
    pub user_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResponse {
    pub email: String,
    pub name: String,
    #[serde(rename = "type")]
    pub user_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub withdrawal_date: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_key: Uuid,
    pub name: String,
    pub user_type: char,
}

struct UserRow {
    id: i64,
    user_key: Uuid,
    email: String,
    pwd_hash: String,
    name: String,
    user_type: char,
    created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, user_key, email, pwd_hash, name, user_type, created_at";

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRow {
    let user_type: String = row.get("user_type");
    UserRow {
        id: row.get("id"),
        user_key: row.get("user_key"),
        email: row.get("email"),
        pwd_hash: row.get("pwd_hash"),
        name: row.get("name"),
        user_type: code_char(&user_type),
        created_at: row.get("created_at"),
    }
}

fn type_text(code: char) -> String {
    UserType::from_code(code)
        .map_or("", UserType::text)
        .to_owned()
}

impl UserRow {
    fn response(&self) -> UserResponse {
        UserResponse {
            email: self.email.clone(),
            name: self.name.clone(),
            user_type: type_text(self.user_type),
            created_date: self.created_at,
        }
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// `ssafy@gmail.com` -> `ss***@gmail.com`. Local parts of two characters or
/// fewer keep only their first character.
#[must_use]
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_owned();
    };
    let count = local.chars().count();
    let keep = if count > 2 { 2 } else { 1.min(count) };
    let visible: String = local.chars().take(keep).collect();
    let hidden = "*".repeat(count - keep);
    format!("{visible}{hidden}@{domain}")
}

fn validate_join(dto: &JoinUserDto) -> Result<String, UserError> {
    let email = normalize_email(&dto.email).ok_or(UserError::InvalidEmail)?;
    if UserType::from_code(dto.user_type).is_none() {
        return Err(UserError::InvalidInput("회원 유형이 올바르지 않습니다."));
    }
    if dto.pwd.is_empty() {
        return Err(UserError::InvalidInput("비밀번호를 입력해주세요."));
    }
    if dto.name.trim().is_empty() {
        return Err(UserError::InvalidInput("이름을 입력해주세요."));
    }
    Ok(email)
}

// =============================================================================
// QUERIES
// =============================================================================

async fn find_active_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND NOT is_deleted"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(user_from_row))
}

/// Active account for `email` whose password matches, or the matching
/// not-found / mismatch error.
async fn authenticate(pool: &PgPool, email: &str, pwd: &str) -> Result<UserRow, UserError> {
    let email = normalize_email(email).ok_or(UserError::EmailNotFound)?;
    let user = find_active_by_email(pool, &email)
        .await?
        .ok_or(UserError::EmailNotFound)?;
    if !verify_password(pwd, &user.pwd_hash) {
        return Err(UserError::PasswordMismatch);
    }
    Ok(user)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

// =============================================================================
// ACCOUNT OPERATIONS
// =============================================================================

/// Register a new account.
///
/// # Errors
///
/// `DuplicateEmail` when any account (withdrawn included) already uses the
/// email; validation errors for malformed input.
pub async fn join(pool: &PgPool, dto: &JoinUserDto) -> Result<UserResponse, UserError> {
    let email = validate_join(dto)?;

    let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(pool)
        .await?;
    if taken {
        return Err(UserError::DuplicateEmail);
    }

    let pwd_hash = hash_password(&dto.pwd)?;
    let row = sqlx::query(&format!(
        "INSERT INTO users (user_key, email, pwd_hash, name, birth, user_type)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&pwd_hash)
    .bind(dto.name.trim())
    .bind(dto.birth.trim())
    .bind(dto.user_type.to_string())
    .fetch_one(pool)
    .await
    .map_err(|e| if is_unique_violation(&e) { UserError::DuplicateEmail } else { UserError::Database(e) })?;

    let user = user_from_row(&row);
    info!(user_id = user.id, user_type = %user.user_type, "user joined");
    Ok(user.response())
}

/// Verify credentials and open a session.
///
/// # Errors
///
/// `LoginFailed` for an unknown email or a wrong password.
pub async fn login(pool: &PgPool, email: &str, pwd: &str, ttl_hours: i64) -> Result<LoginResponse, UserError> {
    let user = match authenticate(pool, email, pwd).await {
        Ok(user) => user,
        Err(UserError::EmailNotFound | UserError::PasswordMismatch) => return Err(UserError::LoginFailed),
        Err(e) => return Err(e),
    };
    let token = session::create_session(pool, user.id, ttl_hours).await?;
    info!(user_id = user.id, "user logged in");
    Ok(LoginResponse { token, user_key: user.user_key, name: user.name, user_type: user.user_type })
}

/// Close a session. Unknown tokens are ignored.
pub async fn logout(pool: &PgPool, token: &str) -> Result<(), UserError> {
    session::delete_session(pool, token).await?;
    Ok(())
}

/// Replace the password after checking the current one. Every open
/// session of the account is revoked.
///
/// # Errors
///
/// `EmailNotFound` when no active account uses the email;
/// `PasswordMismatch` when `current_pwd` is wrong.
pub async fn edit_pwd(pool: &PgPool, email: &str, current_pwd: &str, new_pwd: &str) -> Result<UserResponse, UserError> {
    let user = authenticate(pool, email, current_pwd).await?;
    if new_pwd.is_empty() {
        return Err(UserError::InvalidInput("비밀번호를 입력해주세요."));
    }
    sqlx::query("UPDATE users SET pwd_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user.id)
        .bind(hash_password(new_pwd)?)
        .execute(pool)
        .await?;
    session::delete_user_sessions(pool, user.id).await?;
    info!(user_id = user.id, "password changed");
    Ok(user.response())
}

/// Issue a temporary password for an account matched by email and name.
///
/// # Errors
///
/// `EmailNotFound` when no active account matches both.
pub async fn reset_pwd(pool: &PgPool, email: &str, name: &str) -> Result<String, UserError> {
    let email = normalize_email(email).ok_or(UserError::EmailNotFound)?;
    let user = find_active_by_email(pool, &email)
        .await?
        .filter(|u| u.name == name.trim())
        .ok_or(UserError::EmailNotFound)?;

    let temp = generate_temp_password();
    sqlx::query("UPDATE users SET pwd_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user.id)
        .bind(hash_password(&temp)?)
        .execute(pool)
        .await?;
    session::delete_user_sessions(pool, user.id).await?;
    info!(user_id = user.id, "password reset");
    Ok(temp)
}

/// Masked emails of active accounts with this name and birth date.
pub async fn forget_email(pool: &PgPool, name: &str, birth: &str) -> Result<Vec<String>, UserError> {
    let emails: Vec<String> = sqlx::query_scalar(
        "SELECT email FROM users WHERE name = $1 AND birth = $2 AND NOT is_deleted ORDER BY id",
    )
    .bind(name.trim())
    .bind(birth.trim())
    .fetch_all(pool)
    .await?;
    Ok(emails.iter().map(|e| mask_email(e)).collect())
}

/// Soft-delete an account after checking its password.
///
/// # Errors
///
/// `EmailNotFound` when no active account uses the email;
/// `PasswordMismatch` when `pwd` is wrong.
pub async fn withdrawal(pool: &PgPool, email: &str, pwd: &str) -> Result<WithdrawalResponse, UserError> {
    let user = authenticate(pool, email, pwd).await?;
    let withdrawal_date: OffsetDateTime = sqlx::query_scalar(
        "UPDATE users SET is_deleted = TRUE, deleted_at = now(), updated_at = now()
         WHERE id = $1
         RETURNING deleted_at",
    )
    .bind(user.id)
    .fetch_one(pool)
    .await?;
    session::delete_user_sessions(pool, user.id).await?;
    info!(user_id = user.id, "user withdrew");
    Ok(WithdrawalResponse {
        email: user.email,
        name: user.name,
        user_type: type_text(user.user_type),
        withdrawal_date,
    })
}

// =============================================================================
// IDENTITY LOOKUPS
// =============================================================================

/// The class a user currently belongs to: the newest class they teach, or
/// the newest approved enrollment where they are the student or guardian.
async fn current_school_class_id(pool: &PgPool, user_id: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r"SELECT COALESCE(
              (SELECT sc.id FROM school_classes sc
               WHERE sc.teacher_id = $1
               ORDER BY sc.school_year DESC, sc.id DESC LIMIT 1),
              (SELECT stc.school_class_id FROM student_classes stc
               WHERE (stc.student_id = $1 OR stc.parent_id = $1) AND stc.is_approved
               ORDER BY stc.applied_at DESC LIMIT 1)
          )",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Identity of the holder of a session token.
///
/// # Errors
///
/// `InvalidSession` for unknown or expired tokens.
pub async fn search_user_info(pool: &PgPool, token: &str) -> Result<UserInfo, UserError> {
    let user = session::validate_session(pool, token)
        .await?
        .ok_or(UserError::InvalidSession)?;
    Ok(UserInfo {
        user_id: user.id,
        user_type: user.user_type,
        user_name: user.name,
        school_class_id: current_school_class_id(pool, user.id).await?,
    })
}

/// Identity behind a public user key.
///
/// # Errors
///
/// `UserNotFound` for malformed, unknown or withdrawn keys.
pub async fn search_user_info_by_user_key(pool: &PgPool, user_key: &str) -> Result<UserInfo, UserError> {
    let key = Uuid::parse_str(user_key.trim()).map_err(|_| UserError::UserNotFound)?;
    let row = sqlx::query("SELECT id, name, user_type FROM users WHERE user_key = $1 AND NOT is_deleted")
        .bind(key)
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::UserNotFound)?;
    let user_id: i64 = row.get("id");
    let user_type: String = row.get("user_type");
    Ok(UserInfo {
        user_id,
        user_type: code_char(&user_type),
        user_name: row.get("name"),
        school_class_id: current_school_class_id(pool, user_id).await?,
    })
}

/// Internal id of an active account by user key.
pub async fn find_user_id_by_key(pool: &PgPool, user_key: &str) -> Result<i64, UserError> {
    let key = Uuid::parse_str(user_key.trim()).map_err(|_| UserError::UserNotFound)?;
    sqlx::query_scalar("SELECT id FROM users WHERE user_key = $1 AND NOT is_deleted")
        .bind(key)
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::UserNotFound)
}

/// Name of the guardian's child enrolled in the class.
///
/// # Errors
///
/// `ChildNotFound` when the guardian has no child in that class.
pub async fn search_child_name(pool: &PgPool, school_class_id: i64, parent_id: i64) -> Result<String, UserError> {
    sqlx::query_scalar(
        r"SELECT u.name
          FROM student_classes stc
          JOIN users u ON u.id = stc.student_id
          WHERE stc.school_class_id = $1 AND stc.parent_id = $2
          ORDER BY stc.applied_at DESC
          LIMIT 1",
    )
    .bind(school_class_id)
    .bind(parent_id)
    .fetch_optional(pool)
    .await?
    .ok_or(UserError::ChildNotFound)
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
