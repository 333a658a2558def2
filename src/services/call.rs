//! Call service — call-log storage between a teacher and another user.
//!
//! A teacher's app uploads one record per finished call. The record names
//! which side placed the call (`T` teacher, `O` other user) and may flag the
//! recording as abusive.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use time::OffsetDateTime;
use tracing::info;

use crate::db::code_char;
use crate::directory::{DirectoryError, UserInfo, UserType};
use crate::response::ErrorCode;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSender {
    Teacher,
    Other,
}

impl CallSender {
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "T" => Some(Self::Teacher),
            "O" => Some(Self::Other),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Teacher => 'T',
            Self::Other => 'O',
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("발신자 정보가 올바르지 않습니다.")]
    InvalidSender(String),
    #[error("통화 종료 시간이 시작 시간보다 빠릅니다.")]
    InvalidPeriod,
    #[error("선생님만 통화 기록을 저장할 수 있습니다.")]
    NotTeacher,
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for CallError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidSender(_) => "E_INVALID_SENDER",
            Self::InvalidPeriod => "E_INVALID_PERIOD",
            Self::NotTeacher => "E_NOT_TEACHER",
            Self::Directory(e) => e.error_code(),
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidSender(_) | Self::InvalidPeriod => StatusCode::BAD_REQUEST,
            Self::NotTeacher => StatusCode::FORBIDDEN,
            Self::Directory(e) => e.status(),
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserCallDto {
    pub sender: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date_time: OffsetDateTime,
    #[serde(default)]
    pub upload_file_name: String,
    #[serde(default)]
    pub store_file_name: String,
    #[serde(default)]
    pub is_bad: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCallResponse {
    pub call_id: i64,
    pub sender_name: String,
    pub receiver_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date_time: OffsetDateTime,
    pub upload_file_name: String,
    pub is_bad: bool,
}

/// `(sender name, receiver name)` for a call between the two parties.
#[must_use]
pub fn call_parties<'a>(sender: CallSender, teacher_name: &'a str, other_name: &'a str) -> (&'a str, &'a str) {
    match sender {
        CallSender::Teacher => (teacher_name, other_name),
        CallSender::Other => (other_name, teacher_name),
    }
}

fn validate(dto: &CreateUserCallDto) -> Result<CallSender, CallError> {
    let sender = CallSender::from_code(&dto.sender).ok_or_else(|| CallError::InvalidSender(dto.sender.clone()))?;
    if dto.end_date_time < dto.start_date_time {
        return Err(CallError::InvalidPeriod);
    }
    Ok(sender)
}

fn ensure_teacher(user: &UserInfo) -> Result<(), CallError> {
    if UserType::from_code(user.user_type) == Some(UserType::Teacher) {
        Ok(())
    } else {
        Err(CallError::NotTeacher)
    }
}

/// Store a finished call placed between the teacher holding `token` and the
/// user behind `other_user_key`.
///
/// # Errors
///
/// Validation errors for an unknown sender code or an inverted period;
/// `NotTeacher` when the caller is not a teacher; directory errors for
/// unresolvable identities.
pub async fn create_call_info(
    state: &AppState,
    dto: &CreateUserCallDto,
    other_user_key: &str,
    token: &str,
) -> Result<UserCallResponse, CallError> {
    let sender = validate(dto)?;
    let teacher = state.users.search_user_info(token).await?;
    ensure_teacher(&teacher)?;
    let other = state
        .users
        .search_user_info_by_user_key(other_user_key)
        .await?;

    let call_id: i64 = sqlx::query_scalar(
        "INSERT INTO user_calls
             (teacher_id, other_user_id, sender, start_date_time, end_date_time,
              upload_file_name, store_file_name, is_bad)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id",
    )
    .bind(teacher.user_id)
    .bind(other.user_id)
    .bind(sender.code().to_string())
    .bind(dto.start_date_time)
    .bind(dto.end_date_time)
    .bind(&dto.upload_file_name)
    .bind(&dto.store_file_name)
    .bind(dto.is_bad)
    .fetch_one(&state.pool)
    .await?;

    info!(call_id, teacher_id = teacher.user_id, other_user_id = other.user_id, is_bad = dto.is_bad, "call stored");
    let (sender_name, receiver_name) = call_parties(sender, &teacher.user_name, &other.user_name);
    Ok(UserCallResponse {
        call_id,
        sender_name: sender_name.to_owned(),
        receiver_name: receiver_name.to_owned(),
        start_date_time: dto.start_date_time,
        end_date_time: dto.end_date_time,
        upload_file_name: dto.upload_file_name.clone(),
        is_bad: dto.is_bad,
    })
}

/// Call log of the signed-in teacher, newest first.
pub async fn search_calls(state: &AppState, token: &str) -> Result<Vec<UserCallResponse>, CallError> {
    let teacher = state.users.search_user_info(token).await?;
    ensure_teacher(&teacher)?;

    let rows = sqlx::query(
        r"SELECT uc.id, uc.sender, uc.start_date_time, uc.end_date_time, uc.upload_file_name, uc.is_bad,
                 COALESCE(o.name, '') AS other_name
          FROM user_calls uc
          LEFT JOIN users o ON o.id = uc.other_user_id
          WHERE uc.teacher_id = $1
          ORDER BY uc.start_date_time DESC, uc.id DESC",
    )
    .bind(teacher.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| {
            let code: String = r.get("sender");
            let sender = if code_char(&code) == 'O' { CallSender::Other } else { CallSender::Teacher };
            let other_name: String = r.get("other_name");
            let (sender_name, receiver_name) = call_parties(sender, &teacher.user_name, &other_name);
            UserCallResponse {
                call_id: r.get("id"),
                sender_name: sender_name.to_owned(),
                receiver_name: receiver_name.to_owned(),
                start_date_time: r.get("start_date_time"),
                end_date_time: r.get("end_date_time"),
                upload_file_name: r.get("upload_file_name"),
                is_bad: r.get("is_bad"),
            }
        })
        .collect())
}

#[cfg(test)]
#[path = "call_test.rs"]
mod tests;
