//! Consult service — consultation records between guardians and teachers.
//!
//! A guardian books a consult with a teacher about one student. Identities
//! are resolved through the user directory at creation time; listings join
//! names back from the shared user tables.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::info;

use super::school::class_display_name;
use crate::directory::{DirectoryError, UserType};
use crate::response::ErrorCode;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsultType {
    Visit,
    Call,
}

impl ConsultType {
    #[must_use]
    pub fn from_id(type_id: i32) -> Option<Self> {
        match type_id {
            1 => Some(Self::Visit),
            2 => Some(Self::Call),
            _ => None,
        }
    }

    #[must_use]
    pub fn id(self) -> i32 {
        match self {
            Self::Visit => 1,
            Self::Call => 2,
        }
    }

    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::Visit => "방문상담",
            Self::Call => "전화상담",
        }
    }
}

/// Display text for a stored type id; empty for unknown ids.
#[must_use]
pub fn consult_type_text(type_id: i32) -> &'static str {
    ConsultType::from_id(type_id).map_or("", ConsultType::text)
}

#[derive(Debug, thiserror::Error)]
pub enum ConsultError {
    #[error("상담 유형이 올바르지 않습니다.")]
    InvalidType(i32),
    #[error("학부모만 상담을 신청할 수 있습니다.")]
    NotGuardian,
    #[error("선생님에게만 상담을 신청할 수 있습니다.")]
    NotTeacher,
    #[error("존재하지 않는 상담입니다.")]
    NotFound(i64),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for ConsultError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidType(_) => "E_INVALID_CONSULT_TYPE",
            Self::NotGuardian => "E_NOT_GUARDIAN",
            Self::NotTeacher => "E_NOT_TEACHER",
            Self::NotFound(_) => "E_CONSULT_NOT_FOUND",
            Self::Directory(e) => e.error_code(),
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidType(_) | Self::NotGuardian | Self::NotTeacher => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Directory(e) => e.status(),
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsultDto {
    pub teacher_key: String,
    pub student_key: String,
    pub type_id: i32,
    pub school_year: i32,
    #[serde(default)]
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub consult_date_time: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultResponse {
    pub consult_id: i64,
    #[serde(rename = "type")]
    pub consult_type: String,
    pub student_info: String,
    pub parent_info: String,
    #[serde(with = "time::serde::rfc3339")]
    pub consult_date: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultDetailResponse {
    #[serde(flatten)]
    pub summary: ConsultResponse,
    pub teacher_name: String,
    pub message: String,
    pub rejected_reason: String,
}

/// `1학년 3반 이예리`, or just the name when the class is unknown.
#[must_use]
pub fn student_info(grade_class: Option<(i32, i32)>, student_name: &str) -> String {
    match grade_class {
        Some((grade, class_num)) => format!("{}{student_name}", class_display_name(grade, class_num)),
        None => student_name.to_owned(),
    }
}

/// `이예리 어머니`: the guardian named through the student.
#[must_use]
pub fn parent_info(student_name: &str, parent_type: char) -> String {
    let relation = UserType::from_code(parent_type)
        .filter(|t| t.is_guardian())
        .map_or("보호자", UserType::text);
    format!("{student_name} {relation}")
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Book a consult from the guardian holding `token`.
///
/// # Errors
///
/// `NotGuardian` / `NotTeacher` when the resolved roles are wrong,
/// `InvalidType` for unknown type ids, directory errors for unresolvable
/// identities.
pub async fn create_consult(state: &AppState, token: &str, dto: &CreateConsultDto) -> Result<ConsultResponse, ConsultError> {
    let consult_type = ConsultType::from_id(dto.type_id).ok_or(ConsultError::InvalidType(dto.type_id))?;

    let parent = state.users.search_user_info(token).await?;
    if !UserType::from_code(parent.user_type).is_some_and(UserType::is_guardian) {
        return Err(ConsultError::NotGuardian);
    }
    let teacher = state
        .users
        .search_user_info_by_user_key(&dto.teacher_key)
        .await?;
    if UserType::from_code(teacher.user_type) != Some(UserType::Teacher) {
        return Err(ConsultError::NotTeacher);
    }
    let student = state
        .users
        .search_user_info_by_user_key(&dto.student_key)
        .await?;

    let consult_id: i64 = sqlx::query_scalar(
        "INSERT INTO consults (type_id, school_year, teacher_id, parent_id, student_id, message, consult_date_time)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id",
    )
    .bind(consult_type.id())
    .bind(dto.school_year)
    .bind(teacher.user_id)
    .bind(parent.user_id)
    .bind(student.user_id)
    .bind(&dto.message)
    .bind(dto.consult_date_time)
    .fetch_one(&state.pool)
    .await?;

    let grade_class = match student.school_class_id {
        Some(id) => {
            let class = state.schools.search_school_class_info(id).await?;
            Some((class.grade, class.class_num))
        }
        None => None,
    };

    info!(consult_id, teacher_id = teacher.user_id, parent_id = parent.user_id, "consult created");
    Ok(ConsultResponse {
        consult_id,
        consult_type: consult_type.text().to_owned(),
        student_info: student_info(grade_class, &student.user_name),
        parent_info: parent_info(&student.user_name, parent.user_type),
        consult_date: dto.consult_date_time,
    })
}

const CONSULT_SELECT: &str = r"
    SELECT c.id, c.type_id, c.consult_date_time, c.message, c.rejected_reason,
           t.name AS teacher_name, st.name AS student_name, p.user_type AS parent_type,
           sc.grade, sc.class_num
    FROM consults c
    JOIN users t ON t.id = c.teacher_id
    JOIN users p ON p.id = c.parent_id
    JOIN users st ON st.id = c.student_id
    LEFT JOIN LATERAL (
        SELECT scl.grade, scl.class_num
        FROM student_classes stc
        JOIN school_classes scl ON scl.id = stc.school_class_id
        WHERE stc.student_id = c.student_id AND scl.school_year = c.school_year AND stc.is_approved
        ORDER BY stc.applied_at DESC
        LIMIT 1
    ) sc ON TRUE";

fn detail_from_row(row: &sqlx::postgres::PgRow) -> ConsultDetailResponse {
    let type_id: i32 = row.get("type_id");
    let student_name: String = row.get("student_name");
    let parent_type: String = row.get("parent_type");
    let grade: Option<i32> = row.get("grade");
    let class_num: Option<i32> = row.get("class_num");
    ConsultDetailResponse {
        summary: ConsultResponse {
            consult_id: row.get("id"),
            consult_type: consult_type_text(type_id).to_owned(),
            student_info: student_info(grade.zip(class_num), &student_name),
            parent_info: parent_info(&student_name, crate::db::code_char(&parent_type)),
            consult_date: row.get("consult_date_time"),
        },
        teacher_name: row.get("teacher_name"),
        message: row.get("message"),
        rejected_reason: row.get("rejected_reason"),
    }
}

async fn list_for(pool: &PgPool, user_id: i64, as_teacher: bool) -> Result<Vec<ConsultResponse>, sqlx::Error> {
    let column = if as_teacher { "c.teacher_id" } else { "c.parent_id" };
    let rows = sqlx::query(&format!("{CONSULT_SELECT} WHERE {column} = $1 ORDER BY c.consult_date_time DESC, c.id DESC"))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|r| detail_from_row(r).summary)
        .collect())
}

/// Consults the caller takes part in, newest first.
pub async fn search_consults(state: &AppState, token: &str) -> Result<Vec<ConsultResponse>, ConsultError> {
    let user = state.users.search_user_info(token).await?;
    let as_teacher = UserType::from_code(user.user_type) == Some(UserType::Teacher);
    Ok(list_for(&state.pool, user.user_id, as_teacher).await?)
}

/// One consult; only its teacher or guardian may read it.
pub async fn search_consult(state: &AppState, token: &str, consult_id: i64) -> Result<ConsultDetailResponse, ConsultError> {
    let user = state.users.search_user_info(token).await?;
    let row = sqlx::query(&format!("{CONSULT_SELECT} WHERE c.id = $1 AND (c.teacher_id = $2 OR c.parent_id = $2)"))
        .bind(consult_id)
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ConsultError::NotFound(consult_id))?;
    Ok(detail_from_row(&row))
}

#[cfg(test)]
#[path = "consult_test.rs"]
mod tests;
