//! School service — school search, enrollment status and class lookups.

use axum::http::StatusCode;
use serde::Serialize;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;

use super::user::{UserError, find_user_id_by_key};
use crate::db::code_char;
use crate::directory::SchoolClassInfo;
use crate::response::ErrorCode;

const MAX_SEARCH_RESULTS: i64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum SchoolError {
    #[error("존재하지 않는 학교입니다.")]
    SchoolNotFound(i64),
    #[error("존재하지 않는 학급입니다.")]
    ClassNotFound(i64),
    #[error("학급 신청 내역이 없습니다.")]
    EnrollNotFound,
    #[error(transparent)]
    User(#[from] UserError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for SchoolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SchoolNotFound(_) => "E_SCHOOL_NOT_FOUND",
            Self::ClassNotFound(_) => "E_CLASS_NOT_FOUND",
            Self::EnrollNotFound => "E_ENROLL_NOT_FOUND",
            Self::User(e) => e.error_code(),
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::SchoolNotFound(_) | Self::ClassNotFound(_) | Self::EnrollNotFound => StatusCode::NOT_FOUND,
            Self::User(e) => e.status(),
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolResponse {
    pub school_id: i64,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolDetailResponse {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub url: String,
    pub tel: String,
}

/// A student's (or guardian's) latest enrollment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyEnrollResponse {
    pub school_year: i32,
    pub school_name: String,
    pub grade: i32,
    pub class_num: i32,
    /// Student's name.
    pub name: String,
    pub is_approved: bool,
    pub rejected_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomResponse {
    pub teacher_name: String,
    pub school_year: i32,
    pub grade: i32,
    pub class_num: i32,
    /// School name.
    pub name: String,
}

/// Pending enrollment request as seen by the class teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequestResponse {
    #[serde(rename = "type")]
    pub request_type: String,
    pub child_name: String,
    pub grade: i32,
    pub class_num: i32,
    pub student_num: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub applied_date: OffsetDateTime,
}

/// `1학년 3반 `; the trailing space lets titles append a name directly.
#[must_use]
pub fn class_display_name(grade: i32, class_num: i32) -> String {
    format!("{grade}학년 {class_num}반 ")
}

/// Label for the requester of an enrollment (`P` guardian, `C` child).
#[must_use]
pub fn request_type_text(code: char) -> &'static str {
    match code {
        'P' => "학부모",
        _ => "학생",
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// Schools whose name contains `query` as a plain substring (`%` and `_`
/// are not wildcards), by name. A blank query matches nothing.
pub async fn search_schools(pool: &PgPool, query: &str) -> Result<Vec<SchoolResponse>, SchoolError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(
        "SELECT id, name, address FROM schools
         WHERE strpos(name, $1) > 0
         ORDER BY name ASC, id ASC
         LIMIT $2",
    )
    .bind(query)
    .bind(MAX_SEARCH_RESULTS)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| SchoolResponse { school_id: r.get("id"), name: r.get("name"), address: r.get("address") })
        .collect())
}

pub async fn search_one_school(pool: &PgPool, school_id: i64) -> Result<SchoolDetailResponse, SchoolError> {
    let row = sqlx::query("SELECT id, name, address, url, tel FROM schools WHERE id = $1")
        .bind(school_id)
        .fetch_optional(pool)
        .await?
        .ok_or(SchoolError::SchoolNotFound(school_id))?;

    Ok(SchoolDetailResponse {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        url: row.get("url"),
        tel: row.get("tel"),
    })
}

/// Latest enrollment request where the user is the student or the guardian.
pub async fn search_my_enroll(pool: &PgPool, user_key: &str) -> Result<MyEnrollResponse, SchoolError> {
    let user_id = find_user_id_by_key(pool, user_key).await?;
    let row = sqlx::query(
        r"SELECT sc.school_year, s.name AS school_name, sc.grade, sc.class_num,
                 st.name AS student_name, stc.is_approved, stc.rejected_reason
          FROM student_classes stc
          JOIN school_classes sc ON sc.id = stc.school_class_id
          JOIN schools s ON s.id = sc.school_id
          JOIN users st ON st.id = stc.student_id
          WHERE stc.student_id = $1 OR stc.parent_id = $1
          ORDER BY stc.applied_at DESC
          LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(SchoolError::EnrollNotFound)?;

    Ok(MyEnrollResponse {
        school_year: row.get("school_year"),
        school_name: row.get("school_name"),
        grade: row.get("grade"),
        class_num: row.get("class_num"),
        name: row.get("student_name"),
        is_approved: row.get("is_approved"),
        rejected_reason: row.get("rejected_reason"),
    })
}

/// The class the user belongs to through an approved enrollment.
pub async fn search_my_classroom(pool: &PgPool, user_key: &str) -> Result<ClassroomResponse, SchoolError> {
    let user_id = find_user_id_by_key(pool, user_key).await?;
    let row = sqlx::query(
        r"SELECT COALESCE(t.name, '') AS teacher_name, sc.school_year, sc.grade, sc.class_num,
                 s.name AS school_name
          FROM student_classes stc
          JOIN school_classes sc ON sc.id = stc.school_class_id
          JOIN schools s ON s.id = sc.school_id
          LEFT JOIN users t ON t.id = sc.teacher_id
          WHERE (stc.student_id = $1 OR stc.parent_id = $1) AND stc.is_approved
          ORDER BY sc.school_year DESC, stc.applied_at DESC
          LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(SchoolError::EnrollNotFound)?;

    Ok(ClassroomResponse {
        teacher_name: row.get("teacher_name"),
        school_year: row.get("school_year"),
        grade: row.get("grade"),
        class_num: row.get("class_num"),
        name: row.get("school_name"),
    })
}

/// Unapproved, unrejected enrollment requests for a class, oldest first.
pub async fn search_enrolls(pool: &PgPool, school_class_id: i64) -> Result<Vec<EnrollRequestResponse>, SchoolError> {
    let rows = sqlx::query(
        r"SELECT stc.request_type, st.name AS child_name, sc.grade, sc.class_num,
                 stc.student_num, stc.applied_at
          FROM student_classes stc
          JOIN school_classes sc ON sc.id = stc.school_class_id
          JOIN users st ON st.id = stc.student_id
          WHERE stc.school_class_id = $1 AND NOT stc.is_approved AND stc.rejected_reason = ''
          ORDER BY stc.applied_at ASC",
    )
    .bind(school_class_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            let request_type: String = r.get("request_type");
            EnrollRequestResponse {
                request_type: request_type_text(code_char(&request_type)).to_owned(),
                child_name: r.get("child_name"),
                grade: r.get("grade"),
                class_num: r.get("class_num"),
                student_num: r.get("student_num"),
                applied_date: r.get("applied_at"),
            }
        })
        .collect())
}

/// Class metadata served to the school directory.
pub async fn search_school_class_info(pool: &PgPool, school_class_id: i64) -> Result<SchoolClassInfo, SchoolError> {
    let row = sqlx::query(
        r"SELECT sc.id, s.name AS school_name, sc.school_year, sc.grade, sc.class_num
          FROM school_classes sc
          JOIN schools s ON s.id = sc.school_id
          WHERE sc.id = $1",
    )
    .bind(school_class_id)
    .fetch_optional(pool)
    .await?
    .ok_or(SchoolError::ClassNotFound(school_class_id))?;

    let grade: i32 = row.get("grade");
    let class_num: i32 = row.get("class_num");
    Ok(SchoolClassInfo {
        school_class_id: row.get("id"),
        school_name: row.get("school_name"),
        class_name: class_display_name(grade, class_num),
        school_year: row.get("school_year"),
        grade,
        class_num,
    })
}

#[cfg(test)]
#[path = "school_test.rs"]
mod tests;
