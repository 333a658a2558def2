//! Directory clients — cross-service identity and class lookups.
//!
//! DESIGN
//! ======
//! The chat, consult and call services never read user or school tables
//! directly; they resolve identities through the [`UserDirectory`] and
//! [`SchoolDirectory`] traits. Production wiring uses the HTTP clients in
//! [`http`]; tests swap in hand-written mocks.

pub mod http;

use serde::{Deserialize, Serialize};

// =============================================================================
// USER TYPE
// =============================================================================

/// Role of an account, stored as a single-character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserType {
    Student,
    /// Guardian recorded as father (`M`).
    Father,
    /// Guardian recorded as mother (`F`).
    Mother,
    Teacher,
}

impl UserType {
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'S' => Some(Self::Student),
            'M' => Some(Self::Father),
            'F' => Some(Self::Mother),
            'T' => Some(Self::Teacher),
            _ => None,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Student => 'S',
            Self::Father => 'M',
            Self::Mother => 'F',
            Self::Teacher => 'T',
        }
    }

    #[must_use]
    pub fn is_guardian(self) -> bool {
        matches!(self, Self::Father | Self::Mother)
    }

    /// Display text used in user-facing responses.
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::Student => "학생",
            Self::Father => "아버지",
            Self::Mother => "어머니",
            Self::Teacher => "선생님",
        }
    }
}

/// `true` when a raw type code belongs to a guardian account.
#[must_use]
pub fn is_guardian_code(code: char) -> bool {
    UserType::from_code(code).is_some_and(UserType::is_guardian)
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Identity record returned by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: i64,
    pub user_type: char,
    pub user_name: String,
    #[serde(default)]
    pub school_class_id: Option<i64>,
}

/// Class metadata returned by the school directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClassInfo {
    pub school_class_id: i64,
    pub school_name: String,
    /// Rendered prefix such as `1학년 3반 `.
    pub class_name: String,
    pub school_year: i32,
    pub grade: i32,
    pub class_num: i32,
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The upstream service answered 404; carries its message.
    #[error("{0}")]
    NotFound(String),

    #[error("directory request failed: {0}")]
    Request(String),

    #[error("directory response error: status {status}")]
    Response { status: u16, body: String },

    #[error("directory response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::response::ErrorCode for DirectoryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Request(_) => "E_DIRECTORY_REQUEST",
            Self::Response { .. } => "E_DIRECTORY_RESPONSE",
            Self::Parse(_) => "E_DIRECTORY_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn status(&self) -> axum::http::StatusCode {
        match self {
            Self::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            Self::Response { status: 401, .. } => axum::http::StatusCode::UNAUTHORIZED,
            _ => axum::http::StatusCode::BAD_GATEWAY,
        }
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Resolves users from session tokens, user keys and guardian links.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Identity of the holder of `token`.
    async fn search_user_info(&self, token: &str) -> Result<UserInfo, DirectoryError>;

    /// Identity behind a public user key.
    async fn search_user_info_by_user_key(&self, user_key: &str) -> Result<UserInfo, DirectoryError>;

    /// Name of the guardian's child enrolled in the given class.
    async fn search_child_name(&self, school_class_id: i64, parent_id: i64) -> Result<String, DirectoryError>;
}

/// Resolves class metadata.
#[async_trait::async_trait]
pub trait SchoolDirectory: Send + Sync {
    async fn search_school_class_info(&self, school_class_id: i64) -> Result<SchoolClassInfo, DirectoryError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
