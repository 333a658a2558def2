//! HTTP directory clients.
//!
//! Thin `reqwest` wrappers around the user-service and school-service client
//! endpoints. Both services answer with the shared response envelope; the
//! payload lives under `data`. Parsing is a pure function for testability.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{DirectoryError, SchoolClassInfo, SchoolDirectory, UserDirectory, UserInfo};
use crate::config::DirectoryTimeouts;

fn build_http_client(timeouts: DirectoryTimeouts) -> Result<reqwest::Client, DirectoryError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| DirectoryError::HttpClientBuild(e.to_string()))
}

async fn read_envelope<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, DirectoryError> {
    let response = request
        .send()
        .await
        .map_err(|e| DirectoryError::Request(e.to_string()))?;

    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| DirectoryError::Request(e.to_string()))?;

    parse_envelope(status, &text)
}

// =============================================================================
// USER DIRECTORY
// =============================================================================

pub struct HttpUserDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>, timeouts: DirectoryTimeouts) -> Result<Self, DirectoryError> {
        Ok(Self { http: build_http_client(timeouts)?, base_url: base_url.into() })
    }
}

#[async_trait::async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn search_user_info(&self, token: &str) -> Result<UserInfo, DirectoryError> {
        let url = format!("{}/user-service/client/v1/user-info", self.base_url);
        read_envelope(self.http.get(url).bearer_auth(token)).await
    }

    async fn search_user_info_by_user_key(&self, user_key: &str) -> Result<UserInfo, DirectoryError> {
        let url = format!("{}/user-service/client/v1/user-info/{user_key}", self.base_url);
        read_envelope(self.http.get(url)).await
    }

    async fn search_child_name(&self, school_class_id: i64, parent_id: i64) -> Result<String, DirectoryError> {
        let url = format!("{}/user-service/client/v1/child-name", self.base_url);
        let request = self
            .http
            .get(url)
            .query(&[("schoolClassId", school_class_id), ("parentId", parent_id)]);
        read_envelope(request).await
    }
}

// =============================================================================
// SCHOOL DIRECTORY
// =============================================================================

pub struct HttpSchoolDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSchoolDirectory {
    pub fn new(base_url: impl Into<String>, timeouts: DirectoryTimeouts) -> Result<Self, DirectoryError> {
        Ok(Self { http: build_http_client(timeouts)?, base_url: base_url.into() })
    }
}

#[async_trait::async_trait]
impl SchoolDirectory for HttpSchoolDirectory {
    async fn search_school_class_info(&self, school_class_id: i64) -> Result<SchoolClassInfo, DirectoryError> {
        let url = format!("{}/school-service/client/v1/school-class/{school_class_id}", self.base_url);
        read_envelope(self.http.get(url)).await
    }
}

// =============================================================================
// WIRE PARSING
// =============================================================================

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: String,
    data: Option<T>,
}

/// Parse a directory response envelope into its `data` payload.
pub(crate) fn parse_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, DirectoryError> {
    if status == 404 {
        let message = serde_json::from_str::<Envelope<serde_json::Value>>(body)
            .map(|e| e.message)
            .unwrap_or_default();
        return Err(DirectoryError::NotFound(message));
    }
    if !(200..300).contains(&status) {
        return Err(DirectoryError::Response { status, body: body.to_owned() });
    }

    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| DirectoryError::Parse(e.to_string()))?;
    envelope
        .data
        .ok_or_else(|| DirectoryError::Parse("missing data field".into()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
