//! School service routes (`/school-service`).

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::directory::SchoolClassInfo;
use crate::response::{ApiError, ApiResponse};
use crate::services::school::{
    self, ClassroomResponse, EnrollRequestResponse, MyEnrollResponse, SchoolDetailResponse, SchoolResponse,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    query: String,
}

/// `GET /school-service/v1/schools?query=`
pub async fn search_schools(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<ApiResponse<Vec<SchoolResponse>>, ApiError> {
    Ok(ApiResponse::ok(school::search_schools(&state.pool, &params.query).await?))
}

/// `GET /school-service/v1/school/{schoolId}`
pub async fn search_one_school(
    State(state): State<AppState>,
    Path(school_id): Path<i64>,
) -> Result<ApiResponse<SchoolDetailResponse>, ApiError> {
    Ok(ApiResponse::ok(school::search_one_school(&state.pool, school_id).await?))
}

/// `GET /school-service/enroll/{userKey}`
pub async fn search_my_enroll(
    State(state): State<AppState>,
    Path(user_key): Path<String>,
) -> Result<ApiResponse<MyEnrollResponse>, ApiError> {
    Ok(ApiResponse::ok(school::search_my_enroll(&state.pool, &user_key).await?))
}

/// `GET /school-service/classroom/{userKey}`
pub async fn search_my_classroom(
    State(state): State<AppState>,
    Path(user_key): Path<String>,
) -> Result<ApiResponse<ClassroomResponse>, ApiError> {
    Ok(ApiResponse::ok(school::search_my_classroom(&state.pool, &user_key).await?))
}

/// `GET /school-service/enroll/teacher/{schoolClassId}`
pub async fn search_enrolls(
    State(state): State<AppState>,
    Path(school_class_id): Path<i64>,
) -> Result<ApiResponse<Vec<EnrollRequestResponse>>, ApiError> {
    Ok(ApiResponse::ok(school::search_enrolls(&state.pool, school_class_id).await?))
}

/// `GET /school-service/client/v1/school-class/{schoolClassId}`
pub async fn school_class_info(
    State(state): State<AppState>,
    Path(school_class_id): Path<i64>,
) -> Result<ApiResponse<SchoolClassInfo>, ApiError> {
    Ok(ApiResponse::ok(school::search_school_class_info(&state.pool, school_class_id).await?))
}
