use super::*;
use crate::state::test_helpers::{test_harness, user};

#[test]
fn consult_type_text_mapping() {
    assert_eq!(consult_type_text(1), "방문상담");
    assert_eq!(consult_type_text(2), "전화상담");
    assert_eq!(consult_type_text(3), "");
    assert_eq!(ConsultType::from_id(2).map(ConsultType::id), Some(2));
}

#[test]
fn student_info_with_and_without_class() {
    assert_eq!(student_info(Some((1, 3)), "이예리"), "1학년 3반 이예리");
    assert_eq!(student_info(None, "이예리"), "이예리");
}

#[test]
fn parent_info_uses_guardian_relation() {
    assert_eq!(parent_info("이예리", 'F'), "이예리 어머니");
    assert_eq!(parent_info("이예리", 'M'), "이예리 아버지");
    assert_eq!(parent_info("이예리", 'T'), "이예리 보호자");
}

#[test]
fn consult_response_serializes_type_text() {
    let json = serde_json::to_value(ConsultResponse {
        consult_id: 9,
        consult_type: consult_type_text(1).to_owned(),
        student_info: "1학년 3반 이예리".into(),
        parent_info: "이예리 어머니".into(),
        consult_date: OffsetDateTime::UNIX_EPOCH,
    })
    .unwrap();
    assert_eq!(json["consultId"], 9);
    assert_eq!(json["type"], "방문상담");
    assert_eq!(json["consultDate"], "1970-01-01T00:00:00Z");
}

#[test]
fn detail_flattens_summary() {
    let detail = ConsultDetailResponse {
        summary: ConsultResponse {
            consult_id: 1,
            consult_type: "전화상담".into(),
            student_info: "s".into(),
            parent_info: "p".into(),
            consult_date: OffsetDateTime::UNIX_EPOCH,
        },
        teacher_name: "김선생".into(),
        message: "성적 상담".into(),
        rejected_reason: String::new(),
    };
    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["consultId"], 1);
    assert_eq!(json["teacherName"], "김선생");
    assert_eq!(json["rejectedReason"], "");
}

fn create_dto(type_id: i32) -> CreateConsultDto {
    CreateConsultDto {
        teacher_key: "teacher-key".into(),
        student_key: "student-key".into(),
        type_id,
        school_year: 2023,
        message: String::new(),
        consult_date_time: OffsetDateTime::UNIX_EPOCH,
    }
}

#[tokio::test]
async fn create_rejects_unknown_type() {
    let h = test_harness();
    let err = create_consult(&h.state, "mother-token", &create_dto(7))
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultError::InvalidType(7)));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_requires_guardian_caller_and_teacher_target() {
    let h = test_harness();
    h.users
        .add_user("teacher-token", "teacher-key", user(1, 'T', "김선생"));
    h.users
        .add_user("mother-token", "mother-key", user(2, 'F', "박엄마"));

    let err = create_consult(&h.state, "teacher-token", &create_dto(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultError::NotGuardian));

    let mut dto = create_dto(1);
    dto.teacher_key = "mother-key".into();
    let err = create_consult(&h.state, "mother-token", &dto)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultError::NotTeacher));
}

#[tokio::test]
async fn create_with_unknown_token_is_unauthorized() {
    let h = test_harness();
    let err = create_consult(&h.state, "nobody", &create_dto(1))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}
