use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// SessionUser
// =============================================================================

#[test]
fn session_user_serializes_camel_case() {
    let user = SessionUser {
        id: 3,
        user_key: Uuid::nil(),
        email: "teacher@everyschool.com".into(),
        name: "김선생".into(),
        user_type: 'T',
    };
    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["userKey"], "00000000-0000-0000-0000-000000000000");
    assert_eq!(json["userType"], "T");
    assert_eq!(json["name"], "김선생");
}
