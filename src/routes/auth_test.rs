use axum::http::{Request, StatusCode};

use super::*;

async fn extract(request: Request<()>) -> Result<AuthToken, ApiError> {
    let (mut parts, ()) = request.into_parts();
    AuthToken::from_request_parts(&mut parts, &()).await
}

// =============================================================================
// bearer_token
// =============================================================================

#[test]
fn bearer_token_accepts_any_scheme_case() {
    assert_eq!(bearer_token("Bearer abc"), Some("abc"));
    assert_eq!(bearer_token("bearer  abc "), Some("abc"));
}

#[test]
fn bearer_token_rejects_other_schemes_and_blank() {
    assert_eq!(bearer_token("Basic abc"), None);
    assert_eq!(bearer_token("Bearer "), None);
    assert_eq!(bearer_token("abc"), None);
}

// =============================================================================
// AuthToken
// =============================================================================

#[tokio::test]
async fn extracts_from_authorization_header() {
    let request = Request::builder()
        .header(AUTHORIZATION, "Bearer header-token")
        .header("cookie", "session_token=cookie-token")
        .body(())
        .unwrap();
    let AuthToken(token) = extract(request).await.unwrap();
    assert_eq!(token, "header-token");
}

#[tokio::test]
async fn falls_back_to_session_cookie() {
    let request = Request::builder()
        .header("cookie", "theme=dark; session_token=cookie-token")
        .body(())
        .unwrap();
    let AuthToken(token) = extract(request).await.unwrap();
    assert_eq!(token, "cookie-token");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let request = Request::builder().body(()).unwrap();
    let Err(err) = extract(request).await else {
        panic!("expected rejection");
    };
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    assert_eq!(err.code, "E_UNAUTHORIZED");
}

// =============================================================================
// cookies
// =============================================================================

#[test]
fn session_cookie_attributes() {
    let cookie = session_cookie("tok".into(), true, 2);
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "tok");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.max_age(), Some(Duration::hours(2)));
}

#[test]
fn cleared_cookie_expires_immediately() {
    let cookie = cleared_session_cookie(false);
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    assert_eq!(cookie.secure(), Some(false));
}
