use super::*;

// =============================================================================
// env_parse / env_bool — unique env var names avoid races with parallel tests.
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: u64 = env_parse("__TEST_CFG_NONEXISTENT_KEY_31__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__TEST_CFG_EP_VALID__", "99") };
    let val: u64 = env_parse("__TEST_CFG_EP_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__TEST_CFG_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__TEST_CFG_EP_INVALID__", "soon") };
    let val: i64 = env_parse("__TEST_CFG_EP_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__TEST_CFG_EP_INVALID__") };
}

#[test]
fn env_bool_true_and_false_variants() {
    for (i, (val, expected)) in [("1", true), ("Yes", true), ("off", false), (" false ", false)]
        .iter()
        .enumerate()
    {
        let key = format!("__TEST_CFG_EB_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(*expected), "unexpected result for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn local_service_url_follows_port() {
    assert_eq!(local_service_url(8080), "http://127.0.0.1:8080");
    assert_eq!(local_service_url(DEFAULT_PORT), "http://127.0.0.1:3000");
}

#[test]
fn env_bool_garbage_returns_none() {
    let key = "__TEST_CFG_EB_GARBAGE__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
}

// =============================================================================
// AppConfig::from_env — the only test touching these shared keys.
// =============================================================================

#[test]
fn from_env_reads_values_and_defaults() {
    unsafe {
        std::env::remove_var("DATABASE_URL");
    }
    assert!(matches!(AppConfig::from_env(), Err(ConfigError::Missing("DATABASE_URL"))));

    unsafe {
        std::env::set_var("DATABASE_URL", "postgres://u:p@localhost/everyschool");
        std::env::set_var("PORT", "8081");
        std::env::set_var("REDIS_URL", "  ");
        std::env::set_var("USER_SERVICE_URL", "http://user-service:8080/");
        std::env::remove_var("SCHOOL_SERVICE_URL");
        std::env::remove_var("SESSION_TTL_HOURS");
    }
    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.port, 8081);
    assert!(config.redis_url.is_none(), "blank REDIS_URL means in-memory counters");
    assert_eq!(config.user_service_url, "http://user-service:8080");
    assert_eq!(config.school_service_url, "http://127.0.0.1:8081");
    assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);

    unsafe {
        std::env::set_var("PORT", "8080");
        std::env::remove_var("USER_SERVICE_URL");
    }
    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.user_service_url, "http://127.0.0.1:8080");
    assert_eq!(config.school_service_url, "http://127.0.0.1:8080");

    unsafe { std::env::remove_var("PORT") };
    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.user_service_url, local_service_url(DEFAULT_PORT));

    unsafe { std::env::set_var("PORT", "not-a-port") };
    assert!(matches!(AppConfig::from_env(), Err(ConfigError::Invalid { key: "PORT", .. })));

    unsafe {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("PORT");
        std::env::remove_var("REDIS_URL");
        std::env::remove_var("USER_SERVICE_URL");
    }
}
