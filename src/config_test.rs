use std::sync::{Mutex, MutexGuard};

use super::*;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// # Safety
/// Callers must hold `env_lock()` so env mutations do not race.
unsafe fn clear_rentify_env() {
    unsafe {
        std::env::remove_var("RENTIFY_API_BASE_URL");
        std::env::remove_var("RENTIFY_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("RENTIFY_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("RENTIFY_SESSION_FILE");
    }
}

#[test]
fn from_env_defaults() {
    let _env = env_lock();
    unsafe { clear_rentify_env() };

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, DEFAULT_API_BASE_URL);
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 30, connect_secs: 10 });
    assert_eq!(cfg.session_file, PathBuf::from(DEFAULT_SESSION_FILE));
}

#[test]
fn from_env_parses_overrides() {
    let _env = env_lock();
    unsafe {
        clear_rentify_env();
        std::env::set_var("RENTIFY_API_BASE_URL", "https://rentify.example/");
        std::env::set_var("RENTIFY_REQUEST_TIMEOUT_SECS", "5");
        std::env::set_var("RENTIFY_CONNECT_TIMEOUT_SECS", "2");
        std::env::set_var("RENTIFY_SESSION_FILE", "/tmp/rentify.json");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, "https://rentify.example");
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 5, connect_secs: 2 });
    assert_eq!(cfg.session_file, PathBuf::from("/tmp/rentify.json"));

    unsafe { clear_rentify_env() };
}

#[test]
fn from_env_ignores_unparseable_timeouts() {
    let _env = env_lock();
    unsafe {
        clear_rentify_env();
        std::env::set_var("RENTIFY_REQUEST_TIMEOUT_SECS", "soon");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);

    unsafe { clear_rentify_env() };
}

#[test]
fn new_rejects_non_http_url() {
    let err = ClientConfig::new("ftp://rentify.example").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    assert!(err.to_string().contains("ftp://rentify.example"));
}

#[test]
fn url_joins_without_double_slash() {
    let cfg = ClientConfig::new("http://localhost:8000/").unwrap();
    assert_eq!(cfg.url("/api/my-items/"), "http://localhost:8000/api/my-items/");
    assert_eq!(cfg.url("auth/login/"), "http://localhost:8000/auth/login/");
}

#[test]
fn with_base_url_keeps_timeouts() {
    let cfg = ClientConfig::new("http://a.test").unwrap().with_base_url("https://b.test/").unwrap();
    assert_eq!(cfg.base_url, "https://b.test");
    assert_eq!(cfg.timeouts, Timeouts::default());
}
