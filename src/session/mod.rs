//! Authentication session: credential storage and the refresh protocol.

pub mod manager;
pub mod store;

pub use manager::{Identity, MAX_REFRESH_RETRIES, REFRESH_PATH, Route, Session, SessionManager, SessionState};
