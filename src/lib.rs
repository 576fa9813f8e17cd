//! Rentify — typed client for the Rentify rental-marketplace REST API.
//!
//! ARCHITECTURE
//! ============
//! `SessionManager` owns the credential pair and is passed by reference into
//! every call in `api`. It attaches bearer tokens and runs the one-shot
//! refresh-and-retry protocol. Network I/O goes through the `HttpTransport`
//! trait so the session protocol can be exercised without a server.
//!
//! `dashboard` holds the owner-side projection (bookings grouped by owned
//! item) as a pure function plus the loader that performs the dependent
//! fetches.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod net;
pub mod session;

pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use net::{ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport};
pub use session::store::{CredentialStore, FileStore, MemoryStore, StoreError};
pub use session::{Identity, Route, Session, SessionManager, SessionState};
