//! Networking: request/response DTOs and the HTTP transport seam.
//!
//! SYSTEM CONTEXT
//! ==============
//! `types` describes a single REST exchange, `transport` performs it. The
//! session manager is the only caller of `HttpTransport::send`.

#[cfg(test)]
pub(crate) mod mock;
pub mod transport;
pub mod types;

pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{ApiRequest, ApiResponse, Method};
