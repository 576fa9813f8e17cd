//! API error taxonomy and server error-payload parsing.
//!
//! ERROR HANDLING
//! ==============
//! Authorization failures are recovered by the session manager (one refresh,
//! one retry). Everything else is surfaced to the caller unchanged and never
//! retried. `user_message` renders the string a front end should show.

use serde_json::Value;

use crate::session::store::StoreError;

const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Errors produced by Rentify API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the credential and no further refresh is allowed.
    #[error("not authorized: {message}")]
    Unauthorized { message: String },

    /// The session could not be renewed: the refresh failed (credentials are
    /// purged) or the session was ended or replaced while refreshing.
    #[error("session expired; log in again")]
    SessionExpired,

    /// HTTP 400 with the server's structured validation messages.
    #[error("validation failed: {}", messages.join("; "))]
    Validation { messages: Vec<String> },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("server error: status {status}")]
    Server { status: u16, message: String },

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("credential storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Classify a non-success response by status code.
    #[must_use]
    pub fn from_response(status: u16, body: &Value) -> Self {
        let message = extract_message(body).unwrap_or_else(|| FALLBACK_MESSAGE.to_owned());
        match status {
            400 => Self::Validation { messages: validation_messages(body) },
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            500..=599 => Self::Server { status, message },
            _ => Self::Status { status, message },
        }
    }

    /// Grepable error code for CLI and log output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "E_UNAUTHORIZED",
            Self::SessionExpired => "E_SESSION_EXPIRED",
            Self::Validation { .. } => "E_VALIDATION",
            Self::Forbidden { .. } => "E_FORBIDDEN",
            Self::NotFound { .. } => "E_NOT_FOUND",
            Self::Server { .. } => "E_SERVER",
            Self::Status { .. } => "E_STATUS",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Decode(_) => "E_DECODE",
            Self::Storage(_) => "E_STORAGE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Message suitable for an inline error or notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::SessionExpired => "Session expired. Please login again.".to_owned(),
            Self::Forbidden { .. } => "You do not have permission to perform this action".to_owned(),
            Self::NotFound { .. } => "Resource not found".to_owned(),
            Self::Server { .. } => "Server error. Please try again later.".to_owned(),
            Self::Validation { messages } => messages.join("\n"),
            Self::Unauthorized { message } | Self::Status { message, .. } => message.clone(),
            Self::Transport(_) | Self::Decode(_) | Self::HttpClientBuild(_) => FALLBACK_MESSAGE.to_owned(),
            Self::Storage(e) => e.to_string(),
        }
    }

    /// True when the caller should send the user back to the login screen.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::Unauthorized { .. })
    }
}

/// Pull the top-level human message out of a DRF-style error payload.
pub(crate) fn extract_message(body: &Value) -> Option<String> {
    message_under(body, &["detail", "message", "error"])
}

fn message_under(body: &Value, keys: &[&str]) -> Option<String> {
    match body {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => keys.iter().find_map(|key| map.get(*key).and_then(value_text)),
        _ => None,
    }
}

/// Flatten a validation payload into `field: message` lines.
///
/// A payload carrying `detail` or `message` yields that single message. Any
/// other key, `error` included, is rendered as a field line.
pub(crate) fn validation_messages(body: &Value) -> Vec<String> {
    if let Some(message) = message_under(body, &["detail", "message"]) {
        return vec![message];
    }
    let Value::Object(map) = body else {
        return vec![FALLBACK_MESSAGE.to_owned()];
    };

    let mut messages = Vec::new();
    for (field, errors) in map {
        match errors {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = value_text(item) {
                        messages.push(format!("{field}: {text}"));
                    }
                }
            }
            other => {
                if let Some(text) = value_text(other) {
                    messages.push(format!("{field}: {text}"));
                }
            }
        }
    }
    if messages.is_empty() {
        messages.push(FALLBACK_MESSAGE.to_owned());
    }
    messages
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
