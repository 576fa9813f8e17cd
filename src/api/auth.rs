//! Authentication endpoints: login, registration, email verification,
//! password reset, and the current-user profile.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use serde_json::json;
use tracing::info;

use super::types::{LoginResponse, MessageResponse, ProfileUpdate, RegisterRequest, User, VerificationStatus};
use crate::error::ApiError;
use crate::net::ApiRequest;
use crate::session::SessionManager;

const LOGIN_PATH: &str = "/auth/login/";
const REGISTER_PATH: &str = "/auth/register/";
const SEND_VERIFICATION_PATH: &str = "/auth/send-verification/";
const CHECK_VERIFICATION_PATH: &str = "/auth/check-verification/";
const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password/";
const RESET_PASSWORD_PATH: &str = "/auth/reset-password/";
const ME_PATH: &str = "/api/auth/me/";
const PROFILE_PATH: &str = "/api/auth/user/profile/";

fn verify_email_path(uid: &str, token: &str) -> String {
    format!("/auth/verify-email/{uid}/{token}/")
}

/// Exchange credentials for a token pair and establish the session.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] for bad credentials; the refresh
/// protocol is never attempted for this call.
pub async fn login(session: &SessionManager, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let request = ApiRequest::post(LOGIN_PATH).with_body(json!({ "email": email, "password": password })).public();
    let login: LoginResponse = session.send_json(request).await?;
    session.establish(&login)?;
    info!(email, "logged in");
    Ok(login)
}

/// Create an account. The server sends a verification email; the account
/// cannot log in until it is confirmed.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] with per-field messages on rejected input.
pub async fn register(session: &SessionManager, request: &RegisterRequest) -> Result<MessageResponse, ApiError> {
    session.send_json(ApiRequest::post(REGISTER_PATH).json(request)?.public()).await
}

/// Send (or resend) the verification email for `email`.
///
/// # Errors
///
/// Propagates the server's classification of the failure.
pub async fn send_verification(session: &SessionManager, email: &str) -> Result<MessageResponse, ApiError> {
    let request = ApiRequest::post(SEND_VERIFICATION_PATH).with_body(json!({ "email": email })).public();
    session.send_json(request).await
}

/// Ask whether `email` has been verified yet.
///
/// # Errors
///
/// Propagates the server's classification of the failure.
pub async fn check_verification(session: &SessionManager, email: &str) -> Result<VerificationStatus, ApiError> {
    let request = ApiRequest::post(CHECK_VERIFICATION_PATH).with_body(json!({ "email": email })).public();
    session.send_json(request).await
}

/// Confirm an email address with the `uid`/`token` pair from the link.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] when the link is invalid or expired.
pub async fn verify_email(session: &SessionManager, uid: &str, token: &str) -> Result<MessageResponse, ApiError> {
    session.send_json(ApiRequest::get(verify_email_path(uid, token)).public()).await
}

/// Request a password-reset email.
///
/// # Errors
///
/// Propagates the server's classification of the failure.
pub async fn forgot_password(session: &SessionManager, email: &str) -> Result<MessageResponse, ApiError> {
    let request = ApiRequest::post(FORGOT_PASSWORD_PATH).with_body(json!({ "email": email })).public();
    session.send_json(request).await
}

/// Set a new password using the `uidb64`/`token` pair from the reset link.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for an invalid link or a weak password.
pub async fn reset_password(
    session: &SessionManager,
    uidb64: &str,
    token: &str,
    new_password: &str,
) -> Result<MessageResponse, ApiError> {
    let body = json!({ "uidb64": uidb64, "token": token, "new_password": new_password });
    session.send_json(ApiRequest::post(RESET_PASSWORD_PATH).with_body(body).public()).await
}

/// Fetch the authenticated user's profile.
///
/// # Errors
///
/// Returns [`ApiError::SessionExpired`] when no valid session can be restored.
pub async fn current_user(session: &SessionManager) -> Result<User, ApiError> {
    session.send_json(ApiRequest::get(ME_PATH)).await
}

/// Patch the signed-in user's name, phone, or address.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] locally when `update` sets nothing, and
/// for server-side field errors.
pub async fn update_profile(session: &SessionManager, update: &ProfileUpdate) -> Result<User, ApiError> {
    if update.is_empty() {
        return Err(ApiError::Validation { messages: vec!["Nothing to update".to_owned()] });
    }
    let user: User = session.send_json(ApiRequest::patch(PROFILE_PATH).json(update)?).await?;
    info!(user_id = user.id, "profile updated");
    Ok(user)
}
