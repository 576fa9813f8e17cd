//! Session manager — bearer attachment and refresh-on-401.
//!
//! ARCHITECTURE
//! ============
//! ```text
//!   Anonymous ──login──▶ Authenticated ──401──▶ Refreshing
//!       ▲                     ▲  │                 │  │
//!       │                     │  └────logout───────┼──┼──▶ Anonymous
//!       │                     └──refresh ok────────┘  │
//!       └─────────────────────refresh failed──────────┘
//! ```
//!
//! DESIGN
//! ======
//! - The manager is the single writer of the credential store. Login,
//!   refresh, and logout each issue one store mutation.
//! - `execute` threads an explicit attempt counter: a request may be
//!   replayed at most `MAX_REFRESH_RETRIES` times after a refresh. A 401 on
//!   the replay is surfaced, never refreshed again.
//! - Refreshes are single-flight. The guard is held across the refresh call;
//!   a waiter that finds the stored access token changed since its request
//!   was sent reuses the new token instead of refreshing again.
//! - Credentials are written only after a complete refresh response, so a
//!   dropped (cancelled) future never leaves a half-updated session.
//! - Logout takes the refresh guard too. A refreshed access token is stored
//!   only if the refresh token it was minted from is still the stored one.

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::store::{CredentialStore, REFRESH_KEY, TOKEN_KEY, USER_EMAIL_KEY, USER_ID_KEY, USER_NAME_KEY};
use crate::api::types::{LoginResponse, RefreshResponse};
use crate::error::ApiError;
use crate::net::{ApiRequest, ApiResponse, HttpTransport};

pub const REFRESH_PATH: &str = "/auth/refresh/";
pub const LOGOUT_PATH: &str = "/api/auth/logout/";

/// Replays allowed per originating request after a successful refresh.
pub const MAX_REFRESH_RETRIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    Refreshing,
}

/// Navigation target requested by a session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

/// Cached display identity. Not authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub user_id: Option<String>,
}

struct Attempt {
    request: ApiRequest,
    retries: u32,
}

impl Attempt {
    fn can_retry(&self) -> bool {
        self.retries < MAX_REFRESH_RETRIES
    }
}

pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
    redirect: Mutex<Option<Route>>,
    refresh_guard: tokio::sync::Mutex<()>,
}

impl SessionManager {
    /// Build a manager over `store`. A stored access token resumes the session
    /// as `Authenticated`; validity is only discovered by the server.
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<dyn CredentialStore>) -> Self {
        let initial =
            if store.get(TOKEN_KEY).is_some() { SessionState::Authenticated } else { SessionState::Anonymous };
        let (state, _) = watch::channel(initial);
        Self { transport, store, state, redirect: Mutex::new(None), refresh_guard: tokio::sync::Mutex::new(()) }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY)
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        Some(Session { access_token: self.store.get(TOKEN_KEY)?, refresh_token: self.store.get(REFRESH_KEY)? })
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            email: self.store.get(USER_EMAIL_KEY),
            user_name: self.store.get(USER_NAME_KEY),
            user_id: self.store.get(USER_ID_KEY),
        }
    }

    /// Take the pending navigation target, if a transition requested one.
    pub fn take_redirect(&self) -> Option<Route> {
        self.redirect.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Store a fresh login. Identity fields absent from the response are
    /// cleared so a previous user's name never lingers.
    pub fn establish(&self, login: &LoginResponse) -> Result<(), ApiError> {
        let mut entries = vec![(TOKEN_KEY, login.access.as_str()), (REFRESH_KEY, login.refresh.as_str())];
        if let Some(email) = &login.email {
            entries.push((USER_EMAIL_KEY, email.as_str()));
        }
        if let Some(name) = &login.user_name {
            entries.push((USER_NAME_KEY, name.as_str()));
        }
        if let Some(id) = &login.user_id {
            entries.push((USER_ID_KEY, id.as_str()));
        }
        self.store.replace(&entries)?;
        self.state.send_replace(SessionState::Authenticated);
        info!(user_name = login.user_name.as_deref().unwrap_or(""), "session established");
        Ok(())
    }

    /// Explicit logout. Tells the server (best effort) to revoke the refresh
    /// token, then purges local state and requests the home route. Calling
    /// it while anonymous is a no-op apart from the redirect.
    ///
    /// Holds the refresh guard, so an in-flight refresh completes before the
    /// purge and can never write a token back afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the credential store cannot be cleared.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _guard = self.refresh_guard.lock().await;
        if let Some(refresh) = self.store.get(REFRESH_KEY) {
            let request = ApiRequest::post(LOGOUT_PATH).with_body(serde_json::json!({ "refresh": refresh }));
            match self.dispatch(request).await {
                Ok((response, _)) if response.is_success() => debug!("server logout acknowledged"),
                Ok((response, _)) => debug!(status = response.status, "server logout rejected; clearing locally"),
                Err(e) => debug!(error = %e, "server logout failed; clearing locally"),
            }
        }
        self.store.clear()?;
        self.state.send_replace(SessionState::Anonymous);
        self.set_redirect(Route::Home);
        info!("logged out");
        Ok(())
    }

    // =========================================================================
    // REQUEST EXECUTION
    // =========================================================================

    /// Send `request`, refreshing and replaying once on 401.
    ///
    /// # Errors
    ///
    /// - [`ApiError::SessionExpired`] when the refresh itself fails.
    /// - [`ApiError::Unauthorized`] when the replayed request is rejected too,
    ///   or a public request is rejected.
    /// - Any other non-success status, classified by [`ApiError::from_response`].
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut attempt = Attempt { request, retries: 0 };
        loop {
            let (response, sent_token) = self.dispatch(attempt.request.clone()).await?;
            if response.status != 401 || attempt.request.public {
                return response.error_for_status();
            }
            if !attempt.can_retry() {
                warn!(path = %attempt.request.path, retries = attempt.retries, "authorization failed after refresh");
                return response.error_for_status();
            }
            self.refresh(sent_token.as_deref()).await?;
            attempt.retries += 1;
        }
    }

    /// [`execute`](Self::execute) and decode the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.execute(request).await?.json()
    }

    /// [`execute`](Self::execute) and discard the body.
    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    /// Attach the current bearer (authorized calls only) and send once.
    async fn dispatch(&self, mut request: ApiRequest) -> Result<(ApiResponse, Option<String>), ApiError> {
        let token = if request.public { None } else { self.store.get(TOKEN_KEY) };
        request.bearer.clone_from(&token);
        let response = self.transport.send(&request).await?;
        Ok((response, token))
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// `rejected` is the access token the failing request carried.
    async fn refresh(&self, rejected: Option<&str>) -> Result<(), ApiError> {
        let _guard = self.refresh_guard.lock().await;

        let current = self.store.get(TOKEN_KEY);
        if current.is_some() && current.as_deref() != rejected {
            debug!("access token already refreshed by a concurrent request");
            return Ok(());
        }

        let Some(refresh_token) = self.store.get(REFRESH_KEY) else {
            warn!("no refresh token stored; ending session");
            self.purge(Route::Login);
            return Err(ApiError::SessionExpired);
        };

        let _refreshing = RefreshingState::enter(&self.state);
        let request = ApiRequest::post(REFRESH_PATH).with_body(serde_json::json!({ "refresh": refresh_token })).public();
        let outcome = match self.transport.send(&request).await {
            Ok(response) if response.is_success() => response.json::<RefreshResponse>(),
            Ok(response) => Err(ApiError::from_response(response.status, &response.body)),
            Err(e) => Err(e),
        };

        // Another writer replaced the session while the call was in flight.
        if self.store.get(REFRESH_KEY).as_deref() != Some(refresh_token.as_str()) {
            warn!("session replaced during token refresh; discarding refresh outcome");
            return Err(ApiError::SessionExpired);
        }

        let stored = outcome.and_then(|body| self.store.set(TOKEN_KEY, &body.access).map_err(ApiError::from));
        match stored {
            Ok(()) => {
                self.state.send_replace(SessionState::Authenticated);
                info!("access token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed; ending session");
                self.purge(Route::Login);
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Drop every stored credential. Storage errors are logged; the in-memory
    /// state still moves to `Anonymous`.
    fn purge(&self, route: Route) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear stored credentials");
        }
        self.state.send_replace(SessionState::Anonymous);
        self.set_redirect(route);
    }

    fn set_redirect(&self, route: Route) {
        *self.redirect.lock().unwrap_or_else(PoisonError::into_inner) = Some(route);
    }
}

/// Holds `Refreshing` for the duration of a refresh call. If the future is
/// dropped mid-refresh the state falls back to `Authenticated`, since the
/// stored credentials were not touched.
struct RefreshingState<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl<'a> RefreshingState<'a> {
    fn enter(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_replace(SessionState::Refreshing);
        Self { state }
    }
}

impl Drop for RefreshingState<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Refreshing {
                *state = SessionState::Authenticated;
                true
            } else {
                false
            }
        });
    }
}
