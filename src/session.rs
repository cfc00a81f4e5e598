//! Session State Machine
//!
//! `Anonymous -> Authenticating -> Authenticated`, and back to `Anonymous` on
//! logout or when the transport reports a 401. The token only exists inside
//! the `Authenticated` state, so "token present iff authenticated" holds by
//! construction.

use std::cell::Cell;
use std::rc::Rc;

use leptos::prelude::*;

use crate::api::{self, ApiClient, SessionEvent};
use crate::error::{ApiError, ApiResult};
use crate::models::{AccessToken, Credentials, EmailVerification, Registration};
use crate::validation::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(AccessToken),
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Anonymous => SessionStatus::Anonymous,
            SessionState::Authenticating => SessionStatus::Authenticating,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
        }
    }

    pub fn token(&self) -> Option<&AccessToken> {
        match self {
            SessionState::Authenticated(token) => Some(token),
            _ => None,
        }
    }
}

/// Successful registration; the email is needed for the verification step
#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    pub email: String,
    pub response: serde_json::Value,
}

struct SessionInner {
    client: ApiClient,
    state: ArcRwSignal<SessionState>,
    resolved: ArcRwSignal<bool>,
    initialized: Cell<bool>,
}

impl SessionInner {
    fn set_state(&self, next: SessionState) {
        tracing::debug!(from = ?self.state.with_untracked(SessionState::status), to = ?next.status(), "session transition");
        self.state.set(next);
    }

    fn force_logout(&self, path: &str) {
        tracing::info!(%path, "session invalidated by server");
        self.set_state(SessionState::Anonymous);
    }
}

/// Owned session handle; clones share state
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionInner>,
}

impl Session {
    /// Create an unresolved, anonymous session bound to `client`'s event bus.
    pub fn new(client: ApiClient) -> Self {
        let inner = Rc::new(SessionInner {
            client,
            state: ArcRwSignal::new(SessionState::Anonymous),
            resolved: ArcRwSignal::new(false),
            initialized: Cell::new(false),
        });

        let weak = Rc::downgrade(&inner);
        inner.client.events().subscribe(move |event| {
            if let SessionEvent::Invalidated { path } = event {
                if let Some(inner) = weak.upgrade() {
                    inner.force_logout(path);
                }
            }
        });

        Self { inner }
    }

    /// Read the stored token and resolve the session. Runs once; later calls
    /// are ignored.
    pub fn initialize(&self) {
        if self.inner.initialized.replace(true) {
            tracing::debug!("session already initialized");
            return;
        }
        match self.inner.client.credentials().load() {
            Some(token) => {
                tracing::info!("restored session from stored token");
                self.inner.set_state(SessionState::Authenticated(AccessToken::new(token)));
            }
            None => self.inner.set_state(SessionState::Anonymous),
        }
        self.inner.resolved.set(true);
    }

    // ========================
    // Observation
    // ========================

    /// Read-only subscription to the session state
    pub fn state(&self) -> ArcReadSignal<SessionState> {
        self.inner.state.read_only()
    }

    /// Becomes `true` once `initialize` has run, and stays there
    pub fn resolved(&self) -> ArcReadSignal<bool> {
        self.inner.resolved.read_only()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.with_untracked(SessionState::status)
    }

    /// `None` until the session has been initialized
    pub fn resolved_status(&self) -> Option<SessionStatus> {
        self.inner.resolved.get_untracked().then(|| self.status())
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    // ========================
    // Operations
    // ========================

    /// Exchange credentials for a token.
    ///
    /// Callers must not start another login while one is in flight; if they
    /// do, whichever resolves last decides the final state.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<()> {
        let credentials = Credentials {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        credentials.validate()?;

        let client = &self.inner.client;
        let ending_session = self.is_authenticated();
        if client.credentials().load().is_some() {
            client.credentials().clear();
        }
        if ending_session {
            tracing::info!("ending current session before new login");
            client.events().emit(SessionEvent::LoggedOut);
        }
        self.inner.set_state(SessionState::Authenticating);

        match api::auth::login(client, &credentials).await {
            Ok(response) if !response.access_token.is_empty() => {
                client.credentials().save(&response.access_token);
                self.inner.set_state(SessionState::Authenticated(AccessToken::new(response.access_token)));
                tracing::info!(username = %credentials.username, "logged in");
                Ok(())
            }
            Ok(_) => {
                tracing::warn!("login response carried an empty token");
                self.inner.set_state(SessionState::Anonymous);
                Err(ApiError::Authentication("login failed".to_string()))
            }
            Err(e) => {
                self.inner.set_state(SessionState::Anonymous);
                Err(ApiError::rejected(e, "login failed"))
            }
        }
    }

    /// Create an account. Does not touch the session; the account still has
    /// to be verified by email before `login` will succeed.
    pub async fn register(&self, registration: &Registration) -> ApiResult<Registered> {
        registration.validate()?;
        match api::auth::register(&self.inner.client, registration).await {
            Ok(response) => Ok(Registered {
                email: registration.email.clone(),
                response,
            }),
            Err(e) => Err(ApiError::rejected(e, "Registration failed")),
        }
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> ApiResult<()> {
        let verification = EmailVerification {
            email: email.trim().to_string(),
            code: code.trim().to_string(),
        };
        verification.validate()?;
        api::auth::verify_email(&self.inner.client, &verification)
            .await
            .map(|_| ())
            .map_err(|e| ApiError::rejected(e, "Verification failed. Please try again."))
    }

    /// Drop the token and return to anonymous. Safe to call in any state.
    pub fn logout(&self) {
        self.inner.client.credentials().clear();
        self.inner.set_state(SessionState::Anonymous);
        tracing::info!("logged out");
        self.inner.client.events().emit(SessionEvent::LoggedOut);
    }
}
