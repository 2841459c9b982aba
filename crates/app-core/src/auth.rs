//! Authentication service
//!
//! Glues the session manager, the observable [`AuthContext`] and the query
//! cache. Signing in or out drops every cached server snapshot so one
//! attendee never sees another attendee's enrollments.

use app_state::{AuthContext, AuthState, AuthStateError, QueryClient};
use conference_client::{SessionManager, SessionToken};
use std::sync::Arc;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// The operation needs a signed-in attendee
    #[error("Authentication required")]
    NotAuthenticated,

    /// Sign-in was rejected; carries the alert text
    #[error("{0}")]
    SignIn(String),

    /// Auth state error
    #[error(transparent)]
    State(#[from] AuthStateError),
}

impl AuthError {
    /// Alert text for the attendee
    pub fn user_message(&self) -> String {
        match self {
            AuthError::NotAuthenticated => {
                "Please log in to view workshop details and register.".to_string()
            }
            AuthError::SignIn(message) => message.clone(),
            AuthError::State(AuthStateError::SessionManager(err)) => err.user_message(),
        }
    }
}

/// Result type for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Authentication service
#[derive(Debug, Clone)]
pub struct AuthService {
    context: AuthContext,
    queries: QueryClient,
}

impl AuthService {
    /// Create a service over a session manager
    pub fn new(manager: Arc<SessionManager>, queries: QueryClient) -> Self {
        Self { context: AuthContext::new(manager), queries }
    }

    /// Create a service over an existing context
    pub fn with_context(context: AuthContext, queries: QueryClient) -> Self {
        Self { context, queries }
    }

    /// Observable auth context
    pub fn context(&self) -> &AuthContext {
        &self.context
    }

    /// Current auth state
    pub fn state(&self) -> AuthState {
        self.context.state()
    }

    /// Restore the stored session on start-up
    pub async fn restore(&self) -> AuthState {
        self.context.restore().await
    }

    /// Sign in
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        match self.context.sign_in(email, password).await {
            Ok(()) => {
                self.queries.clear();
                tracing::info!("signed in");
                Ok(())
            }
            Err(_) => {
                let message = self
                    .context
                    .state()
                    .error
                    .unwrap_or_else(|| app_state::session::SIGN_IN_FALLBACK_ERROR.to_string());
                Err(AuthError::SignIn(message))
            }
        }
    }

    /// Sign out
    ///
    /// Cached server data is dropped even when the token could not be
    /// deleted.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.context.sign_out().await;
        self.queries.clear();
        tracing::info!("signed out");
        result.map_err(Into::into)
    }

    /// Whether a session token is held
    pub fn is_authenticated(&self) -> bool {
        self.context.state().is_authenticated()
    }

    /// Current token, or [`AuthError::NotAuthenticated`]
    ///
    /// Checked before any attendee-specific fetch.
    pub fn require_token(&self) -> Result<SessionToken> {
        self.context.state().token.ok_or(AuthError::NotAuthenticated)
    }
}
