//! Session manager
//!
//! Owns the current [`SessionToken`] and keeps it in sync with secure
//! storage under [`storage::SESSION_TOKEN_KEY`].
//!
//! # Example
//!
//! ```rust,no_run
//! use conference_client::{ApiClientConfig, ConferenceAgent, SessionManager};
//! use std::sync::Arc;
//! use storage::{MemorySecureStore, SecureStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: Arc<dyn SecureStore> = Arc::new(MemorySecureStore::new());
//!     let agent = ConferenceAgent::new(ApiClientConfig::default(), store.clone())?;
//!     let manager = SessionManager::new(Arc::new(agent), store);
//!
//!     if manager.restore().await?.is_none() {
//!         manager.sign_in("attendee@example.org", "password").await?;
//!     }
//!     Ok(())
//! }
//! ```

use crate::api::ConferenceApi;
use crate::types::{LoginResponse, SessionToken};
use std::sync::Arc;
use storage::{KvError, SecureStore, SESSION_TOKEN_KEY};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during session manager operations
#[derive(Debug, Error)]
pub enum SessionManagerError {
    /// The backend rejected the request
    #[error("Client error: {0}")]
    Client(#[from] crate::Error),

    /// Secure storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] KvError),

    /// Email or password missing
    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl SessionManagerError {
    /// Message suitable for the sign-in screen
    pub fn user_message(&self) -> String {
        match self {
            SessionManagerError::Client(err) => err.user_message(),
            SessionManagerError::Storage(_) => "Could not access secure storage".to_string(),
            SessionManagerError::InvalidCredentials => "Invalid credentials".to_string(),
        }
    }
}

/// Result type for session manager operations
pub type Result<T> = std::result::Result<T, SessionManagerError>;

/// Session manager
///
/// The stored token is the source of truth across restarts; the in-memory
/// copy is what the rest of the app reads.
pub struct SessionManager {
    api: Arc<dyn ConferenceApi>,
    store: Arc<dyn SecureStore>,
    current: RwLock<Option<SessionToken>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager with no current session
    pub fn new(api: Arc<dyn ConferenceApi>, store: Arc<dyn SecureStore>) -> Self {
        Self { api, store, current: RwLock::new(None) }
    }

    /// Load the stored token, making it current when present
    pub async fn restore(&self) -> Result<Option<SessionToken>> {
        let token = self
            .store
            .get_item(SESSION_TOKEN_KEY)?
            .filter(|t| !t.is_empty())
            .map(SessionToken::new);

        tracing::debug!(found = token.is_some(), "restored session token");
        *self.current.write().await = token.clone();
        Ok(token)
    }

    /// Sign in and persist the issued token
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(SessionManagerError::InvalidCredentials);
        }

        let response = self.api.login(email, password).await?;
        self.store.set_item(SESSION_TOKEN_KEY, response.token.as_str())?;
        *self.current.write().await = Some(response.token.clone());

        tracing::info!("session stored");
        Ok(response)
    }

    /// Sign out
    ///
    /// The server call is best effort. The stored token is deleted and the
    /// session cleared regardless of its outcome; only a storage failure is
    /// reported.
    pub async fn sign_out(&self) -> Result<()> {
        if self.current.read().await.is_some() {
            if let Err(err) = self.api.logout().await {
                tracing::warn!(error = %err, "server logout failed, clearing local session anyway");
            }
        }

        *self.current.write().await = None;
        self.store.delete_item(SESSION_TOKEN_KEY)?;

        tracing::info!("session cleared");
        Ok(())
    }

    /// Current token, if signed in
    pub async fn current_token(&self) -> Option<SessionToken> {
        self.current.read().await.clone()
    }

    /// Whether a token is held
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiError;
    use crate::test_utils::MockConferenceBackend as MockApi;
    use storage::MemorySecureStore;

    fn login_ok(token: &str) -> LoginResponse {
        LoginResponse { token: SessionToken::new(token), user: None }
    }

    #[tokio::test]
    async fn test_restore_without_token() {
        let manager =
            SessionManager::new(Arc::new(MockApi::new()), Arc::new(MemorySecureStore::new()));
        assert!(manager.restore().await.unwrap().is_none());
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_restore_with_stored_token() {
        let store = Arc::new(MemorySecureStore::new());
        store.set_item(SESSION_TOKEN_KEY, "stored").unwrap();

        let manager = SessionManager::new(Arc::new(MockApi::new()), store);
        let token = manager.restore().await.unwrap();
        assert_eq!(token.map(|t| t.as_str().to_string()), Some("stored".to_string()));
        assert!(manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_sign_in_persists_token() {
        let mut api = MockApi::new();
        api.expect_login()
            .withf(|email, password| email == "a@b.gr" && password == "pw")
            .times(1)
            .returning(|_, _| Ok(login_ok("fresh")));

        let store = Arc::new(MemorySecureStore::new());
        let manager = SessionManager::new(Arc::new(api), store.clone());

        manager.sign_in(" a@b.gr ", "pw").await.unwrap();
        assert_eq!(store.get_item(SESSION_TOKEN_KEY).unwrap(), Some("fresh".to_string()));
        assert_eq!(manager.current_token().await, Some(SessionToken::new("fresh")));
    }

    #[tokio::test]
    async fn test_sign_in_rejects_empty_credentials() {
        let manager =
            SessionManager::new(Arc::new(MockApi::new()), Arc::new(MemorySecureStore::new()));
        let err = manager.sign_in("", "pw").await.unwrap_err();
        assert!(matches!(err, SessionManagerError::InvalidCredentials));
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_sign_in_failure_keeps_signed_out() {
        let mut api = MockApi::new();
        api.expect_login().returning(|_, _| {
            Err(ApiError::new(401, "Unauthorized", "Wrong email or password").into())
        });

        let store = Arc::new(MemorySecureStore::new());
        let manager = SessionManager::new(Arc::new(api), store.clone());

        let err = manager.sign_in("a@b.gr", "bad").await.unwrap_err();
        assert_eq!(err.user_message(), "Wrong email or password");
        assert!(!manager.is_authenticated().await);
        assert_eq!(store.get_item(SESSION_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_when_server_fails() {
        let mut api = MockApi::new();
        api.expect_logout()
            .times(1)
            .returning(|| Err(ApiError::network("connection refused").into()));

        let store = Arc::new(MemorySecureStore::new());
        store.set_item(SESSION_TOKEN_KEY, "old").unwrap();

        let manager = SessionManager::new(Arc::new(api), store.clone());
        manager.restore().await.unwrap();
        manager.sign_out().await.unwrap();

        assert!(!manager.is_authenticated().await);
        assert_eq!(store.get_item(SESSION_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_out_without_session_skips_server() {
        let mut api = MockApi::new();
        api.expect_logout().times(0);

        let manager = SessionManager::new(Arc::new(api), Arc::new(MemorySecureStore::new()));
        manager.sign_out().await.unwrap();
    }
}
