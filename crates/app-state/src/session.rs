//! Authentication state
//!
//! [`AuthContext`] wraps the [`SessionManager`] and exposes the state every
//! screen reads: the current token, whether an auth operation is running, and
//! the last sign-in error. Observers subscribe to changes through a
//! `tokio::sync::watch` channel.

use conference_client::{SessionManager, SessionManagerError, SessionToken};
use std::sync::Arc;
use tokio::sync::watch;

/// Message shown when sign-in fails without a more specific one
pub const SIGN_IN_FALLBACK_ERROR: &str = "An error occurred during sign in";

/// Auth state errors
#[derive(Debug, thiserror::Error)]
pub enum AuthStateError {
    /// Session manager error
    #[error("Session manager error: {0}")]
    SessionManager(#[from] SessionManagerError),
}

/// Result type for auth state operations
pub type Result<T> = std::result::Result<T, AuthStateError>;

/// Snapshot of the authentication state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    /// Current token, `None` when signed out
    pub token: Option<SessionToken>,
    /// True while restoring, signing in or signing out
    pub is_loading: bool,
    /// Last sign-in error
    pub error: Option<String>,
}

impl AuthState {
    /// Initial state before the stored token has been read
    pub fn loading() -> Self {
        Self { token: None, is_loading: true, error: None }
    }

    /// Whether a token is held
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::loading()
    }
}

/// Shared authentication context
#[derive(Clone)]
pub struct AuthContext {
    manager: Arc<SessionManager>,
    state: Arc<watch::Sender<AuthState>>,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext").field("state", &*self.state.borrow()).finish()
    }
}

impl AuthContext {
    /// Create a context in the loading state
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let (state, _) = watch::channel(AuthState::loading());
        Self { manager, state: Arc::new(state) }
    }

    /// Current state
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Underlying session manager
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Read the stored token
    ///
    /// A storage failure is logged and leaves the user signed out. Loading
    /// always ends.
    pub async fn restore(&self) -> AuthState {
        let token = match self.manager.restore().await {
            Ok(token) => token,
            Err(err) => {
                tracing::error!(error = %err, "failed to load token");
                None
            }
        };

        self.state.send_modify(|s| {
            s.token = token;
            s.is_loading = false;
        });
        self.state()
    }

    /// Sign in
    ///
    /// On failure the error message is recorded in the state and returned.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        match self.manager.sign_in(email, password).await {
            Ok(response) => {
                self.state.send_modify(|s| {
                    s.token = Some(response.token);
                    s.is_loading = false;
                });
                Ok(())
            }
            Err(err) => {
                let message = sign_in_message(&err);
                tracing::warn!(error = %err, "sign in failed");
                self.state.send_modify(|s| {
                    s.error = Some(message);
                    s.is_loading = false;
                });
                Err(err.into())
            }
        }
    }

    /// Sign out
    ///
    /// The state always ends signed out. A storage failure while deleting the
    /// token is returned after the state has been cleared.
    pub async fn sign_out(&self) -> Result<()> {
        self.state.send_modify(|s| s.is_loading = true);

        let result = self.manager.sign_out().await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "sign out error");
        }

        self.state.send_modify(|s| {
            s.token = None;
            s.is_loading = false;
        });

        result.map_err(Into::into)
    }
}

fn sign_in_message(err: &SessionManagerError) -> String {
    let message = err.user_message();
    if message.trim().is_empty() {
        SIGN_IN_FALLBACK_ERROR.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conference_client::test_utils::MockConferenceBackend;
    use conference_client::{ApiError, LoginResponse};
    use storage::{KvConfig, KvSecureStore, KvStore, MemorySecureStore, SecureStore, SESSION_TOKEN_KEY};

    fn context(api: MockConferenceBackend, store: Arc<dyn SecureStore>) -> AuthContext {
        AuthContext::new(Arc::new(SessionManager::new(Arc::new(api), store)))
    }

    #[tokio::test]
    async fn test_starts_loading() {
        let ctx = context(MockConferenceBackend::new(), Arc::new(MemorySecureStore::new()));
        let state = ctx.state();
        assert!(state.is_loading);
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_ends_loading() {
        let store = Arc::new(MemorySecureStore::new());
        store.set_item(SESSION_TOKEN_KEY, "kept").unwrap();

        let ctx = context(MockConferenceBackend::new(), store);
        let state = ctx.restore().await;
        assert!(!state.is_loading);
        assert!(state.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_in_success_notifies_subscribers() {
        let mut api = MockConferenceBackend::new();
        api.expect_login().returning(|_, _| {
            Ok(LoginResponse { token: SessionToken::new("t"), user: None })
        });

        let ctx = context(api, Arc::new(MemorySecureStore::new()));
        ctx.restore().await;
        let mut rx = ctx.subscribe();
        rx.borrow_and_update();

        ctx.sign_in("a@b.gr", "pw").await.unwrap();

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(state.is_authenticated());
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_sign_in_failure_records_server_message() {
        let mut api = MockConferenceBackend::new();
        api.expect_login().returning(|_, _| {
            Err(ApiError::new(401, "Unauthorized", "Invalid login details").into())
        });

        let ctx = context(api, Arc::new(MemorySecureStore::new()));
        ctx.restore().await;

        assert!(ctx.sign_in("a@b.gr", "bad").await.is_err());
        let state = ctx.state();
        assert_eq!(state.error.as_deref(), Some("Invalid login details"));
        assert!(!state.is_loading);
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_in_failure_without_message_uses_fallback() {
        let mut api = MockConferenceBackend::new();
        api.expect_login().returning(|_, _| Err(ApiError::new(500, "HTTP500", "").into()));

        let ctx = context(api, Arc::new(MemorySecureStore::new()));
        assert!(ctx.sign_in("a@b.gr", "pw").await.is_err());
        assert_eq!(ctx.state().error.as_deref(), Some(SIGN_IN_FALLBACK_ERROR));
    }

    #[tokio::test]
    async fn test_new_sign_in_clears_previous_error() {
        let mut api = MockConferenceBackend::new();
        let mut attempts = 0;
        api.expect_login().times(2).returning(move |_, _| {
            attempts += 1;
            if attempts == 1 {
                Err(ApiError::new(401, "Unauthorized", "Wrong password").into())
            } else {
                Ok(LoginResponse { token: SessionToken::new("t"), user: None })
            }
        });

        let ctx = context(api, Arc::new(MemorySecureStore::new()));
        assert!(ctx.sign_in("a@b.gr", "x").await.is_err());
        ctx.sign_in("a@b.gr", "y").await.unwrap();
        assert_eq!(ctx.state().error, None);
    }

    #[tokio::test]
    async fn test_sign_out_always_ends_signed_out() {
        let mut api = MockConferenceBackend::new();
        api.expect_logout().returning(|| Err(ApiError::network("offline").into()));

        let store = Arc::new(MemorySecureStore::new());
        store.set_item(SESSION_TOKEN_KEY, "t").unwrap();

        let ctx = context(api, store.clone());
        ctx.restore().await;
        ctx.sign_out().await.unwrap();

        assert!(!ctx.state().is_authenticated());
        assert!(!ctx.state().is_loading);
        assert_eq!(store.get_item(SESSION_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_session_survives_restart_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv");

        {
            let mut api = MockConferenceBackend::new();
            api.expect_login().returning(|_, _| {
                Ok(LoginResponse { token: SessionToken::new("persisted"), user: None })
            });
            let kv = KvStore::new(KvConfig::new(&path)).unwrap();
            let ctx = context(api, Arc::new(KvSecureStore::new(kv)));
            ctx.sign_in("a@b.gr", "pw").await.unwrap();
        }

        let kv = KvStore::new(KvConfig::new(&path)).unwrap();
        let ctx = context(MockConferenceBackend::new(), Arc::new(KvSecureStore::new(kv)));
        let state = ctx.restore().await;
        assert_eq!(state.token, Some(SessionToken::new("persisted")));
    }
}
