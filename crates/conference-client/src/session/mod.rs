//! Session token lifecycle
//!
//! A session is nothing more than the bearer token issued at sign-in. It is
//! created by [`SessionManager::sign_in`], read back by
//! [`SessionManager::restore`] on app start and deleted by
//! [`SessionManager::sign_out`]. The token is never inspected, validated or
//! refreshed on the client.

mod manager;

pub use manager::{Result, SessionManager, SessionManagerError};
