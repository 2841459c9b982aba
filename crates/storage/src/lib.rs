//! Storage layer for the conference companion
//!
//! This crate provides the sled-backed key-value store and the secure-store
//! facade that holds the session token and device preferences.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;
pub mod preferences;
pub mod secure;

pub use kv::{DeviceStore, KvConfig, KvError, KvStore};
pub use preferences::{ThemePreferenceStore, THEME_KEY};
pub use secure::{KvSecureStore, MemorySecureStore, SecureStore, SESSION_TOKEN_KEY};
