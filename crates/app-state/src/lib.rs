//! Application state management for the conference companion
//!
//! This crate provides the shared client-side state: the authentication
//! context, a query cache for server snapshots and per-id mutation tracking.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mutation;
pub mod query;
pub mod session;

pub use mutation::{MutationError, MutationGuard, MutationState, MutationTracker};
pub use query::{Query, QueryClient, QueryConfig, QueryKey, QueryState};
pub use session::{AuthContext, AuthState, AuthStateError};
