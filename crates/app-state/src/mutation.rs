//! Mutation management
//!
//! This module tracks in-flight mutations by id. A screen disables its
//! action while a mutation for the same id is pending; [`MutationTracker`]
//! enforces the same rule for any caller by refusing to start a second
//! mutation under an id that is still pending.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Mutation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MutationError {
    /// A mutation with this id is still in flight
    #[error("Mutation already in progress: {0}")]
    AlreadyPending(String),
}

/// Result type for mutation operations
pub type Result<T> = std::result::Result<T, MutationError>;

/// Mutation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Mutation is idle
    Idle,

    /// Mutation is pending
    Pending,

    /// Mutation succeeded
    Success,

    /// Mutation failed
    Error,
}

/// Tracker of per-id mutation state
#[derive(Debug, Clone, Default)]
pub struct MutationTracker {
    states: Arc<RwLock<HashMap<String, MutationState>>>,
}

impl MutationTracker {
    /// Create a new tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a mutation as pending
    ///
    /// Fails when a mutation with the same id is already pending. The
    /// returned guard records the outcome; dropping it without calling
    /// [`MutationGuard::finish`] returns the id to [`MutationState::Idle`].
    pub fn begin(&self, mutation_id: impl Into<String>) -> Result<MutationGuard> {
        let id = mutation_id.into();
        let mut states = self.states.write();

        if states.get(&id) == Some(&MutationState::Pending) {
            return Err(MutationError::AlreadyPending(id));
        }

        states.insert(id.clone(), MutationState::Pending);
        tracing::debug!(mutation = %id, "mutation started");

        Ok(MutationGuard { tracker: self.clone(), id, finished: false })
    }

    /// Get mutation state
    pub fn state(&self, mutation_id: &str) -> MutationState {
        self.states.read().get(mutation_id).copied().unwrap_or(MutationState::Idle)
    }

    /// Whether a mutation is pending
    pub fn is_pending(&self, mutation_id: &str) -> bool {
        self.state(mutation_id) == MutationState::Pending
    }

    /// Number of pending mutations
    pub fn pending_count(&self) -> usize {
        self.states.read().values().filter(|s| **s == MutationState::Pending).count()
    }

    /// Reset mutation state
    pub fn reset(&self, mutation_id: &str) {
        self.states.write().remove(mutation_id);
    }

    /// Clear all mutation states
    pub fn clear(&self) {
        self.states.write().clear();
    }

    fn set(&self, id: &str, state: MutationState) {
        self.states.write().insert(id.to_string(), state);
    }
}

/// Handle for a pending mutation
#[derive(Debug)]
#[must_use = "dropping the guard immediately ends the mutation"]
pub struct MutationGuard {
    tracker: MutationTracker,
    id: String,
    finished: bool,
}

impl MutationGuard {
    /// Mutation id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record the outcome
    pub fn finish(mut self, success: bool) {
        let state = if success { MutationState::Success } else { MutationState::Error };
        self.tracker.set(&self.id, state);
        self.finished = true;
        tracing::debug!(mutation = %self.id, ?state, "mutation finished");
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.tracker.set(&self.id, MutationState::Idle);
        }
    }
}
