//! Device preferences
//!
//! The theme preference is stored as the raw string the user picked
//! (`"light"`, `"dark"` or `"system"`). Validation of the value belongs to
//! the theme layer so that an unknown value written by another build can be
//! detected and replaced there.

use crate::kv::Result;
use crate::secure::SecureStore;
use std::sync::Arc;

/// Key under which the theme preference is stored
pub const THEME_KEY: &str = "theme";

/// Persists the theme preference in secure storage
#[derive(Clone)]
pub struct ThemePreferenceStore {
    store: Arc<dyn SecureStore>,
}

impl std::fmt::Debug for ThemePreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemePreferenceStore").finish_non_exhaustive()
    }
}

impl ThemePreferenceStore {
    /// Create a preference store on top of a secure store
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// Read the stored preference, if any
    pub fn load(&self) -> Result<Option<String>> {
        self.store.get_item(THEME_KEY)
    }

    /// Store a preference
    pub fn save(&self, value: &str) -> Result<()> {
        self.store.set_item(THEME_KEY, value)
    }
}
