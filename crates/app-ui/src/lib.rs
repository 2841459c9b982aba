//! User interface layer for the conference companion
//!
//! This crate holds the parts of the UI that are independent of any
//! rendering toolkit: routing with the authentication guard, per-tab
//! navigation stacks, and the theme provider.
//!
//! # Modules
//!
//! - [`navigation`] - Routes, deep-link matching and the auth guard
//! - [`theme`] - Light, dark and system themes with a stored preference
//!
//! # Example
//!
//! ```rust
//! use app_ui::navigation::{Route, Router};
//!
//! let router = Router::new();
//! assert_eq!(router.match_path("/workshop/4"), Route::WorkshopDetails { id: "4".into() });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod navigation;
pub mod theme;

// Re-export commonly used types
pub use navigation::{
    guard, GuardDecision, NavigationStack, NavigationState, NavigationTab, Route, RouteGroup,
    RouteParams, Router, StackEntry,
};
pub use theme::{
    ColorScheme, ThemeColors, ThemeContext, ThemeError, ThemePreference, ThemeState, DARK_COLORS,
    LIGHT_COLORS,
};
