//! Theme provider for the conference companion
//!
//! The attendee picks `light`, `dark` or `system`; `system` follows the
//! device. Dark is the default, both before the stored preference has been
//! read and whenever it is missing or unreadable.
//!
//! # Usage
//!
//! ```rust
//! use app_ui::theme::{ColorScheme, ThemePreference, ThemeState};
//!
//! let state = ThemeState::new(ThemePreference::System);
//! assert_eq!(state.color_scheme(ColorScheme::Light), ColorScheme::Light);
//! assert!(ThemeState::default().is_dark(ColorScheme::Light));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use storage::{KvError, ThemePreferenceStore};
use thiserror::Error;

/// Theme errors
#[derive(Debug, Error)]
pub enum ThemeError {
    /// The preference could not be persisted
    #[error("Failed to save theme preference: {0}")]
    Storage(#[from] KvError),

    /// Unknown preference value
    #[error("Unknown theme: {0}")]
    Unknown(String),
}

/// Result type for theme operations
pub type Result<T> = std::result::Result<T, ThemeError>;

// =============================================================================
// Preference and Scheme
// =============================================================================

/// Resolved color scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    /// Light scheme; also used when the device reports nothing
    #[default]
    Light,
    /// Dark scheme
    Dark,
}

/// Attendee's theme choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    /// Always light
    Light,
    /// Always dark
    #[default]
    Dark,
    /// Follow the device
    System,
}

impl ThemePreference {
    /// Stored string value
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::System => "system",
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            "system" => Ok(ThemePreference::System),
            other => Err(ThemeError::Unknown(other.to_string())),
        }
    }
}

// =============================================================================
// Colors
// =============================================================================

/// Colors of one scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    /// Body text
    pub text: &'static str,
    /// Screen background
    pub background: &'static str,
    /// Accent
    pub tint: &'static str,
    /// Icons
    pub icon: &'static str,
    /// Inactive tab icon
    pub tab_icon_default: &'static str,
    /// Active tab icon
    pub tab_icon_selected: &'static str,
}

const TINT_LIGHT: &str = "#0a7ea4";
const TINT_DARK: &str = "#fff";

/// Light scheme colors
pub const LIGHT_COLORS: ThemeColors = ThemeColors {
    text: "#11181C",
    background: "#fff",
    tint: TINT_LIGHT,
    icon: "#687076",
    tab_icon_default: "#687076",
    tab_icon_selected: TINT_LIGHT,
};

/// Dark scheme colors
pub const DARK_COLORS: ThemeColors = ThemeColors {
    text: "#ECEDEE",
    background: "#151718",
    tint: TINT_DARK,
    icon: "#9BA1A6",
    tab_icon_default: "#9BA1A6",
    tab_icon_selected: TINT_DARK,
};

impl ColorScheme {
    /// Colors of this scheme
    pub fn colors(&self) -> &'static ThemeColors {
        match self {
            ColorScheme::Light => &LIGHT_COLORS,
            ColorScheme::Dark => &DARK_COLORS,
        }
    }
}

// =============================================================================
// Theme State
// =============================================================================

/// Current theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThemeState {
    /// Attendee's choice
    pub preference: ThemePreference,
}

impl ThemeState {
    /// Create a new theme state with the given preference
    pub fn new(preference: ThemePreference) -> Self {
        Self { preference }
    }

    /// Active scheme given the device scheme
    pub fn color_scheme(&self, device: ColorScheme) -> ColorScheme {
        match self.preference {
            ThemePreference::Light => ColorScheme::Light,
            ThemePreference::Dark => ColorScheme::Dark,
            ThemePreference::System => device,
        }
    }

    /// Whether the active scheme is dark
    pub fn is_dark(&self, device: ColorScheme) -> bool {
        self.color_scheme(device) == ColorScheme::Dark
    }
}

/// Theme provider backed by the preference store
#[derive(Debug, Clone)]
pub struct ThemeContext {
    store: ThemePreferenceStore,
    state: ThemeState,
    device: ColorScheme,
}

impl ThemeContext {
    /// Read the stored preference
    ///
    /// A missing or unknown value becomes `dark` and is written back. A
    /// storage failure is logged and also yields `dark`.
    pub fn load(store: ThemePreferenceStore, device: ColorScheme) -> Self {
        let preference = match store.load() {
            Ok(Some(value)) => match value.parse::<ThemePreference>() {
                Ok(preference) => preference,
                Err(_) => Self::reset_to_default(&store),
            },
            Ok(None) => Self::reset_to_default(&store),
            Err(err) => {
                tracing::error!(error = %err, "failed to load theme preference");
                ThemePreference::default()
            }
        };

        Self { store, state: ThemeState::new(preference), device }
    }

    fn reset_to_default(store: &ThemePreferenceStore) -> ThemePreference {
        let preference = ThemePreference::default();
        if let Err(err) = store.save(preference.as_str()) {
            tracing::error!(error = %err, "failed to save theme preference");
        }
        preference
    }

    /// Current state
    pub fn state(&self) -> ThemeState {
        self.state
    }

    /// Current preference
    pub fn preference(&self) -> ThemePreference {
        self.state.preference
    }

    /// Active scheme
    pub fn color_scheme(&self) -> ColorScheme {
        self.state.color_scheme(self.device)
    }

    /// Whether the active scheme is dark
    pub fn is_dark(&self) -> bool {
        self.state.is_dark(self.device)
    }

    /// Colors of the active scheme
    pub fn colors(&self) -> &'static ThemeColors {
        self.color_scheme().colors()
    }

    /// Device scheme changed
    pub fn set_device_scheme(&mut self, device: ColorScheme) {
        self.device = device;
    }

    /// Change the preference
    ///
    /// The value is persisted first; the state only changes when that
    /// succeeds.
    pub fn set_preference(&mut self, preference: ThemePreference) -> Result<()> {
        if let Err(err) = self.store.save(preference.as_str()) {
            tracing::error!(error = %err, "failed to save theme preference");
            return Err(err.into());
        }
        self.state.preference = preference;
        Ok(())
    }
}
