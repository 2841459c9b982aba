//! Core application logic for the conference companion
//!
//! This crate contains the business logic behind each screen: the agenda
//! time filter, workshop registration, the attendee profile, the badge and
//! the sponsor directory.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agenda;
pub mod auth;
pub mod badge;
pub mod profiles;
pub mod sponsors;
pub mod workshops;

pub use agenda::{Agenda, AgendaDay, AgendaEvent, ConferenceTimezone, EventKind, TimeRange};
pub use auth::{AuthError, AuthService};
pub use badge::BadgeService;
pub use profiles::{CvStatus, DisplayProfile, ProfileService};
pub use sponsors::{Sponsor, SponsorLevel, Sponsors};
pub use workshops::{
    WorkshopAction, WorkshopDetails, WorkshopError, WorkshopFilter, WorkshopOperation,
    WorkshopOutcome, WorkshopService,
};

/// Severity of a [`Notice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Operation succeeded
    Success,
    /// Informational
    Info,
    /// Operation failed
    Error,
}

/// Alert shown to the attendee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Alert title
    pub title: String,
    /// Alert body
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, title: &str, message: impl Into<String>) -> Self {
        Self { level, title: title.to_string(), message: message.into() }
    }

    /// Success alert
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, "Success", message)
    }

    /// Informational alert
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, "Info", message)
    }

    /// Error alert
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, "Error", message)
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

impl From<&WorkshopError> for Notice {
    fn from(err: &WorkshopError) -> Self {
        Notice::error(err.user_message())
    }
}
