//! Conference backend client library
//!
//! This crate provides the REST client for the conference backend: the
//! HTTP transport, typed API operations, and the session token manager.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod http;
pub mod session;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use api::{ConferenceAgent, ConferenceApi};
pub use http::{ApiClient, ApiClientConfig, ApiError};
pub use session::{SessionManager, SessionManagerError};
pub use types::{
    Ack, BadgeImage, CvDocument, LoginResponse, SessionToken, UserProfile, Workshop, WorkshopId,
    WorkshopRef,
};

/// Result type for API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for API operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server or the transport rejected the request
    #[error(transparent)]
    Api(#[from] ApiError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing the stored token failed
    #[error("Storage error: {0}")]
    Storage(#[from] storage::KvError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Message suitable for an alert shown to the attendee
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(err) => err.message().to_string(),
            Error::Json(_) => http::INVALID_RESPONSE_MESSAGE.to_string(),
            Error::Storage(_) => "Could not access secure storage".to_string(),
            Error::InvalidInput(msg) => msg.clone(),
        }
    }

    /// HTTP status if the error came from the server
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) if err.status() != 0 => Some(err.status()),
            _ => None,
        }
    }
}
