//! Wire types for the conference backend
//!
//! The backend is loosely typed: ids arrive as numbers or strings, the
//! academic year may be either, and list endpoints occasionally return an
//! object instead of an array. The types here absorb those differences so
//! that the rest of the workspace sees one shape.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// =============================================================================
// Session token
// =============================================================================

/// Opaque bearer token issued by the backend
///
/// No structure is assumed. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value for the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Workshop identifier, normalised to a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WorkshopId(String);

impl WorkshopId {
    /// Create an id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkshopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkshopId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for WorkshopId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for WorkshopId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => Ok(WorkshopId(s)),
            StringOrNumber::Number(n) => Ok(WorkshopId(n.to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

// =============================================================================
// Profile
// =============================================================================

/// Attendee profile snapshot returned by `/profile`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// University
    #[serde(default)]
    pub university: Option<String>,
    /// School or department
    #[serde(default)]
    pub school: Option<String>,
    /// City
    #[serde(default)]
    pub city: Option<String>,
    /// Year of study (the backend sends either a number or a string)
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: Option<String>,
    /// Role at the conference
    #[serde(default)]
    pub role: Option<String>,
    /// Reference to the uploaded CV
    #[serde(default)]
    pub cv: Option<String>,
    /// When the email was verified
    #[serde(default)]
    pub email_verified_at: Option<String>,
}

/// CV reference returned by `/cv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvDocument {
    /// Viewable URL
    #[serde(alias = "url", default)]
    pub cv_url: Option<String>,
    /// Original file name
    #[serde(default)]
    pub file_name: Option<String>,
}

// =============================================================================
// Workshops
// =============================================================================

/// Workshop as returned by `/listworkshops`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workshop {
    /// Workshop id
    pub workshop_id: WorkshopId,
    /// Title
    pub title: String,
    /// HTML description
    #[serde(default)]
    pub description: Option<String>,
    /// Date as `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<String>,
    /// Start time as `HH:MM[:SS]`
    #[serde(default)]
    pub hour: Option<String>,
    /// End time as `HH:MM[:SS]`
    #[serde(default)]
    pub end_time: Option<String>,
    /// Remaining places; zero or below means full
    #[serde(default)]
    pub availability: i64,
    /// Cover image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Capacity
    #[serde(default)]
    pub max_participants: i64,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Workshop {
    /// Places taken so far
    pub fn spots_filled(&self) -> i64 {
        self.max_participants - self.availability
    }

    /// No places left
    pub fn is_full(&self) -> bool {
        self.availability <= 0
    }

    /// Start time as `HH:MM`
    pub fn start_hhmm(&self) -> Option<String> {
        self.start_time().map(|t| t.format("%H:%M").to_string())
    }

    /// End time as `HH:MM`
    pub fn end_hhmm(&self) -> Option<String> {
        parse_clock(self.end_time.as_deref()?).map(|t| t.format("%H:%M").to_string())
    }

    /// Parsed calendar date
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.as_deref()?.trim(), "%Y-%m-%d").ok()
    }

    /// Parsed start time
    pub fn start_time(&self) -> Option<NaiveTime> {
        parse_clock(self.hour.as_deref()?)
    }

    /// Local start date and time, when both are known
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        Some(self.calendar_date()?.and_time(self.start_time()?))
    }
}

/// Server clock times come as `HH:MM:SS` or `HH:MM`, hours not always padded
fn parse_clock(time: &str) -> Option<NaiveTime> {
    let time = time.trim();
    NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .ok()
}

/// Entry of the user's enrollment or waiting list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopRef {
    /// Referenced workshop
    pub workshop_id: WorkshopId,
    /// Title, when the backend includes it
    #[serde(default)]
    pub title: Option<String>,
}

// =============================================================================
// Auth and acknowledgements
// =============================================================================

/// Response of `/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Issued token
    #[serde(alias = "access_token")]
    pub token: SessionToken,
    /// Embedded profile, when present
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Generic acknowledgement of a mutating call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    /// Server message
    #[serde(default)]
    pub message: Option<String>,
    /// Set for `204 No Content` replies
    #[serde(default)]
    pub success: Option<bool>,
}

// =============================================================================
// Badge
// =============================================================================

/// QR badge image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeImage {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// MIME type
    pub content_type: String,
}

impl BadgeImage {
    /// Create a badge, defaulting the MIME type to PNG
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        let content_type = content_type
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_string())
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| "image/png".to_string());
        Self { bytes, content_type }
    }

    /// Displayable `data:` URL
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, BASE64.encode(&self.bytes))
    }
}
