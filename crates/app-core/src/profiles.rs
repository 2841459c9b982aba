//! Attendee profile
//!
//! This module fetches the attendee profile and CV reference and turns them
//! into the strings the profile screen shows, with fallbacks for missing
//! fields and for signed-out visitors.

use crate::auth::{AuthError, AuthService};
use crate::Notice;
use app_state::{Query, QueryClient, QueryKey};
use async_trait::async_trait;
use conference_client::{ConferenceApi, CvDocument, UserProfile};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Shown for optional fields the attendee left empty
pub const NOT_SPECIFIED: &str = "Not specified";

/// Notice when there is no CV to open
pub const NO_CV_MESSAGE: &str = "No CV available to view";

/// Profile service error types
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No active session
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Client error
    #[error("Failed to load profile: {0}")]
    Client(#[from] conference_client::Error),
}

impl ProfileError {
    /// Alert text for the attendee
    pub fn user_message(&self) -> String {
        match self {
            ProfileError::Auth(err) => err.user_message(),
            ProfileError::Client(err) => err.user_message(),
        }
    }
}

/// Result type for profile operations
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Profile as displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayProfile {
    /// Full name
    pub name: String,
    /// Role label
    pub role: String,
    /// University
    pub university: String,
    /// Email address
    pub email: String,
    /// City
    pub city: String,
    /// School or department
    pub school: String,
    /// Year of study
    pub year: String,
    /// Stored CV reference
    pub cv: Option<String>,
}

impl DisplayProfile {
    /// Placeholder for signed-out visitors
    pub fn guest() -> Self {
        Self {
            name: "Guest User".to_string(),
            role: "Guest".to_string(),
            university: "Not logged in".to_string(),
            email: "guest@example.com".to_string(),
            city: "Unknown".to_string(),
            school: "Unknown".to_string(),
            year: "Unknown".to_string(),
            cv: None,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn or_not_specified(value: Option<&str>) -> String {
    non_empty(value).unwrap_or(NOT_SPECIFIED).to_string()
}

impl From<Option<&UserProfile>> for DisplayProfile {
    fn from(profile: Option<&UserProfile>) -> Self {
        let Some(user) = profile else {
            return Self::guest();
        };

        Self {
            name: user.name.clone(),
            role: non_empty(user.role.as_deref()).unwrap_or("Attendee").to_string(),
            university: or_not_specified(user.university.as_deref()),
            email: user.email.clone(),
            city: or_not_specified(user.city.as_deref()),
            school: or_not_specified(user.school.as_deref()),
            year: or_not_specified(user.year.as_deref()),
            cv: non_empty(user.cv.as_deref()).map(str::to_string),
        }
    }
}

/// CV section state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CvStatus {
    /// Whether a CV is on file
    pub uploaded: bool,
    /// File name to show
    pub file_name: Option<String>,
    /// URL to open
    pub url: Option<String>,
}

impl CvStatus {
    /// No CV on file
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from the `/cv` response
    ///
    /// The file name falls back to the last path segment of the URL.
    pub fn from_document(document: &CvDocument) -> Self {
        let url = non_empty(document.cv_url.as_deref()).map(str::to_string);
        let file_name = non_empty(document.file_name.as_deref()).map(str::to_string).or_else(|| {
            url.as_deref()
                .and_then(|u| u.split(['?', '#']).next())
                .and_then(|u| u.rsplit('/').next())
                .filter(|name| !name.is_empty())
                .map(|name| urlencoding::decode(name).map(|n| n.into_owned()).unwrap_or_else(|_| name.to_string()))
        });

        Self { uploaded: url.is_some(), file_name, url }
    }

    /// URL to open, or the notice shown instead
    pub fn view(&self) -> std::result::Result<&str, Notice> {
        self.url.as_deref().ok_or_else(|| Notice::info(NO_CV_MESSAGE))
    }
}

struct ProfileQuery {
    api: Arc<dyn ConferenceApi>,
}

#[async_trait]
impl Query for ProfileQuery {
    type Data = UserProfile;
    type Error = conference_client::Error;

    async fn fetch(&self) -> std::result::Result<Self::Data, Self::Error> {
        self.api.profile().await
    }

    fn key(&self) -> QueryKey {
        QueryKey::new("profile", "me")
    }
}

/// Profile service
#[derive(Clone)]
pub struct ProfileService {
    api: Arc<dyn ConferenceApi>,
    auth: AuthService,
    queries: QueryClient,
}

impl fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileService").field("queries", &self.queries).finish()
    }
}

impl ProfileService {
    /// Create a new profile service
    pub fn new(api: Arc<dyn ConferenceApi>, auth: AuthService, queries: QueryClient) -> Self {
        Self { api, auth, queries }
    }

    /// Fetch the attendee profile
    pub async fn profile(&self) -> Result<UserProfile> {
        self.auth.require_token()?;
        Ok(self.queries.get(&ProfileQuery { api: self.api.clone() }).await?)
    }

    /// Profile for display; the guest placeholder when signed out
    pub async fn display_profile(&self) -> Result<DisplayProfile> {
        if !self.auth.is_authenticated() {
            return Ok(DisplayProfile::guest());
        }
        let profile = self.profile().await?;
        Ok(DisplayProfile::from(Some(&profile)))
    }

    /// CV section state
    ///
    /// Never fails: signed out or a failing fetch both mean no CV.
    pub async fn cv_status(&self) -> CvStatus {
        if self.auth.require_token().is_err() {
            return CvStatus::none();
        }

        match self.api.cv().await {
            Ok(document) => CvStatus::from_document(&document),
            Err(err) => {
                tracing::warn!(error = %err, "unexpected error loading CV");
                CvStatus::none()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoticeLevel;
    use conference_client::test_utils::{profiles, MockConferenceBackend};
    use conference_client::{ApiError, SessionManager};
    use storage::{MemorySecureStore, SecureStore, SESSION_TOKEN_KEY};

    async fn service(api: MockConferenceBackend, signed_in: bool) -> ProfileService {
        let api: Arc<dyn ConferenceApi> = Arc::new(api);
        let store = Arc::new(MemorySecureStore::new());
        if signed_in {
            store.set_item(SESSION_TOKEN_KEY, "token").unwrap();
        }
        let queries = QueryClient::new();
        let auth = AuthService::new(Arc::new(SessionManager::new(api.clone(), store)), queries.clone());
        auth.restore().await;
        ProfileService::new(api, auth, queries)
    }

    #[test]
    fn test_guest_profile() {
        let profile = DisplayProfile::from(None);
        assert_eq!(profile.name, "Guest User");
        assert_eq!(profile.role, "Guest");
        assert_eq!(profile.university, "Not logged in");
        assert_eq!(profile.email, "guest@example.com");
        assert_eq!(profile.year, "Unknown");
    }

    #[test]
    fn test_profile_fallbacks() {
        let mut user = profiles::attendee();
        user.city = None;
        user.school = Some(String::new());
        user.year = None;

        let profile = DisplayProfile::from(Some(&user));
        assert_eq!(profile.name, "Maria Papadopoulou");
        assert_eq!(profile.role, "Attendee");
        assert_eq!(profile.university, "Aristotle University of Thessaloniki");
        assert_eq!(profile.city, NOT_SPECIFIED);
        assert_eq!(profile.school, NOT_SPECIFIED);
        assert_eq!(profile.year, NOT_SPECIFIED);
        assert_eq!(profile.cv.as_deref(), Some("cv/maria.pdf"));
    }

    #[test]
    fn test_explicit_role_kept() {
        let mut user = profiles::attendee();
        user.role = Some("Speaker".to_string());
        assert_eq!(DisplayProfile::from(Some(&user)).role, "Speaker");
    }

    #[test]
    fn test_cv_status_from_document() {
        let status = CvStatus::from_document(&CvDocument {
            cv_url: Some("https://cdn.example.org/cv/Maria%20CV.pdf?sig=1".to_string()),
            file_name: None,
        });
        assert!(status.uploaded);
        assert_eq!(status.file_name.as_deref(), Some("Maria CV.pdf"));
        assert_eq!(status.view().unwrap(), "https://cdn.example.org/cv/Maria%20CV.pdf?sig=1");

        let named = CvStatus::from_document(&CvDocument {
            cv_url: Some("https://cdn.example.org/x".to_string()),
            file_name: Some("resume.pdf".to_string()),
        });
        assert_eq!(named.file_name.as_deref(), Some("resume.pdf"));
    }

    #[test]
    fn test_missing_cv_notice() {
        let status = CvStatus::from_document(&CvDocument { cv_url: None, file_name: None });
        assert!(!status.uploaded);

        let notice = status.view().unwrap_err();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert_eq!(notice.message, NO_CV_MESSAGE);
    }

    #[tokio::test]
    async fn test_display_profile_signed_in() {
        let mut api = MockConferenceBackend::new();
        api.expect_profile().times(1).returning(|| Ok(profiles::attendee()));

        let service = service(api, true).await;
        let profile = service.display_profile().await.unwrap();
        assert_eq!(profile.email, "maria@example.org");
    }

    #[tokio::test]
    async fn test_display_profile_signed_out() {
        let mut api = MockConferenceBackend::new();
        api.expect_profile().never();

        let service = service(api, false).await;
        assert_eq!(service.display_profile().await.unwrap(), DisplayProfile::guest());
        assert!(matches!(service.profile().await, Err(ProfileError::Auth(AuthError::NotAuthenticated))));
    }

    #[tokio::test]
    async fn test_cv_fetch_failure_means_no_cv() {
        let mut api = MockConferenceBackend::new();
        api.expect_cv().returning(|| Err(ApiError::network("offline").into()));

        let service = service(api, true).await;
        assert_eq!(service.cv_status().await, CvStatus::none());
    }

    #[tokio::test]
    async fn test_cv_signed_out_skips_request() {
        let mut api = MockConferenceBackend::new();
        api.expect_cv().never();

        let service = service(api, false).await;
        assert!(!service.cv_status().await.uploaded);
    }
}
