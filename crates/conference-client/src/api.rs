//! ConferenceAgent - typed client for the conference REST backend
//!
//! The [`ConferenceApi`] trait lists every backend operation the app uses.
//! [`ConferenceAgent`] implements it over [`ApiClient`], reading the bearer
//! token from secure storage on every call so that a sign-in or sign-out
//! performed elsewhere is picked up immediately.
//!
//! # Example
//!
//! ```rust,no_run
//! use conference_client::{ApiClientConfig, ConferenceAgent, ConferenceApi};
//! use std::sync::Arc;
//! use storage::MemorySecureStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent = ConferenceAgent::new(
//!         ApiClientConfig::new("https://example.org/api"),
//!         Arc::new(MemorySecureStore::new()),
//!     )?;
//!
//!     for workshop in agent.list_workshops().await? {
//!         println!("{} ({} left)", workshop.title, workshop.availability);
//!     }
//!     Ok(())
//! }
//! ```

use crate::http::{ApiClient, ApiClientConfig, ApiRequest};
use crate::types::{Ack, BadgeImage, CvDocument, LoginResponse, UserProfile, Workshop, WorkshopId, WorkshopRef};
use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use storage::{SecureStore, SESSION_TOKEN_KEY};

/// Backend endpoint paths
pub mod endpoints {
    /// Sign in
    pub const LOGIN: &str = "/login";
    /// Sign out
    pub const LOGOUT: &str = "/logout";
    /// Current attendee profile
    pub const PROFILE: &str = "/profile";
    /// Current attendee CV
    pub const CV: &str = "/cv";
    /// QR badge image
    pub const QR_CODE: &str = "/user/qrcode";
    /// All workshops
    pub const LIST_WORKSHOPS: &str = "/listworkshops";
    /// Workshops the attendee is enrolled in
    pub const USER_WORKSHOPS: &str = "/profile/workshops";
    /// Workshops the attendee is waiting for
    pub const USER_WAITING_LIST: &str = "/profile/waiting-list";
}

/// Operations offered by the conference backend
#[async_trait]
pub trait ConferenceApi: Send + Sync {
    /// Exchange credentials for a session token
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse>;

    /// Invalidate the current token on the server
    async fn logout(&self) -> Result<Ack>;

    /// Fetch the attendee profile
    async fn profile(&self) -> Result<UserProfile>;

    /// Fetch the attendee CV reference
    async fn cv(&self) -> Result<CvDocument>;

    /// Fetch the QR badge image
    async fn qr_code(&self) -> Result<BadgeImage>;

    /// List all workshops
    async fn list_workshops(&self) -> Result<Vec<Workshop>>;

    /// Enroll in a workshop
    async fn enroll(&self, id: &WorkshopId) -> Result<Ack>;

    /// Cancel an enrollment
    async fn unenroll(&self, id: &WorkshopId) -> Result<Ack>;

    /// Join the waiting list of a full workshop
    async fn join_waiting_list(&self, id: &WorkshopId) -> Result<Ack>;

    /// Leave a waiting list
    async fn leave_waiting_list(&self, id: &WorkshopId) -> Result<Ack>;

    /// Workshops the attendee is enrolled in
    async fn user_workshops(&self) -> Result<Vec<WorkshopRef>>;

    /// Workshops the attendee is waiting for
    async fn user_waiting_list(&self) -> Result<Vec<WorkshopRef>>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// REST implementation of [`ConferenceApi`]
#[derive(Clone)]
pub struct ConferenceAgent {
    client: ApiClient,
    tokens: Arc<dyn SecureStore>,
}

impl std::fmt::Debug for ConferenceAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConferenceAgent").field("base_url", &self.client.base_url()).finish()
    }
}

impl ConferenceAgent {
    /// Create an agent with the given transport config and token source
    pub fn new(config: ApiClientConfig, tokens: Arc<dyn SecureStore>) -> Result<Self> {
        Ok(Self { client: ApiClient::new(config)?, tokens })
    }

    /// Create an agent from an existing client
    pub fn with_client(client: ApiClient, tokens: Arc<dyn SecureStore>) -> Self {
        Self { client, tokens }
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn authorized(&self, request: ApiRequest) -> Result<ApiRequest> {
        match self.tokens.get_item(SESSION_TOKEN_KEY)? {
            Some(token) if !token.is_empty() => Ok(request.bearer(&token)),
            _ => Ok(request),
        }
    }

    async fn read<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authorized(ApiRequest::get(path))?;
        Ok(self.client.send_with_retry(request).await?.data)
    }

    async fn read_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let value: serde_json::Value = self.read(path).await?;
        decode_list(path, value)
    }

    async fn write(&self, request: ApiRequest) -> Result<Ack> {
        let request = self.authorized(request)?;
        let path = request.path.clone();
        let ack = self.client.send::<serde_json::Value>(request).await?.data;
        tracing::info!(%path, "request acknowledged");
        Ok(serde_json::from_value(ack).unwrap_or_default())
    }
}

fn workshop_path(id: &WorkshopId, action: &str) -> String {
    format!("/workshops/{}/{}", urlencoding::encode(id.as_str()), action)
}

/// Lists that are not JSON arrays are treated as empty
fn decode_list<T: DeserializeOwned>(path: &str, value: serde_json::Value) -> Result<Vec<T>> {
    match value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        other => {
            tracing::debug!(%path, kind = json_kind(&other), "expected a list, treating as empty");
            Ok(Vec::new())
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[async_trait]
impl ConferenceApi for ConferenceAgent {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = ApiRequest::post(endpoints::LOGIN).json_body(&LoginRequest { email, password })?;
        let response = self.client.send::<LoginResponse>(request).await?;
        tracing::info!("signed in");
        Ok(response.data)
    }

    async fn logout(&self) -> Result<Ack> {
        self.write(ApiRequest::post(endpoints::LOGOUT)).await
    }

    async fn profile(&self) -> Result<UserProfile> {
        self.read(endpoints::PROFILE).await
    }

    async fn cv(&self) -> Result<CvDocument> {
        self.read(endpoints::CV).await
    }

    async fn qr_code(&self) -> Result<BadgeImage> {
        let request = self.authorized(ApiRequest::get(endpoints::QR_CODE))?;
        let response = self.client.fetch_bytes(request).await?;
        Ok(BadgeImage::new(response.bytes, response.content_type))
    }

    async fn list_workshops(&self) -> Result<Vec<Workshop>> {
        self.read_list(endpoints::LIST_WORKSHOPS).await
    }

    async fn enroll(&self, id: &WorkshopId) -> Result<Ack> {
        self.write(ApiRequest::post(workshop_path(id, "enroll"))).await
    }

    async fn unenroll(&self, id: &WorkshopId) -> Result<Ack> {
        self.write(ApiRequest::delete(workshop_path(id, "unenroll"))).await
    }

    async fn join_waiting_list(&self, id: &WorkshopId) -> Result<Ack> {
        self.write(ApiRequest::post(workshop_path(id, "waiting-list"))).await
    }

    async fn leave_waiting_list(&self, id: &WorkshopId) -> Result<Ack> {
        self.write(ApiRequest::delete(workshop_path(id, "waiting-list"))).await
    }

    async fn user_workshops(&self) -> Result<Vec<WorkshopRef>> {
        self.read_list(endpoints::USER_WORKSHOPS).await
    }

    async fn user_waiting_list(&self) -> Result<Vec<WorkshopRef>> {
        self.read_list(endpoints::USER_WAITING_LIST).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::MemorySecureStore;

    #[test]
    fn test_workshop_path_encodes_id() {
        assert_eq!(workshop_path(&WorkshopId::new("12"), "enroll"), "/workshops/12/enroll");
        assert_eq!(
            workshop_path(&WorkshopId::new("a/b c"), "waiting-list"),
            "/workshops/a%2Fb%20c/waiting-list"
        );
    }

    #[test]
    fn test_decode_list_tolerates_objects() {
        let refs: Vec<WorkshopRef> =
            decode_list("/profile/workshops", serde_json::json!({"data": []})).unwrap();
        assert!(refs.is_empty());

        let refs: Vec<WorkshopRef> =
            decode_list("/profile/workshops", serde_json::json!([{"workshop_id": 3}])).unwrap();
        assert_eq!(refs[0].workshop_id.as_str(), "3");
    }

    #[test]
    fn test_authorized_adds_bearer_only_with_token() {
        let store = Arc::new(MemorySecureStore::new());
        let agent =
            ConferenceAgent::new(ApiClientConfig::new("http://localhost:1/api"), store.clone())
                .unwrap();

        let request = agent.authorized(ApiRequest::get("/profile")).unwrap();
        assert!(!request.headers.contains_key("Authorization"));

        store.set_item(SESSION_TOKEN_KEY, "tok").unwrap();
        let request = agent.authorized(ApiRequest::get("/profile")).unwrap();
        assert_eq!(request.headers.get("Authorization"), Some(&"Bearer tok".to_string()));
    }
}
