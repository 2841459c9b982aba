//! Conference badge
//!
//! The badge is a QR code generated by the server. The screen either shows
//! it or an empty state; it never shows an error.

use crate::auth::AuthService;
use conference_client::{BadgeImage, ConferenceApi};
use std::fmt;
use std::sync::Arc;

/// Badge service
#[derive(Clone)]
pub struct BadgeService {
    api: Arc<dyn ConferenceApi>,
    auth: AuthService,
}

impl fmt::Debug for BadgeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BadgeService").finish_non_exhaustive()
    }
}

impl BadgeService {
    /// Create a new badge service
    pub fn new(api: Arc<dyn ConferenceApi>, auth: AuthService) -> Self {
        Self { api, auth }
    }

    /// Badge image, `None` when signed out or on any failure
    pub async fn fetch_image(&self) -> Option<BadgeImage> {
        if self.auth.require_token().is_err() {
            tracing::debug!("no session, skipping badge fetch");
            return None;
        }

        match self.api.qr_code().await {
            Ok(image) if image.bytes.is_empty() => {
                tracing::warn!("badge image is empty");
                None
            }
            Ok(image) => Some(image),
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch badge");
                None
            }
        }
    }

    /// Badge as a displayable `data:` URL
    pub async fn fetch(&self) -> Option<String> {
        self.fetch_image().await.map(|image| image.to_data_url())
    }
}
