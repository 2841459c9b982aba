//! Test utilities and fixtures for conference client testing
//!
//! This module provides a mock of [`ConferenceApi`] and canned backend
//! payloads shared by the tests of this crate and of downstream crates
//! (enable the `test-utils` feature).

#![allow(dead_code)]

use crate::api::ConferenceApi;
use crate::types::{
    Ack, BadgeImage, CvDocument, LoginResponse, UserProfile, Workshop, WorkshopId, WorkshopRef,
};
use async_trait::async_trait;
use mockall::mock;

mock! {
    /// Mock conference backend
    pub ConferenceBackend {}

    #[async_trait]
    impl ConferenceApi for ConferenceBackend {
        async fn login(&self, email: &str, password: &str) -> crate::Result<LoginResponse>;
        async fn logout(&self) -> crate::Result<Ack>;
        async fn profile(&self) -> crate::Result<UserProfile>;
        async fn cv(&self) -> crate::Result<CvDocument>;
        async fn qr_code(&self) -> crate::Result<BadgeImage>;
        async fn list_workshops(&self) -> crate::Result<Vec<Workshop>>;
        async fn enroll(&self, id: &WorkshopId) -> crate::Result<Ack>;
        async fn unenroll(&self, id: &WorkshopId) -> crate::Result<Ack>;
        async fn join_waiting_list(&self, id: &WorkshopId) -> crate::Result<Ack>;
        async fn leave_waiting_list(&self, id: &WorkshopId) -> crate::Result<Ack>;
        async fn user_workshops(&self) -> crate::Result<Vec<WorkshopRef>>;
        async fn user_waiting_list(&self) -> crate::Result<Vec<WorkshopRef>>;
    }
}

/// Workshop fixtures
pub mod workshops {
    use super::*;

    /// Workshop with the given id, availability and capacity on 26 April 2025
    pub fn workshop(id: &str, availability: i64, max_participants: i64) -> Workshop {
        Workshop {
            workshop_id: WorkshopId::new(id),
            title: format!("Workshop {}", id),
            description: Some("<p>Hands-on session</p>".to_string()),
            date: Some("2025-04-26".to_string()),
            hour: Some("10:00:00".to_string()),
            end_time: Some("12:00:00".to_string()),
            availability,
            image_url: None,
            max_participants,
            created_at: None,
            updated_at: None,
        }
    }

    /// Workshop with free places
    pub fn open(id: &str) -> Workshop {
        workshop(id, 5, 20)
    }

    /// Workshop with no free places
    pub fn full(id: &str) -> Workshop {
        workshop(id, 0, 20)
    }

    /// Enrollment or waiting list entry
    pub fn reference(id: &str) -> WorkshopRef {
        WorkshopRef { workshop_id: WorkshopId::new(id), title: None }
    }

    /// `/listworkshops` payload with one open and one full workshop
    pub fn list_json() -> serde_json::Value {
        serde_json::json!([
            {
                "workshop_id": 1,
                "title": "PCB Design",
                "description": "<p>From schematic to board</p>",
                "date": "2025-04-26",
                "hour": "14:00:00",
                "end_time": "16:00:00",
                "availability": 4,
                "image_url": null,
                "max_participants": 15,
                "created_at": "2025-03-01T10:00:00Z",
                "updated_at": "2025-03-20T10:00:00Z"
            },
            {
                "workshop_id": 2,
                "title": "Embedded Rust",
                "date": "2025-04-26",
                "hour": "10:00:00",
                "end_time": null,
                "availability": 0,
                "max_participants": 12
            }
        ])
    }
}

/// Profile fixtures
pub mod profiles {
    use super::*;

    /// A complete attendee profile
    pub fn attendee() -> UserProfile {
        UserProfile {
            name: "Maria Papadopoulou".to_string(),
            email: "maria@example.org".to_string(),
            university: Some("Aristotle University of Thessaloniki".to_string()),
            school: Some("Electrical and Computer Engineering".to_string()),
            city: Some("Thessaloniki".to_string()),
            year: Some("4".to_string()),
            role: None,
            cv: Some("cv/maria.pdf".to_string()),
            email_verified_at: None,
        }
    }

    /// `/profile` payload
    pub fn attendee_json() -> serde_json::Value {
        serde_json::json!({
            "name": "Maria Papadopoulou",
            "email": "maria@example.org",
            "university": "Aristotle University of Thessaloniki",
            "school": "Electrical and Computer Engineering",
            "city": "Thessaloniki",
            "year": 4,
            "cv": "cv/maria.pdf"
        })
    }
}

/// Generic acknowledgement with a message
pub fn ack(message: &str) -> Ack {
    Ack { message: Some(message.to_string()), success: None }
}
