//! Request DTOs for the REST API
//!
//! Defines the structure of query strings and incoming request bodies.
//! `validate` returns the first problem found, or None if the request is usable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EventStatus, ItemType, Rsvp};

/// Default page size when `limit` is omitted
pub const DEFAULT_PAGE_LIMIT: i64 = 25;

/// Largest page a caller may request
pub const MAX_PAGE_LIMIT: i64 = 100;

pub const MAX_PROFILE_NAME_LENGTH: usize = 100;
pub const MAX_EVENT_TITLE_LENGTH: usize = 150;

/// `?limit=&offset=` query string of every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn validate(&self) -> Option<String> {
        if let Some(limit) = self.limit {
            if limit < 1 || limit > MAX_PAGE_LIMIT {
                return Some(format!(
                    "limit ({limit}) must be between 1 and {MAX_PAGE_LIMIT}"
                ));
            }
        }
        if let Some(offset) = self.offset {
            if offset < 0 {
                return Some(format!("offset ({offset}) must not be negative"));
            }
        }
        None
    }

    /// (limit, offset) with defaults applied.
    pub fn resolve(&self) -> (i64, i64) {
        (
            self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            self.offset.unwrap_or(0),
        )
    }
}

fn check_text(field: &str, value: &str, max: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field} cannot be empty"));
    }
    if trimmed.chars().count() > max {
        return Some(format!("{field} exceeds maximum length of {max} characters"));
    }
    None
}

/// Body of `POST /sites/:site_id/profiles`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub user_id: i64,
    pub profile_name: String,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl CreateProfileRequest {
    pub fn validate(&self) -> Option<String> {
        if self.user_id <= 0 {
            return Some(format!("userId ({}) must be a positive integer", self.user_id));
        }
        check_text("profileName", &self.profile_name, MAX_PROFILE_NAME_LENGTH)
    }
}

/// Body of `PUT /sites/:site_id/profiles/:profile_id`; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Option<String> {
        match &self.profile_name {
            Some(name) => check_text("profileName", name, MAX_PROFILE_NAME_LENGTH),
            None => None,
        }
    }
}

/// Body of `POST /sites/:site_id/events`
///
/// Also serialized as the dedup fingerprint input, so it only carries fields
/// that make two submissions "the same event".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub when: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rsvp_limit: Option<i32>,
    pub created_by: i64,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Option<String> {
        if let Some(problem) = check_text("title", &self.title, MAX_EVENT_TITLE_LENGTH) {
            return Some(problem);
        }
        if self.created_by <= 0 {
            return Some("createdBy must be a positive profile id".to_string());
        }
        if let Some(status) = &self.status {
            if EventStatus::parse(status).is_none() {
                return Some(format!("status ('{status}') is not a valid event status"));
            }
        }
        if matches!(self.duration_minutes, Some(d) if d < 0) {
            return Some("durationMinutes must not be negative".to_string());
        }
        if matches!(self.rsvp_limit, Some(l) if l < 0) {
            return Some("rsvpLimit must not be negative".to_string());
        }
        None
    }
}

/// Body of `PUT /sites/:site_id/events/:event_id`; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub when: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rsvp_limit: Option<i32>,
    /// Every edit must say why
    #[serde(default)]
    pub edit_reason: String,
}

impl UpdateEventRequest {
    pub fn validate(&self) -> Option<String> {
        if self.edit_reason.trim().is_empty() {
            return Some("You must provide a reason for the update".to_string());
        }
        if let Some(title) = &self.title {
            if let Some(problem) = check_text("title", title, MAX_EVENT_TITLE_LENGTH) {
                return Some(problem);
            }
        }
        if let Some(status) = &self.status {
            if EventStatus::parse(status).is_none() {
                return Some(format!("status ('{status}') is not a valid event status"));
            }
        }
        if matches!(self.duration_minutes, Some(d) if d < 0) {
            return Some("durationMinutes must not be negative".to_string());
        }
        if matches!(self.rsvp_limit, Some(l) if l < 0) {
            return Some("rsvpLimit must not be negative".to_string());
        }
        None
    }
}

/// Body of `PUT /sites/:site_id/events/:event_id/attendees`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub profile_id: i64,
    pub rsvp: String,
}

impl AttendanceRequest {
    pub fn validate(&self) -> Option<String> {
        if self.profile_id <= 0 {
            return Some(format!(
                "profileId ({}) must be a positive integer",
                self.profile_id
            ));
        }
        if Rsvp::parse(&self.rsvp).is_none() {
            return Some(format!("rsvp ('{}') must be one of invited, yes, maybe, no", self.rsvp));
        }
        None
    }
}

/// Body of `POST /sites/:site_id/profiles/:profile_id/ignores`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoreRequest {
    pub item_type: String,
    pub item_id: i64,
}

impl IgnoreRequest {
    pub fn validate(&self) -> Option<String> {
        if ItemType::parse(&self.item_type).is_none() {
            return Some(format!(
                "itemType ('{}') must be one of profile, event",
                self.item_type
            ));
        }
        if self.item_id <= 0 {
            return Some(format!("itemId ({}) must be a positive integer", self.item_id));
        }
        None
    }
}
