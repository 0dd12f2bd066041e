//! Event and attendance records and their cached views.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheRecord, EntityKind, Scope};
use crate::hydrate::CachedView;
use crate::models::common::{Link, Meta};

/// Lifecycle state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Proposed,
    Upcoming,
    Postponed,
    Cancelled,
    Past,
}

impl EventStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "proposed" => Some(Self::Proposed),
            "upcoming" => Some(Self::Upcoming),
            "postponed" => Some(Self::Postponed),
            "cancelled" => Some(Self::Cancelled),
            "past" => Some(Self::Past),
            _ => None,
        }
    }
}

/// Attendance answer for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rsvp {
    Invited,
    Yes,
    Maybe,
    No,
}

impl Rsvp {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "invited" => Some(Self::Invited),
            "yes" => Some(Self::Yes),
            "maybe" => Some(Self::Maybe),
            "no" => Some(Self::No),
            _ => None,
        }
    }

    /// Only a "yes" takes a place.
    pub fn is_attending(&self) -> bool {
        matches!(self, Self::Yes)
    }
}

/// Authoritative event row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub site_id: i64,
    pub title: String,
    pub when: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub status: EventStatus,
    /// 0 means unlimited
    pub rsvp_limit: i32,
    pub created_by: i64,
    pub created: DateTime<Utc>,
    pub edited: Option<DateTime<Utc>>,
}

/// Authoritative attendance row, one per (event, profile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendeeRecord {
    pub event_id: i64,
    pub profile_id: i64,
    pub rsvp: Rsvp,
    pub created: DateTime<Utc>,
}

/// List-view projection of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: i64,
    pub site_id: i64,
    pub title: String,
    /// RFC 3339, seconds precision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: EventStatus,
    pub rsvp_limit: i32,
    pub meta: Meta,
}

/// Full event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub site_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    pub duration_minutes: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: EventStatus,
    pub rsvp_limit: i32,
    pub created_by: i64,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited: Option<DateTime<Utc>>,
    pub meta: Meta,
}

fn event_links(site_id: i64, id: i64) -> Vec<Link> {
    vec![
        Link::new("self", format!("/sites/{site_id}/events/{id}")),
        Link::new("attendees", format!("/sites/{site_id}/events/{id}/attendees")),
        Link::site(site_id),
    ]
}

fn format_when(when: Option<DateTime<Utc>>) -> Option<String> {
    when.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl From<&EventRecord> for EventSummary {
    fn from(record: &EventRecord) -> Self {
        Self {
            id: record.id,
            site_id: record.site_id,
            title: record.title.clone(),
            when: format_when(record.when),
            location: record.location.clone(),
            status: record.status,
            rsvp_limit: record.rsvp_limit,
            meta: Meta::default(),
        }
    }
}

impl From<&EventRecord> for Event {
    fn from(record: &EventRecord) -> Self {
        Self {
            id: record.id,
            site_id: record.site_id,
            title: record.title.clone(),
            when: format_when(record.when),
            duration_minutes: record.duration_minutes,
            location: record.location.clone(),
            status: record.status,
            rsvp_limit: record.rsvp_limit,
            created_by: record.created_by,
            created: record.created,
            edited: record.edited,
            meta: Meta::default(),
        }
    }
}

impl CacheRecord for EventSummary {
    const SCHEMA: &'static str = "event_summary.v1";
}

impl CachedView for EventSummary {
    const KIND: EntityKind = EntityKind::Event;
    const SCOPE: Scope = Scope::Summary;

    fn site_id(&self) -> i64 {
        self.site_id
    }

    fn enrich(&mut self) {
        self.meta.links = event_links(self.site_id, self.id);
    }
}

impl CacheRecord for Event {
    const SCHEMA: &'static str = "event.v1";
}

impl CachedView for Event {
    const KIND: EntityKind = EntityKind::Event;
    const SCOPE: Scope = Scope::Detail;

    fn site_id(&self) -> i64 {
        self.site_id
    }

    fn enrich(&mut self) {
        self.meta.links = event_links(self.site_id, self.id);
    }
}
