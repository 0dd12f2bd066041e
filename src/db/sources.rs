//! `RecordSource` implementations: the store's fetch-by-id for each view.

use async_trait::async_trait;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::hydrate::RecordSource;
use crate::models::{Event, EventSummary, Profile, ProfileSummary};

fn missing(kind: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{kind} {id} not found"))
}

#[async_trait]
impl RecordSource<ProfileSummary> for Database {
    async fn load(&self, site_id: i64, id: i64) -> Result<ProfileSummary> {
        self.read(|t| t.profile(site_id, id).map(ProfileSummary::from))
            .await?
            .ok_or_else(|| missing("profile", id))
    }
}

#[async_trait]
impl RecordSource<Profile> for Database {
    async fn load(&self, site_id: i64, id: i64) -> Result<Profile> {
        self.read(|t| t.profile(site_id, id).map(Profile::from))
            .await?
            .ok_or_else(|| missing("profile", id))
    }
}

#[async_trait]
impl RecordSource<EventSummary> for Database {
    async fn load(&self, site_id: i64, id: i64) -> Result<EventSummary> {
        self.read(|t| t.event(site_id, id).map(EventSummary::from))
            .await?
            .ok_or_else(|| missing("event", id))
    }
}

#[async_trait]
impl RecordSource<Event> for Database {
    async fn load(&self, site_id: i64, id: i64) -> Result<Event> {
        self.read(|t| t.event(site_id, id).map(Event::from))
            .await?
            .ok_or_else(|| missing("event", id))
    }
}
