//! Event and attendance flows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::cache::{CacheKey, EntityKind, Scope, ScopedCache};
use crate::db::{Database, IdFilter};
use crate::error::{AppError, Result};
use crate::hydrate::{Aggregator, CachedFetcher, DedupGuard, Fingerprint, Pagination};
use crate::models::{
    AttendanceRequest, AttendeeRecord, AttendingResponse, CreateEventRequest, Event, EventRecord,
    EventResponse, EventStatus, EventSummary, PageResponse, ProfileSummary, Rsvp,
    UpdateEventRequest,
};
use crate::services::profiles::ProfileSummaries;

pub type EventSummaries = CachedFetcher<EventSummary, Database>;

fn parse_status(value: Option<&str>) -> Result<Option<EventStatus>> {
    value
        .map(|v| {
            EventStatus::parse(v)
                .ok_or_else(|| AppError::Validation(format!("status ('{v}') is not valid")))
        })
        .transpose()
}

/// Fields that make two create requests the same submission.
#[derive(Serialize)]
struct CreateFingerprint<'a> {
    site_id: i64,
    #[serde(flatten)]
    request: &'a CreateEventRequest,
}

#[derive(Clone)]
pub struct EventService {
    db: Database,
    cache: ScopedCache,
    aggregator: Aggregator,
    dedup: DedupGuard,
    summaries: Arc<EventSummaries>,
    details: Arc<CachedFetcher<Event, Database>>,
    profiles: Arc<ProfileSummaries>,
    record_ttl: Duration,
}

impl EventService {
    pub fn new(
        db: Database,
        cache: ScopedCache,
        aggregator: Aggregator,
        dedup: DedupGuard,
        summaries: Arc<EventSummaries>,
        profiles: Arc<ProfileSummaries>,
        record_ttl: Duration,
    ) -> Self {
        Self {
            details: Arc::new(CachedFetcher::new(
                cache.clone(),
                Arc::new(db.clone()),
                record_ttl,
            )),
            summaries,
            db,
            cache,
            aggregator,
            dedup,
            profiles,
            record_ttl,
        }
    }

    /// Events of a site, newest first.
    pub async fn list(
        &self,
        site_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<PageResponse<EventSummary>> {
        let page = self
            .db
            .fetch_id_page(&IdFilter::Events { site_id }, limit, offset)
            .await?;
        let pagination = Pagination::compute(page.total, limit, offset)?;
        let items = self
            .aggregator
            .run(site_id, &page.ids, self.summaries.clone())
            .await?;

        Ok(PageResponse::new(items, pagination))
    }

    /// Event detail with its attendee count.
    pub async fn get(&self, site_id: i64, event_id: i64) -> Result<EventResponse> {
        let event = self.details.get(site_id, event_id).await?;
        let rsvp_attending = self.attending_count(event_id).await?;

        Ok(EventResponse {
            event,
            rsvp_attending,
        })
    }

    /// Creates an event, or returns the one an identical request created
    /// a moment ago.
    pub async fn create(&self, site_id: i64, req: &CreateEventRequest) -> Result<EventResponse> {
        let fingerprint = Fingerprint::of(&CreateFingerprint {
            site_id,
            request: req,
        })?;

        if let Some(existing) = self.dedup.check(&fingerprint).await {
            match self.get(site_id, existing).await {
                Ok(event) => return Ok(event),
                // Deleted since; treat as a fresh submission
                Err(AppError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let status = parse_status(req.status.as_deref())?.unwrap_or(EventStatus::Upcoming);

        let id = self
            .db
            .run_in_transaction(|t| {
                if t.profile(site_id, req.created_by).is_none() {
                    return Err(AppError::Validation(format!(
                        "createdBy ({}) is not a profile on this site",
                        req.created_by
                    )));
                }

                let id = t.next_event_id();
                t.events.insert(
                    id,
                    EventRecord {
                        id,
                        site_id,
                        title: req.title.trim().to_string(),
                        when: req.when,
                        duration_minutes: req.duration_minutes.unwrap_or(0),
                        location: req.location.clone(),
                        status,
                        rsvp_limit: req.rsvp_limit.unwrap_or(0),
                        created_by: req.created_by,
                        created: Utc::now(),
                        edited: None,
                    },
                );
                Ok(id)
            })
            .await?;

        self.dedup.remember(&fingerprint, id).await;
        self.cache.purge(EntityKind::Event, id).await;
        info!(site_id, event_id = id, "event created");

        self.get(site_id, id).await
    }

    pub async fn update(
        &self,
        site_id: i64,
        event_id: i64,
        req: &UpdateEventRequest,
    ) -> Result<EventResponse> {
        let status = parse_status(req.status.as_deref())?;

        self.db
            .run_in_transaction(|t| {
                let row = t
                    .event_mut(site_id, event_id)
                    .ok_or_else(|| AppError::NotFound(format!("event {event_id} not found")))?;

                if let Some(title) = &req.title {
                    row.title = title.trim().to_string();
                }
                if req.when.is_some() {
                    row.when = req.when;
                }
                if let Some(duration) = req.duration_minutes {
                    row.duration_minutes = duration;
                }
                if let Some(location) = &req.location {
                    row.location = Some(location.clone()).filter(|l| !l.is_empty());
                }
                if let Some(status) = status {
                    row.status = status;
                }
                if let Some(limit) = req.rsvp_limit {
                    row.rsvp_limit = limit;
                }
                row.edited = Some(Utc::now());
                Ok(())
            })
            .await?;

        self.cache.purge(EntityKind::Event, event_id).await;
        info!(site_id, event_id, reason = %req.edit_reason, "event updated");

        self.get(site_id, event_id).await
    }

    /// Deletes an event together with its attendance.
    pub async fn delete(&self, site_id: i64, event_id: i64) -> Result<()> {
        self.db
            .run_in_transaction(|t| {
                if t.event(site_id, event_id).is_none() {
                    return Err(AppError::NotFound(format!("event {event_id} not found")));
                }
                t.remove_event(event_id);
                Ok(())
            })
            .await?;

        self.cache.purge(EntityKind::Event, event_id).await;
        info!(site_id, event_id, "event deleted");

        Ok(())
    }

    /// Records a profile's answer for an event.
    ///
    /// Only the attendance scopes are purged; detail and summary do not
    /// carry attendance.
    pub async fn set_attendance(
        &self,
        site_id: i64,
        event_id: i64,
        req: &AttendanceRequest,
    ) -> Result<AttendingResponse> {
        let rsvp = Rsvp::parse(&req.rsvp)
            .ok_or_else(|| AppError::Validation(format!("rsvp ('{}') is not valid", req.rsvp)))?;
        let profile_id = req.profile_id;

        self.db
            .run_in_transaction(|t| {
                let limit = t
                    .event(site_id, event_id)
                    .ok_or_else(|| AppError::NotFound(format!("event {event_id} not found")))?
                    .rsvp_limit;
                if t.profile(site_id, profile_id).is_none() {
                    return Err(AppError::NotFound(format!("profile {profile_id} not found")));
                }

                let previous = t.attendees.get(&(event_id, profile_id)).cloned();
                let already_attending = previous.as_ref().is_some_and(|p| p.rsvp.is_attending());
                if rsvp.is_attending()
                    && !already_attending
                    && limit > 0
                    && t.attending_count(event_id) >= i64::from(limit)
                {
                    return Err(AppError::Conflict(format!(
                        "event {event_id} has reached its limit of {limit} attendees"
                    )));
                }

                t.attendees.insert(
                    (event_id, profile_id),
                    AttendeeRecord {
                        event_id,
                        profile_id,
                        rsvp,
                        created: previous.map(|p| p.created).unwrap_or_else(Utc::now),
                    },
                );
                Ok(())
            })
            .await?;

        self.cache
            .purge_scope(Scope::Counts, EntityKind::Event, event_id)
            .await;
        self.cache
            .purge_scope(Scope::RelatedIds, EntityKind::Event, event_id)
            .await;
        info!(site_id, event_id, profile_id, rsvp = ?rsvp, "attendance recorded");

        Ok(AttendingResponse {
            event_id,
            profile_id,
            attending: rsvp.is_attending(),
        })
    }

    pub async fn is_attending(
        &self,
        site_id: i64,
        event_id: i64,
        profile_id: i64,
    ) -> Result<AttendingResponse> {
        self.details.get(site_id, event_id).await?;
        let attending = self.attending_ids(event_id).await?.contains(&profile_id);

        Ok(AttendingResponse {
            event_id,
            profile_id,
            attending,
        })
    }

    /// Profiles attending an event, in the order they answered.
    pub async fn list_attendees(
        &self,
        site_id: i64,
        event_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<PageResponse<ProfileSummary>> {
        self.details.get(site_id, event_id).await?;

        let page = self
            .db
            .fetch_id_page(&IdFilter::Attendees { site_id, event_id }, limit, offset)
            .await?;
        let pagination = Pagination::compute(page.total, limit, offset)?;
        let items = self
            .aggregator
            .run(site_id, &page.ids, self.profiles.clone())
            .await?;

        Ok(PageResponse::new(items, pagination))
    }

    async fn attending_count(&self, event_id: i64) -> Result<i64> {
        let key = CacheKey::scoped(EntityKind::Event, Scope::Counts, event_id);
        if let Some(count) = self.cache.get_int(&key).await {
            return Ok(count);
        }

        let count = self.db.attending_count(event_id).await?;
        self.cache.set_int(&key, count, self.record_ttl).await;
        Ok(count)
    }

    async fn attending_ids(&self, event_id: i64) -> Result<Vec<i64>> {
        let key = CacheKey::scoped(EntityKind::Event, Scope::RelatedIds, event_id);
        if let Some(ids) = self.cache.get_ids(&key).await {
            return Ok(ids);
        }

        let ids = self.db.attending_ids(event_id).await?;
        self.cache.set_ids(&key, &ids, self.record_ttl).await;
        Ok(ids)
    }
}
