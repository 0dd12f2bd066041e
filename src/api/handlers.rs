//! API Handlers
//!
//! HTTP request handlers. Each one validates its input and delegates to a
//! service; errors render through `AppError`'s `IntoResponse`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::cache::{CacheBackend, ScopedCache};
use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    AttendanceRequest, AttendingResponse, CreateEventRequest, CreateProfileRequest,
    EventResponse, EventSummary, HealthResponse, IgnoreRequest, Ignored, IgnoringResponse,
    PageQuery, PageResponse, Profile, ProfileSummary, StatsResponse, UpdateEventRequest,
    UpdateProfileRequest,
};
use crate::services::{ServiceSettings, Services};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub cache: ScopedCache,
}

impl AppState {
    pub fn new(db: Database, cache: ScopedCache, settings: ServiceSettings) -> Self {
        Self {
            services: Services::new(db, cache.clone(), settings),
            cache,
        }
    }

    /// Creates a state over a fresh store and the given cache backend.
    pub fn from_config(config: &Config, backend: Arc<dyn CacheBackend>) -> Self {
        Self::new(
            Database::new(),
            ScopedCache::new(backend),
            ServiceSettings::from(config),
        )
    }
}

fn page(query: &PageQuery) -> Result<(i64, i64)> {
    match query.validate() {
        Some(msg) => Err(AppError::Validation(msg)),
        None => Ok(query.resolve()),
    }
}

fn check(problem: Option<String>) -> Result<()> {
    match problem {
        Some(msg) => Err(AppError::Validation(msg)),
        None => Ok(()),
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let store = state.cache.backend_stats().await;
    Json(StatsResponse::new(state.cache.stats(), store))
}

// == Profiles ==

/// Handler for GET /sites/:site_id/profiles
pub async fn list_profiles(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<ProfileSummary>>> {
    let (limit, offset) = page(&query)?;
    let profiles = state.services.profiles.list(site_id, limit, offset).await?;
    Ok(Json(profiles))
}

/// Handler for POST /sites/:site_id/profiles
pub async fn create_profile(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<Profile>)> {
    check(req.validate())?;
    let profile = state.services.profiles.create(site_id, &req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Handler for GET /sites/:site_id/profiles/:profile_id
pub async fn get_profile(
    State(state): State<AppState>,
    Path((site_id, profile_id)): Path<(i64, i64)>,
) -> Result<Json<Profile>> {
    Ok(Json(state.services.profiles.get(site_id, profile_id).await?))
}

/// Handler for PUT /sites/:site_id/profiles/:profile_id
pub async fn update_profile(
    State(state): State<AppState>,
    Path((site_id, profile_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    check(req.validate())?;
    let profile = state
        .services
        .profiles
        .update(site_id, profile_id, &req)
        .await?;
    Ok(Json(profile))
}

/// Handler for GET /sites/:site_id/users/:user_id/profile
pub async fn user_profile(
    State(state): State<AppState>,
    Path((site_id, user_id)): Path<(i64, i64)>,
) -> Result<Json<Profile>> {
    let profile_id = state
        .services
        .profiles
        .profile_id_for_user(site_id, user_id)
        .await?;
    Ok(Json(state.services.profiles.get(site_id, profile_id).await?))
}

// == Events ==

/// Handler for GET /sites/:site_id/events
pub async fn list_events(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<EventSummary>>> {
    let (limit, offset) = page(&query)?;
    let events = state.services.events.list(site_id, limit, offset).await?;
    Ok(Json(events))
}

/// Handler for POST /sites/:site_id/events
///
/// A resubmission inside the dedup window answers 201 with the first event.
pub async fn create_event(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    check(req.validate())?;
    let event = state.services.events.create(site_id, &req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Handler for GET /sites/:site_id/events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    Path((site_id, event_id)): Path<(i64, i64)>,
) -> Result<Json<EventResponse>> {
    Ok(Json(state.services.events.get(site_id, event_id).await?))
}

/// Handler for PUT /sites/:site_id/events/:event_id
pub async fn update_event(
    State(state): State<AppState>,
    Path((site_id, event_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>> {
    check(req.validate())?;
    let event = state.services.events.update(site_id, event_id, &req).await?;
    Ok(Json(event))
}

/// Handler for DELETE /sites/:site_id/events/:event_id
pub async fn delete_event(
    State(state): State<AppState>,
    Path((site_id, event_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    state.services.events.delete(site_id, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /sites/:site_id/events/:event_id/attendees
pub async fn list_attendees(
    State(state): State<AppState>,
    Path((site_id, event_id)): Path<(i64, i64)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<ProfileSummary>>> {
    let (limit, offset) = page(&query)?;
    let attendees = state
        .services
        .events
        .list_attendees(site_id, event_id, limit, offset)
        .await?;
    Ok(Json(attendees))
}

/// Handler for PUT /sites/:site_id/events/:event_id/attendees
pub async fn set_attendance(
    State(state): State<AppState>,
    Path((site_id, event_id)): Path<(i64, i64)>,
    Json(req): Json<AttendanceRequest>,
) -> Result<Json<AttendingResponse>> {
    check(req.validate())?;
    let answer = state
        .services
        .events
        .set_attendance(site_id, event_id, &req)
        .await?;
    Ok(Json(answer))
}

/// Handler for GET /sites/:site_id/events/:event_id/attendees/:profile_id
pub async fn is_attending(
    State(state): State<AppState>,
    Path((site_id, event_id, profile_id)): Path<(i64, i64, i64)>,
) -> Result<Json<AttendingResponse>> {
    let answer = state
        .services
        .events
        .is_attending(site_id, event_id, profile_id)
        .await?;
    Ok(Json(answer))
}

// == Ignores ==

/// Handler for GET /sites/:site_id/profiles/:profile_id/ignores
pub async fn list_ignored(
    State(state): State<AppState>,
    Path((site_id, profile_id)): Path<(i64, i64)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<Ignored>>> {
    let (limit, offset) = page(&query)?;
    let ignored = state
        .services
        .ignores
        .list(site_id, profile_id, limit, offset)
        .await?;
    Ok(Json(ignored))
}

/// Handler for POST /sites/:site_id/profiles/:profile_id/ignores
pub async fn add_ignore(
    State(state): State<AppState>,
    Path((site_id, profile_id)): Path<(i64, i64)>,
    Json(req): Json<IgnoreRequest>,
) -> Result<(StatusCode, Json<IgnoringResponse>)> {
    check(req.validate())?;
    let answer = state.services.ignores.add(site_id, profile_id, &req).await?;
    Ok((StatusCode::CREATED, Json(answer)))
}

/// Handler for GET /sites/:site_id/profiles/:profile_id/ignores/:item_type/:item_id
pub async fn is_ignoring(
    State(state): State<AppState>,
    Path((site_id, profile_id, item_type, item_id)): Path<(i64, i64, String, i64)>,
) -> Result<Json<IgnoringResponse>> {
    let answer = state
        .services
        .ignores
        .is_ignoring(site_id, profile_id, &item_type, item_id)
        .await?;
    Ok(Json(answer))
}

/// Handler for DELETE /sites/:site_id/profiles/:profile_id/ignores/:item_type/:item_id
pub async fn remove_ignore(
    State(state): State<AppState>,
    Path((site_id, profile_id, item_type, item_id)): Path<(i64, i64, String, i64)>,
) -> Result<StatusCode> {
    state
        .services
        .ignores
        .remove(site_id, profile_id, &item_type, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
