//! API Routes
//!
//! Configures the Axum router with every endpoint.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_ignore, create_event, create_profile, delete_event, get_event, get_profile,
    health_handler, is_attending, is_ignoring, list_attendees, list_events, list_ignored,
    list_profiles, remove_ignore, set_attendance, stats_handler, update_event, update_profile,
    user_profile, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health`, `GET /stats`
/// - `GET|POST /sites/:site_id/profiles`
/// - `GET|PUT /sites/:site_id/profiles/:profile_id`
/// - `GET|POST /sites/:site_id/profiles/:profile_id/ignores`
/// - `GET|DELETE /sites/:site_id/profiles/:profile_id/ignores/:item_type/:item_id`
/// - `GET /sites/:site_id/users/:user_id/profile`
/// - `GET|POST /sites/:site_id/events`
/// - `GET|PUT|DELETE /sites/:site_id/events/:event_id`
/// - `GET|PUT /sites/:site_id/events/:event_id/attendees`
/// - `GET /sites/:site_id/events/:event_id/attendees/:profile_id`
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route(
            "/sites/:site_id/profiles",
            get(list_profiles).post(create_profile),
        )
        .route(
            "/sites/:site_id/profiles/:profile_id",
            get(get_profile).put(update_profile),
        )
        .route(
            "/sites/:site_id/profiles/:profile_id/ignores",
            get(list_ignored).post(add_ignore),
        )
        .route(
            "/sites/:site_id/profiles/:profile_id/ignores/:item_type/:item_id",
            get(is_ignoring).delete(remove_ignore),
        )
        .route("/sites/:site_id/users/:user_id/profile", get(user_profile))
        .route("/sites/:site_id/events", get(list_events).post(create_event))
        .route(
            "/sites/:site_id/events/:event_id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route(
            "/sites/:site_id/events/:event_id/attendees",
            get(list_attendees).put(set_attendance),
        )
        .route(
            "/sites/:site_id/events/:event_id/attendees/:profile_id",
            get(is_attending),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
