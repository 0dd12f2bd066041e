//! Resource records, cached views and the HTTP DTOs built around them.

pub mod common;
pub mod event;
pub mod ignore;
pub mod profile;
pub mod requests;
pub mod responses;

pub use common::{Link, Meta};
pub use event::{AttendeeRecord, Event, EventRecord, EventStatus, EventSummary, Rsvp};
pub use ignore::{IgnoreRecord, Ignored, IgnoredItems, ItemRef, ItemSummary, ItemType};
pub use profile::{Profile, ProfileRecord, ProfileSummary};
pub use requests::{
    AttendanceRequest, CreateEventRequest, CreateProfileRequest, IgnoreRequest, PageQuery,
    UpdateEventRequest, UpdateProfileRequest,
};
pub use responses::{
    AttendingResponse, ErrorResponse, EventResponse, HealthResponse, IgnoringResponse, PageResponse,
    StatsResponse,
};
