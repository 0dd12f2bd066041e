//! Services Module
//!
//! Resource flows composed from the store, the scoped cache and the
//! hydration helpers. Mutations purge the cache right after commit.

pub mod events;
pub mod ignores;
pub mod profiles;

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ScopedCache;
use crate::config::Config;
use crate::db::Database;
use crate::hydrate::{Aggregator, CachedFetcher, DedupGuard};

pub use events::EventService;
pub use ignores::IgnoreService;
pub use profiles::ProfileService;

/// Tunables shared by every service.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub record_ttl: Duration,
    pub dedup_ttl: Duration,
    pub max_concurrency: usize,
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            record_ttl: Duration::from_secs(config.record_ttl),
            dedup_ttl: Duration::from_secs(config.dedup_ttl),
            max_concurrency: config.aggregate_concurrency,
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub profiles: ProfileService,
    pub events: EventService,
    pub ignores: IgnoreService,
}

impl Services {
    pub fn new(db: Database, cache: ScopedCache, settings: ServiceSettings) -> Self {
        let aggregator = Aggregator::new(settings.max_concurrency);
        let profile_summaries = Arc::new(CachedFetcher::new(
            cache.clone(),
            Arc::new(db.clone()),
            settings.record_ttl,
        ));
        let event_summaries = Arc::new(CachedFetcher::new(
            cache.clone(),
            Arc::new(db.clone()),
            settings.record_ttl,
        ));
        let dedup = DedupGuard::new(cache.clone(), settings.dedup_ttl);

        Self {
            profiles: ProfileService::new(
                db.clone(),
                cache.clone(),
                aggregator,
                profile_summaries.clone(),
                settings.record_ttl,
            ),
            events: EventService::new(
                db.clone(),
                cache.clone(),
                aggregator,
                dedup,
                event_summaries.clone(),
                profile_summaries.clone(),
                settings.record_ttl,
            ),
            ignores: IgnoreService::new(
                db,
                cache,
                aggregator,
                profile_summaries,
                event_summaries,
                settings.record_ttl,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, EntityKind, MemoryBackend, Scope};
    use crate::error::AppError;
    use crate::models::{
        AttendanceRequest, CreateEventRequest, CreateProfileRequest, Event, IgnoreRequest,
        IgnoredItems, ItemSummary, ItemType, UpdateEventRequest, UpdateProfileRequest,
    };

    struct Fixture {
        db: Database,
        cache: ScopedCache,
        services: Services,
    }

    fn fixture() -> Fixture {
        fixture_with_dedup_ttl(Duration::from_secs(300))
    }

    fn fixture_with_dedup_ttl(dedup_ttl: Duration) -> Fixture {
        let db = Database::new();
        let cache = ScopedCache::new(Arc::new(MemoryBackend::new(1000)));
        let settings = ServiceSettings {
            record_ttl: Duration::from_secs(60),
            dedup_ttl,
            max_concurrency: 4,
        };
        let services = Services::new(db.clone(), cache.clone(), settings);
        Fixture {
            db,
            cache,
            services,
        }
    }

    fn new_profile(user_id: i64, name: &str) -> CreateProfileRequest {
        CreateProfileRequest {
            user_id,
            profile_name: name.to_string(),
            visible: None,
            avatar_url: None,
        }
    }

    fn new_event(title: &str, created_by: i64, rsvp_limit: Option<i32>) -> CreateEventRequest {
        CreateEventRequest {
            title: title.to_string(),
            when: None,
            duration_minutes: Some(90),
            location: None,
            status: None,
            rsvp_limit,
            created_by,
        }
    }

    fn answer(profile_id: i64, rsvp: &str) -> AttendanceRequest {
        AttendanceRequest {
            profile_id,
            rsvp: rsvp.to_string(),
        }
    }

    #[tokio::test]
    async fn test_profile_list_is_hydrated_in_order() {
        let f = fixture();
        for (user, name) in [(1, "Cleo"), (2, "abe"), (3, "Bo")] {
            f.services.profiles.create(7, &new_profile(user, name)).await.unwrap();
        }

        let page = f.services.profiles.list(7, 2, 0).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|p| p.profile_name.as_str()).collect();

        assert_eq!(names, vec!["abe", "Bo"]);
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 2);
        assert_eq!(page.max_offset, 2);
    }

    #[tokio::test]
    async fn test_profile_list_rejects_offset_past_end() {
        let f = fixture();
        f.services.profiles.create(7, &new_profile(1, "a")).await.unwrap();

        let result = f.services.profiles.list(7, 10, 10).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_profile_for_user_conflicts() {
        let f = fixture();
        f.services.profiles.create(7, &new_profile(1, "a")).await.unwrap();

        let result = f.services.profiles.create(7, &new_profile(1, "b")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // Same user on another site is fine
        assert!(f.services.profiles.create(8, &new_profile(1, "b")).await.is_ok());
    }

    #[tokio::test]
    async fn test_profile_update_purges_cached_views() {
        let f = fixture();
        let created = f.services.profiles.create(7, &new_profile(1, "old")).await.unwrap();
        f.services.profiles.list(7, 10, 0).await.unwrap();

        let req = UpdateProfileRequest {
            profile_name: Some("new".to_string()),
            ..Default::default()
        };
        f.services.profiles.update(7, created.id, &req).await.unwrap();

        let page = f.services.profiles.list(7, 10, 0).await.unwrap();
        assert_eq!(page.items[0].profile_name, "new");
        assert_eq!(f.services.profiles.get(7, created.id).await.unwrap().profile_name, "new");
    }

    #[tokio::test]
    async fn test_profile_detail_is_site_scoped() {
        let f = fixture();
        let created = f.services.profiles.create(7, &new_profile(1, "a")).await.unwrap();

        let result = f.services.profiles.get(8, created.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_profile_id_for_user_is_cached() {
        let f = fixture();
        let created = f.services.profiles.create(7, &new_profile(42, "a")).await.unwrap();

        assert_eq!(f.services.profiles.profile_id_for_user(7, 42).await.unwrap(), created.id);

        // Served from the special key once the store is gone
        f.db.set_available(false);
        assert_eq!(f.services.profiles.profile_id_for_user(7, 42).await.unwrap(), created.id);
        assert!(matches!(
            f.services.profiles.profile_id_for_user(7, 43).await,
            Err(AppError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_event_create_is_deduplicated() {
        let f = fixture();
        let author = f.services.profiles.create(7, &new_profile(1, "host")).await.unwrap();
        let req = new_event("Picnic", author.id, None);

        let first = f.services.events.create(7, &req).await.unwrap();
        let second = f.services.events.create(7, &req).await.unwrap();

        assert_eq!(first.event.id, second.event.id);
        let events = f.db.read(|t| t.events.len()).await.unwrap();
        assert_eq!(events, 1);

        // Another site is another submission
        let foreign_author = f.services.profiles.create(8, &new_profile(1, "host")).await.unwrap();
        let other = f
            .services
            .events
            .create(8, &new_event("Picnic", foreign_author.id, None))
            .await
            .unwrap();
        assert_ne!(other.event.id, first.event.id);
    }

    #[tokio::test]
    async fn test_event_create_after_dedup_window_creates_again() {
        let f = fixture_with_dedup_ttl(Duration::from_millis(50));
        let author = f.services.profiles.create(7, &new_profile(1, "host")).await.unwrap();
        let req = new_event("Picnic", author.id, None);

        let first = f.services.events.create(7, &req).await.unwrap();
        let second = f.services.events.create(7, &req).await.unwrap();
        assert_eq!(first.event.id, second.event.id);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let third = f.services.events.create(7, &req).await.unwrap();
        assert_ne!(third.event.id, first.event.id);
        let events = f.db.read(|t| t.events.len()).await.unwrap();
        assert_eq!(events, 2);
    }

    #[tokio::test]
    async fn test_event_update_rejects_unknown_status() {
        let f = fixture();
        let host = f.services.profiles.create(7, &new_profile(1, "host")).await.unwrap();
        let id = f
            .services
            .events
            .create(7, &new_event("Picnic", host.id, None))
            .await
            .unwrap()
            .event
            .id;

        let req = UpdateEventRequest {
            title: Some("Renamed".to_string()),
            status: Some("soon".to_string()),
            edit_reason: "typo".to_string(),
            ..Default::default()
        };
        let result = f.services.events.update(7, id, &req).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        // Nothing was written
        assert_eq!(f.services.events.get(7, id).await.unwrap().event.title, "Picnic");
    }

    #[tokio::test]
    async fn test_event_create_requires_local_author() {
        let f = fixture();
        let result = f.services.events.create(7, &new_event("Picnic", 99, None)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_attendance_purges_counts_but_keeps_detail() {
        let f = fixture();
        let host = f.services.profiles.create(7, &new_profile(1, "host")).await.unwrap();
        let guest = f.services.profiles.create(7, &new_profile(2, "guest")).await.unwrap();
        let event = f
            .services
            .events
            .create(7, &new_event("Picnic", host.id, None))
            .await
            .unwrap();
        let id = event.event.id;
        assert_eq!(event.rsvp_attending, 0);
        assert!(!f.services.events.is_attending(7, id, guest.id).await.unwrap().attending);

        f.services.events.set_attendance(7, id, &answer(guest.id, "yes")).await.unwrap();

        let detail_key = CacheKey::scoped(EntityKind::Event, Scope::Detail, id);
        let counts_key = CacheKey::scoped(EntityKind::Event, Scope::Counts, id);
        let ids_key = CacheKey::scoped(EntityKind::Event, Scope::RelatedIds, id);
        assert!(f.cache.get_record::<Event>(&detail_key).await.is_some());
        assert!(f.cache.get_int(&counts_key).await.is_none());
        assert!(f.cache.get_ids(&ids_key).await.is_none());

        assert_eq!(f.services.events.get(7, id).await.unwrap().rsvp_attending, 1);
        assert!(f.services.events.is_attending(7, id, guest.id).await.unwrap().attending);

        let attendees = f.services.events.list_attendees(7, id, 10, 0).await.unwrap();
        assert_eq!(attendees.items.len(), 1);
        assert_eq!(attendees.items[0].id, guest.id);
    }

    #[tokio::test]
    async fn test_rsvp_limit_is_enforced() {
        let f = fixture();
        let host = f.services.profiles.create(7, &new_profile(1, "host")).await.unwrap();
        let a = f.services.profiles.create(7, &new_profile(2, "a")).await.unwrap();
        let b = f.services.profiles.create(7, &new_profile(3, "b")).await.unwrap();
        let id = f
            .services
            .events
            .create(7, &new_event("Small", host.id, Some(1)))
            .await
            .unwrap()
            .event
            .id;

        f.services.events.set_attendance(7, id, &answer(a.id, "yes")).await.unwrap();
        let full = f.services.events.set_attendance(7, id, &answer(b.id, "yes")).await;
        assert!(matches!(full, Err(AppError::Conflict(_))));

        // Re-answering yes does not count twice; maybe never takes a place
        assert!(f.services.events.set_attendance(7, id, &answer(a.id, "yes")).await.is_ok());
        assert!(f.services.events.set_attendance(7, id, &answer(b.id, "maybe")).await.is_ok());
    }

    #[tokio::test]
    async fn test_attendance_checks_site_membership() {
        let f = fixture();
        let host = f.services.profiles.create(7, &new_profile(1, "host")).await.unwrap();
        let outsider = f.services.profiles.create(8, &new_profile(2, "x")).await.unwrap();
        let id = f
            .services
            .events
            .create(7, &new_event("Picnic", host.id, None))
            .await
            .unwrap()
            .event
            .id;

        let result = f.services.events.set_attendance(7, id, &answer(outsider.id, "yes")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_event_update_and_delete() {
        let f = fixture();
        let host = f.services.profiles.create(7, &new_profile(1, "host")).await.unwrap();
        let id = f
            .services
            .events
            .create(7, &new_event("Picnic", host.id, None))
            .await
            .unwrap()
            .event
            .id;
        f.services.events.list(7, 10, 0).await.unwrap();

        let req = UpdateEventRequest {
            title: Some("Beach picnic".to_string()),
            status: Some("postponed".to_string()),
            edit_reason: "rain".to_string(),
            ..Default::default()
        };
        let updated = f.services.events.update(7, id, &req).await.unwrap();
        assert_eq!(updated.event.title, "Beach picnic");
        assert!(updated.event.edited.is_some());

        let page = f.services.events.list(7, 10, 0).await.unwrap();
        assert_eq!(page.items[0].title, "Beach picnic");

        f.services.events.delete(7, id).await.unwrap();
        assert!(matches!(
            f.services.events.get(7, id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(f.services.events.list(7, 10, 0).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_list_surfaces_store_outage() {
        let f = fixture();
        for user in 1..=3 {
            f.services.profiles.create(7, &new_profile(user, "p")).await.unwrap();
        }

        f.db.set_available(false);
        let result = f.services.profiles.list(7, 10, 0).await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }

    fn ignore_req(item_type: &str, item_id: i64) -> IgnoreRequest {
        IgnoreRequest {
            item_type: item_type.to_string(),
            item_id,
        }
    }

    #[tokio::test]
    async fn test_ignore_list_mixes_profiles_and_events() {
        let f = fixture();
        let me = f.services.profiles.create(7, &new_profile(1, "me")).await.unwrap();
        let zoe = f.services.profiles.create(7, &new_profile(2, "Zoe")).await.unwrap();
        let adam = f.services.profiles.create(7, &new_profile(3, "adam")).await.unwrap();
        let gig = f
            .services
            .events
            .create(7, &new_event("Gig", zoe.id, None))
            .await
            .unwrap()
            .event
            .id;

        let ignores = &f.services.ignores;
        ignores.add(7, me.id, &ignore_req("event", gig)).await.unwrap();
        ignores.add(7, me.id, &ignore_req("profile", zoe.id)).await.unwrap();
        ignores.add(7, me.id, &ignore_req("profile", adam.id)).await.unwrap();
        // Twice is still once
        ignores.add(7, me.id, &ignore_req("profile", adam.id)).await.unwrap();

        let page = ignores.list(7, me.id, 10, 0).await.unwrap();
        assert_eq!(page.total, 3);

        let kinds: Vec<(ItemType, i64)> =
            page.items.iter().map(|i| (i.item_type, i.item_id)).collect();
        assert_eq!(
            kinds,
            vec![
                (ItemType::Profile, adam.id),
                (ItemType::Profile, zoe.id),
                (ItemType::Event, gig),
            ]
        );
        assert!(matches!(&page.items[0].item, ItemSummary::Profile(p) if p.profile_name == "adam"));
        assert!(matches!(&page.items[2].item, ItemSummary::Event(e) if e.title == "Gig"));

        // Pages slice the mixed list
        let second = ignores.list(7, me.id, 2, 2).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].item_type, ItemType::Event);
    }

    #[tokio::test]
    async fn test_ignore_mutations_purge_the_cached_set() {
        let f = fixture();
        let me = f.services.profiles.create(7, &new_profile(1, "me")).await.unwrap();
        let other = f.services.profiles.create(7, &new_profile(2, "other")).await.unwrap();
        let ignores = &f.services.ignores;
        let key = CacheKey::scoped(EntityKind::Profile, Scope::RelatedIds, me.id);

        assert!(!ignores.is_ignoring(7, me.id, "profile", other.id).await.unwrap().ignoring);
        assert!(f.cache.get_record::<IgnoredItems>(&key).await.is_some());

        ignores.add(7, me.id, &ignore_req("profile", other.id)).await.unwrap();
        assert!(f.cache.get_record::<IgnoredItems>(&key).await.is_none());
        assert!(ignores.is_ignoring(7, me.id, "profile", other.id).await.unwrap().ignoring);

        ignores.remove(7, me.id, "profile", other.id).await.unwrap();
        assert!(f.cache.get_record::<IgnoredItems>(&key).await.is_none());
        assert!(!ignores.is_ignoring(7, me.id, "profile", other.id).await.unwrap().ignoring);

        // Removing again is fine
        assert!(ignores.remove(7, me.id, "profile", other.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_ignore_rejects_unknown_items_and_foreign_profiles() {
        let f = fixture();
        let me = f.services.profiles.create(7, &new_profile(1, "me")).await.unwrap();
        let outsider = f.services.profiles.create(8, &new_profile(2, "x")).await.unwrap();
        let ignores = &f.services.ignores;

        let missing = ignores.add(7, me.id, &ignore_req("event", 404)).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let foreign_item = ignores.add(7, me.id, &ignore_req("profile", outsider.id)).await;
        assert!(matches!(foreign_item, Err(AppError::NotFound(_))));

        let foreign_owner = ignores.list(8, me.id, 10, 0).await;
        assert!(matches!(foreign_owner, Err(AppError::NotFound(_))));

        let bad_kind = ignores.add(7, me.id, &ignore_req("comment", 1)).await;
        assert!(matches!(bad_kind, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ignore_list_skips_deleted_events() {
        let f = fixture();
        let me = f.services.profiles.create(7, &new_profile(1, "me")).await.unwrap();
        let gig = f
            .services
            .events
            .create(7, &new_event("Gig", me.id, None))
            .await
            .unwrap()
            .event
            .id;
        f.services.ignores.add(7, me.id, &ignore_req("event", gig)).await.unwrap();

        f.services.events.delete(7, gig).await.unwrap();

        let page = f.services.ignores.list(7, me.id, 10, 0).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }
}
