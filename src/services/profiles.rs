//! Profile flows: list, detail, lookup by user, create and update.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::cache::{CacheKey, EntityKind, ScopedCache};
use crate::db::{Database, IdFilter};
use crate::error::{AppError, Result};
use crate::hydrate::{Aggregator, CachedFetcher, Pagination};
use crate::models::{
    CreateProfileRequest, PageResponse, Profile, ProfileRecord, ProfileSummary,
    UpdateProfileRequest,
};

pub type ProfileSummaries = CachedFetcher<ProfileSummary, Database>;

#[derive(Clone)]
pub struct ProfileService {
    db: Database,
    cache: ScopedCache,
    aggregator: Aggregator,
    summaries: Arc<ProfileSummaries>,
    details: Arc<CachedFetcher<Profile, Database>>,
    record_ttl: Duration,
}

impl ProfileService {
    pub fn new(
        db: Database,
        cache: ScopedCache,
        aggregator: Aggregator,
        summaries: Arc<ProfileSummaries>,
        record_ttl: Duration,
    ) -> Self {
        let details = Arc::new(CachedFetcher::new(
            cache.clone(),
            Arc::new(db.clone()),
            record_ttl,
        ));
        Self {
            db,
            cache,
            aggregator,
            summaries,
            details,
            record_ttl,
        }
    }

    /// Profiles of a site ordered by name.
    pub async fn list(
        &self,
        site_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<PageResponse<ProfileSummary>> {
        let page = self
            .db
            .fetch_id_page(&IdFilter::Profiles { site_id }, limit, offset)
            .await?;
        let pagination = Pagination::compute(page.total, limit, offset)?;
        let items = self
            .aggregator
            .run(site_id, &page.ids, self.summaries.clone())
            .await?;

        Ok(PageResponse::new(items, pagination))
    }

    pub async fn get(&self, site_id: i64, profile_id: i64) -> Result<Profile> {
        self.details.get(site_id, profile_id).await
    }

    /// Profile id of `user_id` on `site_id`.
    ///
    /// The mapping never changes once a profile exists, so it is cached
    /// under a special key that no purge touches.
    pub async fn profile_id_for_user(&self, site_id: i64, user_id: i64) -> Result<i64> {
        let key = CacheKey::profile_for_user(site_id, user_id);
        if let Some(id) = self.cache.get_int(&key).await {
            return Ok(id);
        }

        let id = self
            .db
            .profile_id_for_user(site_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("user {user_id} has no profile on site {site_id}"))
            })?;
        self.cache.set_int(&key, id, self.record_ttl).await;

        Ok(id)
    }

    pub async fn create(&self, site_id: i64, req: &CreateProfileRequest) -> Result<Profile> {
        let id = self
            .db
            .run_in_transaction(|t| {
                if t.profile_for_user(site_id, req.user_id).is_some() {
                    return Err(AppError::Conflict(format!(
                        "user {} already has a profile on site {site_id}",
                        req.user_id
                    )));
                }

                let id = t.next_profile_id();
                let now = Utc::now();
                t.profiles.insert(
                    id,
                    ProfileRecord {
                        id,
                        site_id,
                        user_id: req.user_id,
                        profile_name: req.profile_name.trim().to_string(),
                        visible: req.visible.unwrap_or(true),
                        avatar_url: req.avatar_url.clone(),
                        item_count: 0,
                        comment_count: 0,
                        created: now,
                        last_active: now,
                    },
                );
                Ok(id)
            })
            .await?;

        self.cache.purge(EntityKind::Profile, id).await;
        info!(site_id, profile_id = id, "profile created");

        self.get(site_id, id).await
    }

    pub async fn update(
        &self,
        site_id: i64,
        profile_id: i64,
        req: &UpdateProfileRequest,
    ) -> Result<Profile> {
        self.db
            .run_in_transaction(|t| {
                let row = t
                    .profile_mut(site_id, profile_id)
                    .ok_or_else(|| AppError::NotFound(format!("profile {profile_id} not found")))?;

                if let Some(name) = &req.profile_name {
                    row.profile_name = name.trim().to_string();
                }
                if let Some(visible) = req.visible {
                    row.visible = visible;
                }
                if let Some(avatar) = &req.avatar_url {
                    row.avatar_url = Some(avatar.clone()).filter(|url| !url.is_empty());
                }
                row.last_active = Utc::now();
                Ok(())
            })
            .await?;

        self.cache.purge(EntityKind::Profile, profile_id).await;
        info!(site_id, profile_id, "profile updated");

        self.get(site_id, profile_id).await
    }
}
