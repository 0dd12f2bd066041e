//! Ignore-list flows.
//!
//! A page of ignores mixes profiles and events. Each unit loads its row and
//! hands the item to the summary fetcher of that kind.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::cache::{CacheKey, EntityKind, Scope, ScopedCache};
use crate::db::{Database, IdFilter};
use crate::error::{AppError, Result};
use crate::hydrate::{Aggregator, Pagination, SummaryFetcher};
use crate::models::{
    IgnoreRecord, IgnoreRequest, Ignored, IgnoredItems, IgnoringResponse, ItemRef, ItemSummary,
    ItemType, PageResponse,
};
use crate::services::events::EventSummaries;
use crate::services::profiles::ProfileSummaries;

fn parse_item_type(value: &str) -> Result<ItemType> {
    ItemType::parse(value)
        .ok_or_else(|| AppError::Validation(format!("itemType ('{value}') is not valid")))
}

// == Ignored Item Fetcher ==
/// Hydrates one ignore row into the summary of the item it points at.
pub struct IgnoredItemFetcher {
    db: Database,
    profiles: Arc<ProfileSummaries>,
    events: Arc<EventSummaries>,
}

impl IgnoredItemFetcher {
    pub fn new(db: Database, profiles: Arc<ProfileSummaries>, events: Arc<EventSummaries>) -> Self {
        Self {
            db,
            profiles,
            events,
        }
    }
}

#[async_trait]
impl SummaryFetcher for IgnoredItemFetcher {
    type Item = Ignored;

    async fn fetch(&self, site_id: i64, id: i64) -> Result<Ignored> {
        let row = self
            .db
            .ignore(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ignore {id} not found")))?;

        let item = match row.item_type {
            ItemType::Profile => {
                ItemSummary::Profile(self.profiles.get(site_id, row.item_id).await?)
            }
            ItemType::Event => ItemSummary::Event(self.events.get(site_id, row.item_id).await?),
        };

        Ok(Ignored {
            item_type: row.item_type,
            item_id: row.item_id,
            item,
        })
    }
}

// == Ignore Service ==
#[derive(Clone)]
pub struct IgnoreService {
    db: Database,
    cache: ScopedCache,
    aggregator: Aggregator,
    items: Arc<IgnoredItemFetcher>,
    profiles: Arc<ProfileSummaries>,
    record_ttl: Duration,
}

impl IgnoreService {
    pub fn new(
        db: Database,
        cache: ScopedCache,
        aggregator: Aggregator,
        profiles: Arc<ProfileSummaries>,
        events: Arc<EventSummaries>,
        record_ttl: Duration,
    ) -> Self {
        Self {
            items: Arc::new(IgnoredItemFetcher::new(db.clone(), profiles.clone(), events)),
            db,
            cache,
            aggregator,
            profiles,
            record_ttl,
        }
    }

    /// What a profile ignores: profiles first, then events, each by name.
    pub async fn list(
        &self,
        site_id: i64,
        profile_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<PageResponse<Ignored>> {
        self.profiles.get(site_id, profile_id).await?;

        let page = self
            .db
            .fetch_id_page(&IdFilter::Ignores { site_id, profile_id }, limit, offset)
            .await?;
        let pagination = Pagination::compute(page.total, limit, offset)?;
        let items = self
            .aggregator
            .run(site_id, &page.ids, self.items.clone())
            .await?;

        Ok(PageResponse::new(items, pagination))
    }

    /// Adds an item to a profile's ignore list. Ignoring twice is a no-op.
    pub async fn add(
        &self,
        site_id: i64,
        profile_id: i64,
        req: &IgnoreRequest,
    ) -> Result<IgnoringResponse> {
        let item = ItemRef {
            item_type: parse_item_type(&req.item_type)?,
            item_id: req.item_id,
        };

        self.db
            .run_in_transaction(|t| {
                if t.profile(site_id, profile_id).is_none() {
                    return Err(AppError::NotFound(format!("profile {profile_id} not found")));
                }
                if t.item_title(site_id, item).is_none() {
                    return Err(AppError::NotFound(format!(
                        "{} {} not found",
                        item.item_type.kind(),
                        item.item_id
                    )));
                }
                if t.ignore_row(profile_id, item).is_some() {
                    return Ok(());
                }

                let id = t.next_ignore_id();
                t.ignores.insert(
                    id,
                    IgnoreRecord {
                        id,
                        profile_id,
                        item_type: item.item_type,
                        item_id: item.item_id,
                        created: Utc::now(),
                    },
                );
                Ok(())
            })
            .await?;

        self.purge(profile_id).await;
        info!(
            site_id,
            profile_id,
            item_type = item.item_type.as_str(),
            item_id = item.item_id,
            "item ignored"
        );

        Ok(IgnoringResponse {
            profile_id,
            item_type: item.item_type,
            item_id: item.item_id,
            ignoring: true,
        })
    }

    /// Takes an item off a profile's ignore list. Removing an item that is
    /// not there succeeds.
    pub async fn remove(
        &self,
        site_id: i64,
        profile_id: i64,
        item_type: &str,
        item_id: i64,
    ) -> Result<()> {
        let item = ItemRef {
            item_type: parse_item_type(item_type)?,
            item_id,
        };

        self.db
            .run_in_transaction(|t| {
                if t.profile(site_id, profile_id).is_none() {
                    return Err(AppError::NotFound(format!("profile {profile_id} not found")));
                }
                if let Some(id) = t.ignore_row(profile_id, item).map(|row| row.id) {
                    t.ignores.remove(&id);
                }
                Ok(())
            })
            .await?;

        self.purge(profile_id).await;
        info!(
            site_id,
            profile_id,
            item_type = item.item_type.as_str(),
            item_id,
            "item unignored"
        );

        Ok(())
    }

    pub async fn is_ignoring(
        &self,
        site_id: i64,
        profile_id: i64,
        item_type: &str,
        item_id: i64,
    ) -> Result<IgnoringResponse> {
        let item = ItemRef {
            item_type: parse_item_type(item_type)?,
            item_id,
        };
        self.profiles.get(site_id, profile_id).await?;

        let ignoring = self.ignored_items(profile_id).await?.contains(&item);

        Ok(IgnoringResponse {
            profile_id,
            item_type: item.item_type,
            item_id,
            ignoring,
        })
    }

    async fn ignored_items(&self, profile_id: i64) -> Result<IgnoredItems> {
        let key = CacheKey::scoped(EntityKind::Profile, Scope::RelatedIds, profile_id);
        if let Some(set) = self.cache.get_record::<IgnoredItems>(&key).await {
            return Ok(set);
        }

        let set = IgnoredItems {
            profile_id,
            items: self.db.ignored_items(profile_id).await?,
        };
        self.cache.set_record(&key, &set, self.record_ttl).await;
        Ok(set)
    }

    async fn purge(&self, profile_id: i64) {
        self.cache
            .purge_scope(Scope::RelatedIds, EntityKind::Profile, profile_id)
            .await;
    }
}
