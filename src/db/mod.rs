//! In-memory authoritative store.
//!
//! Holds profiles, events, attendance and ignore lists behind a `tokio::sync::RwLock`.
//! Writes go through `run_in_transaction`, which works on a copy of the tables
//! and swaps it in only when the closure succeeds.

mod sources;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{AttendeeRecord, EventRecord, IgnoreRecord, ItemRef, ItemType, ProfileRecord};

/// Which ordered id set a page is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdFilter {
    /// Profiles of a site, by case-insensitive name then id
    Profiles { site_id: i64 },
    /// Events of a site, newest first
    Events { site_id: i64 },
    /// Profiles attending (RSVP yes) an event, in RSVP order
    Attendees { site_id: i64, event_id: i64 },
    /// Ignore rows of a profile whose item still exists on the site,
    /// profiles before events, then by name or title
    Ignores { site_id: i64, profile_id: i64 },
}

/// One page of identifiers plus the size of the whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPage {
    pub ids: Vec<i64>,
    pub total: i64,
}

/// All rows. Cloned wholesale at the start of every transaction.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub profiles: BTreeMap<i64, ProfileRecord>,
    pub events: BTreeMap<i64, EventRecord>,
    /// Keyed by (event_id, profile_id)
    pub attendees: BTreeMap<(i64, i64), AttendeeRecord>,
    pub ignores: BTreeMap<i64, IgnoreRecord>,
    last_profile_id: i64,
    last_event_id: i64,
    last_ignore_id: i64,
}

impl Tables {
    pub fn next_profile_id(&mut self) -> i64 {
        self.last_profile_id += 1;
        self.last_profile_id
    }

    pub fn next_event_id(&mut self) -> i64 {
        self.last_event_id += 1;
        self.last_event_id
    }

    pub fn next_ignore_id(&mut self) -> i64 {
        self.last_ignore_id += 1;
        self.last_ignore_id
    }

    /// Profile `id` if it belongs to `site_id`.
    pub fn profile(&self, site_id: i64, id: i64) -> Option<&ProfileRecord> {
        self.profiles.get(&id).filter(|p| p.site_id == site_id)
    }

    pub fn profile_mut(&mut self, site_id: i64, id: i64) -> Option<&mut ProfileRecord> {
        self.profiles.get_mut(&id).filter(|p| p.site_id == site_id)
    }

    pub fn profile_for_user(&self, site_id: i64, user_id: i64) -> Option<&ProfileRecord> {
        self.profiles
            .values()
            .find(|p| p.site_id == site_id && p.user_id == user_id)
    }

    /// Event `id` if it belongs to `site_id`.
    pub fn event(&self, site_id: i64, id: i64) -> Option<&EventRecord> {
        self.events.get(&id).filter(|e| e.site_id == site_id)
    }

    pub fn event_mut(&mut self, site_id: i64, id: i64) -> Option<&mut EventRecord> {
        self.events.get_mut(&id).filter(|e| e.site_id == site_id)
    }

    /// Attendance rows of one event.
    pub fn attendance(&self, event_id: i64) -> impl Iterator<Item = &AttendeeRecord> {
        self.attendees
            .range((event_id, i64::MIN)..=(event_id, i64::MAX))
            .map(|(_, row)| row)
    }

    /// Number of "yes" answers for an event.
    pub fn attending_count(&self, event_id: i64) -> i64 {
        self.attendance(event_id)
            .filter(|row| row.rsvp.is_attending())
            .count() as i64
    }

    /// Profile ids with a "yes" answer, in the order they answered.
    pub fn attending_ids(&self, event_id: i64) -> Vec<i64> {
        let mut rows: Vec<&AttendeeRecord> = self
            .attendance(event_id)
            .filter(|row| row.rsvp.is_attending())
            .collect();
        rows.sort_by(|a, b| a.created.cmp(&b.created).then(a.profile_id.cmp(&b.profile_id)));
        rows.into_iter().map(|row| row.profile_id).collect()
    }

    /// Name or title of an item on `site_id`, if it exists there.
    pub fn item_title(&self, site_id: i64, item: ItemRef) -> Option<&str> {
        match item.item_type {
            ItemType::Profile => self
                .profile(site_id, item.item_id)
                .map(|p| p.profile_name.as_str()),
            ItemType::Event => self.event(site_id, item.item_id).map(|e| e.title.as_str()),
        }
    }

    /// The ignore row of (profile, item), if any.
    pub fn ignore_row(&self, profile_id: i64, item: ItemRef) -> Option<&IgnoreRecord> {
        self.ignores.values().find(|row| {
            row.profile_id == profile_id
                && row.item_type == item.item_type
                && row.item_id == item.item_id
        })
    }

    /// Everything a profile ignores, sorted.
    pub fn ignored_items(&self, profile_id: i64) -> Vec<ItemRef> {
        let mut items: Vec<ItemRef> = self
            .ignores
            .values()
            .filter(|row| row.profile_id == profile_id)
            .map(|row| ItemRef {
                item_type: row.item_type,
                item_id: row.item_id,
            })
            .collect();
        items.sort();
        items
    }

    /// Removes an event and every attendance row pointing at it.
    pub fn remove_event(&mut self, event_id: i64) -> Option<EventRecord> {
        let removed = self.events.remove(&event_id)?;
        self.attendees.retain(|(event, _), _| *event != event_id);
        Some(removed)
    }

    fn ordered_ids(&self, filter: &IdFilter) -> Vec<i64> {
        match *filter {
            IdFilter::Profiles { site_id } => {
                let mut rows: Vec<&ProfileRecord> = self
                    .profiles
                    .values()
                    .filter(|p| p.site_id == site_id)
                    .collect();
                rows.sort_by_cached_key(|p| (p.profile_name.to_lowercase(), p.id));
                rows.into_iter().map(|p| p.id).collect()
            }
            IdFilter::Events { site_id } => {
                let mut rows: Vec<&EventRecord> = self
                    .events
                    .values()
                    .filter(|e| e.site_id == site_id)
                    .collect();
                rows.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
                rows.into_iter().map(|e| e.id).collect()
            }
            IdFilter::Attendees { site_id, event_id } => match self.event(site_id, event_id) {
                Some(_) => self.attending_ids(event_id),
                None => Vec::new(),
            },
            IdFilter::Ignores {
                site_id,
                profile_id,
            } => {
                if self.profile(site_id, profile_id).is_none() {
                    return Vec::new();
                }
                let mut rows: Vec<(ItemType, String, i64, i64)> = self
                    .ignores
                    .values()
                    .filter(|row| row.profile_id == profile_id)
                    .filter_map(|row| {
                        let item = ItemRef {
                            item_type: row.item_type,
                            item_id: row.item_id,
                        };
                        self.item_title(site_id, item)
                            .map(|title| (row.item_type, title.to_lowercase(), row.item_id, row.id))
                    })
                    .collect();
                rows.sort();
                rows.into_iter().map(|(_, _, _, id)| id).collect()
            }
        }
    }
}

/// Shared handle to the store. Clones see the same tables.
#[derive(Debug, Clone)]
pub struct Database {
    tables: Arc<RwLock<Tables>>,
    available: Arc<AtomicBool>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulates losing (or regaining) the store. While unavailable every
    /// operation fails with `StoreUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::StoreUnavailable("database is not reachable".to_string()))
        }
    }

    /// Runs `f` against a consistent snapshot of the tables.
    pub async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(f(&tables))
    }

    /// Runs `f` on a copy of the tables and commits it only if `f` succeeds.
    pub async fn run_in_transaction<R>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<R>,
    ) -> Result<R> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        let mut working = tables.clone();

        match f(&mut working) {
            Ok(value) => {
                *tables = working;
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    /// One page of ordered identifiers and the total size of the set.
    pub async fn fetch_id_page(&self, filter: &IdFilter, limit: i64, offset: i64) -> Result<IdPage> {
        let ids = self.read(|tables| tables.ordered_ids(filter)).await?;
        let total = ids.len() as i64;
        let start = offset.clamp(0, total) as usize;
        let take = limit.max(0) as usize;

        Ok(IdPage {
            ids: ids.into_iter().skip(start).take(take).collect(),
            total,
        })
    }

    pub async fn attending_count(&self, event_id: i64) -> Result<i64> {
        self.read(|tables| tables.attending_count(event_id)).await
    }

    pub async fn attending_ids(&self, event_id: i64) -> Result<Vec<i64>> {
        self.read(|tables| tables.attending_ids(event_id)).await
    }

    /// Ignore row by its own id.
    pub async fn ignore(&self, id: i64) -> Result<Option<IgnoreRecord>> {
        self.read(|tables| tables.ignores.get(&id).cloned()).await
    }

    pub async fn ignored_items(&self, profile_id: i64) -> Result<Vec<ItemRef>> {
        self.read(|tables| tables.ignored_items(profile_id)).await
    }

    pub async fn profile_id_for_user(&self, site_id: i64, user_id: i64) -> Result<Option<i64>> {
        self.read(|tables| tables.profile_for_user(site_id, user_id).map(|p| p.id))
            .await
    }
}
