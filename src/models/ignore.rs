//! Ignore-list rows and the mixed-kind items they hydrate to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheRecord, EntityKind};
use crate::models::{EventSummary, ProfileSummary};

/// Kind of item a profile can ignore. Lists show profiles before events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Profile,
    Event,
}

impl ItemType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "profile" => Some(Self::Profile),
            "event" => Some(Self::Event),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Event => "event",
        }
    }

    /// Cache family holding this item's views.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Profile => EntityKind::Profile,
            Self::Event => EntityKind::Event,
        }
    }
}

/// Authoritative ignore row. One per (profile, item type, item id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoreRecord {
    pub id: i64,
    pub profile_id: i64,
    pub item_type: ItemType,
    pub item_id: i64,
    pub created: DateTime<Utc>,
}

/// Address of an ignored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub item_type: ItemType,
    pub item_id: i64,
}

/// Everything one profile ignores, cached in the profile's RelatedIds scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoredItems {
    pub profile_id: i64,
    pub items: Vec<ItemRef>,
}

impl IgnoredItems {
    pub fn contains(&self, item: &ItemRef) -> bool {
        self.items.binary_search(item).is_ok()
    }
}

impl CacheRecord for IgnoredItems {
    const SCHEMA: &'static str = "ignored_items.v1";
}

/// Summary of whichever kind of item was ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemSummary {
    Profile(ProfileSummary),
    Event(EventSummary),
}

/// One entry of an ignore list page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ignored {
    pub item_type: ItemType,
    pub item_id: i64,
    pub item: ItemSummary,
}
