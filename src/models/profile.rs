//! Profile records and their cached views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheRecord, EntityKind, Scope};
use crate::hydrate::CachedView;
use crate::models::common::{Link, Meta};

/// Authoritative profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: i64,
    pub site_id: i64,
    pub user_id: i64,
    pub profile_name: String,
    pub visible: bool,
    pub avatar_url: Option<String>,
    pub item_count: i32,
    pub comment_count: i32,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// List-view projection of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: i64,
    pub site_id: i64,
    pub user_id: i64,
    pub profile_name: String,
    pub visible: bool,
    /// Empty when the profile has no avatar
    pub avatar: String,
    pub meta: Meta,
}

/// Full profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub site_id: i64,
    pub user_id: i64,
    pub profile_name: String,
    pub visible: bool,
    pub avatar: String,
    pub item_count: i32,
    pub comment_count: i32,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub meta: Meta,
}

fn profile_links(site_id: i64, id: i64) -> Vec<Link> {
    vec![
        Link::new("self", format!("/sites/{site_id}/profiles/{id}")),
        Link::site(site_id),
    ]
}

impl From<&ProfileRecord> for ProfileSummary {
    fn from(record: &ProfileRecord) -> Self {
        Self {
            id: record.id,
            site_id: record.site_id,
            user_id: record.user_id,
            profile_name: record.profile_name.clone(),
            visible: record.visible,
            avatar: record.avatar_url.clone().unwrap_or_default(),
            meta: Meta::default(),
        }
    }
}

impl From<&ProfileRecord> for Profile {
    fn from(record: &ProfileRecord) -> Self {
        Self {
            id: record.id,
            site_id: record.site_id,
            user_id: record.user_id,
            profile_name: record.profile_name.clone(),
            visible: record.visible,
            avatar: record.avatar_url.clone().unwrap_or_default(),
            item_count: record.item_count,
            comment_count: record.comment_count,
            created: record.created,
            last_active: record.last_active,
            meta: Meta::default(),
        }
    }
}

impl CacheRecord for ProfileSummary {
    const SCHEMA: &'static str = "profile_summary.v1";
}

impl CachedView for ProfileSummary {
    const KIND: EntityKind = EntityKind::Profile;
    const SCOPE: Scope = Scope::Summary;

    fn site_id(&self) -> i64 {
        self.site_id
    }

    fn enrich(&mut self) {
        self.meta.links = profile_links(self.site_id, self.id);
    }
}

impl CacheRecord for Profile {
    const SCHEMA: &'static str = "profile.v1";
}

impl CachedView for Profile {
    const KIND: EntityKind = EntityKind::Profile;
    const SCOPE: Scope = Scope::Detail;

    fn site_id(&self) -> i64 {
        self.site_id
    }

    fn enrich(&mut self) {
        self.meta.links = profile_links(self.site_id, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProfileRecord {
        ProfileRecord {
            id: 12,
            site_id: 3,
            user_id: 400,
            profile_name: "mira".to_string(),
            visible: true,
            avatar_url: None,
            item_count: 2,
            comment_count: 9,
            created: Utc::now(),
            last_active: Utc::now(),
        }
    }

    #[test]
    fn summary_resolves_missing_avatar_to_empty() {
        let summary = ProfileSummary::from(&record());
        assert_eq!(summary.avatar, "");
        assert!(summary.meta.links.is_empty());
    }

    #[test]
    fn enrich_adds_links() {
        let mut profile = Profile::from(&record());
        profile.enrich();

        assert_eq!(profile.meta.links[0].href, "/sites/3/profiles/12");
        assert_eq!(profile.meta.links[1].rel, "site");
    }

    #[test]
    fn summary_serializes_camel_case() {
        let json = serde_json::to_value(ProfileSummary::from(&record())).unwrap();
        assert_eq!(json["profileName"], "mira");
        assert_eq!(json["siteId"], 3);
    }
}
