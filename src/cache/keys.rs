//! Cache key definitions.
//!
//! Scoped keys are rendered through `KeyTemplates`, a lookup table from
//! (entity kind, scope) to a formatter. Adding a kind or scope means
//! registering one more row.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Entity families that have cached shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Profile,
    Event,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Profile => f.write_str("profile"),
            EntityKind::Event => f.write_str("event"),
        }
    }
}

/// Read-shape of a cached entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Full record
    Detail,
    /// List-view projection
    Summary,
    /// Scalar aggregates such as attendee counts
    Counts,
    /// Identifier sets such as attending profile ids or ignored items
    RelatedIds,
}

impl Scope {
    pub const ALL: [Scope; 4] = [Scope::Detail, Scope::Summary, Scope::Counts, Scope::RelatedIds];
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Detail => f.write_str("detail"),
            Scope::Summary => f.write_str("summary"),
            Scope::Counts => f.write_str("counts"),
            Scope::RelatedIds => f.write_str("related_ids"),
        }
    }
}

/// Address of a cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A scoped entity shape, rendered through `KeyTemplates`
    Scoped {
        kind: EntityKind,
        scope: Scope,
        id: i64,
    },
    /// A free-form key outside the purge mechanism
    Special(String),
}

impl CacheKey {
    pub fn scoped(kind: EntityKind, scope: Scope, id: i64) -> Self {
        CacheKey::Scoped { kind, scope, id }
    }

    /// Site + user to profile id mapping. Never purged: the mapping is fixed
    /// once the profile exists.
    pub fn profile_for_user(site_id: i64, user_id: i64) -> Self {
        CacheKey::Special(format!("s{site_id}_u{user_id}"))
    }

    /// Dedup token for a creation fingerprint.
    pub fn dedup(fingerprint: &str) -> Self {
        CacheKey::Special(format!("dupe_{fingerprint}"))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Scoped { kind, scope, id } => write!(f, "{kind}/{scope}/{id}"),
            CacheKey::Special(key) => f.write_str(key),
        }
    }
}

/// Renders the backend key for one entity id.
pub type KeyFormatter = fn(i64) -> String;

/// Registry of key formats per (kind, scope).
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    table: HashMap<(EntityKind, Scope), KeyFormatter>,
}

impl KeyTemplates {
    /// A registry with no templates.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Adds or replaces the template for (kind, scope).
    pub fn register(mut self, kind: EntityKind, scope: Scope, format: KeyFormatter) -> Self {
        self.table.insert((kind, scope), format);
        self
    }

    /// Backend key for a `CacheKey`, or `None` if no template is registered.
    pub fn render(&self, key: &CacheKey) -> Option<String> {
        match key {
            CacheKey::Scoped { kind, scope, id } => {
                self.table.get(&(*kind, *scope)).map(|format| format(*id))
            }
            CacheKey::Special(raw) => Some(raw.clone()),
        }
    }

    /// Scopes with a registered template for `kind`, in `Scope::ALL` order.
    pub fn scopes_for(&self, kind: EntityKind) -> Vec<Scope> {
        Scope::ALL
            .into_iter()
            .filter(|scope| self.table.contains_key(&(kind, *scope)))
            .collect()
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        KeyTemplates::empty()
            .register(EntityKind::Profile, Scope::Detail, |id| format!("pf_d{id}"))
            .register(EntityKind::Profile, Scope::Summary, |id| format!("pf_s{id}"))
            .register(EntityKind::Profile, Scope::RelatedIds, |id| format!("pf_i{id}"))
            .register(EntityKind::Event, Scope::Detail, |id| format!("ev_d{id}"))
            .register(EntityKind::Event, Scope::Summary, |id| format!("ev_s{id}"))
            .register(EntityKind::Event, Scope::Counts, |id| format!("ev_c{id}"))
            .register(EntityKind::Event, Scope::RelatedIds, |id| format!("ev_p{id}"))
    }
}
