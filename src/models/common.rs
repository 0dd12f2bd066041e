//! Shared pieces of resource bodies.

use serde::{Deserialize, Serialize};

/// Hypermedia link attached to a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }

    pub fn site(site_id: i64) -> Self {
        Self::new("site", format!("/sites/{site_id}"))
    }
}

/// Metadata block carried by every cached view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub links: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_link() {
        assert_eq!(Link::site(4), Link::new("site", "/sites/4"));
    }
}
