//! Per-app detail record
//!
//! A `DetailRecord` only lives for one fetch-and-classify cycle. Records that pass the
//! eligibility policy are turned into a [`NormalizedRecord`](super::NormalizedRecord);
//! rejected ones are dropped.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Store classification of an app (`type` in the detail payload)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppKind {
    Game,
    Dlc,
    Demo,
    Other(String),
}

impl AppKind {
    pub fn from_store_type(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "game" => Self::Game,
            "dlc" => Self::Dlc,
            "demo" => Self::Demo,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Game => "game",
            Self::Dlc => "dlc",
            Self::Demo => "demo",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for AppKind {
    fn from(raw: String) -> Self {
        Self::from_store_type(&raw)
    }
}

impl From<AppKind> for String {
    fn from(kind: AppKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw attributes of one app as reported by the detail endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub id: u32,
    pub name: String,
    /// Release date text exactly as the store renders it ("12 Mar, 2021", "Coming soon", ...)
    pub release_status: String,
    pub coming_soon: bool,
    /// Genre descriptions in store order, without duplicates
    pub genres: Vec<String>,
    /// Category descriptions in store order, without duplicates
    pub categories: Vec<String>,
    pub content_tags: BTreeSet<String>,
    pub kind: AppKind,
    pub developers: Vec<String>,
    /// Final price in minor currency units; `None` when the store lists no price
    pub price_cents: Option<u64>,
    pub recommendation_count: u32,
    pub critic_score: Option<u32>,
}

impl DetailRecord {
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }

    pub fn has_content_tag(&self, tag: &str) -> bool {
        self.content_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
