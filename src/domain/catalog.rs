use serde::{Deserialize, Serialize};

/// One addressable app in the store catalog.
///
/// The catalog makes no ordering or uniqueness promise; the same `id` can show up
/// more than once and consumers must tolerate that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "appid")]
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

impl CatalogEntry {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
