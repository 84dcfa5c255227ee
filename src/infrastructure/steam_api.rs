//! Store API adapter
//!
//! Endpoint addressing and wire decoding for the two store endpoints the sampler uses:
//! the app catalog (`{applist: {apps: [...]}}`) and per-app details
//! (`{"<id>": {success, data}}`).

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::domain::app_detail::{AppKind, DetailRecord};
use crate::domain::catalog::CatalogEntry;
use crate::domain::constants::store::{ADULT_ONLY_DESCRIPTOR_ID, ADULT_TAG};
use crate::infrastructure::config::ApiConfig;
use crate::infrastructure::http_client::{HttpClient, HttpError, redacted_url};

/// Source of raw catalog and detail payloads
#[async_trait]
pub trait AppDataSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<String, HttpError>;
    async fn fetch_details(&self, app_id: u32) -> Result<String, HttpError>;
}

#[derive(Clone)]
pub struct SteamClient {
    http: HttpClient,
    catalog_url: Url,
    details_url: Url,
}

impl std::fmt::Debug for SteamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamClient")
            .field("http", &self.http)
            .field("catalog_url", &redacted_url(&self.catalog_url))
            .field("details_url", &self.details_url.as_str())
            .finish()
    }
}

impl SteamClient {
    pub fn new(http: HttpClient, api: &ApiConfig) -> Result<Self, HttpError> {
        let mut catalog_url = parse_url(&api.catalog_url)?;
        if !api.api_key.is_empty() {
            catalog_url
                .query_pairs_mut()
                .append_pair("key", &api.api_key);
        }

        Ok(Self {
            http,
            catalog_url,
            details_url: parse_url(&api.details_url)?,
        })
    }

    pub fn details_url_for(&self, app_id: u32) -> Url {
        let mut url = self.details_url.clone();
        url.query_pairs_mut()
            .append_pair("appids", &app_id.to_string());
        url
    }
}

#[async_trait]
impl AppDataSource for SteamClient {
    async fn fetch_catalog(&self) -> Result<String, HttpError> {
        self.http.fetch(self.catalog_url.as_str()).await
    }

    async fn fetch_details(&self, app_id: u32) -> Result<String, HttpError> {
        self.http.fetch(self.details_url_for(app_id).as_str()).await
    }
}

fn parse_url(raw: &str) -> Result<Url, HttpError> {
    Url::parse(raw).map_err(|_| {
        let without_query = raw.split_once('?').map_or(raw, |(base, _)| base);
        HttpError::InvalidUrl(without_query.to_string())
    })
}

// ---- catalog wire format ----

#[derive(Deserialize)]
struct AppListEnvelope {
    #[serde(default)]
    applist: Option<AppList>,
}

#[derive(Deserialize)]
struct AppList {
    #[serde(default)]
    apps: Vec<CatalogEntry>,
}

/// Decodes the catalog body; a missing `applist` or `apps` key is an empty catalog
pub fn parse_app_list(body: &str) -> Result<Vec<CatalogEntry>, serde_json::Error> {
    let envelope: AppListEnvelope = serde_json::from_str(body)?;
    Ok(envelope.applist.map(|list| list.apps).unwrap_or_default())
}

// ---- detail wire format ----

#[derive(Deserialize)]
struct DetailEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<WireDetails>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireDetails {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    release_date: Option<WireReleaseDate>,
    genres: Vec<WireDescription>,
    categories: Vec<WireDescription>,
    developers: Vec<String>,
    price_overview: Option<WirePrice>,
    recommendations: Option<WireRecommendations>,
    metacritic: Option<WireMetacritic>,
    content_descriptors: Option<WireContentDescriptors>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireReleaseDate {
    coming_soon: bool,
    date: String,
}

#[derive(Deserialize)]
struct WireDescription {
    description: String,
}

#[derive(Deserialize)]
struct WirePrice {
    #[serde(rename = "final")]
    final_cents: u64,
}

#[derive(Deserialize)]
struct WireRecommendations {
    total: u32,
}

#[derive(Deserialize)]
struct WireMetacritic {
    score: u32,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireContentDescriptors {
    ids: Option<Vec<u32>>,
}

/// Decodes a detail body for `app_id`.
///
/// Returns `Ok(None)` when the body has no entry for the id, when `success` is false, or
/// when the entry carries no data.
pub fn parse_app_details(
    app_id: u32,
    body: &str,
) -> Result<Option<DetailRecord>, serde_json::Error> {
    let mut envelopes: HashMap<String, DetailEnvelope> = serde_json::from_str(body)?;
    let Some(envelope) = envelopes.remove(&app_id.to_string()) else {
        return Ok(None);
    };
    if !envelope.success {
        return Ok(None);
    }
    Ok(envelope.data.map(|data| into_detail_record(app_id, data)))
}

fn into_detail_record(app_id: u32, data: WireDetails) -> DetailRecord {
    let genres = dedup_descriptions(data.genres);
    let categories = dedup_descriptions(data.categories);

    let mut content_tags: BTreeSet<String> =
        genres.iter().chain(categories.iter()).cloned().collect();
    let adult_only = data
        .content_descriptors
        .and_then(|descriptors| descriptors.ids)
        .is_some_and(|ids| ids.contains(&ADULT_ONLY_DESCRIPTOR_ID));
    if adult_only {
        content_tags.insert(ADULT_TAG.to_string());
    }

    let release = data.release_date.unwrap_or_default();

    DetailRecord {
        id: app_id,
        name: data.name,
        release_status: release.date,
        coming_soon: release.coming_soon,
        genres,
        categories,
        content_tags,
        kind: AppKind::from_store_type(&data.kind),
        developers: data.developers,
        price_cents: data.price_overview.map(|price| price.final_cents),
        recommendation_count: data.recommendations.map_or(0, |r| r.total),
        critic_score: data.metacritic.map(|m| m.score),
    }
}

fn dedup_descriptions(items: Vec<WireDescription>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .map(|item| item.description)
        .filter(|description| seen.insert(description.clone()))
        .collect()
}
