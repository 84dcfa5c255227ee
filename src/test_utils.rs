//! Test utilities
//!
//! A scripted [`AppDataSource`] and JSON fixture builders, so collector and pipeline tests
//! run without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::infrastructure::http_client::HttpError;
use crate::infrastructure::steam_api::AppDataSource;

type Scripted = Result<String, HttpError>;

/// Replays canned responses per app id.
///
/// Each id answers from its queue in order; the last response repeats once the queue is
/// down to one entry. Ids without a script answer 404.
pub struct ScriptedSource {
    catalog: Scripted,
    details: Mutex<HashMap<u32, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<u32, u32>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            catalog: Ok(catalog_body(&[])),
            details: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_catalog(mut self, response: Scripted) -> Self {
        self.catalog = response;
        self
    }

    pub fn with_details(self, app_id: u32, responses: Vec<Scripted>) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(app_id, responses.into());
        self
    }

    pub fn with_detail(self, app_id: u32, response: Scripted) -> Self {
        self.with_details(app_id, vec![response])
    }

    pub fn calls(&self, app_id: u32) -> u32 {
        self.calls.lock().unwrap().get(&app_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl AppDataSource for ScriptedSource {
    async fn fetch_catalog(&self) -> Result<String, HttpError> {
        self.catalog.clone()
    }

    async fn fetch_details(&self, app_id: u32) -> Result<String, HttpError> {
        *self.calls.lock().unwrap().entry(app_id).or_insert(0) += 1;

        let mut details = self.details.lock().unwrap();
        let Some(queue) = details.get_mut(&app_id) else {
            return Err(status(404, app_id));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

pub fn status(code: u16, app_id: u32) -> HttpError {
    HttpError::Status {
        status: code,
        url: format!("details?appids={app_id}"),
    }
}

pub fn throttled(app_id: u32) -> HttpError {
    HttpError::Throttled {
        url: format!("details?appids={app_id}"),
        retry_after: None,
    }
}

pub fn catalog_body(ids: &[u32]) -> String {
    let apps: Vec<_> = ids
        .iter()
        .map(|id| json!({"appid": id, "name": format!("App {id}")}))
        .collect();
    json!({"applist": {"apps": apps}}).to_string()
}

/// Detail body for a released game with the given genres
pub fn detail_body(app_id: u32, genres: &[&str], recommendations: u32) -> String {
    let genres: Vec<_> = genres
        .iter()
        .enumerate()
        .map(|(i, g)| json!({"id": i.to_string(), "description": g}))
        .collect();
    json!({
        app_id.to_string(): {
            "success": true,
            "data": {
                "type": "game",
                "name": format!("Game {app_id}"),
                "release_date": {"coming_soon": false, "date": "1 Mar, 2021"},
                "genres": genres,
                "developers": ["Studio"],
                "price_overview": {"final": 499},
                "recommendations": {"total": recommendations}
            }
        }
    })
    .to_string()
}

pub fn indie_body(app_id: u32, recommendations: u32) -> String {
    detail_body(app_id, &["Indie", "Adventure"], recommendations)
}
