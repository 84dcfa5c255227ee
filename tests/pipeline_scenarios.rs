//! End-to-end runs against a mock store API

use std::path::Path;

use serde_json::{Value, json};
use steam_indie_sampler::crawling::Termination;
use steam_indie_sampler::domain::{BalanceMode, Bucket};
use steam_indie_sampler::{AppConfig, Pipeline};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCENARIO_RECOMMENDATIONS: [u32; 7] = [10, 60, 600, 5, 400, 900, 30];

fn config_for(server: &MockServer, out_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.catalog_url = format!("{}/ISteamApps/GetAppList/v2/", server.uri());
    config.api.details_url = format!("{}/api/appdetails", server.uri());
    config.api.api_key = "test-key".into();
    config.http.backoff_base_ms = 1;
    config.http.backoff_max_ms = 2;
    config.http.jitter_ms = 0;
    config.http.requests_per_window = 1_000;
    config.http.window_secs = 1;
    config.collection.min_records = 5;
    config.collection.concurrency = 4;
    config.collection.throttle_initial_backoff_ms = 1;
    config.collection.throttle_max_backoff_ms = 4;
    config.collection.max_resample_rounds = 1;
    config.balance.per_bucket_cap = 3;
    config.output.dir = out_dir.to_path_buf();
    config.seed = Some(2024);
    config
}

async fn mount_catalog(server: &MockServer, ids: &[u32]) {
    let apps: Vec<_> = ids
        .iter()
        .map(|id| json!({"appid": id, "name": format!("App {id}")}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/ISteamApps/GetAppList/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"applist": {"apps": apps}})))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, app_id: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/appdetails"))
        .and(query_param("appids", app_id.to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}

fn game_data(app_id: u32, genres: &[&str], recommendations: u32) -> Value {
    let genres: Vec<_> = genres
        .iter()
        .map(|g| json!({"id": "1", "description": g}))
        .collect();
    json!({
        "type": "game",
        "name": format!("Game {app_id}"),
        "release_date": {"coming_soon": false, "date": "2 Jun, 2020"},
        "genres": genres,
        "developers": ["Dev One", "Dev Two"],
        "price_overview": {"final": 1999},
        "recommendations": {"total": recommendations},
        "metacritic": {"score": 70}
    })
}

fn detail_response(app_id: u32, data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        app_id.to_string(): {"success": true, "data": data}
    }))
}

fn game(app_id: u32, genres: &[&str], recommendations: u32) -> ResponseTemplate {
    detail_response(app_id, game_data(app_id, genres, recommendations))
}

/// Ids 1-7 qualify, 8 is forbidden, 9 is not indie, 10 is unlisted
async fn mount_scenario(server: &MockServer) {
    mount_catalog(server, &(1..=10).collect::<Vec<_>>()).await;
    for (i, recommendations) in SCENARIO_RECOMMENDATIONS.iter().enumerate() {
        let id = i as u32 + 1;
        mount_detail(server, id, game(id, &["Indie", "Casual"], *recommendations)).await;
    }
    mount_detail(server, 8, ResponseTemplate::new(403)).await;
    mount_detail(server, 9, game(9, &["Action"], 3_000)).await;
    mount_detail(
        server,
        10,
        ResponseTemplate::new(200).set_body_json(json!({"10": {"success": false}})),
    )
    .await;
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<csv::StringRecord>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader.records().map(Result::unwrap).collect();
    (headers, rows)
}

fn fields(row: &csv::StringRecord) -> Vec<String> {
    row.iter().map(str::to_string).collect()
}

fn app_ids(rows: &[csv::StringRecord]) -> Vec<u32> {
    rows.iter().map(|row| row[0].parse().unwrap()).collect()
}

#[tokio::test]
async fn empty_catalog_produces_header_only_outputs() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[]).await;
    let dir = tempfile::tempdir().unwrap();

    let report = Pipeline::from_config(config_for(&server, dir.path()))
        .unwrap()
        .run()
        .await;

    assert_eq!(report.termination, Termination::EmptyCatalog);
    assert!(report.outputs_written());
    for path in [&report.all.path, &report.balanced.path] {
        let (headers, rows) = read_rows(path);
        assert_eq!(headers.len(), 8);
        assert_eq!(headers[0], "AppID");
        assert!(rows.is_empty());
    }
}

#[tokio::test]
async fn unavailable_catalog_degrades_to_empty_outputs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ISteamApps/GetAppList/v2/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let report = Pipeline::from_config(config_for(&server, dir.path()))
        .unwrap()
        .run()
        .await;

    assert_eq!(report.catalog_size, 0);
    assert!(report.outputs_written());
    assert!(read_rows(&report.all.path).1.is_empty());
}

#[tokio::test]
async fn ten_candidate_scenario() {
    let server = MockServer::start().await;
    mount_scenario(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let report = Pipeline::from_config(config_for(&server, dir.path()))
        .unwrap()
        .run()
        .await;

    assert_eq!(report.termination, Termination::TargetReached);
    assert_eq!(report.balance_mode, BalanceMode::Stratified);

    let (_, all_rows) = read_rows(&report.all.path);
    let mut all_ids = app_ids(&all_rows);
    all_ids.sort_unstable();
    assert_eq!(all_ids, vec![1, 2, 3, 4, 5, 6, 7]);
    for row in &all_rows {
        assert!(row[4].split(", ").any(|g| g == "Indie"));
        assert_eq!(&row[3], "Dev One, Dev Two");
        assert_eq!(&row[5], "19.99");
        assert_eq!(&row[7], "70");
    }

    let full: Vec<Vec<String>> = all_rows.iter().map(fields).collect();
    let (_, balanced_rows) = read_rows(&report.balanced.path);
    let mut counts = [0usize; 3];
    for row in &balanced_rows {
        assert!(full.contains(&fields(row)), "balanced row missing from full output");
        let recommendations: u32 = row[6].parse().unwrap();
        counts[Bucket::for_recommendations(recommendations).index()] += 1;
    }
    assert!(counts.iter().all(|&c| c <= 3));
    assert_eq!(counts, [3, 2, 2]);
}

#[tokio::test]
async fn forbidden_id_is_absent_and_run_continues() {
    let server = MockServer::start().await;
    mount_scenario(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let report = Pipeline::from_config(config_for(&server, dir.path()))
        .unwrap()
        .run()
        .await;

    assert_eq!(report.stats.forbidden, 1);
    assert_eq!(report.stats.succeeded, 7);
    for path in [&report.all.path, &report.balanced.path] {
        assert!(!app_ids(&read_rows(path).1).contains(&8));
    }
}

#[tokio::test]
async fn seeded_runs_are_byte_identical() {
    let server = MockServer::start().await;
    mount_scenario(&server).await;
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    for dir in [&first, &second] {
        let mut config = config_for(&server, dir.path());
        config.balance.per_bucket_cap = 2;
        let report = Pipeline::from_config(config).unwrap().run().await;
        assert!(report.outputs_written());
    }

    for file in ["steam_indie_games_all.csv", "steam_indie_games_balanced.csv"] {
        let a = std::fs::read(first.path().join(file)).unwrap();
        let b = std::fs::read(second.path().join(file)).unwrap();
        assert_eq!(a, b, "{file} differs between seeded runs");
    }
}

#[tokio::test]
async fn persistent_throttling_abandons_only_that_id() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[1, 2]).await;
    mount_detail(&server, 1, game(1, &["Indie"], 80)).await;
    Mock::given(method("GET"))
        .and(path("/api/appdetails"))
        .and(query_param("appids", "2"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = config_for(&server, dir.path());
    config.collection.min_records = 1;
    let report = Pipeline::from_config(config).unwrap().run().await;

    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.throttled_responses, 3);
    assert_eq!(app_ids(&read_rows(&report.all.path).1), vec![1]);
}

#[tokio::test]
async fn ineligible_payloads_are_left_out() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[1, 2, 3, 4]).await;
    mount_detail(&server, 1, game(1, &["Indie"], 80)).await;

    let mut adult = game_data(2, &["Indie"], 80);
    adult["content_descriptors"] = json!({"ids": [3], "notes": null});
    mount_detail(&server, 2, detail_response(2, adult)).await;

    let mut dlc = game_data(3, &["Indie"], 80);
    dlc["type"] = json!("dlc");
    mount_detail(&server, 3, detail_response(3, dlc)).await;

    let mut upcoming = game_data(4, &["Indie"], 80);
    upcoming["release_date"] = json!({"coming_soon": true, "date": "Coming soon"});
    mount_detail(&server, 4, detail_response(4, upcoming)).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&server, dir.path());
    config.collection.min_records = 4;
    let report = Pipeline::from_config(config).unwrap().run().await;

    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.skipped, 3);
    assert_eq!(app_ids(&read_rows(&report.all.path).1), vec![1]);
    assert_eq!(app_ids(&read_rows(&report.balanced.path).1), vec![1]);
}
