//! Infrastructure layer
//!
//! Configuration, logging, the rate-limited HTTP client, the store API adapter and CSV
//! persistence.

pub mod config;
pub mod csv_writer;
pub mod http_client;
pub mod logging;
pub mod retry_policy;
pub mod steam_api;

pub use config::{AppConfig, ConfigError};
pub use csv_writer::{CsvWriter, PersistError};
pub use http_client::{HttpClient, HttpError};
pub use logging::init_logging_with_config;
pub use retry_policy::RetryPolicy;
pub use steam_api::{AppDataSource, SteamClient, parse_app_details, parse_app_list};
