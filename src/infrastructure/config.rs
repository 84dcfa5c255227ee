//! Application configuration
//!
//! Settings are layered with the `config` crate: serde defaults, then an optional config
//! file, then `SAMPLER_<SECTION>__<KEY>` environment variables, then the `STEAM_API_KEY`
//! credential. [`AppConfig::validate`] runs before any work starts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::EligibilityPolicy;

pub const ENV_PREFIX: &str = "SAMPLER";
pub const API_KEY_VAR: &str = "STEAM_API_KEY";
const CONFIG_DIR_NAME: &str = "steam-indie-sampler";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Keys whose environment values are comma separated lists
const LIST_KEYS: [&str; 6] = [
    "http.retry_statuses",
    "eligibility.required_genres",
    "eligibility.excluded_content_tags",
    "eligibility.excluded_genres",
    "eligibility.excluded_kinds",
    "eligibility.excluded_release_markers",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },

    #[error("Missing API credential: set {API_KEY_VAR} or api.api_key")]
    MissingCredential,
}

/// Default values
pub mod defaults {
    pub const CATALOG_URL: &str = "https://api.steampowered.com/ISteamApps/GetAppList/v2/";
    pub const DETAILS_URL: &str = "https://store.steampowered.com/api/appdetails";
    pub const USER_AGENT: &str = concat!("steam-indie-sampler/", env!("CARGO_PKG_VERSION"));

    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
    pub const MAX_ATTEMPTS: u32 = 5;
    pub const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];
    pub const BACKOFF_BASE_MS: u64 = 500;
    pub const BACKOFF_MAX_MS: u64 = 8_000;
    pub const JITTER_MS: u64 = 250;
    /// The store tolerates roughly 200 detail requests per five minutes
    pub const REQUESTS_PER_WINDOW: u32 = 200;
    pub const WINDOW_SECS: u64 = 300;

    pub const CANDIDATE_POOL_SIZE: usize = 5_000;
    pub const MIN_RECORDS: usize = 300;
    pub const CONCURRENCY: usize = 10;
    pub const BATCH_SIZE: usize = 50;
    pub const PAUSE_EVERY: usize = 20;
    pub const THROTTLE_MAX_ATTEMPTS: u32 = 3;
    pub const THROTTLE_INITIAL_BACKOFF_MS: u64 = 10_000;
    pub const THROTTLE_MAX_BACKOFF_MS: u64 = 120_000;
    pub const MAX_RESAMPLE_ROUNDS: u32 = 5;
    pub const MAX_RUN_SECS: u64 = 7_200;

    pub const PER_BUCKET_CAP: usize = 100;

    pub const OUTPUT_DIR: &str = ".";
    pub const ALL_FILE: &str = "steam_indie_games_all.csv";
    pub const BALANCED_FILE: &str = "steam_indie_games_balanced.csv";

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_DIR: &str = "logs";
    pub const LOG_FILE: &str = "sampler.log";
    pub const LOG_MAX_FILES: usize = 10;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub http: HttpConfig,
    pub collection: CollectionConfig,
    pub eligibility: EligibilityPolicy,
    pub balance: BalanceConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    /// Seed for sampling and balancing; unseeded runs are not reproducible
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub catalog_url: String,
    pub details_url: String,
    pub api_key: String,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            catalog_url: defaults::CATALOG_URL.to_string(),
            details_url: defaults::DETAILS_URL.to_string(),
            api_key: String::new(),
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_statuses: Vec<u16>,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub jitter_ms: u64,
    pub requests_per_window: u32,
    pub window_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            max_attempts: defaults::MAX_ATTEMPTS,
            retry_statuses: defaults::RETRY_STATUSES.to_vec(),
            backoff_base_ms: defaults::BACKOFF_BASE_MS,
            backoff_max_ms: defaults::BACKOFF_MAX_MS,
            jitter_ms: defaults::JITTER_MS,
            requests_per_window: defaults::REQUESTS_PER_WINDOW,
            window_secs: defaults::WINDOW_SECS,
        }
    }
}

impl HttpConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub candidate_pool_size: usize,
    pub min_records: usize,
    pub concurrency: usize,
    pub batch_size: usize,
    /// Pause the whole pool after every this many collected records
    pub pause_every: usize,
    pub throttle_max_attempts: u32,
    pub throttle_initial_backoff_ms: u64,
    pub throttle_max_backoff_ms: u64,
    pub max_resample_rounds: u32,
    pub max_run_secs: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            candidate_pool_size: defaults::CANDIDATE_POOL_SIZE,
            min_records: defaults::MIN_RECORDS,
            concurrency: defaults::CONCURRENCY,
            batch_size: defaults::BATCH_SIZE,
            pause_every: defaults::PAUSE_EVERY,
            throttle_max_attempts: defaults::THROTTLE_MAX_ATTEMPTS,
            throttle_initial_backoff_ms: defaults::THROTTLE_INITIAL_BACKOFF_MS,
            throttle_max_backoff_ms: defaults::THROTTLE_MAX_BACKOFF_MS,
            max_resample_rounds: defaults::MAX_RESAMPLE_ROUNDS,
            max_run_secs: defaults::MAX_RUN_SECS,
        }
    }
}

impl CollectionConfig {
    pub const fn run_budget(&self) -> Duration {
        Duration::from_secs(self.max_run_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub per_bucket_cap: usize,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            per_bucket_cap: defaults::PER_BUCKET_CAP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub all_file: String,
    pub balanced_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(defaults::OUTPUT_DIR),
            all_file: defaults::ALL_FILE.to_string(),
            balanced_file: defaults::BALANCED_FILE.to_string(),
        }
    }
}

impl OutputConfig {
    pub fn all_path(&self) -> PathBuf {
        self.dir.join(&self.all_file)
    }

    pub fn balanced_path(&self) -> PathBuf {
        self.dir.join(&self.balanced_file)
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs in the log file
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    pub dir: PathBuf,

    pub file_name: String,

    /// Number of rotated log files to keep (older files will be deleted)
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            dir: PathBuf::from(defaults::LOG_DIR),
            file_name: defaults::LOG_FILE.to_string(),
            max_files: defaults::LOG_MAX_FILES,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// Without `path`, the per-user config file is used when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let path = path.map(Path::to_path_buf).or_else(user_config_file);
        Self::load_with_env(path.as_deref(), env)
    }

    /// Loads configuration against an explicit environment map
    pub fn load_with_env(
        path: Option<&Path>,
        env: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let api_key = env.get(API_KEY_VAR).cloned();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let mut environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .try_parsing(true)
            .source(Some(env));
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }

        let settings = builder.add_source(environment).build()?;
        let mut config: Self = settings.try_deserialize()?;

        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            config.api.api_key = key;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential);
        }

        for (name, url) in [
            ("api.catalog_url", &self.api.catalog_url),
            ("api.details_url", &self.api.details_url),
        ] {
            if let Err(e) = url::Url::parse(url) {
                return Err(ConfigError::Validation {
                    message: format!("{name} is not a valid URL ({e}): {url}"),
                });
            }
        }

        let positive = [
            ("http.timeout_secs", self.http.timeout_secs),
            ("http.max_attempts", u64::from(self.http.max_attempts)),
            ("http.requests_per_window", u64::from(self.http.requests_per_window)),
            ("http.window_secs", self.http.window_secs),
            ("collection.concurrency", self.collection.concurrency as u64),
            ("collection.batch_size", self.collection.batch_size as u64),
            ("collection.pause_every", self.collection.pause_every as u64),
            (
                "collection.throttle_max_attempts",
                u64::from(self.collection.throttle_max_attempts),
            ),
            ("collection.max_run_secs", self.collection.max_run_secs),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Validation {
                message: format!("{name} must be greater than 0"),
            });
        }

        if self.http.backoff_base_ms > self.http.backoff_max_ms {
            return Err(ConfigError::Validation {
                message: "http.backoff_base_ms cannot be greater than http.backoff_max_ms"
                    .to_string(),
            });
        }

        if self.collection.throttle_initial_backoff_ms > self.collection.throttle_max_backoff_ms {
            return Err(ConfigError::Validation {
                message: "collection.throttle_initial_backoff_ms cannot be greater than \
                          collection.throttle_max_backoff_ms"
                    .to_string(),
            });
        }

        if self.http.retry_statuses.contains(&429) {
            return Err(ConfigError::Validation {
                message: "http.retry_statuses must not contain 429; throttling is handled by the collector"
                    .to_string(),
            });
        }

        if self.output.all_file.trim().is_empty() || self.output.balanced_file.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "output file names must not be empty".to_string(),
            });
        }

        if self.output.all_path() == self.output.balanced_path() {
            return Err(ConfigError::Validation {
                message: "output.all_file and output.balanced_file must differ".to_string(),
            });
        }

        Ok(())
    }
}

/// `<config dir>/steam-indie-sampler/config.toml`, if it exists
fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}
