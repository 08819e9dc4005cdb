use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gallery::MatchMode;

pub const CONFIG_FILE: &str = "config.toml";

/// Environment variables holding the API secrets, in reporting order
pub const CREDENTIAL_VARS: [&str; 4] = [
    "SMUGMUG_CONSUMER_KEY",
    "SMUGMUG_CONSUMER_SECRET",
    "SMUGMUG_OAUTH_TOKEN",
    "SMUGMUG_OAUTH_SECRET",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("No gallery URL configured (set [gallery] url or pass --url)")]
    MissingGalleryUrl,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub reviewer: ReviewerConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory receiving reports and debug screenshots
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReviewerConfig {
    /// Full name of the client whose comments mark a selection
    #[serde(default = "default_reviewer_name")]
    pub name: String,

    #[serde(default)]
    pub match_mode: MatchMode,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GalleryConfig {
    #[serde(default)]
    pub url: Option<String>,

    /// Usually supplied through SMUGMUG_GALLERY_PASSWORD instead
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Navigation timeout in seconds
    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    /// Consecutive unchanged image counts that end lazy loading
    #[serde(default = "default_stable_reads")]
    pub stable_reads: u32,

    /// Hard ceiling on scroll attempts
    #[serde(default = "default_max_scroll_attempts")]
    pub max_scroll_attempts: u32,

    #[serde(default = "default_page_settle_ms")]
    pub page_settle_ms: u64,

    #[serde(default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,

    #[serde(default = "default_panel_settle_ms")]
    pub panel_settle_ms: u64,

    #[serde(default = "default_comment_settle_ms")]
    pub comment_settle_ms: u64,

    #[serde(default = "default_navigation_settle_ms")]
    pub navigation_settle_ms: u64,

    /// How long to wait for the grid to render after login
    #[serde(default = "default_gallery_ready_timeout")]
    pub gallery_ready_timeout_secs: u64,

    /// Elements below this viewport offset count as filename overlays
    #[serde(default = "default_overlay_min_top")]
    pub overlay_min_top: f64,

    /// Page title that carries no image information
    #[serde(default = "default_site_title")]
    pub site_title: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Account whose albums are listed
    #[serde(default = "default_nickname")]
    pub nickname: String,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Transport retries for 429/5xx responses; items are never retried
    #[serde(default)]
    pub max_retries: usize,

    #[serde(default = "default_rate_limit")]
    pub rate_limit_delay_ms: u64,

    /// Keep only comments written by the configured reviewer
    #[serde(default)]
    pub reviewer_only: bool,
}

fn default_true() -> bool { true }
fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_reviewer_name() -> String { "Clair Polleti".to_string() }
fn default_window_width() -> u32 { 1920 }
fn default_window_height() -> u32 { 1080 }
fn default_browser_timeout() -> u64 { 30 }
fn default_stable_reads() -> u32 { 3 }
fn default_max_scroll_attempts() -> u32 { 20 }
fn default_page_settle_ms() -> u64 { 3000 }
fn default_scroll_settle_ms() -> u64 { 2000 }
fn default_panel_settle_ms() -> u64 { 2000 }
fn default_comment_settle_ms() -> u64 { 3000 }
fn default_navigation_settle_ms() -> u64 { 2000 }
fn default_gallery_ready_timeout() -> u64 { 15 }
fn default_overlay_min_top() -> f64 { 400.0 }
fn default_site_title() -> String { "SmugMug".to_string() }
fn default_api_base_url() -> String { "https://api.smugmug.com/api/v2".to_string() }
fn default_nickname() -> String { "triggbowlin".to_string() }
fn default_page_size() -> usize { 100 }
fn default_timeout() -> u64 { 30 }
fn default_rate_limit() -> u64 { 100 }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            name: default_reviewer_name(),
            match_mode: MatchMode::default(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            timeout_secs: default_browser_timeout(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            stable_reads: default_stable_reads(),
            max_scroll_attempts: default_max_scroll_attempts(),
            page_settle_ms: default_page_settle_ms(),
            scroll_settle_ms: default_scroll_settle_ms(),
            panel_settle_ms: default_panel_settle_ms(),
            comment_settle_ms: default_comment_settle_ms(),
            navigation_settle_ms: default_navigation_settle_ms(),
            gallery_ready_timeout_secs: default_gallery_ready_timeout(),
            overlay_min_top: default_overlay_min_top(),
            site_title: default_site_title(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            nickname: default_nickname(),
            page_size: default_page_size(),
            timeout_secs: default_timeout(),
            max_retries: 0,
            rate_limit_delay_ms: default_rate_limit(),
            reviewer_only: false,
        }
    }
}

impl Config {
    /// Read `config.toml` from the working directory, falling back to
    /// defaults when it is missing or unreadable.
    pub fn load() -> Self {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            match Self::load_from(path) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("{}; using defaults", e),
            }
        }
        Self::default()
    }

    /// Read an explicitly named config file. Unlike [`Config::load`] a bad
    /// path is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl ScanConfig {
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn panel_settle(&self) -> Duration {
        Duration::from_millis(self.panel_settle_ms)
    }

    pub fn comment_settle(&self) -> Duration {
        Duration::from_millis(self.comment_settle_ms)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }

    pub fn gallery_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.gallery_ready_timeout_secs)
    }

    /// Same policy with every settle delay removed, for snapshot pages
    /// where nothing loads asynchronously.
    pub fn without_delays(&self) -> Self {
        Self {
            page_settle_ms: 0,
            scroll_settle_ms: 0,
            panel_settle_ms: 0,
            comment_settle_ms: 0,
            navigation_settle_ms: 0,
            ..self.clone()
        }
    }
}

impl BrowserSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ApiConfig {
    /// Build the HTTP client settings for the REST path
    pub fn http_client_config(&self) -> crate::http_client::HttpClientConfig {
        crate::http_client::HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            rate_limit_delay: Duration::from_millis(self.rate_limit_delay_ms),
            ..Default::default()
        }
    }
}

/// Load `.env` from the working directory. Returns whether a file was
/// loaded; a missing file is normal, anything else is logged.
pub fn load_dotenv() -> bool {
    check_dotenv(dotenvy::dotenv().map(|_| ()))
}

fn check_dotenv(result: Result<(), dotenvy::Error>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) if e.not_found() => false,
        Err(e) => {
            log::warn!("Failed to load .env: {}", e);
            false
        }
    }
}

/// OAuth 1.0a secrets for the REST path
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub oauth_token: String,
    pub oauth_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Load `.env` (if any) and read the four secrets from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the secrets through `lookup`, naming every missing or empty key
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: Vec<Option<String>> = CREDENTIAL_VARS
            .iter()
            .map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
            .collect();

        let missing: Vec<String> = CREDENTIAL_VARS
            .iter()
            .zip(&values)
            .filter(|(_, v)| v.is_none())
            .map(|(key, _)| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials(missing));
        }

        let mut values = values.into_iter().flatten();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            consumer_key: next(),
            consumer_secret: next(),
            oauth_token: next(),
            oauth_secret: next(),
        })
    }
}
