//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MAPCACHE_*)
//! 2. TOML config file (if MAPCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The allow-lists (static/data extensions, tile hosts, app shell) are plain
//! configuration. Nothing validates them against the assets actually deployed.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::Category;

mod validation;

pub use validation::ConfigError;

/// Maximum entry count per partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionLimits {
    #[serde(default = "default_static_entries")]
    pub static_entries: usize,
    #[serde(default = "default_data_entries")]
    pub data_entries: usize,
    #[serde(default = "default_tile_entries")]
    pub tile_entries: usize,
}

fn default_static_entries() -> usize {
    40
}

fn default_data_entries() -> usize {
    40
}

fn default_tile_entries() -> usize {
    400
}

impl Default for PartitionLimits {
    fn default() -> Self {
        Self {
            static_entries: default_static_entries(),
            data_entries: default_data_entries(),
            tile_entries: default_tile_entries(),
        }
    }
}

impl PartitionLimits {
    /// Limit for a category, `None` for categories without a partition.
    pub fn for_category(&self, category: Category) -> Option<usize> {
        match category {
            Category::Static => Some(self.static_entries),
            Category::Data => Some(self.data_entries),
            Category::TileOrCdn => Some(self.tile_entries),
            Category::Navigation | Category::Other => None,
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MAPCACHE_*)
/// 2. TOML config file (if MAPCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the map application is served from.
    ///
    /// Set via MAPCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: Url,

    /// Deployed cache generation, embedded in partition names.
    ///
    /// Set via MAPCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Path to SQLite cache database.
    ///
    /// Set via MAPCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Overall HTTP client timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Timeout for the network-first dataset fetch before falling back to cache.
    #[serde(default = "default_data_timeout_ms")]
    pub data_timeout_ms: u64,

    /// Maximum bytes to read per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Per-partition entry limits.
    #[serde(default)]
    pub limits: PartitionLimits,

    /// App shell precached into the static partition on install, relative to `origin`.
    #[serde(default = "default_app_shell")]
    pub app_shell: Vec<String>,

    /// Start page served to navigations when the network is down, relative to `origin`.
    #[serde(default = "default_start_page")]
    pub start_page: String,

    /// Same-origin path extensions treated as static assets.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Same-origin path extensions treated as datasets.
    #[serde(default = "default_data_extensions")]
    pub data_extensions: Vec<String>,

    /// External tile/CDN hosts (suffix match).
    #[serde(default = "default_tile_hosts")]
    pub tile_hosts: Vec<String>,

    /// Stay in `installed` until a SKIP_WAITING message arrives.
    #[serde(default)]
    pub wait_for_skip: bool,

    /// Nominatim-compatible search endpoint.
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// Radius around the origin coordinate that earns a proximity bonus.
    #[serde(default = "default_geocode_radius_km")]
    pub geocode_radius_km: f64,
}

fn default_origin() -> Url {
    Url::parse("http://localhost:8000/").expect("static origin URL is valid")
}

fn default_version() -> String {
    "v1".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./mapcache.sqlite")
}

fn default_user_agent() -> String {
    "mapcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_data_timeout_ms() -> u64 {
    8_000
}

fn default_max_bytes() -> usize {
    20_971_520 // 20MB
}

fn default_app_shell() -> Vec<String> {
    [
        "./",
        "index.html",
        "style.css",
        "app.js",
        "manifest.webmanifest",
        "icons/icon-192.png",
        "icons/icon-512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_start_page() -> String {
    "index.html".into()
}

fn default_static_extensions() -> Vec<String> {
    ["html", "htm", "css", "js", "mjs", "json", "webmanifest", "png", "svg", "ico", "webp"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_data_extensions() -> Vec<String> {
    vec!["geojson".into()]
}

fn default_tile_hosts() -> Vec<String> {
    [
        "tile.openstreetmap.org",
        "tile.opentopomap.org",
        "server.arcgisonline.com",
        "unpkg.com",
        "cdn.jsdelivr.net",
        "cdnjs.cloudflare.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org/search".into()
}

fn default_geocode_radius_km() -> f64 {
    50.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            version: default_version(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            data_timeout_ms: default_data_timeout_ms(),
            max_bytes: default_max_bytes(),
            limits: PartitionLimits::default(),
            app_shell: default_app_shell(),
            start_page: default_start_page(),
            static_extensions: default_static_extensions(),
            data_extensions: default_data_extensions(),
            tile_hosts: default_tile_hosts(),
            wait_for_skip: false,
            geocoder_url: default_geocoder_url(),
            geocode_radius_km: default_geocode_radius_km(),
        }
    }
}

impl AppConfig {
    /// Client timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Dataset network-first timeout.
    pub fn data_timeout(&self) -> Duration {
        Duration::from_millis(self.data_timeout_ms)
    }

    /// Absolute URL of the start page.
    pub fn start_page_url(&self) -> Result<Url, ConfigError> {
        self.resolve(&self.start_page, "start_page")
    }

    /// Absolute URLs of the app shell, in configured order.
    pub fn app_shell_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.app_shell.iter().map(|p| self.resolve(p, "app_shell")).collect()
    }

    fn resolve(&self, path: &str, field: &str) -> Result<Url, ConfigError> {
        self.origin
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{path}: {e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MAPCACHE_`
    /// 2. TOML file from `MAPCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MAPCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MAPCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
