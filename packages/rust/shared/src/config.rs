//! Application configuration for TopicPress.
//!
//! User config lives at `~/.topicpress/topicpress.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TopicPressError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "topicpress.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".topicpress";

/// Image returned whenever the image provider cannot be used.
pub const DEFAULT_IMAGE_URL: &str =
    "https://cdn.pixabay.com/photo/2018/01/12/10/19/fantasy-3077928_1280.jpg";

// ---------------------------------------------------------------------------
// Config structs (matching topicpress.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl bounds and entry points.
    #[serde(default)]
    pub crawl: CrawlSettings,

    /// Image search provider.
    #[serde(default)]
    pub images: ImageSettings,

    /// Content generation strategy.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Document store.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Search endpoint; the topic is appended as the `q` query parameter.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Encyclopedia base used when the search endpoint is unreachable.
    #[serde(default = "default_fallback_base_url")]
    pub fallback_base_url: String,

    /// Hosts whose links may be followed.
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// URL path glob patterns that are never followed.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Maximum link hops from the entry page.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum pages fetched per crawl.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Stop once this many records are accepted.
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Backfill with synthetic records below this count.
    #[serde(default = "default_min_records")]
    pub min_records: usize,

    /// Concurrent page fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-page fetch timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Aggregate time budget for one crawl in seconds.
    #[serde(default = "default_crawl_budget")]
    pub crawl_budget_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            fallback_base_url: default_fallback_base_url(),
            allowed_domains: default_allowed_domains(),
            exclude_patterns: Vec::new(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            max_records: default_max_records(),
            min_records: default_min_records(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout(),
            crawl_budget_secs: default_crawl_budget(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_search_url() -> String {
    "https://news.google.com/search".into()
}
fn default_fallback_base_url() -> String {
    "https://en.wikipedia.org/wiki/".into()
}
fn default_allowed_domains() -> Vec<String> {
    [
        "en.wikipedia.org",
        "www.bbc.com",
        "www.cnn.com",
        "www.reuters.com",
        "www.theguardian.com",
        "news.google.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_max_depth() -> u32 {
    2
}
fn default_max_pages() -> usize {
    50
}
fn default_max_records() -> usize {
    5
}
fn default_min_records() -> usize {
    2
}
fn default_concurrency() -> u32 {
    4
}
fn default_request_timeout() -> u64 {
    10
}
fn default_crawl_budget() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("TopicPress/", env!("CARGO_PKG_VERSION")).into()
}

/// `[images]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Name of the env var holding the provider key (never store the key itself).
    #[serde(default = "default_image_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_image_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_image_url")]
    pub default_image_url: String,

    #[serde(default = "default_image_timeout")]
    pub timeout_secs: u64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            api_key_env: default_image_key_env(),
            endpoint: default_image_endpoint(),
            default_image_url: default_image_url(),
            timeout_secs: default_image_timeout(),
        }
    }
}

fn default_image_key_env() -> String {
    "PEXELS_API_KEY".into()
}
fn default_image_endpoint() -> String {
    "https://api.pexels.com/v1/search".into()
}
fn default_image_url() -> String {
    DEFAULT_IMAGE_URL.into()
}
fn default_image_timeout() -> u64 {
    10
}

/// Which content generation strategy the synthesizer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// Built-in deterministic templates.
    #[default]
    Template,
    /// External program speaking JSON over stdin/stdout.
    Bridge,
    /// External HTTP endpoint accepting a JSON POST.
    Http,
}

/// `[generator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub mode: GeneratorMode,

    /// Fixed attribution written to every document.
    #[serde(default = "default_author")]
    pub author: String,

    /// Bridge program (e.g., "python3").
    #[serde(default = "default_bridge_cmd")]
    pub bridge_cmd: String,

    /// Arguments passed to the bridge program.
    #[serde(default)]
    pub bridge_args: Vec<String>,

    /// Working directory for the bridge subprocess.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_working_dir: Option<String>,

    /// Endpoint for `http` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::Template,
            author: default_author(),
            bridge_cmd: default_bridge_cmd(),
            bridge_args: Vec::new(),
            bridge_working_dir: None,
            endpoint: None,
            timeout_secs: default_generator_timeout(),
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_author() -> String {
    "AI Content Generator".into()
}
fn default_bridge_cmd() -> String {
    "python3".into()
}
fn default_generator_timeout() -> u64 {
    60
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per document.
    #[default]
    Files,
    /// One row per document in an embedded libSQL database.
    Libsql,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory (files) or database file (libsql).
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Files,
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/blogs")
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Deadline for crawl + synthesis of one generation request.
    #[serde(default = "default_pipeline_deadline")]
    pub pipeline_deadline_secs: u64,

    /// Timeout for image proxy fetches.
    #[serde(default = "default_proxy_timeout")]
    pub proxy_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
            pipeline_deadline_secs: default_pipeline_deadline(),
            proxy_timeout_secs: default_proxy_timeout(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://localhost:5173".into(),
    ]
}
fn default_pipeline_deadline() -> u64 {
    90
}
fn default_proxy_timeout() -> u64 {
    15
}

// ---------------------------------------------------------------------------
// Runtime configs (resolved from AppConfig)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub search_url: String,
    pub fallback_base_url: String,
    /// Trusted hostnames; links to any other host are never followed.
    pub allowed_domains: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_depth: u32,
    pub max_pages: usize,
    pub max_records: usize,
    pub min_records: usize,
    pub concurrency: u32,
    pub request_timeout: Duration,
    pub crawl_budget: Duration,
    pub user_agent: String,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        let c = &config.crawl;
        Self {
            search_url: c.search_url.clone(),
            fallback_base_url: c.fallback_base_url.clone(),
            allowed_domains: c.allowed_domains.clone(),
            exclude_patterns: c.exclude_patterns.clone(),
            max_depth: c.max_depth,
            max_pages: c.max_pages,
            max_records: c.max_records,
            min_records: c.min_records,
            concurrency: c.concurrency.max(1),
            request_timeout: Duration::from_secs(c.request_timeout_secs),
            crawl_budget: Duration::from_secs(c.crawl_budget_secs),
            user_agent: c.user_agent.clone(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Runtime image provider configuration.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Provider credential, resolved from the configured env var.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub default_image_url: String,
    pub timeout: Duration,
}

impl From<&AppConfig> for ImageConfig {
    fn from(config: &AppConfig) -> Self {
        let i = &config.images;
        let api_key = std::env::var(&i.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(env = %i.api_key_env, "image provider key not set, using default image");
        }
        Self {
            api_key,
            endpoint: i.endpoint.clone(),
            default_image_url: i.default_image_url.clone(),
            timeout: Duration::from_secs(i.timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.topicpress/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TopicPressError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.topicpress/topicpress.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TopicPressError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        TopicPressError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TopicPressError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TopicPressError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TopicPressError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

impl AppConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("crawl.search_url", &self.crawl.search_url),
            ("crawl.fallback_base_url", &self.crawl.fallback_base_url),
            ("images.endpoint", &self.images.endpoint),
        ] {
            Url::parse(value)
                .map_err(|e| TopicPressError::config(format!("{name} is not a URL: {e}")))?;
        }
        if self.crawl.max_records == 0 {
            return Err(TopicPressError::config("crawl.max_records must be at least 1"));
        }
        if self.generator.mode == GeneratorMode::Http && self.generator.endpoint.is_none() {
            return Err(TopicPressError::config(
                "generator.endpoint is required when generator.mode = \"http\"",
            ));
        }
        Ok(())
    }
}
