//! Image lookup for generated documents.
//!
//! Resolution never fails: a missing credential, a transport error, a non-2xx
//! status, an unreadable payload, or an empty result set all yield the
//! configured default image URL.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use topicpress_shared::{DEFAULT_IMAGE_URL, ImageConfig, Result, TopicPressError};

/// Maximum provider response size we are willing to decode (2 MB).
const MAX_RESPONSE_SIZE: u64 = 2 * 1024 * 1024;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("TopicPress/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ImageSource
// ---------------------------------------------------------------------------

/// Something that maps a search query to an image URL.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Resolve `query` to an image URL. Always returns a usable URL.
    async fn resolve(&self, query: &str) -> String;
}

/// Always returns one fixed URL.
#[derive(Debug, Clone)]
pub struct StaticImages {
    url: String,
}

impl StaticImages {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for StaticImages {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_URL)
    }
}

#[async_trait]
impl ImageSource for StaticImages {
    async fn resolve(&self, _query: &str) -> String {
        self.url.clone()
    }
}

/// Pick the image source for a runtime config: the provider when a key is
/// present, otherwise the default image.
pub fn image_source(config: &ImageConfig) -> Result<Arc<dyn ImageSource>> {
    if config.api_key.is_none() {
        return Ok(Arc::new(StaticImages::new(config.default_image_url.clone())));
    }
    Ok(Arc::new(PexelsImages::new(config.clone())?))
}

// ---------------------------------------------------------------------------
// Pexels provider
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    large: String,
}

/// Stock photo search against a Pexels-compatible endpoint.
pub struct PexelsImages {
    client: Client,
    config: ImageConfig,
}

impl PexelsImages {
    pub fn new(config: ImageConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TopicPressError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// One search request; any problem is an error for the caller to absorb.
    async fn search(&self, key: &str, query: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("query", query), ("per_page", "1")])
            .header(reqwest::header::AUTHORIZATION, key)
            .send()
            .await
            .map_err(|e| TopicPressError::Network(format!("image search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TopicPressError::Network(format!("image search: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(TopicPressError::validation(format!(
                    "image search: response too large ({len} bytes)"
                )));
            }
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| TopicPressError::parse(format!("image search: {e}")))?;

        body.photos
            .into_iter()
            .map(|p| p.src.large)
            .find(|url| !url.trim().is_empty())
            .ok_or_else(|| TopicPressError::not_found(format!("image for '{query}'")))
    }
}

#[async_trait]
impl ImageSource for PexelsImages {
    #[instrument(skip_all, fields(query = %query))]
    async fn resolve(&self, query: &str) -> String {
        let Some(key) = self.config.api_key.as_deref() else {
            debug!("no image provider key, using default image");
            return self.config.default_image_url.clone();
        };

        match self.search(key, query).await {
            Ok(url) => {
                debug!(%url, "image resolved");
                url
            }
            Err(e) => {
                warn!(error = %e, "image lookup failed, using default image");
                self.config.default_image_url.clone()
            }
        }
    }
}
