//! HTTP generation provider: one JSON POST per request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument};

use topicpress_shared::{ContentRecord, GeneratorConfig, Result, TopicPressError};

use crate::generator::{ContentGenerator, Draft, GenerationRequest, GenerationResponse};

const USER_AGENT: &str = concat!("TopicPress/", env!("CARGO_PKG_VERSION"));

/// Generator backed by an HTTP endpoint.
pub struct HttpGenerator {
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl HttpGenerator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TopicPressError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            timeout,
        })
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            TopicPressError::config("generator.endpoint is required for http mode")
        })?;
        Self::new(endpoint, config.timeout())
    }
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, records = corpus.len()))]
    async fn draft(&self, topic: &str, corpus: &[ContentRecord]) -> Result<Draft> {
        info!("requesting draft from generation endpoint");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerationRequest {
                topic,
                contents: corpus,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TopicPressError::Timeout(format!(
                        "generation endpoint did not answer within {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    TopicPressError::Generation(format!("generation request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(TopicPressError::Generation(format!(
                "generation endpoint returned {status}: {excerpt}"
            )));
        }

        let parsed: GenerationResponse = response.json().await.map_err(|e| {
            TopicPressError::Generation(format!("invalid generation response: {e}"))
        })?;

        parsed.into_draft(topic)
    }
}
