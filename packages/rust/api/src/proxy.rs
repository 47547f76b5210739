//! Image proxy: fetches a remote image server-side and streams it back.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::{Host, Url};

use topicpress_shared::{Result, TopicPressError};

use crate::AppState;
use crate::error::ApiError;

/// Some image hosts refuse requests without a browser-like user agent.
const PROXY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    url: Option<String>,
}

/// HTTP client and target policy for the image proxy.
pub struct ImageProxy {
    client: Client,
    allow_private: bool,
}

impl ImageProxy {
    /// Proxy that refuses private-network targets, redirects included.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::build(timeout, false)
    }

    /// Proxy that also reaches loopback and private-network targets.
    pub fn allowing_private(timeout: Duration) -> Result<Self> {
        Self::build(timeout, true)
    }

    fn build(timeout: Duration, allow_private: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(PROXY_USER_AGENT)
            .redirect(redirect_policy(allow_private))
            .timeout(timeout)
            .build()
            .map_err(|e| TopicPressError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            allow_private,
        })
    }

    fn check_target(&self, raw: Option<String>) -> std::result::Result<Url, ApiError> {
        let raw = raw
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::bad_request("Image URL is required"))?;

        let url =
            Url::parse(&raw).map_err(|e| ApiError::bad_request(format!("invalid image URL: {e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ApiError::bad_request("image URL must use http or https"));
        }
        if !self.allow_private && is_ssrf_target(&url) {
            warn!(%url, "SSRF protection: blocked");
            return Err(ApiError::bad_request("image URL targets a private address"));
        }
        Ok(url)
    }

    /// Send the upstream request; each redirect hop is checked like the target.
    async fn fetch(&self, url: &Url) -> std::result::Result<reqwest::Response, ApiError> {
        self.client.get(url.as_str()).send().await.map_err(|e| {
            warn!(%url, error = %e, "image fetch failed");
            if e.is_redirect() {
                ApiError::bad_request("image URL redirects to a private address")
            } else {
                ApiError::new(StatusCode::BAD_GATEWAY, format!("Failed to fetch image: {e}"))
            }
        })
    }
}

fn redirect_policy(allow_private: bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if !allow_private && is_ssrf_target(attempt.url()) {
            warn!(target_url = %attempt.url(), "SSRF protection: blocked redirect");
            attempt.error("redirect to a private address")
        } else {
            attempt.follow()
        }
    })
}

/// `GET /api/proxy-image?url=<absolute url>`
pub async fn proxy_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProxyQuery>,
) -> std::result::Result<Response, ApiError> {
    let proxy = &state.proxy;
    let url = proxy.check_target(query.url)?;
    debug!(%url, "proxying image");

    let upstream = proxy.fetch(&url).await?;

    let status = upstream.status();
    if !status.is_success() {
        warn!(%url, %status, "image host returned an error");
        return Err(ApiError::new(
            status,
            format!("Failed to fetch image: status code {}", status.as_u16()),
        ));
    }

    let mut builder = Response::builder().status(status);
    for name in [
        header::CONTENT_TYPE,
        header::CONTENT_LENGTH,
        header::CACHE_CONTROL,
        header::ETAG,
        header::LAST_MODIFIED,
    ] {
        if let Some(value) = upstream.headers().get(&name) {
            builder = builder.header(name, value.clone());
        }
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a loopback, private or local-only host.
fn is_ssrf_target(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(Host::Domain(host)) => {
            let host = host.to_ascii_lowercase();
            host == "localhost"
                || host.ends_with(".localhost")
                || host.ends_with(".local")
                || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}
