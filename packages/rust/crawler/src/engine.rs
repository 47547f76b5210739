//! Topic-driven, bounded web crawler.
//!
//! The crawler builds a search entry point from the topic, performs BFS
//! traversal restricted to an allow-list of hosts, extracts an article from
//! every fetched page, and backfills with synthetic records when the result
//! is sparse. It never returns an error: every failure degrades the corpus.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

use topicpress_shared::{ContentRecord, Corpus, CrawlConfig, Result, TopicPressError};

use crate::backfill::backfill;
use crate::extractor::Extractor;

/// Maximum number of redirects followed per page.
const MAX_REDIRECTS: usize = 5;

/// Level of the entry page. `max_depth` counts page levels, so a depth of 2
/// fetches the entry page and the pages it links to.
const ENTRY_LEVEL: u32 = 1;

// ---------------------------------------------------------------------------
// CrawlReport
// ---------------------------------------------------------------------------

/// Which entry point the traversal started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// The topic search page.
    Primary,
    /// The encyclopedia page keyed by the topic.
    Fallback,
    /// Neither entry point could be reached.
    Unreachable,
}

/// Summary of a completed crawl.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Fetch attempts that ran to completion, failed ones included.
    pub pages_fetched: usize,
    /// Links skipped (already visited, or the crawl ran out of budget).
    pub pages_skipped: usize,
    /// Errors encountered (URL, error message).
    pub errors: Vec<(String, String)>,
    pub entry: EntryPoint,
    /// Records extracted from real pages.
    pub extracted: usize,
    /// Synthetic records appended by backfill.
    pub backfilled: usize,
    /// Whether the aggregate time budget cut traversal short.
    pub budget_exhausted: bool,
    pub duration: Duration,
}

/// What a single fetched page contributed.
#[derive(Debug)]
struct PageOutcome {
    /// Final URL after redirects.
    url: Url,
    record: Option<ContentRecord>,
    links: Vec<Url>,
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Bounded, allow-listed crawler that turns a topic into a corpus.
///
/// Postcondition of [`Crawler::crawl`]: the corpus holds at least
/// `min_records` records, and every record satisfies the acceptance invariant.
pub struct Crawler {
    config: CrawlConfig,
    client: Client,
    extractor: Arc<Extractor>,
    scope: Arc<CrawlScope>,
}

impl Crawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let scope = Arc::new(CrawlScope::new(&config));
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect_policy(scope.clone()))
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| TopicPressError::Network(format!("failed to build HTTP client: {e}")))?;

        // Validate entry point templates up front.
        Url::parse(&config.search_url)
            .map_err(|e| TopicPressError::config(format!("invalid search_url: {e}")))?;
        Url::parse(&config.fallback_base_url)
            .map_err(|e| TopicPressError::config(format!("invalid fallback_base_url: {e}")))?;

        Ok(Self {
            config,
            client,
            extractor: Arc::new(Extractor::new()),
            scope,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Search entry point: the topic as the `q` query parameter.
    pub fn search_url(&self, topic: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.search_url)
            .map_err(|e| TopicPressError::config(format!("invalid search_url: {e}")))?;
        url.query_pairs_mut().append_pair("q", topic);
        Ok(url)
    }

    /// Fallback entry point: `<base>/<Topic_With_Underscores>`.
    pub fn fallback_url(&self, topic: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.fallback_base_url)
            .map_err(|e| TopicPressError::config(format!("invalid fallback_base_url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TopicPressError::config("fallback_base_url cannot be a base"))?
            .pop_if_empty()
            .push(&topic.trim().replace(' ', "_"));
        Ok(url)
    }

    /// Crawl for `topic`, returning at least `min_records` records.
    pub async fn crawl(&self, topic: &str) -> Corpus {
        self.crawl_with_report(topic).await.0
    }

    /// Crawl for `topic` and also return traversal statistics.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn crawl_with_report(&self, topic: &str) -> (Corpus, CrawlReport) {
        let start = std::time::Instant::now();
        let deadline = Instant::now() + self.config.crawl_budget;

        info!(
            max_depth = self.config.max_depth,
            max_pages = self.config.max_pages,
            max_records = self.config.max_records,
            min_records = self.config.min_records,
            "starting crawl"
        );

        let mut state = Traversal::default();
        let entry = self.enter(topic, deadline, &mut state).await;
        if entry != EntryPoint::Unreachable {
            self.traverse(deadline, &mut state).await;
        }

        let extracted = state.corpus.len();
        let mut corpus = state.corpus;
        let backfilled = backfill(
            &mut corpus,
            topic,
            self.config.min_records,
            Utc::now().date_naive(),
        );

        let report = CrawlReport {
            pages_fetched: state.fetched,
            pages_skipped: state.skipped,
            errors: state.errors,
            entry,
            extracted,
            backfilled,
            budget_exhausted: state.budget_exhausted,
            duration: start.elapsed(),
        };

        info!(
            pages_fetched = report.pages_fetched,
            pages_skipped = report.pages_skipped,
            errors = report.errors.len(),
            extracted = report.extracted,
            backfilled = report.backfilled,
            entry = ?report.entry,
            duration_ms = report.duration.as_millis(),
            "crawl completed"
        );

        (corpus, report)
    }

    /// Fetch the primary entry point, falling back once to the encyclopedia page.
    async fn enter(&self, topic: &str, deadline: Instant, state: &mut Traversal) -> EntryPoint {
        let candidates = [
            (EntryPoint::Primary, self.search_url(topic)),
            (EntryPoint::Fallback, self.fallback_url(topic)),
        ];

        for (kind, url) in candidates {
            let url = match url {
                Ok(url) => url,
                Err(e) => {
                    warn!(?kind, error = %e, "entry point could not be built");
                    continue;
                }
            };

            if state.fetched >= self.config.max_pages {
                break;
            }
            state.visited.insert(normalize_url(&url));
            state.fetched += 1;

            let fetch = fetch_page(&self.client, self.extractor.clone(), url.clone());
            match tokio::time::timeout_at(deadline, fetch).await {
                Ok(Ok(outcome)) => {
                    debug!(%url, ?kind, "entry point reached");
                    self.absorb(state, outcome, ENTRY_LEVEL);
                    return kind;
                }
                Ok(Err(e)) => {
                    warn!(%url, ?kind, error = %e, "entry point unreachable");
                    state.errors.push((url.to_string(), e.to_string()));
                }
                Err(_) => {
                    warn!(%url, ?kind, "crawl budget exhausted at entry point");
                    state.fetched -= 1;
                    state.budget_exhausted = true;
                    break;
                }
            }
        }

        EntryPoint::Unreachable
    }

    /// Breadth-first traversal of queued links, in batches of `concurrency`.
    async fn traverse(&self, deadline: Instant, state: &mut Traversal) {
        let concurrency = self.config.concurrency.max(1) as usize;

        while !state.queue.is_empty() && !self.corpus_full(state) && !state.budget_exhausted {
            if Instant::now() >= deadline {
                state.budget_exhausted = true;
                break;
            }

            // Bounds are enforced here, before anything is fetched.
            let mut batch = Vec::new();
            while batch.len() < concurrency && state.fetched < self.config.max_pages {
                let Some((url, depth)) = state.queue.pop_front() else {
                    break;
                };
                if depth > self.config.max_depth || !state.visited.insert(normalize_url(&url)) {
                    state.skipped += 1;
                    continue;
                }
                state.fetched += 1;
                batch.push((url, depth));
            }

            if batch.is_empty() {
                break;
            }

            let handles: Vec<_> = batch
                .into_iter()
                .map(|(url, depth)| {
                    let client = self.client.clone();
                    let extractor = self.extractor.clone();
                    let task = FetchTask(tokio::spawn(fetch_page_owned(
                        client,
                        extractor,
                        url.clone(),
                    )));
                    (url, depth, task)
                })
                .collect();

            // Results are absorbed in queue order so the corpus follows discovery order.
            for (url, depth, mut task) in handles {
                if state.budget_exhausted || self.corpus_full(state) {
                    state.fetched -= 1;
                    state.skipped += 1;
                    continue;
                }

                match tokio::time::timeout_at(deadline, &mut task.0).await {
                    Ok(Ok(Ok(outcome))) => self.absorb(state, outcome, depth),
                    Ok(Ok(Err(e))) => {
                        debug!(%url, error = %e, "page skipped");
                        state.errors.push((url.to_string(), e.to_string()));
                    }
                    Ok(Err(e)) => {
                        state.errors.push((url.to_string(), format!("task failed: {e}")));
                    }
                    Err(_) => {
                        warn!(%url, "crawl budget exhausted, aborting in-flight fetches");
                        state.fetched -= 1;
                        state.skipped += 1;
                        state.budget_exhausted = true;
                    }
                }
            }
        }
    }

    /// Record a page's article and enqueue its in-scope links one level down.
    fn absorb(&self, state: &mut Traversal, outcome: PageOutcome, depth: u32) {
        if let Some(record) = outcome.record {
            if !self.corpus_full(state) && state.recorded.insert(record.source_url.clone()) {
                debug!(url = %outcome.url, title = %record.title, "article accepted");
                state.corpus.push(record);
            }
        }

        if depth >= self.config.max_depth {
            return;
        }
        for link in outcome.links {
            if self.scope.in_scope(&link) {
                state.queue.push_back((link, depth + 1));
            }
        }
    }

    fn corpus_full(&self, state: &Traversal) -> bool {
        state.corpus.len() >= self.config.max_records
    }
}

/// A spawned page fetch, aborted when dropped so that cancelling a crawl
/// (budget expiry, a full corpus, or the caller dropping the future) also
/// cancels its network calls.
struct FetchTask(tokio::task::JoinHandle<Result<PageOutcome>>);

impl Drop for FetchTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Mutable state of one traversal.
#[derive(Default)]
struct Traversal {
    corpus: Corpus,
    queue: VecDeque<(Url, u32)>,
    /// Normalized URLs already scheduled.
    visited: HashSet<String>,
    /// Source URLs already in the corpus (redirects can converge).
    recorded: HashSet<String>,
    fetched: usize,
    skipped: usize,
    errors: Vec<(String, String)>,
    budget_exhausted: bool,
}

// ---------------------------------------------------------------------------
// Scope checking
// ---------------------------------------------------------------------------

/// Determines which links may be followed.
struct CrawlScope {
    /// Trusted hostnames (lowercase).
    allowed_hosts: HashSet<String>,
    /// Path patterns that are never followed.
    exclude_patterns: Vec<regex::Regex>,
}

impl CrawlScope {
    fn new(config: &CrawlConfig) -> Self {
        let allowed_hosts = config
            .allowed_domains
            .iter()
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|p| glob_to_regex(p))
            .collect();

        Self {
            allowed_hosts,
            exclude_patterns,
        }
    }

    fn in_scope(&self, url: &Url) -> bool {
        // Must be http/https
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        if !self.allowed_hosts.contains(&host) {
            return false;
        }

        let path = url.path();
        !self.exclude_patterns.iter().any(|p| p.is_match(path))
    }
}

/// Convert a glob-like pattern to a regex.
fn glob_to_regex(pattern: &str) -> Option<regex::Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", ".");
    regex::Regex::new(&format!("^{escaped}$")).ok()
}

/// Follow a redirect only when it stays in scope or on the host that was
/// requested; anything else ends the fetch with the 3xx response.
fn redirect_policy(scope: Arc<CrawlScope>) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let same_host = attempt
            .previous()
            .first()
            .is_some_and(|origin| origin.host_str() == attempt.url().host_str());
        if same_host || scope.in_scope(attempt.url()) {
            attempt.follow()
        } else {
            debug!(target_url = %attempt.url(), "redirect leaves the allow-list, not followed");
            attempt.stop()
        }
    })
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

async fn fetch_page_owned(client: Client, extractor: Arc<Extractor>, url: Url) -> Result<PageOutcome> {
    fetch_page(&client, extractor, url).await
}

/// Fetch a single page, extract its article and links.
async fn fetch_page(client: &Client, extractor: Arc<Extractor>, url: Url) -> Result<PageOutcome> {
    debug!(%url, "fetching page");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| TopicPressError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TopicPressError::Network(format!("{url}: HTTP {status}")));
    }

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|ct| ct.contains("html"));
    if !is_html {
        return Err(TopicPressError::parse(format!("{url}: not an HTML page")));
    }

    let final_url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| TopicPressError::Network(format!("{url}: body read failed: {e}")))?;

    let doc = Html::parse_document(&body);
    let record = extractor.extract_document(&doc, &final_url);
    let links = extract_links(&doc, &final_url);

    Ok(PageOutcome {
        url: final_url,
        record,
        links,
    })
}

/// Extract all links from a document, resolved against the base URL.
fn extract_links(doc: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(link_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        if let Some(href) = el.value().attr("href") {
            // Skip anchors, javascript:, mailto:
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
            {
                continue;
            }

            // Resolve relative URLs
            if let Ok(mut resolved) = base_url.join(href) {
                resolved.set_fragment(None);
                links.push(resolved);
            }
        }
    }

    links
}

/// Normalize a URL for deduplication (strip fragment and trailing slash).
fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let mut s = normalized.to_string();
    // Remove trailing slash for consistency (except root path)
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}
