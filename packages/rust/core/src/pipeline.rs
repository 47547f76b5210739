//! End-to-end `generate` pipeline: topic → crawl → synthesize → save.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use topicpress_crawler::{CrawlReport, Crawler};
use topicpress_images::image_source;
use topicpress_shared::{AppConfig, CrawlConfig, Document, ImageConfig, Result, TopicPressError};
use topicpress_storage::Store;

use crate::generator::generator_from_config;
use crate::synthesizer::Synthesizer;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the crawl has produced its corpus.
    fn crawled(&self, report: &CrawlReport);
    /// Called when the document has been saved.
    fn done(&self, doc: &Document);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn crawled(&self, _report: &CrawlReport) {}
    fn done(&self, _doc: &Document) {}
}

/// One crawler, synthesizer and store wired together.
pub struct Pipeline {
    crawler: Crawler,
    synthesizer: Synthesizer,
    store: Arc<Store>,
    deadline: Duration,
}

impl Pipeline {
    pub fn new(
        crawler: Crawler,
        synthesizer: Synthesizer,
        store: Arc<Store>,
        deadline: Duration,
    ) -> Self {
        Self {
            crawler,
            synthesizer,
            store,
            deadline,
        }
    }

    /// Build every component from the application config.
    pub fn from_config(config: &AppConfig, store: Arc<Store>) -> Result<Self> {
        let crawler = Crawler::new(CrawlConfig::from(config))?;
        let images = image_source(&ImageConfig::from(config))?;
        let generator = generator_from_config(&config.generator)?;
        let synthesizer = Synthesizer::new(generator, images, config.generator.author.clone());

        Ok(Self::new(
            crawler,
            synthesizer,
            store,
            Duration::from_secs(config.server.pipeline_deadline_secs),
        ))
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub async fn generate(&self, topic: &str) -> Result<Document> {
        self.generate_with_progress(topic, &SilentProgress).await
    }

    /// Run the full pipeline for `topic`.
    ///
    /// 1. Crawl the topic into a corpus
    /// 2. Synthesize a document from it
    /// 3. Save the document
    ///
    /// Steps 1 and 2 share one deadline; when it expires the in-flight work is
    /// dropped and nothing is saved.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn generate_with_progress(
        &self,
        topic: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Document> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(TopicPressError::validation("topic must not be empty"));
        }

        let start = Instant::now();
        info!("starting generate pipeline");

        let produce = async {
            progress.phase("Crawling sources");
            let (corpus, report) = self.crawler.crawl_with_report(topic).await;
            progress.crawled(&report);

            if corpus.is_empty() {
                return Err(TopicPressError::not_found(format!("content for '{topic}'")));
            }

            progress.phase("Writing article");
            self.synthesizer.synthesize(topic, &corpus).await
        };

        let doc = match tokio::time::timeout(self.deadline, produce).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(deadline_secs = self.deadline.as_secs(), "generation deadline exceeded");
                return Err(TopicPressError::Timeout(format!(
                    "generating '{topic}' took longer than {}s",
                    self.deadline.as_secs()
                )));
            }
        };

        progress.phase("Saving");
        self.store.save(&doc).await?;
        progress.done(&doc);

        info!(
            id = %doc.id,
            title = %doc.title,
            elapsed_ms = start.elapsed().as_millis(),
            "generate pipeline completed"
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use topicpress_images::StaticImages;
    use topicpress_shared::{ContentRecord, DEFAULT_IMAGE_URL, StorageBackend, StorageConfig};
    use uuid::Uuid;

    use crate::generator::{ContentGenerator, Draft};
    use crate::template::TemplateGenerator;

    fn offline_crawl(min_records: usize) -> CrawlConfig {
        CrawlConfig {
            search_url: "http://127.0.0.1:1/search".into(),
            fallback_base_url: "http://127.0.0.1:1/wiki/".into(),
            allowed_domains: vec!["127.0.0.1".into()],
            min_records,
            request_timeout: Duration::from_secs(2),
            crawl_budget: Duration::from_secs(10),
            ..CrawlConfig::default()
        }
    }

    async fn temp_store() -> Arc<Store> {
        let config = StorageConfig {
            backend: StorageBackend::Files,
            path: std::env::temp_dir().join(format!("tp_test_{}", Uuid::now_v7())),
        };
        Arc::new(Store::open(&config).await.expect("open store"))
    }

    async fn pipeline(
        min_records: usize,
        generator: Arc<dyn ContentGenerator>,
        deadline: Duration,
    ) -> Pipeline {
        let crawler = Crawler::new(offline_crawl(min_records)).unwrap();
        let synth = Synthesizer::new(
            generator,
            Arc::new(StaticImages::default()),
            "AI Content Generator",
        );
        Pipeline::new(crawler, synth, temp_store().await, deadline)
    }

    struct SlowGenerator;

    #[async_trait]
    impl ContentGenerator for SlowGenerator {
        fn name(&self) -> &'static str {
            "slow"
        }
        async fn draft(&self, _topic: &str, _corpus: &[ContentRecord]) -> Result<Draft> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(TopicPressError::Generation("unreachable".into()))
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn crawled(&self, _report: &CrawlReport) {}
        fn done(&self, _doc: &Document) {
            self.phases.lock().unwrap().push("done".into());
        }
    }

    #[tokio::test]
    async fn offline_generation_is_saved() {
        let pipeline = pipeline(2, Arc::new(TemplateGenerator), Duration::from_secs(60)).await;
        let progress = RecordingProgress::default();

        let doc = pipeline
            .generate_with_progress("  Renewable Energy ", &progress)
            .await
            .expect("generate");

        assert_eq!(doc.topic, "Renewable Energy");
        assert_eq!(doc.tags, vec!["Renewable Energy", "News", "Analysis"]);
        assert_eq!(doc.featured_image, DEFAULT_IMAGE_URL);

        let stored = pipeline.store().get(&doc.id.to_string()).await.expect("stored");
        assert_eq!(stored, doc);
        assert_eq!(
            progress.phases.lock().unwrap().as_slice(),
            ["Crawling sources", "Writing article", "Saving", "done"]
        );
    }

    #[tokio::test]
    async fn blank_topic_rejected() {
        let pipeline = pipeline(2, Arc::new(TemplateGenerator), Duration::from_secs(60)).await;
        let err = pipeline.generate("   ").await.unwrap_err();
        assert!(matches!(err, TopicPressError::Validation { .. }));
    }

    #[tokio::test]
    async fn empty_corpus_is_not_found_and_nothing_saved() {
        let pipeline = pipeline(0, Arc::new(TemplateGenerator), Duration::from_secs(60)).await;
        let err = pipeline.generate("Tides").await.unwrap_err();
        assert!(matches!(err, TopicPressError::NotFound { .. }));
        assert!(pipeline.store().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deadline_expiry_saves_nothing() {
        let pipeline = pipeline(2, Arc::new(SlowGenerator), Duration::from_millis(500)).await;
        let err = pipeline.generate("Tides").await.unwrap_err();
        assert!(matches!(err, TopicPressError::Timeout(_)));
        assert!(pipeline.store().list().await.unwrap().is_empty());
    }
}
