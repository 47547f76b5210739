//! Corpus → Document synthesis.
//!
//! Given a topic, its corpus, an image source and a generation strategy, the
//! synthesizer assembles a complete [`Document`]: a fresh id, a draft from the
//! generator, resolved images, de-duplicated tags and a derived reading time.
//! Apart from the id, the output depends only on its inputs and the date.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use topicpress_images::ImageSource;
use topicpress_shared::{ContentBlock, ContentRecord, Document, DocumentId, Result};

use crate::generator::{ContentGenerator, Draft};

/// Reading speed used for the reading time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// Builds documents from corpora.
pub struct Synthesizer {
    generator: Arc<dyn ContentGenerator>,
    images: Arc<dyn ImageSource>,
    author: String,
}

impl Synthesizer {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        images: Arc<dyn ImageSource>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            images,
            author: author.into(),
        }
    }

    /// Synthesize a document dated today (UTC).
    pub async fn synthesize(&self, topic: &str, corpus: &[ContentRecord]) -> Result<Document> {
        self.synthesize_on(topic, corpus, Utc::now().date_naive()).await
    }

    /// Synthesize a document with an explicit creation date.
    #[instrument(skip_all, fields(topic = %topic, records = corpus.len(), generator = self.generator.name()))]
    pub async fn synthesize_on(
        &self,
        topic: &str,
        corpus: &[ContentRecord],
        date: NaiveDate,
    ) -> Result<Document> {
        let id = DocumentId::new();

        let featured = self.images.resolve(topic).await;
        let overview = self.images.resolve(&format!("{topic} overview")).await;
        let detail = self.images.resolve(&format!("{topic} detail")).await;

        let Draft {
            title,
            summary,
            mut content,
            tags,
        } = self.generator.draft(topic, corpus).await?;

        assign_images(&mut content, &overview, &detail);
        let reading_time = reading_time(&content);

        let doc = Document {
            id,
            title,
            author: self.author.clone(),
            date,
            summary,
            content,
            featured_image: featured,
            tags: dedup_tags(tags),
            reading_time,
            topic: topic.to_string(),
        };

        info!(
            %id,
            blocks = doc.content.len(),
            reading_time = doc.reading_time,
            "document synthesized"
        );
        Ok(doc)
    }
}

/// Give image blocks `overview`, `detail`, `overview`, ... in order.
fn assign_images(content: &mut [ContentBlock], overview: &str, detail: &str) {
    let cycle = [overview, detail];
    for (i, url) in content
        .iter_mut()
        .filter_map(|block| match block {
            ContentBlock::Image { url, .. } => Some(url),
            _ => None,
        })
        .enumerate()
    {
        *url = cycle[i % cycle.len()].to_string();
    }
}

/// Remove repeated tags, keeping the first occurrence.
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// `floor(words / 200) + 1`, counting words in headings and paragraphs only.
pub fn reading_time(content: &[ContentBlock]) -> u32 {
    let words: usize = content
        .iter()
        .filter_map(ContentBlock::prose)
        .map(|text| text.split_whitespace().count())
        .sum();
    u32::try_from(words / WORDS_PER_MINUTE + 1).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateGenerator;
    use async_trait::async_trait;
    use topicpress_images::StaticImages;
    use topicpress_shared::{DEFAULT_IMAGE_URL, TopicPressError};

    /// Returns `<query>.jpg` so tests can see which query produced which image.
    struct EchoImages;

    #[async_trait]
    impl ImageSource for EchoImages {
        async fn resolve(&self, query: &str) -> String {
            format!("https://img.test/{}.jpg", query.replace(' ', "-"))
        }
    }

    struct FixedDraft(Draft);

    #[async_trait]
    impl ContentGenerator for FixedDraft {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn draft(&self, _topic: &str, _corpus: &[ContentRecord]) -> Result<Draft> {
            Ok(self.0.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ContentGenerator for FailingGenerator {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn draft(&self, _topic: &str, _corpus: &[ContentRecord]) -> Result<Draft> {
            Err(TopicPressError::Generation("provider offline".into()))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn template_synth(images: Arc<dyn ImageSource>) -> Synthesizer {
        Synthesizer::new(Arc::new(TemplateGenerator), images, "AI Content Generator")
    }

    #[test]
    fn reading_time_boundaries() {
        let at = |n: usize| reading_time(&[ContentBlock::paragraph(words(n))]);
        assert_eq!(at(0), 1);
        assert_eq!(at(199), 1);
        assert_eq!(at(200), 2);
        assert_eq!(at(399), 2);
        assert_eq!(at(400), 3);
    }

    #[test]
    fn reading_time_ignores_non_prose() {
        let content = vec![
            ContentBlock::heading(1, words(100)),
            ContentBlock::paragraph(words(99)),
            ContentBlock::Quote {
                text: words(500),
                citation: String::new(),
            },
            ContentBlock::List {
                items: vec![words(500)],
                ordered: false,
            },
        ];
        assert_eq!(reading_time(&content), 1);
    }

    #[test]
    fn tags_deduplicated_in_order() {
        let tags = vec!["News".into(), "Tides".into(), "News".into(), "Analysis".into()];
        assert_eq!(dedup_tags(tags), vec!["News", "Tides", "Analysis"]);
    }

    #[tokio::test]
    async fn images_alternate_overview_and_detail() {
        let image = |_: usize| ContentBlock::Image {
            url: "placeholder".into(),
            alt: String::new(),
            caption: String::new(),
        };
        let draft = Draft {
            title: "T".into(),
            summary: "S".into(),
            content: vec![image(0), ContentBlock::paragraph("p"), image(1), image(2)],
            tags: vec!["Tides".into(), "Tides".into()],
        };
        let synth = Synthesizer::new(Arc::new(FixedDraft(draft)), Arc::new(EchoImages), "A");
        let doc = synth.synthesize_on("Tides", &[], date()).await.unwrap();

        let urls: Vec<_> = doc
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Image { url, .. } => Some(url.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://img.test/Tides-overview.jpg",
                "https://img.test/Tides-detail.jpg",
                "https://img.test/Tides-overview.jpg",
            ]
        );
        assert_eq!(doc.featured_image, "https://img.test/Tides.jpg");
        assert_eq!(doc.tags, vec!["Tides"]);
    }

    #[tokio::test]
    async fn deterministic_except_for_id() {
        let corpus = vec![ContentRecord {
            source_url: "https://www.bbc.com/news/1".into(),
            title: "Story".into(),
            body: format!("{}\n\n{}", words(150), words(120)),
            published_at: None,
        }];
        let synth = template_synth(Arc::new(EchoImages));

        let a = synth.synthesize_on("Tides", &corpus, date()).await.unwrap();
        let b = synth.synthesize_on("Tides", &corpus, date()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(Document { id: a.id, ..b.clone() }, a);
        assert_eq!(a.date, date());
        assert_eq!(a.author, "AI Content Generator");
        assert_eq!(a.reading_time, reading_time(&a.content));
    }

    #[tokio::test]
    async fn empty_corpus_still_synthesizes() {
        let synth = template_synth(Arc::new(StaticImages::default()));
        let doc = synth.synthesize_on("Tides", &[], date()).await.unwrap();
        assert!(!doc.content.is_empty());
        assert_eq!(doc.featured_image, DEFAULT_IMAGE_URL);
        assert_eq!(doc.topic, "Tides");
    }

    #[tokio::test]
    async fn generator_failure_propagates() {
        let synth = Synthesizer::new(
            Arc::new(FailingGenerator),
            Arc::new(StaticImages::default()),
            "A",
        );
        let err = synth.synthesize_on("Tides", &[], date()).await.unwrap_err();
        assert!(matches!(err, TopicPressError::Generation(_)));
    }

    #[tokio::test]
    async fn renewable_energy_offline_scenario() {
        let mut corpus = Vec::new();
        topicpress_crawler::backfill(&mut corpus, "Renewable Energy", 2, date());
        let synth = template_synth(Arc::new(StaticImages::default()));

        let doc = synth
            .synthesize_on("Renewable Energy", &corpus, date())
            .await
            .unwrap();

        assert_eq!(doc.tags, vec!["Renewable Energy", "News", "Analysis"]);
        assert_eq!(doc.featured_image, DEFAULT_IMAGE_URL);
        let first: Vec<&str> = corpus[0].paragraphs().collect();
        assert_eq!(first.len(), 2);
        for paragraph in first {
            assert!(doc.content.contains(&ContentBlock::paragraph(paragraph)));
        }
    }
}
