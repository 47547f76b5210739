//! Built-in article template.
//!
//! Produces a fixed skeleton around the topic, filled with up to three
//! paragraphs of the first corpus record. Image blocks carry an empty URL;
//! the synthesizer assigns real images afterwards.

use async_trait::async_trait;

use topicpress_shared::{ContentBlock, ContentRecord, Result};

use crate::generator::{ContentGenerator, Draft};

/// Corpus paragraphs copied into the "Current State" section.
const MAX_CORPUS_PARAGRAPHS: usize = 3;

pub fn template_title(topic: &str) -> String {
    format!("Comprehensive Guide to {topic}: Latest Insights and Developments")
}

pub fn template_summary(topic: &str) -> String {
    format!(
        "An in-depth look at {topic}, examining the latest developments, key insights, \
         and future implications based on the most current information available."
    )
}

pub fn template_tags(topic: &str) -> Vec<String> {
    vec![topic.to_string(), "News".into(), "Analysis".into()]
}

/// Build the template draft for `topic` from `corpus`.
pub fn template_draft(topic: &str, corpus: &[ContentRecord]) -> Draft {
    let mut content = vec![
        ContentBlock::heading(1, format!("Understanding {topic}: A Comprehensive Overview")),
        ContentBlock::paragraph(format!(
            "In recent times, {topic} has become an increasingly important topic in global \
             discourse. This article aims to provide a thorough analysis based on the latest \
             information available from reliable sources."
        )),
        ContentBlock::Image {
            url: String::new(),
            alt: format!("Illustration of {topic}"),
            caption: format!("Visual representation of key aspects related to {topic}"),
        },
        ContentBlock::heading(2, "Current State and Recent Developments"),
    ];

    if let Some(first) = corpus.first() {
        content.extend(
            first
                .paragraphs()
                .take(MAX_CORPUS_PARAGRAPHS)
                .map(ContentBlock::paragraph),
        );
    }

    content.extend([
        ContentBlock::heading(2, "Key Factors and Analysis"),
        ContentBlock::paragraph(format!(
            "Several key factors influence the current state of {topic}. Understanding these \
             elements is crucial for a comprehensive perspective."
        )),
        ContentBlock::List {
            items: vec![
                format!("Economic implications of {topic} on global markets"),
                format!("Social and cultural impact of {topic} on communities"),
                format!("Technological advancements related to {topic}"),
                format!("Regulatory frameworks surrounding {topic}"),
            ],
            ordered: false,
        },
        ContentBlock::Image {
            url: String::new(),
            alt: format!("Impact of {topic}"),
            caption: format!("Visualizing the multifaceted impact of {topic}"),
        },
        ContentBlock::heading(2, "Expert Opinions and Insights"),
        ContentBlock::Quote {
            text: format!(
                "The development of {topic} represents one of the most significant shifts in \
                 this field that we've seen in the past decade."
            ),
            citation: "Industry Expert".into(),
        },
    ]);

    Draft {
        title: template_title(topic),
        summary: template_summary(topic),
        content,
        tags: template_tags(topic),
    }
}

/// Deterministic, offline generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn draft(&self, topic: &str, corpus: &[ContentRecord]) -> Result<Draft> {
        Ok(template_draft(topic, corpus))
    }
}
