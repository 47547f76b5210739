//! Content generation strategies.
//!
//! A [`ContentGenerator`] turns a topic and its corpus into a [`Draft`]: the
//! title, summary, blocks and tags of an article before images, id, date and
//! reading time are assigned. The template strategy is built in; the bridge
//! and HTTP strategies delegate to an external provider speaking the
//! `{topic, contents}` → `{title, content, featuredImage, tags, summary}`
//! JSON protocol.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use topicpress_shared::{
    ContentBlock, ContentRecord, GeneratorConfig, GeneratorMode, Result, TopicPressError,
};

use crate::bridge::BridgeGenerator;
use crate::remote::HttpGenerator;
use crate::template::{TemplateGenerator, template_summary, template_tags, template_title};

/// Generated article body, prior to image assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub summary: String,
    pub content: Vec<ContentBlock>,
    pub tags: Vec<String>,
}

/// A strategy for drafting article content.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    async fn draft(&self, topic: &str, corpus: &[ContentRecord]) -> Result<Draft>;
}

/// Build the generator selected by `config.mode`.
pub fn generator_from_config(config: &GeneratorConfig) -> Result<Arc<dyn ContentGenerator>> {
    Ok(match config.mode {
        GeneratorMode::Template => Arc::new(TemplateGenerator),
        GeneratorMode::Bridge => Arc::new(BridgeGenerator::from_config(config)),
        GeneratorMode::Http => Arc::new(HttpGenerator::from_config(config)?),
    })
}

// ---------------------------------------------------------------------------
// External provider protocol
// ---------------------------------------------------------------------------

/// Request sent to an external provider.
#[derive(Debug, Serialize)]
pub(crate) struct GenerationRequest<'a> {
    pub topic: &'a str,
    pub contents: &'a [ContentRecord],
}

/// Response from an external provider. Blocks are kept as raw JSON so each
/// one can be validated on its own.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationResponse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
    /// Ignored: featured images always come from the image resolver.
    #[serde(default)]
    #[allow(dead_code)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

impl GenerationResponse {
    /// Validate the provider output into a draft.
    ///
    /// Invalid blocks are dropped one by one; blank title, summary or tags
    /// fall back to the template values. A response with no valid block is
    /// a generation error.
    pub(crate) fn into_draft(self, topic: &str) -> Result<Draft> {
        let received = self.content.len();
        let content: Vec<ContentBlock> = self
            .content
            .into_iter()
            .enumerate()
            .filter_map(|(i, raw)| match parse_block(raw) {
                Ok(block) => Some(block),
                Err(e) => {
                    warn!(index = i, error = %e, "dropping invalid block from provider");
                    None
                }
            })
            .collect();

        if content.is_empty() {
            return Err(TopicPressError::Generation(format!(
                "provider returned no valid content blocks ({received} received)"
            )));
        }
        debug!(received, kept = content.len(), "provider blocks validated");

        let title = non_blank(self.title).unwrap_or_else(|| template_title(topic));
        let summary = non_blank(self.summary).unwrap_or_else(|| template_summary(topic));
        let tags: Vec<String> = self
            .tags
            .into_iter()
            .filter_map(non_blank)
            .collect();
        let tags = if tags.is_empty() {
            template_tags(topic)
        } else {
            tags
        };

        Ok(Draft {
            title,
            summary,
            content,
            tags,
        })
    }
}

fn parse_block(raw: serde_json::Value) -> Result<ContentBlock> {
    let block: ContentBlock =
        serde_json::from_value(raw).map_err(|e| TopicPressError::validation(e.to_string()))?;
    block.validate()?;
    let blank_text = match &block {
        ContentBlock::Heading { text, .. }
        | ContentBlock::Paragraph { text }
        | ContentBlock::Quote { text, .. } => text.trim().is_empty(),
        _ => false,
    };
    if blank_text {
        return Err(TopicPressError::validation("block has no text"));
    }
    Ok(block)
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> GenerationResponse {
        serde_json::from_value(value).expect("response shape")
    }

    #[test]
    fn invalid_blocks_are_dropped_individually() {
        let resp = response(json!({
            "title": "Tidal power explained",
            "summary": "Short summary.",
            "tags": ["Tides", "Energy"],
            "featuredImage": "https://ignored.example/x.jpg",
            "content": [
                {"type": "heading", "level": 1, "text": "Intro"},
                {"type": "heading", "level": 9, "text": "Too deep"},
                {"type": "video", "src": "clip.mp4"},
                {"type": "paragraph"},
                {"type": "paragraph", "text": "   "},
                {"type": "list", "items": []},
                {"type": "list", "items": ["a", "b"], "ordered": true},
                {"type": "image", "url": "https://img.example/1.jpg"}
            ]
        }));

        let draft = resp.into_draft("Tides").expect("draft");
        assert_eq!(draft.title, "Tidal power explained");
        assert_eq!(draft.tags, vec!["Tides", "Energy"]);
        assert_eq!(draft.content.len(), 3);
        assert_eq!(draft.content[0], ContentBlock::heading(1, "Intro"));
        assert!(matches!(draft.content[1], ContentBlock::List { ordered: true, .. }));
        assert!(matches!(&draft.content[2], ContentBlock::Image { alt, .. } if alt.is_empty()));
    }

    #[test]
    fn blank_fields_fall_back_to_template() {
        let resp = response(json!({
            "title": "  ",
            "content": [{"type": "paragraph", "text": "Only paragraph."}]
        }));
        let draft = resp.into_draft("Tides").expect("draft");
        assert_eq!(draft.title, template_title("Tides"));
        assert_eq!(draft.summary, template_summary("Tides"));
        assert_eq!(draft.tags, template_tags("Tides"));
    }

    #[test]
    fn no_valid_blocks_is_an_error() {
        let resp = response(json!({
            "title": "Empty",
            "content": [{"type": "heading", "level": 0, "text": "x"}]
        }));
        let err = resp.into_draft("Tides").unwrap_err();
        assert!(matches!(err, TopicPressError::Generation(_)));

        let resp = response(json!({"title": "Nothing"}));
        assert!(resp.into_draft("Tides").is_err());
    }

    #[test]
    fn request_uses_record_wire_names() {
        let contents = vec![ContentRecord {
            source_url: "https://www.bbc.com/news/1".into(),
            title: "Story".into(),
            body: "Body".into(),
            published_at: Some("today".into()),
        }];
        let req = GenerationRequest {
            topic: "Tides",
            contents: &contents,
        };
        let value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(value["topic"], "Tides");
        assert_eq!(value["contents"][0]["url"], "https://www.bbc.com/news/1");
        assert_eq!(value["contents"][0]["text"], "Body");
        assert_eq!(value["contents"][0]["publishedAt"], "today");
    }

    #[test]
    fn factory_selects_template_by_default() {
        let generator = generator_from_config(&GeneratorConfig::default()).expect("generator");
        assert_eq!(generator.name(), "template");
    }
}
