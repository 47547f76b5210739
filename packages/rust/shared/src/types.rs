//! Core domain types: scraped records, content blocks, and documents.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TopicPressError};

/// A record's body must be strictly longer than this many characters.
pub const MIN_BODY_CHARS: usize = 100;

/// Highest heading level a [`ContentBlock::Heading`] may carry.
pub const MAX_HEADING_LEVEL: u8 = 6;

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for document identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Generate a new time-sortable document identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ContentRecord
// ---------------------------------------------------------------------------

/// One scraped (or synthesized) source unit in a corpus.
///
/// The serialized field names (`url`, `text`, `publishedAt`) are the wire
/// format external generation providers receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Page the record was extracted from. Unique within one corpus.
    #[serde(rename = "url")]
    pub source_url: String,
    pub title: String,
    /// Accepted paragraphs joined by a blank line.
    #[serde(rename = "text")]
    pub body: String,
    /// Free-form publication timestamp, never parsed.
    #[serde(
        rename = "publishedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<String>,
}

impl ContentRecord {
    /// Whether this record may enter a corpus: non-empty title and a body
    /// longer than [`MIN_BODY_CHARS`] characters.
    pub fn is_acceptable(&self) -> bool {
        !self.title.is_empty() && self.body.chars().count() > MIN_BODY_CHARS
    }

    /// Non-empty paragraphs of the body, in order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.body.split("\n\n").filter(|p| !p.is_empty())
    }
}

/// The ordered records produced by one crawl and consumed by one synthesis.
pub type Corpus = Vec<ContentRecord>;

// ---------------------------------------------------------------------------
// ContentBlock
// ---------------------------------------------------------------------------

/// One typed, renderable unit of a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    Image {
        url: String,
        #[serde(default)]
        alt: String,
        #[serde(default)]
        caption: String,
    },
    Quote {
        text: String,
        #[serde(default)]
        citation: String,
    },
    List {
        items: Vec<String>,
        #[serde(default)]
        ordered: bool,
    },
}

impl ContentBlock {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph { text: text.into() }
    }

    /// Check the per-variant invariants (heading level range, non-empty list).
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Heading { level, .. } if *level == 0 || *level > MAX_HEADING_LEVEL => {
                Err(TopicPressError::validation(format!(
                    "heading level {level} outside 1..={MAX_HEADING_LEVEL}"
                )))
            }
            Self::List { items, .. } if items.is_empty() => {
                Err(TopicPressError::validation("list block has no items"))
            }
            _ => Ok(()),
        }
    }

    /// Text counted toward reading time: headings and paragraphs only.
    pub fn prose(&self) -> Option<&str> {
        match self {
            Self::Heading { text, .. } | Self::Paragraph { text } => Some(text),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The persisted unit: a finished, typed article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Storage key, assigned once at synthesis time.
    pub id: DocumentId,
    pub title: String,
    pub author: String,
    /// Creation date (`YYYY-MM-DD`).
    pub date: NaiveDate,
    pub summary: String,
    /// Blocks in render order.
    pub content: Vec<ContentBlock>,
    pub featured_image: String,
    pub tags: Vec<String>,
    /// Derived minutes, never user supplied.
    pub reading_time: u32,
    /// The topic of the originating request.
    pub topic: String,
}
