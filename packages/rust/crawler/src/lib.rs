//! Topic crawler and article extraction.
//!
//! This crate provides:
//! - [`extractor`]: Readability-style article extraction from one page
//! - [`engine`]: Bounded, allow-listed BFS crawler with entry-point fallback
//! - [`backfill`]: Deterministic synthetic records for sparse corpora

pub mod backfill;
pub mod engine;
pub mod extractor;

pub use backfill::backfill;
pub use engine::{CrawlReport, Crawler, EntryPoint};
pub use extractor::{Extractor, MIN_PARAGRAPH_CHARS};
