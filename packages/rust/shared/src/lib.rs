//! Shared types, error model, and configuration for TopicPress.
//!
//! This crate is the foundation depended on by all other TopicPress crates.
//! It provides:
//! - [`TopicPressError`]: the unified error type
//! - Domain types ([`ContentRecord`], [`ContentBlock`], [`Document`], [`DocumentId`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], [`ImageConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSettings, DEFAULT_IMAGE_URL, GeneratorConfig, GeneratorMode,
    ImageConfig, ImageSettings, ServerConfig, StorageBackend, StorageConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, TopicPressError};
pub use types::{
    ContentBlock, ContentRecord, Corpus, Document, DocumentId, MAX_HEADING_LEVEL, MIN_BODY_CHARS,
};
