//! Core pipeline orchestration and domain logic for TopicPress.
//!
//! This crate turns a crawled corpus into a typed [`Document`] and ties the
//! crawler, synthesizer and store together into the `generate` workflow.
//!
//! [`Document`]: topicpress_shared::Document

pub mod bridge;
pub mod generator;
pub mod pipeline;
pub mod remote;
pub mod synthesizer;
pub mod template;

pub use bridge::BridgeGenerator;
pub use generator::{ContentGenerator, Draft, generator_from_config};
pub use pipeline::{Pipeline, ProgressReporter, SilentProgress};
pub use remote::HttpGenerator;
pub use synthesizer::{Synthesizer, reading_time};
pub use template::TemplateGenerator;
