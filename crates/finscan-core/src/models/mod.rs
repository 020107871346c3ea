//! Data models shared across the pipeline.

pub mod config;
pub mod document;
pub mod record;

pub use config::{ExtractionConfig, FinscanConfig};
pub use document::{NormalizedLine, NormalizedText, RawDocumentText, TextLine};
pub use record::{ConfidenceTier, ExtractionRecord, FieldConfidences, FieldResult};
