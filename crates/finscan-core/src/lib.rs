//! Core library for field extraction from scanned financial documents.
//!
//! This crate provides:
//! - OCR text normalization (whitespace, line endings, letter/digit confusions)
//! - Business-name resolution against a persisted alias store
//! - Total amount, document date and identifier extraction
//! - Confidence scoring per field and overall
//! - Collision-free file rename planning from extraction records
//!
//! OCR itself is out of scope: input is text with optional per-line
//! confidence, as produced by any OCR engine.

pub mod alias;
pub mod error;
pub mod extract;
pub mod models;
pub mod rename;
pub mod text;

pub use alias::{resolve, AliasRegistry, AliasStore};
pub use error::{FinscanError, RenameError, Result, StoreError};
pub use extract::{ConfidenceAggregator, Extractor, FieldExtractor};
pub use models::{
    ConfidenceTier, ExtractionConfig, ExtractionRecord, FieldResult, FinscanConfig, NormalizedText,
    RawDocumentText, TextLine,
};
pub use rename::{apply_plan, plan_rename, Disposition, RenamePlan, RenameSession, TemplateToken};
pub use text::{normalize, Normalizer};
