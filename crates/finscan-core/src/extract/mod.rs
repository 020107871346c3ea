//! Field extraction: rule-based extractors, confidence aggregation and the
//! per-document orchestrator.

pub mod confidence;
mod orchestrator;
pub mod rules;

pub use confidence::ConfidenceAggregator;
pub use orchestrator::Extractor;
pub use rules::{
    AmountCandidate, AmountExtractor, CompanyResolver, DateExtractor, ExtractionMatch,
    FieldExtractor, IdentifierExtractor,
};
