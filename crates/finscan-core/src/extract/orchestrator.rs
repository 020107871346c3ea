//! Per-document extraction pipeline.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::confidence::ConfidenceAggregator;
use super::rules::{AmountExtractor, CompanyResolver, DateExtractor, IdentifierExtractor};
use crate::alias::AliasStore;
use crate::models::config::{ExtractionConfig, TierThresholds};
use crate::models::document::{NormalizedText, RawDocumentText};
use crate::models::record::{ConfidenceTier, ExtractionRecord, FieldConfidences};
use crate::text::Normalizer;

/// Runs normalization, every field extractor and the aggregator over one
/// document.
///
/// Extraction is pure: the extractor holds only compiled configuration and
/// can be shared across threads.
#[derive(Debug, Clone)]
pub struct Extractor {
    config: ExtractionConfig,
    normalizer: Normalizer,
    company: CompanyResolver,
    amounts: AmountExtractor,
    dates: DateExtractor,
    identifier: IdentifierExtractor,
    aggregator: ConfidenceAggregator,
    tiers: TierThresholds,
}

impl Extractor {
    /// Create an extractor with default settings.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            config: config.clone(),
            normalizer: Normalizer::new(config.confusion.clone()),
            company: CompanyResolver::from_config(config),
            amounts: AmountExtractor::from_config(config),
            dates: DateExtractor::from_config(config),
            identifier: IdentifierExtractor::new(),
            aggregator: ConfidenceAggregator::new(config.weights),
            tiers: config.tiers,
        }
    }

    /// Set the date order used for ambiguous numeric dates.
    pub fn with_day_first(mut self, day_first: bool) -> Self {
        self.config.day_first = day_first;
        self.dates = DateExtractor::from_config(&self.config);
        self
    }

    /// Set the fuzzy company-match threshold.
    pub fn with_fuzzy_threshold(mut self, threshold: f32) -> Self {
        self.config.fuzzy_threshold = threshold;
        self.company = CompanyResolver::from_config(&self.config);
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn tiers(&self) -> &TierThresholds {
        &self.tiers
    }

    /// Normalize and extract. Never fails: unusable text yields an
    /// all-absent record with confidence 0.0.
    pub fn extract(&self, raw: &RawDocumentText, store: &AliasStore) -> ExtractionRecord {
        let text = self.normalizer.normalize(raw);
        self.extract_normalized(&text, store)
    }

    /// Extract from already-normalized text.
    pub fn extract_normalized(
        &self,
        text: &NormalizedText,
        store: &AliasStore,
    ) -> ExtractionRecord {
        let start = Instant::now();
        info!(
            "Extracting fields from {} lines ({} characters)",
            text.lines().len(),
            text.text().len()
        );

        let company = self.company.resolve(text, store);
        let total = self.amounts.extract_total(text);
        let date = self.dates.extract_date(text);
        let identifier = self.identifier.extract_identifier(text);

        let fields = FieldConfidences {
            company: company.confidence(),
            total: total.confidence(),
            date: date.confidence(),
            identifier: identifier.confidence(),
        };
        let weighted = self.aggregator.aggregate(&fields);
        let confidence = self.aggregator.with_ocr_quality(weighted, text.ocr_quality());

        debug!(
            "Field confidences {:?}, weighted {:.3}, overall {:.3}",
            fields, weighted, confidence
        );

        let record = ExtractionRecord::assemble(
            company,
            total,
            date,
            identifier,
            confidence,
            Arc::from(text.text()),
        );

        info!(
            "Extraction finished in {} ms: confidence {:.2} ({}), {} warnings",
            start.elapsed().as_millis(),
            record.confidence(),
            ConfidenceTier::from_score(record.confidence(), &self.tiers).as_str(),
            record.warnings().len()
        );

        record
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
