//! Overall confidence from per-field confidences.

use crate::models::config::FieldWeights;
use crate::models::record::FieldConfidences;

/// Weighted mean of field confidences.
///
/// Absent fields count as 0.0 at their full weight, so a missing field
/// always lowers the overall score.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceAggregator {
    weights: FieldWeights,
}

impl ConfidenceAggregator {
    pub fn new(weights: FieldWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &FieldWeights {
        &self.weights
    }

    /// Overall confidence in [0, 1].
    pub fn aggregate(&self, fields: &FieldConfidences) -> f32 {
        let w = &self.weights;
        let total = w.sum();
        if total <= 0.0 {
            return 0.0;
        }

        let weighted = w.company * fields.company
            + w.total * fields.total
            + w.date * fields.date
            + w.identifier * fields.identifier;

        (weighted / total).clamp(0.0, 1.0)
    }

    /// Scale an overall score by OCR quality, when the input reported any.
    pub fn with_ocr_quality(&self, score: f32, ocr_quality: Option<f32>) -> f32 {
        match ocr_quality {
            Some(quality) => (score * quality.clamp(0.0, 1.0)).clamp(0.0, 1.0),
            None => score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(value: f32) -> FieldConfidences {
        FieldConfidences {
            company: value,
            total: value,
            date: value,
            identifier: value,
        }
    }

    #[test]
    fn test_boundaries() {
        let aggregator = ConfidenceAggregator::default();
        assert_eq!(aggregator.aggregate(&all(0.0)), 0.0);
        assert!((aggregator.aggregate(&all(1.0)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_absent_field_penalized_at_full_weight() {
        let aggregator = ConfidenceAggregator::default();
        let fields = FieldConfidences {
            company: 1.0,
            total: 1.0,
            date: 1.0,
            identifier: 0.0,
        };
        assert!((aggregator.aggregate(&fields) - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_weights_are_normalized() {
        let aggregator = ConfidenceAggregator::new(FieldWeights {
            company: 2.0,
            total: 2.0,
            date: 0.0,
            identifier: 0.0,
        });
        let fields = FieldConfidences {
            company: 1.0,
            total: 0.5,
            ..Default::default()
        };
        assert!((aggregator.aggregate(&fields) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_ocr_quality_factor() {
        let aggregator = ConfidenceAggregator::default();
        assert_eq!(aggregator.with_ocr_quality(0.8, None), 0.8);
        assert!((aggregator.with_ocr_quality(0.8, Some(0.5)) - 0.4).abs() < 1e-6);
    }
}
