//! Structured extraction output.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::config::TierThresholds;

/// Outcome of extracting one field.
///
/// Absence is the common case for noisy scans, so it is a variant rather
/// than an error. An absent field always reports confidence 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldResult<T> {
    Present {
        value: T,
        confidence: f32,
        /// Raw text span the value was read from.
        evidence: String,
    },
    Absent {
        /// Best candidate text that failed to produce a value, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        evidence: Option<String>,
    },
}

impl<T> FieldResult<T> {
    pub fn present(value: T, confidence: f32, evidence: impl Into<String>) -> Self {
        FieldResult::Present {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            evidence: evidence.into(),
        }
    }

    pub fn absent() -> Self {
        FieldResult::Absent { evidence: None }
    }

    pub fn absent_with_evidence(evidence: impl Into<String>) -> Self {
        FieldResult::Absent {
            evidence: Some(evidence.into()),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FieldResult::Present { value, .. } => Some(value),
            FieldResult::Absent { .. } => None,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            FieldResult::Present { confidence, .. } => *confidence,
            FieldResult::Absent { .. } => 0.0,
        }
    }

    pub fn evidence(&self) -> Option<&str> {
        match self {
            FieldResult::Present { evidence, .. } => Some(evidence),
            FieldResult::Absent { evidence } => evidence.as_deref(),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, FieldResult::Present { .. })
    }

    pub fn is_absent(&self) -> bool {
        !self.is_present()
    }
}

/// Named per-field confidences, the aggregator's input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldConfidences {
    pub company: f32,
    pub total: f32,
    pub date: f32,
    pub identifier: f32,
}

/// Three-tier quality indicator derived from the overall confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_score(score: f32, thresholds: &TierThresholds) -> Self {
        if score >= thresholds.high {
            ConfidenceTier::High
        } else if score >= thresholds.medium {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }
}

/// Structured, confidence-scored output for one document.
///
/// Built by the orchestrator; the overall confidence is derived from the
/// field results at construction and cannot be set independently.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRecord {
    company: FieldResult<String>,
    total: FieldResult<Decimal>,
    date: FieldResult<NaiveDate>,
    identifier: FieldResult<String>,
    confidence: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip)]
    source: Arc<str>,
}

impl ExtractionRecord {
    pub(crate) fn assemble(
        company: FieldResult<String>,
        total: FieldResult<Decimal>,
        date: FieldResult<NaiveDate>,
        identifier: FieldResult<String>,
        confidence: f32,
        source: Arc<str>,
    ) -> Self {
        let mut warnings = Vec::new();
        if company.is_absent() {
            warnings.push("Could not resolve company name".to_string());
        }
        if total.is_absent() {
            warnings.push("Could not extract total amount".to_string());
        }
        if date.is_absent() {
            warnings.push("Could not extract document date".to_string());
        }
        if identifier.is_absent() {
            warnings.push("Could not extract document identifier".to_string());
        }

        Self {
            company,
            total,
            date,
            identifier,
            confidence: confidence.clamp(0.0, 1.0),
            warnings,
            source,
        }
    }

    pub fn company(&self) -> &FieldResult<String> {
        &self.company
    }

    pub fn total(&self) -> &FieldResult<Decimal> {
        &self.total
    }

    pub fn date(&self) -> &FieldResult<NaiveDate> {
        &self.date
    }

    pub fn identifier(&self) -> &FieldResult<String> {
        &self.identifier
    }

    /// Overall confidence (0.0 - 1.0).
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// One entry per absent field.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The normalized text the record was extracted from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn field_confidences(&self) -> FieldConfidences {
        FieldConfidences {
            company: self.company.confidence(),
            total: self.total.confidence(),
            date: self.date.confidence(),
            identifier: self.identifier.confidence(),
        }
    }

    pub fn tier(&self, thresholds: &TierThresholds) -> ConfidenceTier {
        ConfidenceTier::from_score(self.confidence, thresholds)
    }
}
