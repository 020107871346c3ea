//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FinscanError, Result};

/// Main configuration for finscan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinscanConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Alias store configuration.
    pub alias: AliasConfig,

    /// Rename planning configuration.
    pub rename: RenameConfig,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum similarity (0.0 - 1.0) for a fuzzy company match.
    pub fuzzy_threshold: f32,

    /// Read ambiguous numeric dates as DD/MM/YYYY instead of MM/DD/YYYY.
    pub day_first: bool,

    /// Number of tokens on each side of a value searched for a label.
    pub label_window: usize,

    /// Number of leading lines scanned for company name candidates (0 = all).
    pub company_scan_lines: usize,

    /// Ranked label keywords used to classify amount candidates.
    pub amount_labels: Vec<LabelWeight>,

    /// Score for an amount with no recognized label.
    pub unlabeled_amount_score: u32,

    /// OCR character confusions corrected by the normalizer.
    pub confusion: ConfusionTable,

    /// Per-field weights for the overall confidence.
    pub weights: FieldWeights,

    /// Overall confidence tier thresholds.
    pub tiers: TierThresholds,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.8,
            day_first: false,
            label_window: 5,
            company_scan_lines: 20,
            amount_labels: default_amount_labels(),
            unlabeled_amount_score: 5,
            confusion: ConfusionTable::default(),
            weights: FieldWeights::default(),
            tiers: TierThresholds::default(),
        }
    }
}

/// A label keyword (one or more words) and its rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelWeight {
    pub label: String,
    pub weight: u32,
}

impl LabelWeight {
    pub fn new(label: impl Into<String>, weight: u32) -> Self {
        Self {
            label: label.into(),
            weight,
        }
    }
}

fn default_amount_labels() -> Vec<LabelWeight> {
    [
        ("total due", 100),
        ("amount due", 100),
        ("balance due", 100),
        ("grand total", 100),
        ("total", 90),
        ("new balance", 90),
        ("balance", 70),
        ("subtotal", 30),
        ("sub total", 30),
        ("tax", 10),
        ("gst", 10),
        ("hst", 10),
        ("pst", 10),
        ("qst", 10),
        ("vat", 10),
    ]
    .into_iter()
    .map(|(label, weight)| LabelWeight::new(label, weight))
    .collect()
}

/// A letter that OCR engines commonly emit in place of a digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confusion {
    pub letter: char,
    pub digit: char,
}

/// Explicit table of letter/digit confusions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfusionTable {
    pub pairs: Vec<Confusion>,
}

impl ConfusionTable {
    /// Digit a confusable letter stands for.
    pub fn digit_for(&self, letter: char) -> Option<char> {
        self.pairs.iter().find(|p| p.letter == letter).map(|p| p.digit)
    }

    /// Letters (lowercase) a digit may have been misread from.
    pub fn letters_for(&self, digit: char) -> impl Iterator<Item = char> + '_ {
        self.pairs
            .iter()
            .filter(move |p| p.digit == digit && p.letter.is_alphabetic())
            .map(|p| p.letter.to_ascii_lowercase())
    }
}

impl Default for ConfusionTable {
    fn default() -> Self {
        let pairs = [
            ('O', '0'),
            ('o', '0'),
            ('I', '1'),
            ('l', '1'),
            ('|', '1'),
            ('S', '5'),
            ('B', '8'),
            ('Z', '2'),
        ]
        .into_iter()
        .map(|(letter, digit)| Confusion { letter, digit })
        .collect();

        Self { pairs }
    }
}

/// Weights of each field in the overall confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub company: f32,
    pub total: f32,
    pub date: f32,
    pub identifier: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            company: 0.3,
            total: 0.35,
            date: 0.2,
            identifier: 0.15,
        }
    }
}

impl FieldWeights {
    pub fn sum(&self) -> f32 {
        self.company + self.total + self.date + self.identifier
    }
}

/// Lower bounds of the high and medium confidence tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub high: f32,
    pub medium: f32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.5,
        }
    }
}

/// Alias store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    /// Path of the persisted alias store. The CLI picks a default under the
    /// user config directory when unset.
    pub store_path: Option<PathBuf>,
}

/// Rename planning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    /// Naming template, e.g. `{company}_{date}_{total}`.
    pub template: String,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            template: "{company}_{date}_{total}".to_string(),
        }
    }
}

impl FinscanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let e = &self.extraction;

        if !(0.0..=1.0).contains(&e.fuzzy_threshold) {
            return Err(FinscanError::Config(format!(
                "fuzzy_threshold must be within 0.0..=1.0, got {}",
                e.fuzzy_threshold
            )));
        }

        let w = &e.weights;
        if [w.company, w.total, w.date, w.identifier].iter().any(|v| *v < 0.0) || w.sum() <= 0.0 {
            return Err(FinscanError::Config(
                "field weights must be non-negative with a positive sum".to_string(),
            ));
        }

        if e.tiers.medium > e.tiers.high {
            return Err(FinscanError::Config(format!(
                "medium tier threshold ({}) exceeds high tier threshold ({})",
                e.tiers.medium, e.tiers.high
            )));
        }

        if let Some(bad) = e.amount_labels.iter().find(|l| l.label.trim().is_empty()) {
            return Err(FinscanError::Config(format!(
                "empty amount label with weight {}",
                bad.weight
            )));
        }

        if let Some(bad) = e.confusion.pairs.iter().find(|p| !p.digit.is_ascii_digit()) {
            return Err(FinscanError::Config(format!(
                "confusion for '{}' maps to non-digit '{}'",
                bad.letter, bad.digit
            )));
        }

        if !self.rename.template.contains('{') {
            return Err(FinscanError::Config(
                "rename template contains no {tokens}".to_string(),
            ));
        }

        Ok(())
    }
}
