//! OCR text as handed to the extraction core.

use serde::{Deserialize, Deserializer, Serialize};

/// A single line of OCR output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Recognized text.
    pub text: String,

    /// OCR confidence for the line (0.0 - 1.0), when the engine reports one.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "clamped_confidence"
    )]
    pub confidence: Option<f32>,
}

/// Engines disagree on scale and some emit junk; keep scores in [0, 1].
fn clamped_confidence<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f32>::deserialize(deserializer)?;
    Ok(value.filter(|c| c.is_finite()).map(|c| c.clamp(0.0, 1.0)))
}

impl TextLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

/// Raw OCR output for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocumentText {
    /// Lines in reading order.
    pub lines: Vec<TextLine>,
}

impl RawDocumentText {
    /// Build from plain text. No OCR confidence is attached.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(TextLine::new).collect(),
        }
    }

    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = TextLine>,
    {
        Self {
            lines: lines.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.text.trim().is_empty())
    }
}

/// A normalized line, keeping the confidence of the raw line it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedLine {
    pub text: String,
    pub confidence: Option<f32>,
}

/// Normalizer output: non-empty, whitespace-collapsed, OCR-corrected lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedText {
    lines: Vec<NormalizedLine>,
    text: String,
}

impl NormalizedText {
    pub(crate) fn new(lines: Vec<NormalizedLine>) -> Self {
        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self { lines, text }
    }

    /// Full text, lines joined by `\n`.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[NormalizedLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Mean OCR confidence over the lines that carry one.
    pub fn ocr_quality(&self) -> Option<f32> {
        let scores: Vec<f32> = self.lines.iter().filter_map(|l| l.confidence).collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f32>() / scores.len() as f32)
        }
    }
}

impl From<&NormalizedText> for RawDocumentText {
    fn from(normalized: &NormalizedText) -> Self {
        Self {
            lines: normalized
                .lines
                .iter()
                .map(|l| TextLine {
                    text: l.text.clone(),
                    confidence: l.confidence,
                })
                .collect(),
        }
    }
}
