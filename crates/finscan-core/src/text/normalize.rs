//! OCR text normalization.
//!
//! Runs before every extractor: unifies line endings, collapses Unicode
//! whitespace and repairs letter/digit confusions. Confusions are only
//! repaired inside tokens that already contain a digit, so words made of
//! letters alone are never rewritten.

use tracing::trace;

use crate::extract::rules::patterns::LABEL_KEYWORDS;
use crate::models::config::ConfusionTable;
use crate::models::document::{NormalizedLine, NormalizedText, RawDocumentText};

/// Invisible characters some OCR engines emit between glyphs.
const INVISIBLE: [char; 3] = ['\u{200b}', '\u{200c}', '\u{feff}'];

/// Text normalizer with a configurable confusion table.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    table: ConfusionTable,
}

impl Normalizer {
    pub fn new(table: ConfusionTable) -> Self {
        Self { table }
    }

    /// Normalize one document. Never fails; blank input yields empty text.
    pub fn normalize(&self, raw: &RawDocumentText) -> NormalizedText {
        let mut lines = Vec::with_capacity(raw.lines.len());

        for raw_line in &raw.lines {
            for piece in raw_line.text.split(['\r', '\n']) {
                let collapsed = collapse_whitespace(piece);
                if collapsed.is_empty() {
                    continue;
                }

                let corrected = collapsed
                    .split(' ')
                    .map(|token| self.correct_token(token))
                    .collect::<Vec<_>>()
                    .join(" ");

                if corrected != collapsed {
                    trace!("OCR correction: {:?} -> {:?}", collapsed, corrected);
                }

                lines.push(NormalizedLine {
                    text: corrected,
                    confidence: raw_line.confidence,
                });
            }
        }

        NormalizedText::new(lines)
    }

    fn correct_token(&self, token: &str) -> String {
        let mut out = String::with_capacity(token.len());
        let mut segment = String::new();

        for c in token.chars() {
            if c.is_alphanumeric() || self.table.digit_for(c).is_some() {
                segment.push(c);
            } else {
                self.flush_segment(&mut segment, &mut out);
                out.push(c);
            }
        }
        self.flush_segment(&mut segment, &mut out);

        out
    }

    fn flush_segment(&self, segment: &mut String, out: &mut String) {
        if segment.is_empty() {
            return;
        }
        match self.correct_segment(segment) {
            Some(fixed) => out.push_str(&fixed),
            None => out.push_str(segment),
        }
        segment.clear();
    }

    /// Repair one alphanumeric run, or `None` to keep it as is.
    fn correct_segment(&self, segment: &str) -> Option<String> {
        let digits = segment.chars().filter(|c| c.is_ascii_digit()).count();
        let others = segment.chars().count() - digits;
        if digits == 0 || others == 0 {
            return None;
        }

        if let Some(keyword) = self.restore_keyword(segment) {
            return Some(keyword);
        }

        // Digit context: every non-digit must be a known confusion and the
        // digits must dominate.
        let mapped: Option<String> = segment
            .chars()
            .map(|c| {
                if c.is_ascii_digit() {
                    Some(c)
                } else {
                    self.table.digit_for(c)
                }
            })
            .collect();

        match mapped {
            Some(fixed) if digits >= others => Some(fixed),
            _ => None,
        }
    }

    /// Restore a label keyword spelled with digits (`T0tal` -> `Total`).
    fn restore_keyword(&self, segment: &str) -> Option<String> {
        let chars: Vec<char> = segment.chars().collect();

        let keyword = LABEL_KEYWORDS.iter().find(|keyword| {
            keyword.chars().count() == chars.len()
                && keyword.chars().zip(&chars).all(|(k, &c)| {
                    c.to_lowercase().eq(std::iter::once(k))
                        || (c.is_ascii_digit() && self.table.letters_for(c).any(|l| l == k))
                })
        })?;

        let all_upper = chars
            .iter()
            .filter(|c| c.is_alphabetic())
            .all(|c| c.is_uppercase());

        let restored = keyword
            .chars()
            .zip(&chars)
            .enumerate()
            .map(|(i, (k, &c))| {
                if !c.is_ascii_digit() {
                    c
                } else if all_upper || i == 0 {
                    k.to_ascii_uppercase()
                } else {
                    k
                }
            })
            .collect();

        Some(restored)
    }
}

/// Normalize with the default confusion table.
pub fn normalize(raw: &RawDocumentText) -> NormalizedText {
    Normalizer::default().normalize(raw)
}

/// Drop invisible characters, collapse Unicode whitespace runs into one
/// space and trim.
fn collapse_whitespace(text: &str) -> String {
    let visible: String = text.chars().filter(|c| !INVISIBLE.contains(c)).collect();
    visible.split_whitespace().collect::<Vec<_>>().join(" ")
}
