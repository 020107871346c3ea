//! Rule-based field extractors for invoices and statements.

pub mod amounts;
pub mod company;
pub mod dates;
pub mod identifier;
pub mod patterns;

pub use amounts::{parse_amount, AmountCandidate, AmountExtractor};
pub use company::{company_candidates, CompanyResolver};
pub use dates::DateExtractor;
pub use identifier::IdentifierExtractor;
pub use patterns::*;

use crate::models::document::NormalizedText;
use crate::models::record::FieldResult;

/// Trait for single-field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the best value for the field.
    fn extract(&self, text: &NormalizedText) -> FieldResult<Self::Output>;

    /// Extract every candidate for the field, in reading order.
    fn extract_all(&self, text: &NormalizedText) -> Vec<ExtractionMatch<Self::Output>>;
}

/// A candidate value with its confidence and location.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Line index and byte offset within the line.
    pub position: (usize, usize),
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: (0, 0),
            source: source.into(),
        }
    }

    pub fn with_position(mut self, line: usize, offset: usize) -> Self {
        self.position = (line, offset);
        self
    }

    pub fn into_field(self) -> FieldResult<T> {
        FieldResult::present(self.value, self.confidence, self.source)
    }
}

/// A label found in a word window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelHit {
    pub weight: u32,
    /// Words between the end of the label and the end of the window.
    pub distance: usize,
}

/// Ranked multi-word label table.
///
/// Matching is greedy and longest-phrase-first, so `total due` is consumed
/// before `total` and `sub total` before `total`.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    phrases: Vec<(Vec<String>, u32)>,
}

impl LabelMatcher {
    pub fn new<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let mut phrases: Vec<(Vec<String>, u32)> = labels
            .into_iter()
            .map(|(label, weight)| (label_words(label), weight))
            .filter(|(words, _)| !words.is_empty())
            .collect();
        phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(b.1.cmp(&a.1)));
        Self { phrases }
    }

    /// Every label in `words`, left to right.
    pub fn find_all(&self, words: &[String]) -> Vec<LabelHit> {
        let mut hits = Vec::new();
        let mut i = 0;

        while i < words.len() {
            let matched = self.phrases.iter().find(|(phrase, _)| {
                words.len() - i >= phrase.len()
                    && phrase.iter().zip(&words[i..]).all(|(p, w)| p == w)
            });

            match matched {
                Some((phrase, weight)) => {
                    i += phrase.len();
                    hits.push(LabelHit {
                        weight: *weight,
                        distance: words.len() - i,
                    });
                }
                None => i += 1,
            }
        }

        hits
    }

    /// Highest-ranked label in `words`; the nearest one on equal rank.
    pub fn best(&self, words: &[String]) -> Option<LabelHit> {
        self.find_all(words)
            .into_iter()
            .max_by(|a, b| a.weight.cmp(&b.weight).then(b.distance.cmp(&a.distance)))
    }
}

/// Last `n` label words of a span.
pub(crate) fn tail_words(text: &str, n: usize) -> Vec<String> {
    let words = label_words(text);
    let skip = words.len().saturating_sub(n);
    words.into_iter().skip(skip).collect()
}

/// First `n` label words of a span.
pub(crate) fn head_words(text: &str, n: usize) -> Vec<String> {
    label_words(text).into_iter().take(n).collect()
}
