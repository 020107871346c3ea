//! Document identifier (invoice / statement number) extraction.

use tracing::debug;

use super::amounts::parse_amount;
use super::patterns::{DATE_ISO, DATE_SLASH, IDENTIFIER_LABELED, IDENTIFIER_STANDALONE};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::document::NormalizedText;
use crate::models::record::FieldResult;

/// Confidence of an identifier printed next to its label.
const LABELED: f32 = 0.8;

/// Confidence of an unlabeled identifier-shaped token.
const UNLABELED: f32 = 0.3;

/// Identifier field extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierExtractor;

impl IdentifierExtractor {
    pub fn new() -> Self {
        Self
    }

    /// First labeled identifier, else the first plausible unlabeled one.
    pub fn extract_identifier(&self, text: &NormalizedText) -> FieldResult<String> {
        let result = labeled(text)
            .into_iter()
            .next()
            .or_else(|| standalone(text).into_iter().next())
            .map(ExtractionMatch::into_field)
            .unwrap_or_else(FieldResult::absent);

        debug!("Identifier: {:?} ({:.2})", result.value(), result.confidence());
        result
    }
}

impl FieldExtractor for IdentifierExtractor {
    type Output = String;

    fn extract(&self, text: &NormalizedText) -> FieldResult<String> {
        self.extract_identifier(text)
    }

    fn extract_all(&self, text: &NormalizedText) -> Vec<ExtractionMatch<String>> {
        let mut all = labeled(text);
        all.extend(standalone(text));
        all.sort_by_key(|m| m.position);
        all
    }
}

fn labeled(text: &NormalizedText) -> Vec<ExtractionMatch<String>> {
    let mut matches = Vec::new();

    for (idx, line) in text.lines().iter().enumerate() {
        for caps in IDENTIFIER_LABELED.captures_iter(&line.text) {
            let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = trim_identifier(id.as_str());
            if !value.chars().any(|c| c.is_ascii_digit()) || is_date_or_amount(value) {
                continue;
            }

            let evidence = &line.text[whole.start()..id.start() + value.len()];
            matches.push(
                ExtractionMatch::new(value.to_string(), LABELED, evidence)
                    .with_position(idx, whole.start()),
            );
        }
    }

    matches
}

fn standalone(text: &NormalizedText) -> Vec<ExtractionMatch<String>> {
    let mut matches = Vec::new();

    for (idx, line) in text.lines().iter().enumerate() {
        for caps in IDENTIFIER_STANDALONE.captures_iter(&line.text) {
            let Some(m) = caps.get(1) else {
                continue;
            };
            let value = trim_identifier(m.as_str());
            if is_plausible(value) {
                matches.push(
                    ExtractionMatch::new(value.to_string(), UNLABELED, value)
                        .with_position(idx, m.start()),
                );
            }
        }
    }

    matches
}

/// Mixed letters and digits, at least four characters, and not a date or
/// amount.
fn is_plausible(token: &str) -> bool {
    token.chars().count() >= 4
        && token.chars().any(|c| c.is_ascii_alphabetic())
        && token.chars().any(|c| c.is_ascii_digit())
        && !DATE_ISO.is_match(token)
        && !DATE_SLASH.is_match(token)
        && parse_amount(token).is_none()
}

/// Dates and decimal amounts sit next to the same labels as identifiers
/// (`Invoice 01/15/2024`, `Bill 12.50`). Plain digit runs stay identifiers.
fn is_date_or_amount(token: &str) -> bool {
    DATE_ISO.is_match(token)
        || DATE_SLASH.is_match(token)
        || (token.contains(['.', ',']) && parse_amount(token).is_some())
}

fn trim_identifier(raw: &str) -> &str {
    raw.trim_end_matches(['.', '-', '/', '_'])
}
