//! Amount extraction and total selection.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use super::patterns::MONEY;
use super::{head_words, tail_words, ExtractionMatch, FieldExtractor, LabelHit, LabelMatcher};
use crate::models::config::{ExtractionConfig, LabelWeight};
use crate::models::document::NormalizedText;
use crate::models::record::FieldResult;

/// A monetary token found in the text.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountCandidate {
    /// Parsed value, negative when signed.
    pub value: Decimal,
    /// Matched token as printed.
    pub text: String,
    /// Labels found in the chosen window, left to right.
    pub labels: Vec<LabelHit>,
    /// Line index.
    pub line: usize,
    /// Byte offset of the token within its line.
    pub offset: usize,
    /// Number of decimal digits printed.
    pub decimals: u32,
    /// Classification score after plausibility adjustments.
    pub score: f32,
}

impl AmountCandidate {
    /// Score as a confidence in [0, 1].
    pub fn confidence(&self) -> f32 {
        (self.score / 100.0).min(1.0)
    }
}

/// Scans for monetary tokens and picks the most probable total.
#[derive(Debug, Clone)]
pub struct AmountExtractor {
    labels: LabelMatcher,
    window: usize,
    unlabeled_score: u32,
}

impl AmountExtractor {
    pub fn new(labels: &[LabelWeight], window: usize, unlabeled_score: u32) -> Self {
        Self {
            labels: LabelMatcher::new(labels.iter().map(|l| (l.label.as_str(), l.weight))),
            window,
            unlabeled_score,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            &config.amount_labels,
            config.label_window,
            config.unlabeled_amount_score,
        )
    }

    /// Every monetary candidate in reading order, scored.
    pub fn extract_candidates(&self, text: &NormalizedText) -> Vec<AmountCandidate> {
        let lines = text.lines();
        let tokens: Vec<Vec<Token>> = lines.iter().map(|l| scan_line(&l.text)).collect();

        let mut candidates = Vec::new();

        for (line_idx, line_tokens) in tokens.iter().enumerate() {
            let line = lines[line_idx].text.as_str();

            for (i, token) in line_tokens.iter().enumerate() {
                let prev_end = if i == 0 { 0 } else { line_tokens[i - 1].end };
                let next_start = line_tokens.get(i + 1).map_or(line.len(), |t| t.start);

                let labels = self.window_labels(
                    &line[prev_end..token.start],
                    &line[token.end..next_start],
                    line_idx
                        .checked_sub(1)
                        .filter(|&prev| tokens[prev].is_empty())
                        .map(|prev| lines[prev].text.as_str()),
                );

                let mut score = labels
                    .iter()
                    .map(|hit| hit.weight)
                    .max()
                    .unwrap_or(self.unlabeled_score) as f32;

                if token.value.is_zero() {
                    score /= 2.0;
                }
                if token.value.scale() > 2 {
                    score /= 2.0;
                }

                candidates.push(AmountCandidate {
                    value: token.value,
                    text: line[token.start..token.end].to_string(),
                    labels,
                    line: line_idx,
                    offset: token.start,
                    decimals: token.value.scale(),
                    score,
                });
            }
        }

        candidates
    }

    /// Select the total.
    pub fn extract_total(&self, text: &NormalizedText) -> FieldResult<Decimal> {
        let candidates = self.extract_candidates(text);

        let best = candidates.iter().max_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then(a.value.cmp(&b.value))
                .then((b.line, b.offset).cmp(&(a.line, a.offset)))
        });

        match best {
            Some(c) => {
                debug!(
                    "Selected total {} (score {}) from {} candidates",
                    c.value,
                    c.score,
                    candidates.len()
                );
                FieldResult::present(c.value, c.confidence(), &text.lines()[c.line].text)
            }
            None => {
                debug!("No amount candidates found");
                FieldResult::absent()
            }
        }
    }

    /// Labels before the value on its line, else on the line above, else
    /// after the value. Earlier spans win outright.
    fn window_labels(&self, before: &str, after: &str, line_above: Option<&str>) -> Vec<LabelHit> {
        let hits = self.labels.find_all(&tail_words(before, self.window));
        if !hits.is_empty() {
            return hits;
        }

        if let Some(above) = line_above {
            let hits = self.labels.find_all(&tail_words(above, self.window));
            if !hits.is_empty() {
                return hits;
            }
        }

        self.labels.find_all(&head_words(after, self.window))
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = Decimal;

    fn extract(&self, text: &NormalizedText) -> FieldResult<Decimal> {
        self.extract_total(text)
    }

    fn extract_all(&self, text: &NormalizedText) -> Vec<ExtractionMatch<Decimal>> {
        self.extract_candidates(text)
            .into_iter()
            .map(|c| {
                let confidence = c.confidence();
                ExtractionMatch::new(c.value, confidence, c.text).with_position(c.line, c.offset)
            })
            .collect()
    }
}

/// An accepted monetary token: byte span within the line and value.
#[derive(Debug)]
struct Token {
    start: usize,
    end: usize,
    value: Decimal,
}

/// Currency and credit/debit codes OCR often glues to a decimal amount.
const TRAILING_CODES: [&str; 5] = ["CR", "DR", "CAD", "USD", "EUR"];

fn scan_line(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();

    for caps in MONEY.captures_iter(line) {
        let (Some(whole), Some(num)) = (caps.get(0), caps.name("num")) else {
            continue;
        };
        let lead = caps.name("lead");
        let currency = caps.name("cur");
        let sign = caps.name("sign");
        let start = lead.or(currency).or(sign).unwrap_or(num).start();
        let end = whole.end();

        let is_decimal = num.as_str().contains('.') || is_comma_decimal(num.as_str());

        // A currency symbol marks the token start even when glued to a label.
        if currency.is_none() && embedded_before(&line[..start]) {
            continue;
        }
        if embedded_after(&line[end..]) && !(is_decimal && trailing_code(&line[end..])) {
            continue;
        }

        if currency.is_none() && !is_decimal {
            continue;
        }

        let Some(mut value) = parse_amount(num.as_str()) else {
            continue;
        };
        if lead.is_some() != sign.is_some() {
            value = -value;
        }

        tokens.push(Token { start, end, value });
    }

    tokens
}

/// Whether the text before a token shows it is part of a larger word,
/// date or identifier.
fn embedded_before(before: &str) -> bool {
    let mut rev = before.chars().rev();
    match rev.next() {
        Some(c) if c.is_alphanumeric() || matches!(c, '/' | '.' | ',') => true,
        Some('-') => rev.next().is_some_and(char::is_alphanumeric),
        _ => false,
    }
}

fn embedded_after(after: &str) -> bool {
    let mut chars = after.chars();
    match chars.next() {
        Some(c) if c.is_alphanumeric() || c == '%' => true,
        Some('/' | '-' | '.' | ',') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Whether `after` opens with a whole currency or credit code (`137.50CR`).
fn trailing_code(after: &str) -> bool {
    let len = after
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(after.len());
    let rest = &after[len..];

    TRAILING_CODES
        .iter()
        .any(|code| code.eq_ignore_ascii_case(&after[..len]))
        && !rest.starts_with(|c: char| c.is_alphanumeric())
}

fn is_comma_decimal(num: &str) -> bool {
    match num.split_once(',') {
        Some((int, frac)) => {
            !int.is_empty()
                && int.chars().all(|c| c.is_ascii_digit())
                && frac.len() == 2
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Parse a monetary number: `1,234.56`, `1234.56`, or `137,50`.
pub fn parse_amount(num: &str) -> Option<Decimal> {
    let normalized = if is_comma_decimal(num) {
        num.replace(',', ".")
    } else {
        num.replace(',', "")
    };
    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::RawDocumentText;
    use crate::text::normalize;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn total(text: &str) -> FieldResult<Decimal> {
        AmountExtractor::default().extract_total(&normalize(&RawDocumentText::from_text(text)))
    }

    fn values(text: &str) -> Vec<Decimal> {
        AmountExtractor::default()
            .extract_candidates(&normalize(&RawDocumentText::from_text(text)))
            .into_iter()
            .map(|c| c.value)
            .collect()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("137,50"), Some(dec("137.50")));
        assert_eq!(parse_amount("1,234"), Some(dec("1234")));
        assert_eq!(parse_amount("0.005"), Some(dec("0.005")));
    }

    #[test]
    fn test_total_due_beats_subtotal() {
        let result = total("Subtotal: $100.00\nTax: $37.50\nTotal Due: $137.50");
        assert_eq!(result.value(), Some(&dec("137.50")));
        assert!(result.confidence() >= 0.9);
        assert_eq!(result.evidence(), Some("Total Due: $137.50"));
    }

    #[test]
    fn test_labels_on_same_line() {
        let result = total("Tax: $5.00 Total: $55.00 Subtotal: $50.00");
        assert_eq!(result.value(), Some(&dec("55.00")));
        assert_eq!(result.confidence(), 0.9);
    }

    #[test]
    fn test_label_on_previous_line() {
        let result = total("Amount Due\n$250.00\nSubtotal $240.00");
        assert_eq!(result.value(), Some(&dec("250.00")));
        assert_eq!(result.confidence(), 1.0);
    }

    #[test]
    fn test_label_after_value() {
        let candidates = AmountExtractor::default()
            .extract_candidates(&normalize(&RawDocumentText::from_text("$12.00 balance")));
        assert_eq!(candidates[0].score, 70.0);
    }

    #[test]
    fn test_ignores_dates_identifiers_and_percentages() {
        assert!(values("Date: 2023-01-15\nInvoice No: INV-2023-001").is_empty());
        assert!(values("Rate 12.5% on 03/04/2024").is_empty());
        assert!(values("Call 514-555-1234 or order 1234").is_empty());
        assert_eq!(values("GST 5% $2.50"), vec![dec("2.50")]);
    }

    #[test]
    fn test_bare_integer_needs_currency() {
        assert_eq!(values("Total $40"), vec![dec("40")]);
        assert!(values("Total 40").is_empty());
    }

    #[test]
    fn test_comma_decimal_and_thousands() {
        assert_eq!(values("Total 137,50 EUR"), vec![dec("137.50")]);
        assert_eq!(values("Total: $1,234.56"), vec![dec("1234.56")]);
    }

    #[test]
    fn test_tie_prefers_largest_value() {
        let result = total("$10.00\n$30.00\n$20.00");
        assert_eq!(result.value(), Some(&dec("30.00")));
        assert_eq!(result.confidence(), 0.05);
    }

    #[test]
    fn test_implausible_amounts_penalized() {
        let candidates = AmountExtractor::default().extract_candidates(&normalize(
            &RawDocumentText::from_text("Total: $0.00\nTotal: $12.345\nTotal: $12.34"),
        ));
        let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![45.0, 45.0, 90.0]);
        assert_eq!(candidates[1].decimals, 3);
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(values("Balance: $-5.00"), vec![dec("-5.00")]);
        assert_eq!(values("Balance: -5.00 CR"), vec![dec("-5.00")]);
        assert_eq!(values("Total: -$5.00"), vec![dec("-5.00")]);
        assert_eq!(values("Total: -€ 5,00"), vec![dec("-5.00")]);
    }

    #[test]
    fn test_currency_glued_to_label() {
        let result = total("Total$137.50");
        assert_eq!(result.value(), Some(&dec("137.50")));
        assert_eq!(result.confidence(), 0.9);
    }

    #[test]
    fn test_trailing_currency_and_credit_codes() {
        assert_eq!(total("Total: $137.50CR").value(), Some(&dec("137.50")));
        assert_eq!(total("Total 137.50CAD").value(), Some(&dec("137.50")));
        assert_eq!(values("Paid 20.00eur"), vec![dec("20.00")]);
        // Other trailing letters still mark an embedded token.
        assert!(values("Model 12.50XL").is_empty());
        assert!(values("Total 40CAD").is_empty());
    }

    #[test]
    fn test_label_outside_window_is_ignored() {
        let far = AmountExtractor::default().extract_candidates(&normalize(
            &RawDocumentText::from_text("Total one two three four five six $12.00"),
        ));
        assert_eq!(far[0].score, 5.0);
        assert!(far[0].labels.is_empty());

        let near = AmountExtractor::default().extract_candidates(&normalize(
            &RawDocumentText::from_text("Total one two three four $12.00"),
        ));
        assert_eq!(near[0].score, 90.0);
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(total("HYDRO QUEBEC"), FieldResult::absent());
        assert_eq!(total(""), FieldResult::absent());
    }
}
