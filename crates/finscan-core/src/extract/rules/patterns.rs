//! Common regex patterns and label tables for financial document extraction.

use lazy_static::lazy_static;
use regex::Regex;

const MONTHS: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

lazy_static! {
    // Monetary token: optional currency symbol with a sign on either side,
    // thousands groups, decimal part with '.' or a two-digit ',' decimal.
    pub static ref MONEY: Regex = Regex::new(
        r"(?:(?P<lead>-)?(?P<cur>[$€£]))?\s?(?P<sign>-)?(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+,\d{2}\b|\d+(?:\.\d+)?)"
    ).unwrap();

    // Date patterns
    pub static ref DATE_ISO: Regex = Regex::new(
        r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b"
    ).unwrap();

    // Numeric day/month/year with '/', '.' or '-' separators
    pub static ref DATE_SLASH: Regex = Regex::new(
        r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_MONTH_FIRST: Regex = Regex::new(&format!(
        r"(?i)\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    )).unwrap();

    pub static ref DATE_DAY_FIRST: Regex = Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTHS})\.?,?\s+(\d{{4}})\b"
    )).unwrap();

    // Document identifiers
    pub static ref IDENTIFIER_LABELED: Regex = Regex::new(
        r"(?i)\b(?:invoice|inv|statement|stmt|receipt|bill|document|doc|reference|ref)\b\.?\s*(?:#|no\b\.?|num(?:ber)?\b\.?)?\s*[:#]?\s*([A-Za-z0-9][A-Za-z0-9\-/_.]*)"
    ).unwrap();

    pub static ref IDENTIFIER_STANDALONE: Regex = Regex::new(
        r"\b([A-Za-z]{1,6}[-/]?\d[A-Za-z0-9\-/]{2,})\b"
    ).unwrap();

    // Lines that never name a business
    pub static ref EMAIL: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    pub static ref PHONE: Regex = Regex::new(
        r"(?:\+?1[\s.\-]?)?\(?\d{3}\)?[\s.\-]\d{3}[\s.\-]\d{4}"
    ).unwrap();

    pub static ref URL: Regex = Regex::new(
        r"(?i)(?:https?://|www\.)\S+"
    ).unwrap();

    /// Date labels ranked by how likely they name the document date.
    pub static ref DATE_LABELS: Vec<(&'static str, u32)> = vec![
        ("invoice date", 3),
        ("statement date", 3),
        ("issue date", 3),
        ("billing date", 3),
        ("bill date", 3),
        ("date", 2),
        ("due date", 1),
        ("payment due", 1),
        ("payment due date", 1),
    ];

    /// Label words the normalizer may restore from digit-confused spellings.
    pub static ref LABEL_KEYWORDS: Vec<&'static str> = vec![
        "total", "subtotal", "balance", "amount", "due", "tax", "invoice",
        "date", "statement", "reference", "receipt", "number", "grand",
    ];
}

/// Map a month name or abbreviation to its number.
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Lower-cased alphabetic words of a text span, used for label matching.
pub fn label_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_pattern() {
        let caps = MONEY.captures("Total: $1,234.56").unwrap();
        assert_eq!(&caps["cur"], "$");
        assert_eq!(&caps["num"], "1,234.56");

        let caps = MONEY.captures("137,50 EUR").unwrap();
        assert_eq!(&caps["num"], "137,50");
    }

    #[test]
    fn test_identifier_labeled() {
        let caps = IDENTIFIER_LABELED.captures("Invoice No: INV-2023-001").unwrap();
        assert_eq!(&caps[1], "INV-2023-001");

        let caps = IDENTIFIER_LABELED.captures("Statement # 88213").unwrap();
        assert_eq!(&caps[1], "88213");
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("January"), Some(1));
        assert_eq!(month_number("Sept"), Some(9));
        assert_eq!(month_number("xyz"), None);
    }

    #[test]
    fn test_label_words() {
        assert_eq!(label_words("Sub-Total: $5"), vec!["sub", "total"]);
        assert_eq!(label_words("GST/HST"), vec!["gst", "hst"]);
    }
}
