//! Company name candidates and their resolution through the alias store.

use tracing::debug;

use super::patterns::{label_words, EMAIL, LABEL_KEYWORDS, PHONE, URL};
use crate::alias::{resolve_detailed, AliasStore};
use crate::models::config::ExtractionConfig;
use crate::models::document::NormalizedText;
use crate::models::record::FieldResult;

/// Leading words of lines that label data rather than name a business.
const NON_NAME_LEADS: &[&str] = &[
    "account", "bill", "customer", "doc", "document", "gst", "hst", "inv", "page", "pst", "qst",
    "ref", "ship", "stmt", "thank", "vat",
];

/// Lines that may carry the business name, with their line index.
///
/// Skips lines without letters, contact lines (email, phone, URL), lines
/// starting with a digit and lines led by a field label. `scan_lines`
/// limits the scan to the top of the document (0 scans everything).
pub fn company_candidates(text: &NormalizedText, scan_lines: usize) -> Vec<(usize, &str)> {
    let limit = if scan_lines == 0 { usize::MAX } else { scan_lines };

    text.lines()
        .iter()
        .take(limit)
        .enumerate()
        .map(|(idx, line)| (idx, line.text.as_str()))
        .filter(|(_, line)| is_name_line(line))
        .collect()
}

fn is_name_line(line: &str) -> bool {
    if !line.chars().any(char::is_alphabetic) {
        return false;
    }
    if line.starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    if EMAIL.is_match(line) || PHONE.is_match(line) || URL.is_match(line) {
        return false;
    }

    match label_words(line).first() {
        Some(lead) => {
            !LABEL_KEYWORDS.contains(&lead.as_str()) && !NON_NAME_LEADS.contains(&lead.as_str())
        }
        None => false,
    }
}

/// Finds the business name by resolving candidate lines against the store.
#[derive(Debug, Clone, Copy)]
pub struct CompanyResolver {
    threshold: f32,
    scan_lines: usize,
}

impl CompanyResolver {
    pub fn new(threshold: f32, scan_lines: usize) -> Self {
        Self {
            threshold,
            scan_lines,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.fuzzy_threshold, config.company_scan_lines)
    }

    /// Best-resolving candidate line; the earliest on equal confidence.
    ///
    /// When nothing resolves, the first candidate line is kept as evidence.
    pub fn resolve(&self, text: &NormalizedText, store: &AliasStore) -> FieldResult<String> {
        let candidates = company_candidates(text, self.scan_lines);

        let mut best: Option<(f32, String, &str)> = None;
        for &(_, line) in &candidates {
            let Some(m) = resolve_detailed(line, store, self.threshold) else {
                continue;
            };
            if best.as_ref().is_none_or(|(confidence, _, _)| m.confidence > *confidence) {
                best = Some((m.confidence, m.canonical, line));
            }
        }

        match best {
            Some((confidence, canonical, line)) => {
                debug!("Company {:?} from line {:?} ({:.2})", canonical, line, confidence);
                FieldResult::present(canonical, confidence, line)
            }
            None => match candidates.first() {
                Some((_, line)) => {
                    debug!("No company match among {} candidate lines", candidates.len());
                    FieldResult::absent_with_evidence(*line)
                }
                None => FieldResult::absent(),
            },
        }
    }
}

impl Default for CompanyResolver {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}
