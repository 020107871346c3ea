//! Document date extraction.

use chrono::NaiveDate;
use regex::Captures;
use tracing::debug;

use super::patterns::{
    month_number, DATE_DAY_FIRST, DATE_ISO, DATE_LABELS, DATE_MONTH_FIRST, DATE_SLASH,
};
use super::{tail_words, ExtractionMatch, FieldExtractor, LabelHit, LabelMatcher};
use crate::models::config::ExtractionConfig;
use crate::models::document::NormalizedText;
use crate::models::record::FieldResult;

/// Confidence of an unambiguous (ISO or textual) date.
const UNAMBIGUOUS: f32 = 1.0;

/// Confidence of a numeric slash date.
const SLASH: f32 = 0.7;

/// A date found in the text.
#[derive(Debug, Clone)]
struct Found {
    date: NaiveDate,
    confidence: f32,
    line: usize,
    start: usize,
    end: usize,
    label: Option<LabelHit>,
}

/// Date field extractor.
#[derive(Debug, Clone)]
pub struct DateExtractor {
    day_first: bool,
    window: usize,
    labels: LabelMatcher,
}

impl DateExtractor {
    pub fn new(day_first: bool, window: usize) -> Self {
        Self {
            day_first,
            window,
            labels: LabelMatcher::new(DATE_LABELS.iter().copied()),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.day_first, config.label_window)
    }

    /// Pick the document date: the best-labeled date, else the first one.
    pub fn extract_date(&self, text: &NormalizedText) -> FieldResult<NaiveDate> {
        let found = self.scan(text);

        let labeled = found
            .iter()
            .filter_map(|f| f.label.map(|hit| (f, hit)))
            .min_by(|(a, a_hit), (b, b_hit)| {
                b_hit
                    .weight
                    .cmp(&a_hit.weight)
                    .then(a_hit.distance.cmp(&b_hit.distance))
                    .then((a.line, a.start).cmp(&(b.line, b.start)))
            })
            .map(|(f, _)| f);

        match labeled.or_else(|| found.first()) {
            Some(f) => {
                debug!(
                    "Selected date {} ({}labeled) from {} candidates",
                    f.date,
                    if f.label.is_some() { "" } else { "un" },
                    found.len()
                );
                let evidence = &text.lines()[f.line].text[f.start..f.end];
                FieldResult::present(f.date, f.confidence, evidence)
            }
            None => {
                debug!("No date found");
                FieldResult::absent()
            }
        }
    }

    /// Every valid date in reading order, with its nearest date label.
    fn scan(&self, text: &NormalizedText) -> Vec<Found> {
        let lines = text.lines();
        let per_line: Vec<Vec<Found>> = lines
            .iter()
            .enumerate()
            .map(|(idx, line)| self.scan_line(idx, &line.text))
            .collect();

        let mut all = Vec::new();
        for (idx, mut found) in per_line.iter().cloned().enumerate() {
            let line = lines[idx].text.as_str();
            let mut prev_end = 0;

            for f in &mut found {
                f.label = self.labels.best(&tail_words(&line[prev_end..f.start], self.window));
                prev_end = f.end;
            }

            // Label printed on the line above a lone date.
            if let Some(first) = found.first_mut() {
                if first.label.is_none() && idx > 0 && per_line[idx - 1].is_empty() {
                    first.label = self.labels.best(&tail_words(&lines[idx - 1].text, self.window));
                }
            }

            all.extend(found);
        }
        all
    }

    fn scan_line(&self, idx: usize, line: &str) -> Vec<Found> {
        let mut found: Vec<Found> = Vec::new();

        let mut push = |caps: &Captures, date: Option<NaiveDate>, confidence: f32| {
            let (Some(m), Some(date)) = (caps.get(0), date) else {
                return;
            };
            if found.iter().any(|f| m.start() < f.end && f.start < m.end()) {
                return;
            }
            found.push(Found {
                date,
                confidence,
                line: idx,
                start: m.start(),
                end: m.end(),
                label: None,
            });
        };

        for caps in DATE_ISO.captures_iter(line) {
            let date = ymd(num(&caps, 1), num(&caps, 2), num(&caps, 3));
            push(&caps, date, UNAMBIGUOUS);
        }
        for caps in DATE_MONTH_FIRST.captures_iter(line) {
            let date = ymd(num(&caps, 3), month_number(&caps[1]), num(&caps, 2));
            push(&caps, date, UNAMBIGUOUS);
        }
        for caps in DATE_DAY_FIRST.captures_iter(line) {
            let date = ymd(num(&caps, 3), month_number(&caps[2]), num(&caps, 1));
            push(&caps, date, UNAMBIGUOUS);
        }
        for caps in DATE_SLASH.captures_iter(line) {
            let date = self.slash_date(&caps);
            push(&caps, date, SLASH);
        }

        found.sort_by_key(|f| f.start);
        found
    }

    /// Resolve `a/b/year`: a first part over 12 is a day; otherwise the
    /// configured order, falling back to the other order when invalid.
    fn slash_date(&self, caps: &Captures) -> Option<NaiveDate> {
        let a = num(caps, 1)?;
        let b = num(caps, 2)?;
        let year = num(caps, 3).map(|y| if caps[3].len() == 2 { 2000 + y } else { y });

        let day_first = a > 12 || self.day_first;
        let (month, day) = if day_first { (b, a) } else { (a, b) };

        ymd(year, Some(month), Some(day)).or_else(|| ymd(year, Some(day), Some(month)))
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl FieldExtractor for DateExtractor {
    type Output = NaiveDate;

    fn extract(&self, text: &NormalizedText) -> FieldResult<NaiveDate> {
        self.extract_date(text)
    }

    fn extract_all(&self, text: &NormalizedText) -> Vec<ExtractionMatch<NaiveDate>> {
        let lines = text.lines();
        self.scan(text)
            .into_iter()
            .map(|f| {
                ExtractionMatch::new(f.date, f.confidence, &lines[f.line].text[f.start..f.end])
                    .with_position(f.line, f.start)
            })
            .collect()
    }
}

fn num(caps: &Captures, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn ymd(year: Option<u32>, month: Option<u32>, day: Option<u32>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year?).ok()?, month?, day?)
}
