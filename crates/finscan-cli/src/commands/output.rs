//! Record formatting for JSON, CSV, XML and plain text output.

use console::style;
use serde::Serialize;

use finscan_core::models::config::TierThresholds;
use finscan_core::models::record::{ConfidenceTier, ExtractionRecord, FieldResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// XML output
    Xml,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Xml => "xml",
            OutputFormat::Text => "txt",
        }
    }
}

/// Per-field confidences, shown with `--show-confidence`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldScores {
    pub company: f32,
    pub total: f32,
    pub date: f32,
    pub identifier: f32,
}

/// Flat view of a record: the output contract shared by every format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "record")]
pub struct RecordView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub company: Option<String>,
    pub total: Option<String>,
    pub date: Option<String>,
    pub identifier: Option<String>,
    pub confidence: f32,
    pub tier: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldScores>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RecordView {
    pub fn new(record: &ExtractionRecord, tiers: &TierThresholds, show_confidence: bool) -> Self {
        let fields = show_confidence.then(|| {
            let c = record.field_confidences();
            FieldScores {
                company: round(c.company),
                total: round(c.total),
                date: round(c.date),
                identifier: round(c.identifier),
            }
        });

        Self {
            file: None,
            company: record.company().value().cloned(),
            total: record.total().value().map(|t| t.to_string()),
            date: record.date().value().map(|d| d.format("%Y-%m-%d").to_string()),
            identifier: record.identifier().value().cloned(),
            confidence: round(record.confidence()),
            tier: record.tier(tiers).as_str(),
            fields,
            warnings: record.warnings().to_vec(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

fn round(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn format_record(view: &RecordView, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(view)?),
        OutputFormat::Csv => format_csv(std::slice::from_ref(view)),
        OutputFormat::Xml => Ok(quick_xml::se::to_string_with_root("record", view)?),
        OutputFormat::Text => Ok(format_text(view)),
    }
}

const CSV_HEADER: [&str; 7] = [
    "file",
    "company",
    "total",
    "date",
    "identifier",
    "confidence",
    "tier",
];

/// CSV with one row per record.
pub fn format_csv(views: &[RecordView]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for view in views {
        wtr.write_record([
            view.file.as_deref().unwrap_or(""),
            view.company.as_deref().unwrap_or(""),
            view.total.as_deref().unwrap_or(""),
            view.date.as_deref().unwrap_or(""),
            view.identifier.as_deref().unwrap_or(""),
            &format!("{:.4}", view.confidence),
            view.tier,
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(view: &RecordView) -> String {
    let mut output = String::new();
    let absent = "(not found)";

    if let Some(file) = &view.file {
        output.push_str(&format!("File:       {}\n", file));
    }
    output.push_str(&format!("Company:    {}\n", view.company.as_deref().unwrap_or(absent)));
    output.push_str(&format!("Total:      {}\n", view.total.as_deref().unwrap_or(absent)));
    output.push_str(&format!("Date:       {}\n", view.date.as_deref().unwrap_or(absent)));
    output.push_str(&format!("Identifier: {}\n", view.identifier.as_deref().unwrap_or(absent)));
    output.push_str(&format!(
        "Confidence: {:.1}% ({})\n",
        view.confidence * 100.0,
        view.tier
    ));

    output
}

/// Styled tier label for terminal summaries.
pub fn styled_tier(tier: ConfidenceTier) -> String {
    match tier {
        ConfidenceTier::High => style(tier.as_str()).green().to_string(),
        ConfidenceTier::Medium => style(tier.as_str()).yellow().to_string(),
        ConfidenceTier::Low => style(tier.as_str()).red().to_string(),
    }
}

/// Per-field confidence report with evidence, written to stderr.
pub fn print_confidence_report(record: &ExtractionRecord, tiers: &TierThresholds) {
    eprintln!();
    report_field("company", record.company());
    report_field("total", record.total());
    report_field("date", record.date());
    report_field("identifier", record.identifier());
    eprintln!(
        "{} Overall confidence: {:.1}% ({})",
        style("ℹ").blue(),
        record.confidence() * 100.0,
        styled_tier(record.tier(tiers))
    );
    for warning in record.warnings() {
        eprintln!("{} {}", style("⚠").yellow(), warning);
    }
}

fn report_field<T>(name: &str, field: &FieldResult<T>) {
    let evidence = field.evidence().unwrap_or("-");
    eprintln!(
        "  {:<11} {:>5.1}%  {}",
        name,
        field.confidence() * 100.0,
        style(evidence).dim()
    );
}
