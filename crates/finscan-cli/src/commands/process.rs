//! Process command - extract fields from a single OCR text file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use finscan_core::alias::AliasStore;
use finscan_core::extract::Extractor;
use finscan_core::rename::{Disposition, RenameSession};

use super::output::{format_record, print_confidence_report, OutputFormat, RecordView};
use super::{load_config, read_document, store_path};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (.txt OCR text or .json OCR lines)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show per-field confidence scores and evidence
    #[arg(long)]
    show_confidence: bool,

    /// Print the rename plan for the input file using this template
    #[arg(long)]
    rename_template: Option<String>,

    /// Alias store file
    #[arg(long)]
    alias_store: Option<PathBuf>,

    /// Read ambiguous numeric dates as day-first
    #[arg(long)]
    day_first: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let raw = read_document(&args.input)?;
    let store = AliasStore::load(&store_path(args.alias_store.as_deref(), &config))?;

    let mut extractor = Extractor::from_config(&config.extraction);
    if args.day_first {
        extractor = extractor.with_day_first(true);
    }

    let record = extractor.extract(&raw, &store);
    let tiers = &config.extraction.tiers;

    let view = RecordView::new(&record, tiers, args.show_confidence);
    let output = format_record(&view, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        print_confidence_report(&record, tiers);
    }

    if let Some(template) = &args.rename_template {
        let dir = match args.input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut session = RenameSession::from_dir(template.as_str(), &dir)?;
        let plan = session.plan(&record, &args.input);

        match (&plan.proposed, &plan.disposition) {
            (Some(name), disposition) => eprintln!(
                "{} Rename: {} -> {} ({})",
                style("→").cyan(),
                args.input.display(),
                name,
                disposition.as_str()
            ),
            (None, Disposition::SkipMissingData { missing }) => eprintln!(
                "{} Rename skipped, missing: {}",
                style("⚠").yellow(),
                missing.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
            ),
            (None, disposition) => eprintln!("Rename: {}", disposition.as_str()),
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
