//! Batch command - parallel extraction over many OCR text files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, error, warn};

use finscan_core::alias::AliasStore;
use finscan_core::extract::Extractor;
use finscan_core::models::config::TierThresholds;
use finscan_core::models::record::{ConfidenceTier, ExtractionRecord};
use finscan_core::rename::{apply_plan, Disposition, RenameSession};

use super::output::{format_record, styled_tier, OutputFormat, RecordView};
use super::{is_supported_input, load_config, read_document, store_path};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input glob pattern (e.g. "scans/*.txt")
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers (default: available cores)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Plan renames of the input files with this template
    #[arg(long)]
    rename: Option<String>,

    /// Apply the planned renames
    #[arg(long, requires = "rename")]
    apply: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Alias store file
    #[arg(long)]
    alias_store: Option<PathBuf>,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    record: Option<ExtractionRecord>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && is_supported_input(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let store = Arc::new(AliasStore::load(&store_path(args.alias_store.as_deref(), &config))?);
    let extractor = Arc::new(Extractor::from_config(&config.extraction));

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files",
            )?
            .progress_chars("=>-"),
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .build()?;

    let results = {
        let pb = pb.clone();
        tokio::task::spawn_blocking(move || {
            pool.install(|| {
                files
                    .par_iter()
                    .map(|path| {
                        let result = process_single_file(path, &extractor, &store);
                        pb.inc(1);
                        result
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await?
    };

    pb.finish_and_clear();

    let failed: Vec<&ProcessResult> = results.iter().filter(|r| r.error.is_some()).collect();
    if let Some(first) = failed.first().filter(|_| !args.continue_on_error) {
        let message = first.error.as_deref().unwrap_or("unknown error");
        error!("Failed to process {}: {}", first.path.display(), message);
        anyhow::bail!("Processing failed for {}: {}", first.path.display(), message);
    }

    let tiers = &config.extraction.tiers;
    let views: Vec<RecordView> = results
        .iter()
        .filter_map(|r| {
            r.record
                .as_ref()
                .map(|record| RecordView::new(record, tiers, false).with_file(file_name(&r.path)))
        })
        .collect();

    if let Some(output_dir) = &args.output_dir {
        for (result, view) in results.iter().filter(|r| r.record.is_some()).zip(&views) {
            let stem = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document");
            let output_path = output_dir.join(format!("{}.{}", stem, args.format.extension()));

            fs::write(&output_path, format_record(view, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results, tiers)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    if let Some(template) = &args.rename {
        rename_all(&results, template, args.apply)?;
    }

    print_summary(&results, tiers, start);

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(path: &Path, extractor: &Extractor, store: &AliasStore) -> ProcessResult {
    let file_start = Instant::now();

    let (record, error) = match read_document(path) {
        Ok(raw) => (Some(extractor.extract(&raw, store)), None),
        Err(e) => {
            warn!("Failed to read {}: {:#}", path.display(), e);
            (None, Some(format!("{:#}", e)))
        }
    };

    ProcessResult {
        path: path.to_path_buf(),
        record,
        error,
        processing_time_ms: file_start.elapsed().as_millis() as u64,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Plan renames per directory, in input order, against one listing
/// snapshot per directory; optionally apply them.
fn rename_all(results: &[ProcessResult], template: &str, apply: bool) -> anyhow::Result<()> {
    let mut sessions: BTreeMap<PathBuf, RenameSession> = BTreeMap::new();
    let (mut planned, mut renamed, mut skipped) = (0usize, 0usize, 0usize);

    println!();
    println!("{}", style("Rename plan:").bold());

    for result in results {
        let Some(record) = &result.record else {
            continue;
        };

        let dir = match result.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !sessions.contains_key(&dir) {
            sessions.insert(dir.clone(), RenameSession::from_dir(template, &dir)?);
        }
        let Some(session) = sessions.get_mut(&dir) else {
            continue;
        };

        let plan = session.plan(record, &result.path);
        match (&plan.proposed, &plan.disposition) {
            (None, Disposition::SkipMissingData { missing }) => {
                skipped += 1;
                println!(
                    "  {} {} (missing {})",
                    style("skip").yellow(),
                    file_name(&result.path),
                    missing.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
                );
            }
            (Some(name), disposition) => {
                planned += 1;
                println!(
                    "  {} {} -> {}{}",
                    style("plan").cyan(),
                    file_name(&result.path),
                    name,
                    match disposition {
                        Disposition::ConflictResolvedWithSuffix { suffix } => {
                            format!(" (suffix _{})", suffix)
                        }
                        _ => String::new(),
                    }
                );

                if apply {
                    match apply_plan(&plan, &dir) {
                        Ok(_) => renamed += 1,
                        Err(e) => {
                            warn!("{}", e);
                            println!("  {} {}", style("error").red(), e);
                        }
                    }
                }
            }
            (None, _) => skipped += 1,
        }
    }

    println!(
        "   {} planned, {} skipped{}",
        style(planned).green(),
        style(skipped).yellow(),
        if apply {
            format!(", {} renamed", style(renamed).green())
        } else {
            String::new()
        }
    );

    Ok(())
}

fn write_summary(
    path: &Path,
    results: &[ProcessResult],
    tiers: &TierThresholds,
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "company",
        "total",
        "date",
        "identifier",
        "confidence",
        "tier",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = file_name(&result.path);

        if let Some(record) = &result.record {
            let view = RecordView::new(record, tiers, false);
            wtr.write_record([
                filename.as_str(),
                "success",
                view.company.as_deref().unwrap_or(""),
                view.total.as_deref().unwrap_or(""),
                view.date.as_deref().unwrap_or(""),
                view.identifier.as_deref().unwrap_or(""),
                &format!("{:.4}", view.confidence),
                view.tier,
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename.as_str(),
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

fn print_summary(results: &[ProcessResult], tiers: &TierThresholds, start: Instant) {
    let mut by_tier: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut needs_review = Vec::new();

    for result in results {
        if let Some(record) = &result.record {
            let tier = record.tier(tiers);
            *by_tier.entry(tier.as_str()).or_default() += 1;
            if tier == ConfidenceTier::Low {
                needs_review.push(file_name(&result.path));
            }
        }
    }

    let succeeded = results.iter().filter(|r| r.record.is_some()).count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(succeeded).green(),
        style(results.len() - succeeded).red()
    );

    for tier in [ConfidenceTier::High, ConfidenceTier::Medium, ConfidenceTier::Low] {
        let count = by_tier.get(tier.as_str()).copied().unwrap_or(0);
        println!("   {:>4} {}", count, styled_tier(tier));
    }

    if !needs_review.is_empty() {
        println!();
        println!("{}", style("Low confidence, review manually:").yellow());
        for name in needs_review {
            println!("  - {}", name);
        }
    }
}
