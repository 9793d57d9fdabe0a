//! Batch processing command for a local tree of invoice PDFs.
//!
//! Files are expected at `<YYYY-MM>/<customer>/<code>.pdf`; all rows are
//! written to one consolidated file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use fatura_core::models::row::{current_reference_month, validate_reference_month};
use fatura_core::{DocumentContext, ElektroInvoiceParser, ExtractionResult, LineItemRow};

use super::process::{context_for, format_rows, OutputFormat};
use super::{format_brl, load_config, parser_for, total_value};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input PDFs (e.g. "faturas/2025-01/**/*.pdf")
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Format of the consolidated rows file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Reference month for every file (default: from the folder layout)
    #[arg(long)]
    mes_ref: Option<String>,

    /// Also generate a per-file summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    extraction: Option<ExtractionResult>,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Expand glob pattern
    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let output_dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let parser = parser_for(&config);
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        match process_single_file(&path, &parser, args.mes_ref.as_deref()) {
            Ok(extraction) => {
                for warning in &extraction.warnings {
                    debug!("{}: {}", path.display(), warning);
                }
                results.push(FileResult {
                    path,
                    extraction: Some(extraction),
                    error: None,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(FileResult {
                        path,
                        extraction: None,
                        error: Some(error_msg),
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing {} failed: {}", path.display(), error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    let rows: Vec<LineItemRow> = results
        .iter()
        .filter_map(|r| r.extraction.as_ref())
        .flat_map(|e| e.rows.iter().cloned())
        .collect();

    let rows_path = output_dir.join(format!("rows.{}", args.format.extension()));
    fs::write(&rows_path, format_rows(&rows, args.format)?)?;
    println!(
        "{} {} rows written to {}",
        style("✓").green(),
        rows.len(),
        rows_path.display()
    );

    if args.summary {
        let summary_path = output_dir.join("summary.csv");
        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, items sum R$ {}",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red(),
        format_brl(total_value(&rows))
    );

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

fn process_single_file(
    path: &Path,
    parser: &ElektroInvoiceParser,
    mes_ref: Option<&str>,
) -> anyhow::Result<ExtractionResult> {
    let context = batch_context(path, mes_ref)?;
    let data = fs::read(path)?;
    Ok(parser.extract_pdf(&data, &context)?)
}

/// Identity of a file laid out as `<YYYY-MM>/<customer>/<code>.pdf`.
///
/// `--mes-ref` wins over the folder; without either the current month is
/// used.
fn batch_context(path: &Path, mes_ref: Option<&str>) -> anyhow::Result<DocumentContext> {
    let folder_month = path
        .parent()
        .and_then(Path::parent)
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .filter(|m| validate_reference_month(m).is_ok());

    let month = match (mes_ref, folder_month) {
        (Some(explicit), _) => explicit.to_string(),
        (None, Some(folder)) => folder.to_string(),
        (None, None) => {
            let current = current_reference_month();
            warn!(
                "No YYYY-MM folder above {}, using {}",
                path.display(),
                current
            );
            current
        }
    };

    context_for(path, Some(&month), None, None)
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "mes_ref",
        "cliente",
        "cod_cliente",
        "vencimento",
        "total_pagar",
        "rows",
        "warnings",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result.path.display().to_string();

        match (&result.extraction, result.first_row()) {
            (Some(extraction), Some(first)) => {
                wtr.write_record([
                    filename.as_str(),
                    "success",
                    first.reference_month(),
                    first.customer_name(),
                    first.customer_code(),
                    extraction.document.header.due_date.as_str(),
                    extraction.document.header.total.as_str(),
                    &extraction.rows.len().to_string(),
                    &extraction.warnings.len().to_string(),
                    &extraction.processing_time_ms.to_string(),
                    "",
                ])?;
            }
            (Some(extraction), None) => {
                wtr.write_record([
                    filename.as_str(),
                    "empty",
                    "",
                    "",
                    "",
                    extraction.document.header.due_date.as_str(),
                    extraction.document.header.total.as_str(),
                    "0",
                    &extraction.warnings.len().to_string(),
                    &extraction.processing_time_ms.to_string(),
                    "",
                ])?;
            }
            (None, _) => {
                wtr.write_record([
                    filename.as_str(),
                    "error",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "0",
                    "0",
                    "",
                    result.error.as_deref().unwrap_or(""),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

impl FileResult {
    fn first_row(&self) -> Option<&LineItemRow> {
        self.extraction.as_ref().and_then(|e| e.rows.first())
    }
}
