//! Sync command - extract a month of invoices from Supabase Storage and
//! upsert the rows.

use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use fatura_core::invoice::dedup_by_fingerprint;
use fatura_core::models::row::{current_reference_month, validate_reference_month};
use fatura_core::{ElektroInvoiceParser, ExtractionResult, LineItemRow};

use super::{format_brl, load_config, parser_for, total_value};
use crate::supabase::{MonthDocument, RestClient, StorageClient};

/// Arguments for the sync command.
#[derive(Args)]
pub struct SyncArgs {
    /// Reference month, YYYY-MM (default: current month)
    #[arg(long)]
    mes_ref: Option<String>,

    /// Storage bucket (default: SUPABASE_STORAGE_BUCKET)
    #[arg(long)]
    bucket: Option<String>,

    /// Extract only; do not write to the database
    #[arg(long)]
    dry_run: bool,

    /// Rows per upsert request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Documents downloaded and extracted in parallel
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

pub async fn run(args: SyncArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = load_config(config_path)?;

    if let Some(bucket) = args.bucket.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        config.storage.bucket = Some(bucket.to_string());
    }
    let settings = config.supabase_settings()?;

    let mes_ref = args
        .mes_ref
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(current_reference_month);
    validate_reference_month(&mes_ref)?;

    let batch_size = args.batch_size.unwrap_or(config.sync.batch_size).max(1);
    let jobs = args.jobs.unwrap_or(config.sync.jobs).max(1);

    println!(
        "{} url={} table={} bucket={} mes_ref={}",
        style("ℹ").blue(),
        settings.url,
        settings.table,
        settings.bucket,
        mes_ref
    );

    // 1) list the month's PDFs
    let storage = StorageClient::new(&settings, &config.sync)?;
    let documents = storage.list_month_documents(&mes_ref).await?;
    if documents.is_empty() {
        println!(
            "{} No PDFs found in storage for {}",
            style("ℹ").blue(),
            mes_ref
        );
        return Ok(());
    }

    println!(
        "{} Found {} PDFs in storage",
        style("ℹ").blue(),
        documents.len()
    );

    // 2) download and extract
    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let parser = Arc::new(parser_for(&config));
    let storage = &storage;
    let month = mes_ref.as_str();

    let mut outcomes: Vec<(MonthDocument, anyhow::Result<ExtractionResult>)> =
        stream::iter(documents)
            .map(|doc| {
                let parser = Arc::clone(&parser);
                let pb = pb.clone();
                async move {
                    pb.set_message(doc.object_key.clone());
                    let outcome = extract_document(storage, parser, &doc, month).await;
                    pb.inc(1);
                    (doc, outcome)
                }
            })
            .buffer_unordered(jobs)
            .collect()
            .await;

    pb.finish_and_clear();
    outcomes.sort_by(|a, b| a.0.object_key.cmp(&b.0.object_key));

    let mut rows: Vec<LineItemRow> = Vec::new();
    let mut failed = 0;
    for (doc, outcome) in outcomes {
        match outcome {
            Ok(extraction) => {
                debug!(
                    "{}: {} rows, {} warnings",
                    doc.object_key,
                    extraction.rows.len(),
                    extraction.warnings.len()
                );
                rows.extend(extraction.rows);
            }
            Err(e) => {
                warn!("Failed to process {}: {:#}", doc.object_key, e);
                failed += 1;
            }
        }
    }

    if rows.is_empty() {
        println!(
            "{} No data extracted from the PDFs ({} failed)",
            style("ℹ").blue(),
            failed
        );
        return Ok(());
    }

    let extracted = rows.len();
    let rows = dedup_by_fingerprint(rows);
    if rows.len() < extracted {
        info!("Dropped {} rows with repeated fingerprints", extracted - rows.len());
    }

    println!(
        "{} {} rows extracted ({} failed documents), items sum R$ {}",
        style("ℹ").blue(),
        rows.len(),
        failed,
        format_brl(total_value(&rows))
    );

    if args.dry_run {
        println!("{} Dry run, nothing was written.", style("ℹ").yellow());
        return Ok(());
    }

    // 3) upsert
    let rest = RestClient::new(&settings, &config.sync)?;
    let upload_pb = ProgressBar::new(rows.len() as u64);
    upload_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} rows")
            .unwrap()
            .progress_chars("=>-"),
    );

    let sent = rest
        .upsert(&rows, batch_size, |n| upload_pb.inc(n as u64))
        .await?;
    upload_pb.finish_and_clear();

    println!(
        "{} Upsert complete. {} rows sent to {} in {:?}",
        style("✓").green(),
        sent,
        settings.table,
        start.elapsed()
    );

    Ok(())
}

/// Download one PDF and extract it off the async runtime.
async fn extract_document(
    storage: &StorageClient,
    parser: Arc<ElektroInvoiceParser>,
    doc: &MonthDocument,
    month: &str,
) -> anyhow::Result<ExtractionResult> {
    let context = doc.context(month)?;
    let bytes = storage.download(&doc.object_key).await?;

    let result =
        tokio::task::spawn_blocking(move || parser.extract_pdf(&bytes, &context)).await??;
    Ok(result)
}
