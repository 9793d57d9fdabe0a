//! Process command - extract line items from a single invoice PDF.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use fatura_core::models::row::current_reference_month;
use fatura_core::{DocumentContext, ExtractionResult, LineItemRow, ROW_COLUMNS};

use super::{format_brl, load_config, parser_for, total_value};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Reference month, YYYY-MM (default: current month)
    #[arg(long)]
    mes_ref: Option<String>,

    /// Customer name (default: parent folder name)
    #[arg(long)]
    cliente: Option<String>,

    /// Customer code (default: file name without extension)
    #[arg(long)]
    cod_cliente: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array of rows
    Json,
    /// CSV with one row per line item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let context = context_for(
        &args.input,
        args.mes_ref.as_deref(),
        args.cliente.as_deref(),
        args.cod_cliente.as_deref(),
    )?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.set_message("Extracting line items...");

    let data = fs::read(&args.input)?;
    let result = parser_for(&config).extract_pdf(&data, &context)?;

    pb.finish_and_clear();

    for warning in &result.warnings {
        warn!("{}: {}", args.input.display(), warning);
    }

    let output = format_rows(&result.rows, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} {} rows written to {}",
            style("✓").green(),
            result.rows.len(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    print_summary(&result);
    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Document identity for a local file: explicit values win, then the
/// parent folder (customer) and file stem (code).
pub fn context_for(
    path: &Path,
    mes_ref: Option<&str>,
    cliente: Option<&str>,
    cod_cliente: Option<&str>,
) -> anyhow::Result<DocumentContext> {
    let folder = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let month = mes_ref.map(str::to_string).unwrap_or_else(current_reference_month);
    let context = DocumentContext::new(
        month,
        cliente.unwrap_or(folder),
        cod_cliente.unwrap_or(stem),
    )?;
    Ok(context)
}

fn print_summary(result: &ExtractionResult) {
    eprintln!(
        "{} {} rows, due {}, total R$ {}, items sum R$ {} ({}ms)",
        style("ℹ").blue(),
        result.rows.len(),
        result.document.header.due_date,
        result.document.header.total,
        format_brl(total_value(&result.rows)),
        result.processing_time_ms
    );
}

pub fn format_rows(rows: &[LineItemRow], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
        OutputFormat::Csv => format_csv(rows),
        OutputFormat::Text => Ok(format_text(rows)),
    }
}

fn format_csv(rows: &[LineItemRow]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(ROW_COLUMNS)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(rows: &[LineItemRow]) -> String {
    let Some(first) = rows.first() else {
        return "No line items found\n".to_string();
    };

    let mut output = String::new();

    output.push_str(&format!(
        "Customer: {} ({})\n",
        first.customer_name(),
        first.customer_code()
    ));
    output.push_str(&format!("Month: {}\n", first.reference_month()));
    output.push_str(&format!("Due: {}\n", first.due_date()));
    output.push_str(&format!("Total: R$ {}\n", first.total()));
    output.push_str(&format!(
        "Tariff flag: {} {}\n",
        first.tariff_flag_1(),
        first.tariff_flag_2()
    ));
    output.push('\n');

    output.push_str("Items:\n");
    for row in rows {
        output.push_str(&format!(
            "  {:<40} {:>4} {:>10} {:>12}\n",
            row.description(),
            row.unit(),
            row.quantity(),
            row.value()
        ));
    }
    output.push('\n');

    output.push_str(&format!(
        "Balances (kWh): month {}, accumulated {}, expiring {}\n",
        first.balance_current_month(),
        first.balance_accumulated(),
        first.balance_expiring()
    ));

    output
}
