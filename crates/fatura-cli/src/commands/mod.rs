//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod process;
pub mod sync;

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use tracing::debug;

use fatura_core::invoice::rules::parse_brl_amount;
use fatura_core::models::config::FaturaConfig;
use fatura_core::{ElektroInvoiceParser, LineItemRow};

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fatura")
        .join("config.json")
}

/// Load the config file, then apply environment overrides.
///
/// An explicit path must exist; the default path is optional.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FaturaConfig> {
    let mut config = match config_path {
        Some(path) => {
            let path = Path::new(path);
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            FaturaConfig::from_file(path)?
        }
        None => FaturaConfig::load_or_default(&default_config_path())?,
    };

    config.storage.merge_env(|name| std::env::var(name).ok());
    debug!("Effective storage config: {:?}", config.storage);

    Ok(config)
}

/// Build the invoice parser from configuration.
pub fn parser_for(config: &FaturaConfig) -> ElektroInvoiceParser {
    ElektroInvoiceParser::new().with_header_scan_lines(config.extraction.header_scan_lines)
}

/// Sum of the `value` column of rows whose value parses as an amount.
pub fn total_value(rows: &[LineItemRow]) -> Decimal {
    rows.iter().filter_map(|r| parse_brl_amount(r.value())).sum()
}

/// Format an amount the Brazilian way (`1.234,56`).
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}{},{}", if negative { "-" } else { "" }, grouped, frac_part)
}
