//! Line classification and row building for invoice items.
//!
//! Two line shapes carry billable items:
//!
//! - energy lines (`kWh`, `Wh`, `ENERGIA`): description, unit, then a run of
//!   numbers read positionally as quantity, unit price with taxes, value,
//!   PIS/COFINS, ICMS base, ICMS amount and unit tariff;
//! - surcharge/fee lines (public lighting, fines, interest, returned
//!   payments): only the last number on the line is kept, as the value.

use tracing::trace;

use crate::models::row::{DocumentContext, DocumentFields, ItemFields, LineItemRow};

use super::rules::numbers::extract_numbers;
use super::rules::patterns::{
    ICMS_RATE, ITEM_DESC_BEFORE_NUMBER, ITEM_DESC_BEFORE_UNIT, WITHHOLDING_TAX_LABEL,
};
use super::rules::sanitize::sanitize_line;

/// Keywords (uppercase) marking an energy line.
const ENERGY_KEYWORDS: [&str; 3] = ["KWH", "WH ", "ENERGIA"];

/// Keywords (uppercase) marking a surcharge or fee line.
const SURCHARGE_KEYWORDS: [&str; 7] = [
    "ILUMINAÇÃO",
    "ILUM P",
    "MULTA",
    "JUROS",
    "DEVOL",
    "ILUM PUBLICA",
    "COBRANCA ILUM",
];

/// Longest surcharge description, in characters.
const SURCHARGE_DESCRIPTION_CHARS: usize = 60;

/// Placeholder for fields that do not apply to a line.
pub const PLACEHOLDER: &str = "-";
pub const DEFAULT_TAX_AMOUNT: &str = "0,00";
pub const DEFAULT_TAX_RATE: &str = "0%";
const DEFAULT_DESCRIPTION: &str = "Item";

/// Fixed unit tariffs for tariff-flag surcharge programs, keyed by the code
/// found in the item description. First match wins.
const FIXED_UNIT_TARIFFS: [(&str, &str); 2] = [("AD.B.VERM1", "0,044630"), ("AD.B.AMAR", "0,018850")];

/// Category of an invoice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCategory {
    /// Energy consumption/injection/flag line.
    Energy,
    /// Public lighting, fine, interest or returned-payment line.
    Surcharge,
    /// Anything else.
    Other,
}

/// Classify a line. Energy keywords take precedence over surcharge ones.
pub fn classify_line(line: &str) -> LineCategory {
    let upper = line.to_uppercase();

    if ENERGY_KEYWORDS.iter().any(|k| upper.contains(k)) {
        LineCategory::Energy
    } else if SURCHARGE_KEYWORDS.iter().any(|k| upper.contains(k)) {
        LineCategory::Surcharge
    } else {
        LineCategory::Other
    }
}

/// Builds rows for one document, merging its document-level fields.
pub struct ItemRowBuilder<'a> {
    context: &'a DocumentContext,
    document: &'a DocumentFields,
}

impl<'a> ItemRowBuilder<'a> {
    pub fn new(context: &'a DocumentContext, document: &'a DocumentFields) -> Self {
        Self { context, document }
    }

    /// Build the row for a line, if it is an item line.
    ///
    /// `None` means the line carries no item: wrong category, too few
    /// numbers, or a shape the mappings cannot read. Only that line is lost.
    pub fn build(&self, line: &str) -> Option<LineItemRow> {
        let item = match classify_line(line) {
            LineCategory::Energy => energy_item(line),
            LineCategory::Surcharge => surcharge_item(line),
            LineCategory::Other => None,
        }?;

        Some(LineItemRow::new(self.context, self.document, item))
    }
}

fn energy_item(line: &str) -> Option<ItemFields> {
    let numeric_part = match WITHHOLDING_TAX_LABEL.find(line) {
        Some(m) => &line[..m.start()],
        None => line,
    };
    let tokens = extract_numbers(&sanitize_line(numeric_part));

    // The first five numbers are required, the next two are optional.
    let [quantity, unit_price, value, pis_cofins, icms_base, rest @ ..] = tokens.as_slice() else {
        trace!("Energy line with {} numbers dropped: {}", tokens.len(), line);
        return None;
    };

    let description = energy_description(line);
    let unit_tariff = fixed_unit_tariff(&description)
        .or_else(|| rest.get(1).map(String::as_str))
        .unwrap_or(unit_price.as_str());

    Some(ItemFields {
        unit: energy_unit(line).to_string(),
        quantity: quantity.clone(),
        unit_price_with_taxes: unit_price.clone(),
        value: value.clone(),
        pis_cofins: pis_cofins.clone(),
        icms_base: icms_base.clone(),
        icms_rate: icms_rate(line),
        icms_amount: rest
            .first()
            .map_or(DEFAULT_TAX_AMOUNT, String::as_str)
            .to_string(),
        unit_tariff: unit_tariff.to_string(),
        description,
    })
}

/// Text before the unit marker, else before the first number, else the
/// first word.
fn energy_description(line: &str) -> String {
    let captured = ITEM_DESC_BEFORE_UNIT
        .captures(line)
        .or_else(|| ITEM_DESC_BEFORE_NUMBER.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim());

    match captured {
        Some(desc) => desc.to_string(),
        None => line
            .split_whitespace()
            .next()
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string(),
    }
}

fn energy_unit(line: &str) -> &'static str {
    let upper = line.to_uppercase();
    if upper.contains("KWH") {
        "kWh"
    } else if upper.contains("WH") {
        "Wh"
    } else {
        PLACEHOLDER
    }
}

fn icms_rate(line: &str) -> String {
    ICMS_RATE
        .find(line)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_TAX_RATE.to_string())
}

fn fixed_unit_tariff(description: &str) -> Option<&'static str> {
    let upper = description.to_uppercase();
    FIXED_UNIT_TARIFFS
        .iter()
        .find(|(code, _)| upper.contains(code))
        .map(|(_, tariff)| *tariff)
}

fn surcharge_item(line: &str) -> Option<ItemFields> {
    let tokens = extract_numbers(&sanitize_line(line));
    let value = tokens.last()?.clone();

    let head: String = line.chars().take(SURCHARGE_DESCRIPTION_CHARS).collect();
    let description = head.split(',').next().unwrap_or_default().trim().to_string();

    Some(ItemFields {
        description,
        unit: PLACEHOLDER.to_string(),
        quantity: PLACEHOLDER.to_string(),
        unit_price_with_taxes: PLACEHOLDER.to_string(),
        value,
        pis_cofins: DEFAULT_TAX_AMOUNT.to_string(),
        icms_base: DEFAULT_TAX_AMOUNT.to_string(),
        icms_rate: DEFAULT_TAX_RATE.to_string(),
        icms_amount: DEFAULT_TAX_AMOUNT.to_string(),
        unit_tariff: PLACEHOLDER.to_string(),
    })
}
