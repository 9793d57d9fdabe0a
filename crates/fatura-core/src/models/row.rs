//! Extracted invoice rows and the document identity they belong to.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::invoice::fingerprint::compute_fingerprint;
use crate::invoice::rules::{BalanceFields, HeaderFields, TariffDescriptor};

/// Identity of one invoice document: who and which billing month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContext {
    /// Reference month, `YYYY-MM`.
    pub reference_month: String,
    /// Customer (folder) name.
    pub customer_name: String,
    /// Customer code (consumer unit), usually the PDF file stem.
    pub customer_code: String,
}

impl DocumentContext {
    /// Build a context, checking the reference month is `YYYY-MM`.
    pub fn new(
        reference_month: impl Into<String>,
        customer_name: impl Into<String>,
        customer_code: impl Into<String>,
    ) -> Result<Self, ExtractionError> {
        let reference_month = reference_month.into().trim().to_string();
        validate_reference_month(&reference_month)?;

        Ok(Self {
            reference_month,
            customer_name: customer_name.into().trim().to_string(),
            customer_code: customer_code.into().trim().to_string(),
        })
    }

}

/// Strip a case-insensitive `.pdf` extension.
pub fn strip_pdf_extension(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(4)?;
    let (stem, ext) = (file_name.get(..split)?, file_name.get(split..)?);
    ext.eq_ignore_ascii_case(".pdf").then_some(stem)
}

/// The current month as `YYYY-MM`.
pub fn current_reference_month() -> String {
    Local::now().format("%Y-%m").to_string()
}

/// Check a reference month is a real `YYYY-MM` month.
pub fn validate_reference_month(month: &str) -> Result<(), ExtractionError> {
    let parsed = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d");
    if month.len() != 7 || parsed.is_err() {
        return Err(ExtractionError::InvalidContext {
            field: "reference month",
            value: month.to_string(),
        });
    }
    Ok(())
}

/// Fields shared by every row of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFields {
    pub header: HeaderFields,
    pub tariff: TariffDescriptor,
    pub balances: BalanceFields,
}

/// Per-line values computed by the item builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub description: String,
    pub unit: String,
    pub quantity: String,
    pub unit_price_with_taxes: String,
    pub value: String,
    pub pis_cofins: String,
    pub icms_base: String,
    pub icms_rate: String,
    pub icms_amount: String,
    pub unit_tariff: String,
}

/// One extracted invoice line, ready for upsert.
///
/// Numeric fields hold the invoice's own text (`1.234,56`). Rows are built
/// once and never modified; `row_hash` is computed at construction, so rows
/// can be serialized but not deserialized:
///
/// ```compile_fail
/// let row: fatura_core::LineItemRow = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemRow {
    #[serde(rename = "mes_ref")]
    reference_month: String,
    #[serde(rename = "cliente")]
    customer_name: String,
    #[serde(rename = "cod_cliente")]
    customer_code: String,
    #[serde(rename = "vencimento")]
    due_date: String,
    #[serde(rename = "total_pagar")]
    total: String,
    #[serde(rename = "item_fatura")]
    description: String,
    #[serde(rename = "unid")]
    unit: String,
    #[serde(rename = "quantidade")]
    quantity: String,
    #[serde(rename = "preco_unit_com_trib")]
    unit_price_with_taxes: String,
    #[serde(rename = "valor_rs")]
    value: String,
    #[serde(rename = "pis_confins")]
    pis_cofins: String,
    #[serde(rename = "base_calc_icms")]
    icms_base: String,
    #[serde(rename = "aliquota_icms")]
    icms_rate: String,
    #[serde(rename = "icms_valor")]
    icms_amount: String,
    #[serde(rename = "tarifa_unit")]
    unit_tariff: String,
    #[serde(rename = "bandeira_desc_1")]
    tariff_flag_1: String,
    #[serde(rename = "bandeira_desc_2")]
    tariff_flag_2: String,
    #[serde(rename = "saldo_mes")]
    balance_current_month: String,
    #[serde(rename = "saldo_acumulado")]
    balance_accumulated: String,
    #[serde(rename = "saldo_expirar")]
    balance_expiring: String,
    row_hash: String,
}

/// Column names of the persisted row, in wire order.
pub const ROW_COLUMNS: [&str; 21] = [
    "mes_ref",
    "cliente",
    "cod_cliente",
    "vencimento",
    "total_pagar",
    "item_fatura",
    "unid",
    "quantidade",
    "preco_unit_com_trib",
    "valor_rs",
    "pis_confins",
    "base_calc_icms",
    "aliquota_icms",
    "icms_valor",
    "tarifa_unit",
    "bandeira_desc_1",
    "bandeira_desc_2",
    "saldo_mes",
    "saldo_acumulado",
    "saldo_expirar",
    "row_hash",
];

impl LineItemRow {
    /// Assemble a row from document-level and item-level fields.
    pub fn new(context: &DocumentContext, document: &DocumentFields, item: ItemFields) -> Self {
        let mut row = Self {
            reference_month: context.reference_month.clone(),
            customer_name: context.customer_name.clone(),
            customer_code: context.customer_code.clone(),
            due_date: document.header.due_date.clone(),
            total: document.header.total.clone(),
            description: item.description,
            unit: item.unit,
            quantity: item.quantity,
            unit_price_with_taxes: item.unit_price_with_taxes,
            value: item.value,
            pis_cofins: item.pis_cofins,
            icms_base: item.icms_base,
            icms_rate: item.icms_rate,
            icms_amount: item.icms_amount,
            unit_tariff: item.unit_tariff,
            tariff_flag_1: document.tariff.description_1.clone(),
            tariff_flag_2: document.tariff.description_2.clone(),
            balance_current_month: document.balances.current_month.clone(),
            balance_accumulated: document.balances.accumulated.clone(),
            balance_expiring: document.balances.expiring.clone(),
            row_hash: String::new(),
        };
        row.row_hash = compute_fingerprint(&row).into_string();
        row
    }

    pub fn reference_month(&self) -> &str {
        &self.reference_month
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_code(&self) -> &str {
        &self.customer_code
    }

    pub fn due_date(&self) -> &str {
        &self.due_date
    }

    /// Amount to pay for the whole invoice.
    pub fn total(&self) -> &str {
        &self.total
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    pub fn unit_price_with_taxes(&self) -> &str {
        &self.unit_price_with_taxes
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn pis_cofins(&self) -> &str {
        &self.pis_cofins
    }

    pub fn icms_base(&self) -> &str {
        &self.icms_base
    }

    pub fn icms_rate(&self) -> &str {
        &self.icms_rate
    }

    pub fn icms_amount(&self) -> &str {
        &self.icms_amount
    }

    pub fn unit_tariff(&self) -> &str {
        &self.unit_tariff
    }

    pub fn tariff_flag_1(&self) -> &str {
        &self.tariff_flag_1
    }

    pub fn tariff_flag_2(&self) -> &str {
        &self.tariff_flag_2
    }

    pub fn balance_current_month(&self) -> &str {
        &self.balance_current_month
    }

    pub fn balance_accumulated(&self) -> &str {
        &self.balance_accumulated
    }

    pub fn balance_expiring(&self) -> &str {
        &self.balance_expiring
    }

    /// Fingerprint used as the upsert conflict key.
    pub fn row_hash(&self) -> &str {
        &self.row_hash
    }

    /// Values in [`ROW_COLUMNS`] order.
    pub fn to_record(&self) -> [&str; 21] {
        [
            self.reference_month.as_str(),
            self.customer_name.as_str(),
            self.customer_code.as_str(),
            self.due_date.as_str(),
            self.total.as_str(),
            self.description.as_str(),
            self.unit.as_str(),
            self.quantity.as_str(),
            self.unit_price_with_taxes.as_str(),
            self.value.as_str(),
            self.pis_cofins.as_str(),
            self.icms_base.as_str(),
            self.icms_rate.as_str(),
            self.icms_amount.as_str(),
            self.unit_tariff.as_str(),
            self.tariff_flag_1.as_str(),
            self.tariff_flag_2.as_str(),
            self.balance_current_month.as_str(),
            self.balance_accumulated.as_str(),
            self.balance_expiring.as_str(),
            self.row_hash.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item() -> ItemFields {
        ItemFields {
            description: "Consumo".to_string(),
            unit: "kWh".to_string(),
            quantity: "100".to_string(),
            unit_price_with_taxes: "0,75".to_string(),
            value: "75,00".to_string(),
            pis_cofins: "1,20".to_string(),
            icms_base: "50,00".to_string(),
            icms_rate: "18%".to_string(),
            icms_amount: "0,00".to_string(),
            unit_tariff: "0,75".to_string(),
        }
    }

    #[test]
    fn test_context_trims_fields() {
        let ctx = DocumentContext::new(" 2025-01 ", " ACME LTDA ", "123456 ").unwrap();
        assert_eq!(ctx.reference_month, "2025-01");
        assert_eq!(ctx.customer_name, "ACME LTDA");
        assert_eq!(ctx.customer_code, "123456");
    }

    #[test]
    fn test_strip_pdf_extension() {
        assert_eq!(strip_pdf_extension("123456.PDF"), Some("123456"));
        assert_eq!(strip_pdf_extension("123456.txt"), None);
        assert_eq!(strip_pdf_extension("pdf"), None);
    }

    #[test]
    fn test_reference_month_validation() {
        assert!(validate_reference_month("2025-12").is_ok());
        assert!(validate_reference_month("2025-1").is_err());
        assert!(validate_reference_month("12/2025").is_err());
        assert!(DocumentContext::new("janeiro", "A", "1").is_err());
    }

    #[test]
    fn test_current_reference_month_shape() {
        assert!(validate_reference_month(&current_reference_month()).is_ok());
    }

    #[test]
    fn test_row_wire_format() {
        let ctx = DocumentContext::new("2025-01", "ACME", "123").unwrap();
        let row = LineItemRow::new(&ctx, &DocumentFields::default(), item());

        let json = serde_json::to_value(&row).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), ROW_COLUMNS.len());
        for column in ROW_COLUMNS {
            assert!(obj.contains_key(column), "missing column {column}");
        }
        assert_eq!(obj["vencimento"], "N/A");
        assert_eq!(obj["saldo_mes"], "0");
        assert_eq!(obj["row_hash"], row.row_hash());
        assert_eq!(row.row_hash().len(), 64);
    }

    #[test]
    fn test_record_matches_columns() {
        let ctx = DocumentContext::new("2025-01", "ACME", "123").unwrap();
        let row = LineItemRow::new(&ctx, &DocumentFields::default(), item());
        let record = row.to_record();
        assert_eq!(record[0], "2025-01");
        assert_eq!(record[7], "100");
        assert_eq!(record[20], row.row_hash());
    }
}
