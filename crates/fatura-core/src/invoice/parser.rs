//! Document-level orchestration: text in, fingerprinted rows out.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;
use crate::models::row::{DocumentContext, DocumentFields, LineItemRow};
use crate::pdf::{PdfExtractor, PdfProcessor};

use super::items::ItemRowBuilder;
use super::rules::header::HEADER_SCAN_LINES;
use super::rules::{extract_balances, extract_header, resolve_tariff};

/// Result of extracting one invoice document.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Rows in line order.
    pub rows: Vec<LineItemRow>,
    /// Document-level fields shared by every row.
    pub document: DocumentFields,
    /// Extraction warnings (missing header fields, inferred flag, no items).
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for invoice parsing.
pub trait InvoiceParser {
    /// Parse the full text of one document.
    fn parse(&self, text: &str, context: &DocumentContext) -> Result<ExtractionResult>;
}

/// Rule-based parser for Elektro electricity invoices.
pub struct ElektroInvoiceParser {
    /// Number of leading lines searched for due date and total.
    header_scan_lines: usize,
}

impl ElektroInvoiceParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self {
            header_scan_lines: HEADER_SCAN_LINES,
        }
    }

    /// Set how many leading lines are searched for the header.
    pub fn with_header_scan_lines(mut self, lines: usize) -> Self {
        self.header_scan_lines = lines;
        self
    }

    /// Extract rows straight from PDF bytes.
    ///
    /// Page texts are joined with newlines in page order. An unreadable PDF
    /// fails the whole document.
    pub fn extract_pdf(&self, bytes: &[u8], context: &DocumentContext) -> Result<ExtractionResult> {
        let mut pdf = PdfExtractor::new();
        pdf.load(bytes)?;
        let pages = pdf.extract_pages()?;
        debug!("Extracted {} pages for {}", pages.len(), context.customer_code);
        self.parse(&pages.join("\n"), context)
    }

    fn document_fields(&self, text: &str, warnings: &mut Vec<String>) -> DocumentFields {
        let header = extract_header(text, self.header_scan_lines);
        if header.source_line.is_none() {
            warnings.push(format!(
                "No due date line in the first {} lines",
                self.header_scan_lines
            ));
        }

        let tariff = resolve_tariff(text);
        if tariff.inferred {
            warnings.push(format!("Tariff flag label not found, inferred '{}'", tariff.raw));
        }

        DocumentFields {
            header,
            tariff,
            balances: extract_balances(text),
        }
    }
}

impl Default for ElektroInvoiceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceParser for ElektroInvoiceParser {
    fn parse(&self, text: &str, context: &DocumentContext) -> Result<ExtractionResult> {
        let start = Instant::now();
        let mut warnings = Vec::new();

        info!(
            "Parsing invoice {}/{} from {} characters of text",
            context.customer_name,
            context.customer_code,
            text.len()
        );

        let document = self.document_fields(text, &mut warnings);
        let builder = ItemRowBuilder::new(context, &document);

        let rows: Vec<LineItemRow> = text
            .split('\n')
            .filter_map(|line| builder.build(line))
            .collect();

        if rows.is_empty() {
            warnings.push("No item lines found".to_string());
        }

        debug!(
            "Extracted {} rows for {} (due {}, total {})",
            rows.len(),
            context.customer_code,
            document.header.due_date,
            document.header.total
        );

        Ok(ExtractionResult {
            rows,
            document,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::rules::{DEFAULT_BALANCE, DEFAULT_DUE_DATE, DEFAULT_TOTAL};
    use pretty_assertions::assert_eq;

    const INVOICE: &str = "ELEKTRO REDES S.A.\n\
        Conta de energia\n\
        Vencimento 20/01/2025 Total a pagar R$ 1.234,56\n\
        Bandeira Tarifaria Vermelha Patamar 1 Amarela Patamar 2 (vigente)\n\
        Consumo Uso Sistema TUSD kWh 300 0,507690 152,31 3,18 152,31 18% 27,42 0,416310\n\
        Adicional AD.B.VERM1 kWh 100 0,80 80,00 1,30 60,00 10,80 0,050000\n\
        Energia injetada kWh 50 0,40\n\
        Multa por atraso 10,50\n\
        Contrib. Ilum Publica Municipal 25,30\n\
        Saldo Mes no (TP) Fora Ponta kWh 120\n\
        Saldo Acumulado no (TP) Fora Ponta kWh 4500\n\
        Saldo a Expirar Proximo Mes no (TP) Fora Ponta kWh 35\n";

    fn context() -> DocumentContext {
        DocumentContext::new("2025-01", "ACME LTDA", "123456").unwrap()
    }

    #[test]
    fn test_parse_invoice() {
        let result = ElektroInvoiceParser::new().parse(INVOICE, &context()).unwrap();

        let descriptions: Vec<&str> = result.rows.iter().map(|r| r.description()).collect();
        assert_eq!(
            descriptions,
            vec![
                "Consumo Uso Sistema TUSD",
                "Adicional AD.B.VERM1",
                "Multa por atraso 10",
                "Contrib. Ilum Publica Municipal 25",
            ]
        );
        assert_eq!(result.rows[1].unit_tariff(), "0,044630");
        assert_eq!(result.rows[2].value(), "10,50");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_document_fields_broadcast_to_every_row() {
        let result = ElektroInvoiceParser::new().parse(INVOICE, &context()).unwrap();
        assert!(result.rows.len() > 1);

        for row in &result.rows {
            assert_eq!(row.reference_month(), "2025-01");
            assert_eq!(row.customer_name(), "ACME LTDA");
            assert_eq!(row.customer_code(), "123456");
            assert_eq!(row.due_date(), "20/01/2025");
            assert_eq!(row.total(), "1.234,56");
            assert_eq!(row.tariff_flag_1(), "Vermelha Patamar 1");
            assert_eq!(row.tariff_flag_2(), "Amarela Patamar 2");
            assert_eq!(row.balance_current_month(), "120");
            assert_eq!(row.balance_accumulated(), "4500");
            assert_eq!(row.balance_expiring(), "35");
        }
    }

    #[test]
    fn test_short_energy_line_does_not_affect_document_fields() {
        let with_short = ElektroInvoiceParser::new().parse(INVOICE, &context()).unwrap();
        let without_short = INVOICE.replace("Energia injetada kWh 50 0,40\n", "");
        let without_short = ElektroInvoiceParser::new()
            .parse(&without_short, &context())
            .unwrap();

        assert_eq!(with_short.rows, without_short.rows);
        assert_eq!(with_short.document, without_short.document);
    }

    #[test]
    fn test_defaults_and_warnings() {
        let text = "Consumo kWh 100 0,75 75,00 1,20 50,00\n";
        let result = ElektroInvoiceParser::new().parse(text, &context()).unwrap();

        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.due_date(), DEFAULT_DUE_DATE);
        assert_eq!(row.total(), DEFAULT_TOTAL);
        assert_eq!(row.balance_expiring(), DEFAULT_BALANCE);
        assert_eq!(row.tariff_flag_1(), "Verde");
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_header_scan_limit() {
        let mut text = "linha\n".repeat(3);
        text.push_str("Vencimento 20/01/2025 Total 99,90\nJuros 1,00\n");

        let short = ElektroInvoiceParser::new()
            .with_header_scan_lines(2)
            .parse(&text, &context())
            .unwrap();
        assert_eq!(short.rows[0].due_date(), DEFAULT_DUE_DATE);

        let full = ElektroInvoiceParser::new().parse(&text, &context()).unwrap();
        assert_eq!(full.rows[0].due_date(), "20/01/2025");
        assert_eq!(full.rows[0].total(), "99,90");
    }

    #[test]
    fn test_empty_text_yields_no_rows() {
        let result = ElektroInvoiceParser::new().parse("\n\n", &context()).unwrap();

        assert!(result.rows.is_empty());
        assert_eq!(result.document.header.due_date, DEFAULT_DUE_DATE);
        assert_eq!(result.document.header.total, DEFAULT_TOTAL);
        assert_eq!(result.document.balances.current_month, DEFAULT_BALANCE);
        assert_eq!(result.document.tariff.description_1, "Verde");
        assert!(result.warnings.iter().any(|w| w == "No item lines found"));
    }

    #[test]
    fn test_unreadable_line_does_not_stop_the_document() {
        let text = "Consumo kWh 100 0,75 75,00 1,20 50,00\n\
            Energia kWh abc 1,0 x2 PIS 9,99 8,88 7,77 6,66 5,55\n\
            Multa 10,50\n";
        let result = ElektroInvoiceParser::new().parse(text, &context()).unwrap();

        let values: Vec<&str> = result.rows.iter().map(|r| r.value()).collect();
        assert_eq!(values, vec!["75,00", "10,50"]);
    }

    #[test]
    fn test_same_text_same_hashes() {
        let parser = ElektroInvoiceParser::new();
        let a = parser.parse(INVOICE, &context()).unwrap();
        let b = parser.parse(INVOICE, &context()).unwrap();
        let hashes = |r: &ExtractionResult| {
            r.rows.iter().map(|row| row.row_hash().to_string()).collect::<Vec<_>>()
        };
        assert_eq!(hashes(&a), hashes(&b));
    }
}
