//! Due date and amount to pay, read from the top of the invoice.

use super::patterns::{HEADER_DATE, HEADER_TOTAL};
use super::value_or;

/// Due date used when no header line qualifies.
pub const DEFAULT_DUE_DATE: &str = "N/A";

/// Total used when no header line qualifies.
pub const DEFAULT_TOTAL: &str = "0,00";

/// Number of leading lines searched for the header.
pub const HEADER_SCAN_LINES: usize = 25;

/// Document-level header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFields {
    /// Due date (vencimento), `dd/mm/yyyy`.
    pub due_date: String,
    /// Amount to pay (total a pagar).
    pub total: String,
    /// Index of the line the fields came from.
    pub source_line: Option<usize>,
}

impl Default for HeaderFields {
    fn default() -> Self {
        Self {
            due_date: DEFAULT_DUE_DATE.to_string(),
            total: DEFAULT_TOTAL.to_string(),
            source_line: None,
        }
    }
}

/// Extract due date and total from the first `scan_lines` lines.
///
/// The first line carrying a full date and a comma wins; on it the last date
/// is the due date and the last currency value the total.
pub fn extract_header(text: &str, scan_lines: usize) -> HeaderFields {
    for (idx, line) in text.split('\n').take(scan_lines).enumerate() {
        if !HEADER_DATE.is_match(line) || !line.contains(',') {
            continue;
        }

        let due_date = HEADER_DATE.find_iter(line).last().map(|m| m.as_str());
        let total = HEADER_TOTAL.find_iter(line).last().map(|m| m.as_str());

        return HeaderFields {
            due_date: value_or(due_date, DEFAULT_DUE_DATE),
            total: value_or(total, DEFAULT_TOTAL),
            source_line: Some(idx),
        };
    }

    HeaderFields::default()
}
