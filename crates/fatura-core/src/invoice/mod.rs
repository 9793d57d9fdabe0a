//! Invoice line-item extraction.

pub mod fingerprint;
pub mod items;
mod parser;
pub mod rules;

pub use fingerprint::{compute_fingerprint, dedup_by_fingerprint, RowFingerprint};
pub use items::{classify_line, ItemRowBuilder, LineCategory};
pub use parser::{ElektroInvoiceParser, ExtractionResult, InvoiceParser};
