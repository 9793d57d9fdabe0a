//! Core library for Elektro electricity invoice extraction.
//!
//! This crate provides:
//! - PDF text extraction (lopdf + pdf-extract)
//! - Brazilian-locale number, date and header rules
//! - Line classification into energy and surcharge items
//! - Row fingerprints for idempotent upserts
//! - Configuration shared with the CLI

pub mod error;
pub mod models;
pub mod pdf;
pub mod invoice;

pub use error::{ConfigError, ExtractionError, FaturaError, PdfError, Result};
pub use models::row::{DocumentContext, LineItemRow, ROW_COLUMNS};
pub use models::config::{FaturaConfig, SupabaseSettings};
pub use pdf::{PdfExtractor, PdfProcessor};
pub use invoice::{ElektroInvoiceParser, ExtractionResult, InvoiceParser, RowFingerprint};
