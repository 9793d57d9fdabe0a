//! Data models: extracted rows and configuration.

pub mod config;
pub mod row;

pub use config::{
    ExtractionConfig, FaturaConfig, StorageConfig, SupabaseSettings, SyncConfig,
};
pub use row::{
    current_reference_month, strip_pdf_extension, DocumentContext, DocumentFields, ItemFields,
    LineItemRow, ROW_COLUMNS,
};
