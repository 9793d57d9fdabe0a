//! Rule-based field extractors for Elektro electricity invoices.

pub mod numbers;
pub mod sanitize;
pub mod header;
pub mod tariff;
pub mod balances;
pub mod patterns;

pub use numbers::{extract_numbers, parse_brl_amount, NumberTokenizer};
pub use sanitize::sanitize_line;
pub use header::{extract_header, HeaderFields, DEFAULT_DUE_DATE, DEFAULT_TOTAL};
pub use tariff::{infer_descriptor, resolve_tariff, split_descriptor, TariffDescriptor};
pub use balances::{extract_balances, BalanceFields, DEFAULT_BALANCE};
pub use patterns::*;

/// Take an extracted value, or fall back to a named default.
pub fn value_or(found: Option<&str>, default: &str) -> String {
    match found {
        Some(value) => value.to_string(),
        None => default.to_string(),
    }
}
