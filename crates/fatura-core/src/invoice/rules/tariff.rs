//! Tariff flag (bandeira tarifária) resolution.
//!
//! The invoice prints something like `Bandeira Tarifaria Vermelha Patamar 1
//! Amarela (...)`. Only the unaccented label is read; the accented
//! `Tarifária` does not match and, like a missing label, falls back to
//! guessing from flag names anywhere in the document (green by default).

use super::patterns::{TARIFF_FLAG_LABEL, TARIFF_FLAG_NAME};

/// Descriptor used for red and yellow flags in the same period.
pub const FLAG_RED_YELLOW: &str = "Vermelha Amarela";
pub const FLAG_RED: &str = "Vermelha";
pub const FLAG_YELLOW: &str = "Amarela";
pub const FLAG_GREEN: &str = "Verde";

/// Resolved tariff flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TariffDescriptor {
    /// Raw descriptor text.
    pub raw: String,
    /// First flag chunk.
    pub description_1: String,
    /// Second flag chunk, empty when the period had a single flag.
    pub description_2: String,
    /// Whether `raw` was inferred instead of read from the label.
    pub inferred: bool,
}

/// Resolve the tariff descriptor of a document and split it.
pub fn resolve_tariff(text: &str) -> TariffDescriptor {
    let (raw, inferred) = match TARIFF_FLAG_LABEL.captures(text) {
        Some(caps) => (caps[1].trim().to_string(), false),
        None => (infer_descriptor(text).to_string(), true),
    };

    let (description_1, description_2) = split_descriptor(&raw);

    TariffDescriptor {
        raw,
        description_1,
        description_2,
        inferred,
    }
}

/// Guess the descriptor from flag names present anywhere in the text.
pub fn infer_descriptor(text: &str) -> &'static str {
    let upper = text.to_uppercase();
    let red = upper.contains("VERM");
    let yellow = upper.contains("AMAR");

    match (red, yellow) {
        (true, true) => FLAG_RED_YELLOW,
        (true, false) => FLAG_RED,
        (false, true) => FLAG_YELLOW,
        (false, false) => FLAG_GREEN,
    }
}

/// Split a descriptor into up to two chunks, each starting at a flag name.
///
/// Without any flag name the whole descriptor is the first chunk.
pub fn split_descriptor(raw: &str) -> (String, String) {
    let s = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.is_empty() {
        return (String::new(), String::new());
    }

    let starts: Vec<usize> = TARIFF_FLAG_NAME.find_iter(&s).map(|m| m.start()).collect();
    if starts.is_empty() {
        return (s, String::new());
    }

    let mut chunks = starts.iter().enumerate().filter_map(|(idx, &start)| {
        let end = starts.get(idx + 1).copied().unwrap_or(s.len());
        let chunk = s[start..end].trim();
        (!chunk.is_empty()).then(|| chunk.to_string())
    });

    let first = chunks.next().unwrap_or_default();
    let second = chunks.next().unwrap_or_default();
    (first, second)
}
