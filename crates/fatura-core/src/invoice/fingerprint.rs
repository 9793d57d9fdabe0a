//! Row fingerprints for idempotent upserts.

use std::collections::HashSet;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::models::row::LineItemRow;

/// Separator between key fields; does not occur in invoice text.
const FIELD_SEPARATOR: &str = "|";

/// Hex SHA-256 digest identifying a logical invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowFingerprint(String);

impl RowFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RowFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a row from its ten key fields.
///
/// Document totals, taxes, tariff flags and balances are not part of the
/// key: re-reading the same line yields the same hash even if those drift.
pub fn compute_fingerprint(row: &LineItemRow) -> RowFingerprint {
    fingerprint_fields(&[
        row.reference_month(),
        row.customer_name(),
        row.customer_code(),
        row.due_date(),
        row.description(),
        row.unit(),
        row.quantity(),
        row.unit_price_with_taxes(),
        row.value(),
        row.unit_tariff(),
    ])
}

/// Fingerprint an ordered list of key values (each trimmed).
pub fn fingerprint_fields(fields: &[&str]) -> RowFingerprint {
    let raw = fields
        .iter()
        .map(|f| f.trim())
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR);

    RowFingerprint(format!("{:x}", Sha256::digest(raw.as_bytes())))
}

/// Drop rows whose fingerprint was already seen, keeping the first.
///
/// One upsert batch must not touch the same key twice.
pub fn dedup_by_fingerprint(rows: Vec<LineItemRow>) -> Vec<LineItemRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.row_hash().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::row::{DocumentContext, DocumentFields, ItemFields};
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
            icms_amount: "9,00".to_string(),
            unit_tariff: "0,75".to_string(),
        }
    }

    fn row_with(ctx: &DocumentContext, doc: &DocumentFields, item: ItemFields) -> LineItemRow {
        LineItemRow::new(ctx, doc, item)
    }

    #[test]
    fn test_dedup_keeps_first() {
        let ctx = DocumentContext::new("2025-01", "ACME", "123").unwrap();
        let first = row_with(&ctx, &DocumentFields::default(), item());
        let mut other_item = item();
        other_item.value = "80,00".to_string();
        let other = row_with(&ctx, &DocumentFields::default(), other_item);

        let mut doc = DocumentFields::default();
        doc.header.total = "1,00".to_string();
        let same_key = row_with(&ctx, &doc, item());

        let rows = dedup_by_fingerprint(vec![first.clone(), other.clone(), same_key]);
        assert_eq!(rows, vec![first, other]);
    }

    #[test]
    fn test_known_digest() {
        // sha256 of the empty string
        assert_eq!(
            fingerprint_fields(&[]).as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fields_are_trimmed_and_ordered() {
        assert_eq!(fingerprint_fields(&[" a ", "b"]), fingerprint_fields(&["a", "b"]));
        assert_ne!(fingerprint_fields(&["a", "b"]), fingerprint_fields(&["b", "a"]));
    }

    #[test]
    fn test_deterministic() {
        let ctx = DocumentContext::new("2025-01", "ACME", "123").unwrap();
        let doc = DocumentFields::default();
        let a = row_with(&ctx, &doc, item());
        let b = row_with(&ctx, &doc, item());
        assert_eq!(a.row_hash(), b.row_hash());
        assert_eq!(compute_fingerprint(&a).as_str(), a.row_hash());
        assert_eq!(a.row_hash().len(), 64);
    }

    #[test]
    fn test_non_key_fields_do_not_change_hash() {
        let ctx = DocumentContext::new("2025-01", "ACME", "123").unwrap();
        let base = row_with(&ctx, &DocumentFields::default(), item());

        let mut doc = DocumentFields::default();
        doc.header.total = "999,99".to_string();
        doc.balances.accumulated = "42".to_string();
        doc.tariff.description_1 = "Vermelha".to_string();
        let mut other = item();
        other.icms_amount = "1,00".to_string();
        other.pis_cofins = "2,00".to_string();

        assert_eq!(base.row_hash(), row_with(&ctx, &doc, other).row_hash());
    }

    #[test]
    fn test_each_key_field_changes_hash() {
        let ctx = DocumentContext::new("2025-01", "ACME", "123").unwrap();
        let doc = DocumentFields::default();
        let base = row_with(&ctx, &doc, item()).row_hash().to_string();

        let contexts = [
            DocumentContext::new("2025-02", "ACME", "123").unwrap(),
            DocumentContext::new("2025-01", "ACME 2", "123").unwrap(),
            DocumentContext::new("2025-01", "ACME", "124").unwrap(),
        ];
        for changed in &contexts {
            assert_ne!(row_with(changed, &doc, item()).row_hash(), base);
        }

        let mut due = DocumentFields::default();
        due.header.due_date = "20/01/2025".to_string();
        assert_ne!(row_with(&ctx, &due, item()).row_hash(), base);

        let edits: [fn(&mut ItemFields); 6] = [
            |i| i.description.push('X'),
            |i| i.unit = "Wh".to_string(),
            |i| i.quantity = "101".to_string(),
            |i| i.unit_price_with_taxes = "0,76".to_string(),
            |i| i.value = "75,01".to_string(),
            |i| i.unit_tariff = "0,044630".to_string(),
        ];
        for edit in edits {
            let mut changed = item();
            edit(&mut changed);
            assert_ne!(row_with(&ctx, &doc, changed).row_hash(), base);
        }
    }
}
