//! Common regex patterns for Elektro electricity invoice extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Brazilian numeric literal: 1.234,56 / -12,5000 / 300
    // Grouped form first, plain digit run as fallback.
    pub static ref NUMBER_TOKEN: Regex = Regex::new(
        r"-?\d{1,3}(?:\.\d{3})*(?:,\d{2,6})?|-?\d+(?:,\d{2,6})?"
    ).unwrap();

    // Date shapes removed from item lines before tokenizing (order matters)
    pub static ref SANITIZE_DMY: Regex = Regex::new(
        r"\b\d{1,2}/\d{1,2}/\d{4}\b"
    ).unwrap();

    pub static ref SANITIZE_MY: Regex = Regex::new(
        r"\b\d{1,2}/\d{4}\b"
    ).unwrap();

    pub static ref SANITIZE_DM_RANGE: Regex = Regex::new(
        r"\b\d{1,2}/\d{1,2}\s*-\s*\d{1,2}/\d{1,2}\b"
    ).unwrap();

    pub static ref SANITIZE_DM: Regex = Regex::new(
        r"\b\d{1,2}/\d{1,2}\b"
    ).unwrap();

    // Header: due date and amount to pay
    pub static ref HEADER_DATE: Regex = Regex::new(
        r"(\d{2}/\d{2}/\d{4})"
    ).unwrap();

    pub static ref HEADER_TOTAL: Regex = Regex::new(
        r"(\d{1,3}(?:\.\d{3})*,\d{2})"
    ).unwrap();

    // Tariff flag (bandeira tarifária)
    pub static ref TARIFF_FLAG_LABEL: Regex = Regex::new(
        r"(?i)Bandeira\s*Tarif[a-z]+ria\s+([^(\n\r]+)"
    ).unwrap();

    pub static ref TARIFF_FLAG_NAME: Regex = Regex::new(
        r"(?i)\b(VERMELHA|AMARELA|VERDE)\b"
    ).unwrap();

    // Distributed-generation balances (kWh)
    pub static ref BALANCE_CURRENT_MONTH: Regex = Regex::new(
        r"(?i)Saldo\s+Mes\s+no\s+\(TP\)\s+[\w\s]+\s+(\d+)"
    ).unwrap();

    pub static ref BALANCE_ACCUMULATED: Regex = Regex::new(
        r"(?i)Saldo\s+Acumulado\s+no\s+\(TP\)\s+[\w\s]+\s+(\d+)"
    ).unwrap();

    pub static ref BALANCE_EXPIRING: Regex = Regex::new(
        r"(?i)Saldo\s+a\s+Expirar\s+Proximo\s+Mes\s+no\s+\(TP\)\s+[\w\s]+\s+(\d+)"
    ).unwrap();

    // Item lines
    pub static ref ITEM_DESC_BEFORE_UNIT: Regex = Regex::new(
        r"(?i)^(.*?)(?:\s+k?Wh)"
    ).unwrap();

    pub static ref ITEM_DESC_BEFORE_NUMBER: Regex = Regex::new(
        r"^(.*?)\s+-?\d"
    ).unwrap();

    pub static ref WITHHOLDING_TAX_LABEL: Regex = Regex::new(
        r"(?i)\bPIS\b|\bCOFINS\b|\bCONFINS\b"
    ).unwrap();

    pub static ref ICMS_RATE: Regex = Regex::new(
        r"(\d+)%"
    ).unwrap();
}
