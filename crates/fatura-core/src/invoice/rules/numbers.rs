//! Numeric token extraction for Brazilian-formatted invoice lines.
//!
//! Tokens keep their source text (`1.234,56`). Percentages and digits glued
//! to letters (rate-plan codes such as `VERM1` or `P1`) are not amounts and
//! are skipped.

use std::str::FromStr;

use regex::Match;
use rust_decimal::Decimal;

use super::patterns::NUMBER_TOKEN;

/// Numeric token extractor.
pub struct NumberTokenizer;

impl NumberTokenizer {
    pub fn new() -> Self {
        Self
    }

    /// Iterate over the accepted numeric tokens of a line, in order.
    pub fn tokens<'a>(&self, line: &'a str) -> impl Iterator<Item = Match<'a>> + 'a {
        NUMBER_TOKEN
            .find_iter(line)
            .filter(move |m| !is_percentage(line, m) && !touches_letter(line, m))
    }
}

impl Default for NumberTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// A `%` after the token, possibly separated by whitespace.
fn is_percentage(line: &str, m: &Match<'_>) -> bool {
    line[m.end()..]
        .chars()
        .find(|c| !c.is_whitespace())
        .is_some_and(|c| c == '%')
}

fn touches_letter(line: &str, m: &Match<'_>) -> bool {
    let prev = line[..m.start()].chars().next_back();
    let next = line[m.end()..].chars().next();
    prev.is_some_and(char::is_alphabetic) || next.is_some_and(char::is_alphabetic)
}

/// Extract the numeric tokens of a line as strings.
pub fn extract_numbers(line: &str) -> Vec<String> {
    NumberTokenizer::new()
        .tokens(line)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse a Brazilian-formatted amount (e.g., "1.234,56" or "-0,044630").
///
/// Rows never carry parsed numbers; this is for consumers that need to add
/// values up.
pub fn parse_brl_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '-')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_plain_tokens() {
        assert_eq!(
            extract_numbers("Consumo 100 0,75 75,00 1.234,56"),
            vec!["100", "0,75", "75,00", "1.234,56"]
        );
    }

    #[test]
    fn test_negative_and_long_decimals() {
        assert_eq!(
            extract_numbers("Credito -12,50 tarifa 0,044630"),
            vec!["-12,50", "0,044630"]
        );
    }

    #[test]
    fn test_skips_percentages() {
        assert_eq!(extract_numbers("ICMS 18% 27,42"), vec!["27,42"]);
        assert_eq!(extract_numbers("ICMS 18 % 27,42"), vec!["27,42"]);
        assert_eq!(extract_numbers("aliquota 12,00   %"), Vec::<String>::new());
    }

    #[test]
    fn test_skips_letter_adjacent_tokens() {
        assert_eq!(extract_numbers("AD.B.VERM1 100 P1 2x 50,00"), vec!["100", "50,00"]);
        assert_eq!(extract_numbers("kWh300 300kWh 300 kWh"), vec!["300"]);
        assert_eq!(extract_numbers("Ciclo ÇA1 7"), vec!["7"]);
    }

    #[test]
    fn test_grouping_quirk_is_preserved() {
        // An ungrouped 4-digit integer part is split by the grouped alternative.
        assert_eq!(extract_numbers("1234,56"), vec!["123", "4,56"]);
    }

    #[test]
    fn test_restartable() {
        let tokenizer = NumberTokenizer::new();
        let line = "1 2 3";
        let first: Vec<_> = tokenizer.tokens(line).map(|m| m.as_str()).collect();
        let second: Vec<_> = tokenizer.tokens(line).map(|m| m.as_str()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_brl_amount() {
        assert_eq!(parse_brl_amount("1.234,56"), Some(Decimal::from_str("1234.56").unwrap()));
        assert_eq!(parse_brl_amount("0,044630"), Some(Decimal::from_str("0.044630").unwrap()));
        assert_eq!(parse_brl_amount("-12,50"), Some(Decimal::from_str("-12.50").unwrap()));
        assert_eq!(parse_brl_amount("300"), Some(Decimal::from(300)));
        assert_eq!(parse_brl_amount("-"), None);
        assert_eq!(parse_brl_amount(""), None);
    }
}
