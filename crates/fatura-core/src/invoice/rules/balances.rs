//! Net-metering (distributed generation) kWh balances.

use regex::Regex;

use super::patterns::{BALANCE_ACCUMULATED, BALANCE_CURRENT_MONTH, BALANCE_EXPIRING};
use super::value_or;

/// Balance used when its label is absent.
pub const DEFAULT_BALANCE: &str = "0";

/// Energy-credit balances printed in the compensation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceFields {
    /// Saldo do mês.
    pub current_month: String,
    /// Saldo acumulado.
    pub accumulated: String,
    /// Saldo a expirar no próximo mês.
    pub expiring: String,
}

impl Default for BalanceFields {
    fn default() -> Self {
        Self {
            current_month: DEFAULT_BALANCE.to_string(),
            accumulated: DEFAULT_BALANCE.to_string(),
            expiring: DEFAULT_BALANCE.to_string(),
        }
    }
}

/// Extract the three balances from the full document text.
pub fn extract_balances(text: &str) -> BalanceFields {
    BalanceFields {
        current_month: capture_balance(&BALANCE_CURRENT_MONTH, text),
        accumulated: capture_balance(&BALANCE_ACCUMULATED, text),
        expiring: capture_balance(&BALANCE_EXPIRING, text),
    }
}

fn capture_balance(pattern: &Regex, text: &str) -> String {
    let found = pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    value_or(found, DEFAULT_BALANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_balances() {
        let text = "Informacoes de GD\n\
                    Saldo Mes no (TP) Fora Ponta kWh 120\n\
                    Saldo Acumulado no (TP) Fora Ponta kWh 4500\n\
                    Saldo a Expirar Proximo Mes no (TP) Fora Ponta kWh 35\n\
                    (fim)";

        let balances = extract_balances(text);
        assert_eq!(balances.current_month, "120");
        assert_eq!(balances.accumulated, "4500");
        assert_eq!(balances.expiring, "35");
    }

    #[test]
    fn test_case_insensitive() {
        let balances = extract_balances("SALDO ACUMULADO NO (TP) total 77 ;");
        assert_eq!(balances.accumulated, "77");
        assert_eq!(balances.current_month, DEFAULT_BALANCE);
        assert_eq!(balances.expiring, DEFAULT_BALANCE);
    }

    #[test]
    fn test_defaults_when_absent() {
        assert_eq!(extract_balances("Consumo 300 kWh"), BalanceFields::default());
    }
}
