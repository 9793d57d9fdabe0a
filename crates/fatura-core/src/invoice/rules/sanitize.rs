//! Date stripping for item lines.

use super::patterns::{SANITIZE_DMY, SANITIZE_DM, SANITIZE_DM_RANGE, SANITIZE_MY};

/// Remove date-like fragments from a line so they are not read as
/// quantities or prices, then collapse whitespace.
///
/// Shapes are removed in order: `dd/mm/yyyy`, `mm/yyyy`, `dd/mm - dd/mm`,
/// `dd/mm`.
pub fn sanitize_line(line: &str) -> String {
    let s = SANITIZE_DMY.replace_all(line, " ");
    let s = SANITIZE_MY.replace_all(&s, " ");
    let s = SANITIZE_DM_RANGE.replace_all(&s, " ");
    let s = SANITIZE_DM.replace_all(&s, " ");

    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strips_full_dates() {
        assert_eq!(sanitize_line("Leitura 15/01/2025 300 kWh"), "Leitura 300 kWh");
    }

    #[test]
    fn test_strips_month_year() {
        assert_eq!(sanitize_line("Ref 01/2025   152,31"), "Ref 152,31");
    }

    #[test]
    fn test_strips_ranges_and_day_month() {
        assert_eq!(
            sanitize_line("Periodo 15/12 - 14/01 dias 31 05/02"),
            "Periodo dias 31"
        );
    }

    #[test]
    fn test_full_date_removed_before_shorter_shapes() {
        // Removing dd/mm first would leave "/2025" behind.
        assert_eq!(sanitize_line("x 01/02/2025 y"), "x y");
    }

    #[test]
    fn test_keeps_plain_numbers() {
        assert_eq!(sanitize_line("  100\t0,75  75,00 "), "100 0,75 75,00");
    }
}
