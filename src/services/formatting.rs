/// Amount as shown in tables and cards.
pub fn format_amount(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("{:.2} €", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// One decimal, the way rates are displayed.
pub fn format_percent(rate: f64) -> String {
    format!("{:.1}%", rate)
}

#[cfg(test)]
mod tests {
    use super::{format_amount, format_percent};

    #[test]
    fn formats_known_currencies() {
        assert_eq!(format_amount(1200.0, "EUR"), "1200.00 €");
        assert_eq!(format_amount(12.5, "USD"), "$12.50");
        assert_eq!(format_amount(-40.0, "EUR"), "-40.00 €");
    }

    #[test]
    fn other_currencies_keep_their_code() {
        assert_eq!(format_amount(3.0, "CHF"), "3.00 CHF");
        assert_eq!(format_amount(2500000.0, "PYG"), "2500000.00 PYG");
    }

    #[test]
    fn percent_has_one_decimal() {
        assert_eq!(format_percent(1200.0 / 1700.0 * 100.0), "70.6%");
        assert_eq!(format_percent(0.0), "0.0%");
    }
}
