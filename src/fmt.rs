use chrono::Datelike;

use crate::models::{parse_iso_date, Currency};

fn group_thousands(val: f64) -> (bool, String, String) {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    (negative, with_commas.chars().rev().collect(), dec_part.to_string())
}

/// Format an amount with thousands separators and the currency symbol:
/// $1,234.56 or €1,234.56. Rounding to cents never yields "-$0.00".
pub fn money_in(val: f64, currency: Currency) -> String {
    let (negative, int_part, dec_part) = group_thousands(val);
    let sign = if negative && (int_part != "0" || dec_part != "00") { "-" } else { "" };
    format!("{sign}{}{int_part}.{dec_part}", currency.symbol())
}

pub fn money(val: f64) -> String {
    money_in(val, Currency::MXN)
}

const WEEKDAYS: [&str; 7] = ["Lun", "Mar", "Mié", "Jue", "Vie", "Sáb", "Dom"];

/// Projection column label: "Lun 02/03". Unparseable input is returned as-is.
pub fn day_label(iso: &str) -> String {
    match parse_iso_date(iso) {
        Some(d) => format!(
            "{} {:02}/{:02}",
            WEEKDAYS[d.weekday().num_days_from_monday() as usize],
            d.day(),
            d.month()
        ),
        None => iso.to_string(),
    }
}

/// dd/mm/yyyy, or "—" when empty.
pub fn short_date(iso: Option<&str>) -> String {
    match iso.and_then(parse_iso_date) {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => iso.filter(|s| !s.is_empty()).unwrap_or("—").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "$1,234.56");
        assert_eq!(money(-500.00), "-$500.00");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(-0.001), "$0.00");
        assert_eq!(money(1000000.99), "$1,000,000.99");
        assert_eq!(money_in(42.10, Currency::EUR), "€42.10");
        assert_eq!(money_in(7424.0, Currency::USD), "$7,424.00");
    }

    #[test]
    fn test_day_label() {
        assert_eq!(day_label("2026-03-02"), "Lun 02/03");
        assert_eq!(day_label("2026-03-01"), "Dom 01/03");
        assert_eq!(day_label("2026-02-28"), "Sáb 28/02");
        assert_eq!(day_label("garbage"), "garbage");
    }

    #[test]
    fn test_short_date() {
        assert_eq!(short_date(Some("2026-01-07")), "07/01/2026");
        assert_eq!(short_date(None), "—");
        assert_eq!(short_date(Some("")), "—");
    }
}
