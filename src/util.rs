// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" number/year handling so the
// normalizers can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::record::RawValue;

static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("static regex")
});

static FOUR_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("static regex"));

/// Placeholder strings that mean "not applicable" rather than a value.
const SENTINELS: [&str; 3] = ["na", "n/a", "-"];

pub fn is_sentinel(s: &str) -> bool {
    let s = s.trim();
    SENTINELS.iter().any(|sentinel| s.eq_ignore_ascii_case(sentinel))
}

/// Coerce a raw cell into `f64` while being forgiving about formatting
/// issues that are common in spreadsheet exports.
///
/// - Numbers pass through unchanged (non-finite values become `0`).
/// - Strips thousands separators, currency symbols and whitespace.
/// - Parses the leading numeric prefix, so `"12.5%"` yields `12.5`.
/// - Returns `0` for sentinels and anything that cannot be parsed.
pub fn parse_number(value: &RawValue) -> f64 {
    match value {
        RawValue::Number(n) if n.is_finite() => *n,
        RawValue::Number(_) => 0.0,
        RawValue::Text(s) => parse_number_str(s),
    }
}

pub fn parse_number_str(s: &str) -> f64 {
    if s.trim().is_empty() || is_sentinel(s) {
        return 0.0;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '₹' | '€' | '£') && !c.is_whitespace())
        .collect();
    LEADING_FLOAT
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Extract a calendar year. Numbers are truncated; strings yield the
/// first run of four consecutive digits (`"2017-18"` -> `2017`,
/// `"12/05/2019"` -> `2019`).
pub fn parse_year(value: &RawValue) -> Option<i32> {
    match value {
        RawValue::Number(n) if n.is_finite() => Some(n.trunc() as i32),
        RawValue::Number(_) => None,
        RawValue::Text(s) => parse_year_str(s),
    }
}

pub fn parse_year_str(s: &str) -> Option<i32> {
    FOUR_DIGITS
        .find(s)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

pub fn mean(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Percentage change from `previous` to `current`; `0` when there is no
/// previous value to compare against.
pub fn growth_rate(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    finite_or_zero((current - previous) / previous * 100.0)
}

pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

pub fn percentage(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    finite_or_zero(part / total * 100.0)
}

pub fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Out of integer range (or not finite): plain fixed-point text.
    let Ok(int_val) = int_part.parse::<u128>() else {
        return if neg { format!("-{}", s) } else { s };
    };
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Render an optional value, substituting `N/A` when it is missing.
pub fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_strips_separators_and_currency() {
        assert_eq!(parse_number_str("1,000"), 1000.0);
        assert_eq!(parse_number_str(" $ 2,500.50 "), 2500.5);
        assert_eq!(parse_number_str("₹1,20,000"), 120000.0);
        assert_eq!(parse_number_str("12.5%"), 12.5);
        assert_eq!(parse_number_str("-3.25"), -3.25);
    }

    #[test]
    fn parse_number_never_returns_nan() {
        assert_eq!(parse_number_str("NA"), 0.0);
        assert_eq!(parse_number_str(""), 0.0);
        assert_eq!(parse_number_str("abc"), 0.0);
        assert_eq!(parse_number(&RawValue::Number(f64::NAN)), 0.0);
        assert_eq!(parse_number(&RawValue::Number(42.0)), 42.0);
    }

    #[test]
    fn parse_year_finds_first_four_digits() {
        assert_eq!(parse_year_str("2017-18"), Some(2017));
        assert_eq!(parse_year_str("12/05/2019"), Some(2019));
        assert_eq!(parse_year_str("FY 2020-21"), Some(2020));
        assert_eq!(parse_year_str("n/a"), None);
        assert_eq!(parse_year_str("99"), None);
        assert_eq!(parse_year(&RawValue::Number(1999.7)), Some(1999));
    }

    #[test]
    fn growth_and_ratio_guard_zero_denominators() {
        assert_eq!(growth_rate(0.0, 50.0), 0.0);
        assert_eq!(growth_rate(1000.0, 1200.0), 20.0);
        assert_eq!(ratio(10.0, 0.0), 0.0);
        assert_eq!(ratio(10.0, 4.0), 2.5);
        assert_eq!(percentage(1.0, 0.0), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn sentinels_are_case_insensitive() {
        assert!(is_sentinel("NA"));
        assert!(is_sentinel(" na "));
        assert!(is_sentinel("N/A"));
        assert!(!is_sentinel("Nagaland"));
    }

    #[test]
    fn format_number_inserts_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_number(0.0, 1), "0.0");
        assert_eq!(or_na::<i32>(None), "N/A");
    }

    #[test]
    fn format_number_survives_huge_values() {
        assert_eq!(format_number(1e20, 0), "100,000,000,000,000,000,000");
        let huge = format_number(-1e300, 1);
        assert!(huge.starts_with("-1000"));
        assert!(huge.ends_with(".0"));
        assert_eq!(format_number(f64::INFINITY, 2), "inf");
    }
}
