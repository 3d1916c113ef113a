//! Field coercion applied to raw form input right before submission.
//!
//! Decimals go out as fixed two-decimal strings, integers as whole numbers,
//! and empty optionals are dropped instead of being sent as `""`.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

pub const ZERO_DECIMAL: &str = "0.00";

/// `"12,5"` → `"12.50"`. Halves round away from zero and negative zero
/// prints as `"0.00"`. Empty or unparsable input becomes `"0.00"`.
pub fn to_decimal(raw: Option<&str>) -> String {
    parse_decimal(raw)
        .map(round_money)
        .unwrap_or_else(|| ZERO_DECIMAL.to_string())
}

fn round_money(value: Decimal) -> String {
    let mut value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if value.is_zero() {
        value = Decimal::ZERO;
    }
    value.rescale(2);
    value.to_string()
}

/// Leading integer part, `0` when there is none (`"12.9"` → 12, `"abc"` → 0).
pub fn to_integer(raw: Option<&str>) -> i64 {
    parse_integer_prefix(raw.unwrap_or_default()).unwrap_or(0)
}

pub fn optional_decimal(raw: Option<&str>) -> Option<String> {
    non_empty_opt(raw).map(|value| to_decimal(Some(&value)))
}

pub fn optional_integer(raw: Option<&str>) -> Option<i64> {
    non_empty_opt(raw).map(|value| to_integer(Some(&value)))
}

pub fn non_empty_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_decimal(raw: Option<&str>) -> Option<Decimal> {
    let text = non_empty_opt(raw)?.replacen(',', ".", 1);
    Decimal::from_str(&numeric_prefix(&text)?).ok()
}

/// Longest numeric prefix in canonical form, so `"45 m2"` reads as `"45"`
/// and `".5"` as `"0.5"`.
fn numeric_prefix(text: &str) -> Option<String> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let whole: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let fraction: String = rest[whole.len()..]
        .strip_prefix('.')
        .map(|tail| tail.chars().take_while(char::is_ascii_digit).collect())
        .unwrap_or_default();
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let sign = if negative { "-" } else { "" };
    let whole = if whole.is_empty() { "0" } else { &whole };
    Some(if fraction.is_empty() {
        format!("{sign}{whole}")
    } else {
        format!("{sign}{whole}.{fraction}")
    })
}

fn parse_integer_prefix(text: &str) -> Option<i64> {
    let text = text.trim();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    text[..end].parse::<i64>().ok()
}
