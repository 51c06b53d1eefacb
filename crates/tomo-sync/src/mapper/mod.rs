//! Entity mappers.
//!
//! Pure transforms between the internal catalog model and the store wire
//! shapes. Relation resolution (term ids, product ids, customer ids) happens
//! in the orchestrators; mappers only reshape data they are handed.

pub mod address;
pub mod coupon;
pub mod customer;
pub mod order;
pub mod product;
pub mod term;

use serde_json::Value;

/// Format a monetary amount as the fixed-point string the store expects.
#[must_use]
pub fn format_money(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Parse a monetary string coming back from the store. Absent or malformed
/// values parse to zero; stores send empty strings for unset amounts.
#[must_use]
pub fn parse_money(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(0.0)
}

/// Parse a monetary JSON value that may be a string or a bare number.
#[must_use]
pub fn parse_money_value(raw: Option<&Value>) -> f64 {
    match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_money_fixed_point() {
        assert_eq!(format_money(19.9), "19.90");
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(1234.567), "1234.57");
    }

    #[test]
    fn test_parse_money_tolerates_garbage() {
        assert_eq!(parse_money(Some("19.90")), 19.90);
        assert_eq!(parse_money(Some("")), 0.0);
        assert_eq!(parse_money(Some("n/a")), 0.0);
        assert_eq!(parse_money(None), 0.0);
    }

    #[test]
    fn test_parse_money_value_both_shapes() {
        assert_eq!(parse_money_value(Some(&json!("12.50"))), 12.50);
        assert_eq!(parse_money_value(Some(&json!(12.5))), 12.5);
        assert_eq!(parse_money_value(Some(&json!(null))), 0.0);
        assert_eq!(parse_money_value(None), 0.0);
    }
}
