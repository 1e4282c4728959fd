//! Decimal amounts as they arrive from storefront JSON and provider forms.

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parses a JSON number or numeric string without going through `f64`, so
/// `10.1` stays `10.1`.
pub fn parse_amount(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// `deserialize_with` helper for optional amounts. `null` and a missing
/// field both give `None`; anything that is present but not numeric is an
/// error.
pub fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_amount(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {value}"))),
    }
}

/// Decimal places the order tables store amounts with.
pub const CURRENCY_SCALE: i64 = 2;

/// True when the amount is stored without rounding, e.g. `12.5` but not
/// `0.001`.
pub fn has_currency_precision(amount: &BigDecimal) -> bool {
    let (_, scale) = amount.normalized().as_bigint_and_exponent();
    scale <= CURRENCY_SCALE
}

/// Two-decimal rendering used in provider fields and customer messages.
pub fn format_amount(amount: &BigDecimal) -> String {
    amount.with_scale_round(2, RoundingMode::HalfUp).to_string()
}

/// Converts a major-unit amount into provider minor units (cents).
pub fn to_minor_units(amount: &BigDecimal) -> Option<i64> {
    (amount * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "deserialize_optional_amount")]
        amount: Option<BigDecimal>,
    }

    #[test]
    fn keeps_decimal_literals_exact() {
        let amount = parse_amount(&json!(10.1)).unwrap();
        assert_eq!(amount, BigDecimal::from_str("10.1").unwrap());
        assert_eq!(to_minor_units(&amount), Some(1010));
    }

    #[test]
    fn accepts_numeric_strings() {
        let amount = parse_amount(&json!(" 99.50 ")).unwrap();
        assert_eq!(format_amount(&amount), "99.50");
        assert!(parse_amount(&json!("abc")).is_none());
        assert!(parse_amount(&json!(true)).is_none());
    }

    #[test]
    fn optional_amount_distinguishes_missing_from_invalid() {
        let missing: Payload = serde_json::from_value(json!({})).unwrap();
        assert!(missing.amount.is_none());

        let null: Payload = serde_json::from_value(json!({ "amount": null })).unwrap();
        assert!(null.amount.is_none());

        let present: Payload = serde_json::from_value(json!({ "amount": 100 })).unwrap();
        assert_eq!(present.amount, Some(BigDecimal::from(100)));

        assert!(serde_json::from_value::<Payload>(json!({ "amount": "ten" })).is_err());
    }

    #[test]
    fn precision_is_checked_after_trailing_zeros() {
        assert!(has_currency_precision(&BigDecimal::from(100)));
        assert!(has_currency_precision(&BigDecimal::from_str("12.50").unwrap()));
        assert!(has_currency_precision(&BigDecimal::from_str("12.3400").unwrap()));
        assert!(!has_currency_precision(&BigDecimal::from_str("0.001").unwrap()));
        assert!(!has_currency_precision(&BigDecimal::from_str("9.995").unwrap()));
    }

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(format_amount(&BigDecimal::from(100)), "100.00");
        assert_eq!(format_amount(&BigDecimal::from_str("12.345").unwrap()), "12.35");
    }
}
