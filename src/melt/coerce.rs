//! Numeric coercion
//!
//! Anything that does not read as a number becomes `null`. Coercion never
//! fails and never substitutes zero.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

// Plain decimal literal, optional sign and exponent. No "inf"/"nan".
static NUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").unwrap()
});

static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

/// How a column is coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coerce {
    /// Numbers pass through, numeric strings are parsed
    Number,
    /// A measurement with a unit suffix, e.g. `"5649 sqft"`
    Measure { unit: &'static str },
}

impl Coerce {
    pub fn apply(self, value: &Value) -> Value {
        match self {
            Coerce::Number => to_numeric(value),
            Coerce::Measure { unit } => measure_to_numeric(value, unit),
        }
    }
}

/// Parse a trimmed decimal literal. Integers stay integers when they fit.
pub fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if !NUMERIC_REGEX.is_match(text) {
        return None;
    }

    if INTEGER_REGEX.is_match(text) {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Number::from(i));
        }
    }

    text.parse::<f64>().ok().and_then(Number::from_f64)
}

pub fn to_numeric(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(n.clone()),
        Value::String(s) => parse_number(s).map(Value::Number).unwrap_or(Value::Null),
        Value::Bool(b) => Value::Number(Number::from(i64::from(*b))),
        _ => Value::Null,
    }
}

/// Strip `" <unit>"` from the textual form of the value, then parse
pub fn measure_to_numeric(value: &Value, unit: &str) -> Value {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Value::Null,
    };

    let stripped = text.replace(&format!(" {unit}"), "");
    parse_number(&stripped).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_area_with_unit() {
        let sqft = Coerce::Measure { unit: "sqft" };
        assert_eq!(sqft.apply(&json!("5649 sqft")), json!(5649));
        assert_eq!(sqft.apply(&json!(" 1200.5 sqft ")), json!(1200.5));
        assert_eq!(sqft.apply(&json!(870)), json!(870));
    }

    #[test]
    fn test_unparseable_becomes_null_not_zero() {
        let sqft = Coerce::Measure { unit: "sqft" };
        assert_eq!(sqft.apply(&json!("N/A")), Value::Null);
        assert_eq!(sqft.apply(&Value::Null), Value::Null);
        assert_eq!(sqft.apply(&json!("sqft")), Value::Null);

        assert_eq!(to_numeric(&json!("N/A")), Value::Null);
        assert_eq!(to_numeric(&json!("")), Value::Null);
        assert_eq!(to_numeric(&json!("12abc")), Value::Null);
        assert_eq!(to_numeric(&json!("inf")), Value::Null);
        assert_eq!(to_numeric(&json!([1])), Value::Null);
        assert_eq!(to_numeric(&json!({"a": 1})), Value::Null);
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(to_numeric(&json!("250000")), json!(250000));
        assert_eq!(to_numeric(&json!(" -3 ")), json!(-3));
        assert_eq!(to_numeric(&json!("0.5")), json!(0.5));
        assert_eq!(to_numeric(&json!("1e3")), json!(1000.0));
        assert_eq!(to_numeric(&json!(".25")), json!(0.25));
        assert_eq!(to_numeric(&json!(42)), json!(42));
        assert_eq!(to_numeric(&json!(true)), json!(1));
    }

    #[test]
    fn test_huge_integer_falls_back_to_float() {
        let v = to_numeric(&json!("99999999999999999999"));
        assert_eq!(v.as_f64(), Some(1e20));
    }
}
