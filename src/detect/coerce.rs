use serde_json::{Map, Value};

/// Coerce a loosely-typed JSON value into a finite number.
///
/// Accepts JSON numbers and strings holding a number. Everything else,
/// including values that parse to NaN or infinity, yields `None`.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

pub(crate) fn number_or_zero(value: Option<&Value>) -> f64 {
    value.and_then(coerce_number).unwrap_or(0.0)
}

/// Non-negative integer count; fractions truncate toward zero.
pub(crate) fn count_or_zero(value: Option<&Value>) -> u64 {
    let number = number_or_zero(value).trunc();
    if number <= 0.0 {
        0
    } else if number >= u64::MAX as f64 {
        u64::MAX
    } else {
        number as u64
    }
}

/// Look up the first key present in `obj`, tolerating snake_case and
/// camelCase spellings of the same field.
pub(crate) fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_are_coerced() {
        assert_eq!(coerce_number(&json!("0.42")), Some(0.42));
        assert_eq!(coerce_number(&json!(" 12 ")), Some(12.0));
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn counts_floor_at_zero() {
        assert_eq!(count_or_zero(Some(&json!(-4))), 0);
        assert_eq!(count_or_zero(Some(&json!(3.9))), 3);
        assert_eq!(count_or_zero(Some(&json!("7"))), 7);
        assert_eq!(count_or_zero(None), 0);
    }

    #[test]
    fn field_skips_null_spellings() {
        let obj = json!({ "size_counts": null, "sizeCounts": { "small": 1 } });
        let obj = obj.as_object().unwrap();
        assert!(field(obj, &["size_counts", "sizeCounts"]).unwrap().is_object());
        assert!(field(obj, &["missing"]).is_none());
    }
}
