//! Coercing rendered template output to the field's value type.

use crate::schema::{FieldKind, FieldSchema};
use serde_json::{Number, Value};
use std::borrow::Cow;

/// Convert a rendered result to the type the field stores.
///
/// Number and slider fields get a number (text that is not a finite number
/// stays text), switch fields a boolean, everything else text. Without a
/// field declaration the result is text.
pub fn coerce_result(raw: &Value, field: Option<&FieldSchema>) -> Value {
    let text: Cow<'_, str> = match raw {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    };

    match field.map(|field| &field.kind) {
        Some(FieldKind::Number) | Some(FieldKind::Slider) => {
            parse_number(&text).unwrap_or_else(|| Value::String(text.into_owned()))
        }
        Some(FieldKind::Switch) => Value::Bool(parse_bool(&text)),
        _ => Value::String(text.into_owned()),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let parsed: f64 = text.trim().parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    if parsed.fract() == 0.0 && parsed.abs() < i64::MAX as f64 {
        return Some(Value::Number(Number::from(parsed as i64)));
    }
    Number::from_f64(parsed).map(Value::Number)
}

fn parse_bool(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "yes" | "1"
    )
}
