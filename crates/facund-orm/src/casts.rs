//! Attribute cast rules.
//!
//! A cast declared on a model field coerces the raw stored value into the
//! declared shape every time the field is read. Casts are total: whatever the
//! stored literal looks like, the caller gets a value of the declared type
//! back. Notably, for the boolean cast the strings `""` and `"0"` are false
//! and any other string (including `"false"`) is true.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

/// Target shape of a cast declared on a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastType {
    Integer,
    Float,
    String,
    Boolean,
    Object,
    Array,
    Date,
    DateTime,
}

impl CastType {
    /// Coerces a raw stored value into the declared shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use facund_orm::casts::CastType;
    /// use serde_json::json;
    ///
    /// assert_eq!(CastType::Boolean.apply(&json!(1)), json!(true));
    /// assert_eq!(CastType::Boolean.apply(&json!("0")), json!(false));
    /// assert_eq!(CastType::Integer.apply(&json!("42nd")), json!(42));
    /// ```
    pub fn apply(self, value: &Value) -> Value {
        match self {
            Self::Integer => Value::Number(Number::from(to_integer(value))),
            Self::Float => Number::from_f64(to_float(value))
                .map(Value::Number)
                .unwrap_or_else(|| Value::Number(Number::from(0))),
            Self::String => Value::String(to_string(value)),
            Self::Boolean => Value::Bool(truthy(value)),
            Self::Object => to_object(value),
            Self::Array => to_array(value),
            Self::Date => match parse_datetime(value) {
                Some(dt) => Value::String(render_date(&dt)),
                None => value.clone(),
            },
            Self::DateTime => match parse_datetime(value) {
                Some(dt) => Value::String(render_datetime(&dt)),
                None => value.clone(),
            },
        }
    }
}

/// Truthiness of a raw stored value: `""` and `"0"` are false, any other
/// string is true; numbers are compared against zero; containers are true
/// when non-empty.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn to_integer(value: &Value) -> i64 {
    match value {
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        Value::String(s) => leading_integer(s),
        _ => 0,
    }
}

/// Parses the leading numeric prefix of a string, `0` when there is none.
fn leading_integer(s: &str) -> i64 {
    let trimmed = s.trim();
    let mut end = 0;
    for (i, c) in trimmed.char_indices() {
        if c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')) {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    trimmed[..end].parse().unwrap_or(0)
}

fn to_float(value: &Value) -> f64 {
    match value {
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or_else(|_| leading_integer(s) as f64),
        _ => 0.0,
    }
}

fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_object(value: &Value) -> Value {
    match value {
        Value::Object(_) => value.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(decoded @ Value::Object(_)) => decoded,
            _ => Value::Object(serde_json::Map::new()),
        },
        _ => Value::Object(serde_json::Map::new()),
    }
}

fn to_array(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(decoded @ Value::Array(_)) => decoded,
            _ => Value::Array(Vec::new()),
        },
        _ => Value::Array(Vec::new()),
    }
}

/// Interprets a stored value as a point in time.
///
/// Accepts integer epoch seconds, RFC 3339 strings, and the bare
/// `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DD` forms a relational column usually
/// holds.
pub fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0),
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(naive.and_utc());
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
            }
            None
        }
        _ => None,
    }
}

pub(crate) fn render_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn render_date(dt: &DateTime<Utc>) -> String {
    dt.date_naive().to_string()
}
