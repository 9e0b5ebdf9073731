//! Tolerant accessors for ledger object JSON
//!
//! Full nodes render Move structs either wrapped (`{ "type": .., "fields": {..} }`)
//! or bare, and render `u64` values as decimal strings. These helpers accept
//! both shapes but never substitute defaults: a missing required field is a
//! [`Error::Decode`], and optional fields stay `None`.

use crate::{Error, Result};
use serde_json::Value;

/// Unwrap a `{ "fields": {..} }` wrapper if present.
pub fn struct_fields(value: &Value) -> &Value {
    match value.get("fields") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    }
}

/// Look up a field, treating JSON `null` as absent.
pub fn field<'a>(obj: &'a Value, name: &str) -> Option<&'a Value> {
    struct_fields(obj).get(name).filter(|v| !v.is_null())
}

pub fn required<'a>(obj: &'a Value, name: &str, context: &str) -> Result<&'a Value> {
    field(obj, name).ok_or_else(|| Error::decode(context, format!("missing field `{}`", name)))
}

/// First present field among `names`.
pub fn first_of<'a>(obj: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| field(obj, name))
}

/// Decode an unsigned integer rendered as a JSON number or decimal string.
pub fn as_u64(value: &Value, context: &str) -> Result<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| Error::decode(context, format!("{} is not an unsigned integer", n))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::decode(context, format!("`{}`: {}", s, e))),
        // `Supply<T>` and `Balance<T>` render as `{ "value": .. }`
        Value::Object(_) => match field(value, "value") {
            Some(inner) => as_u64(inner, context),
            None => Err(Error::decode(context, "expected integer, found object")),
        },
        other => Err(Error::decode(
            context,
            format!("expected integer, found {}", type_name(other)),
        )),
    }
}

pub fn required_u64(obj: &Value, name: &str, context: &str) -> Result<u64> {
    as_u64(required(obj, name, context)?, &format!("{}.{}", context, name))
}

/// Decode an optional integer. Absent, `null` and an empty Move `Option`
/// (`{ "vec": [] }`) all decode to `None`.
pub fn optional_u64(obj: &Value, name: &str, context: &str) -> Result<Option<u64>> {
    let ctx = format!("{}.{}", context, name);
    match field(obj, name).map(unwrap_option) {
        None | Some(None) => Ok(None),
        Some(Some(v)) => as_u64(v, &ctx).map(Some),
    }
}

/// Decode an optional signed integer. Accepts plain numbers, signed decimal
/// strings and the `{ is_negative, value }` struct used for signed amounts.
pub fn optional_i64(obj: &Value, name: &str, context: &str) -> Result<Option<i64>> {
    let ctx = format!("{}.{}", context, name);
    match field(obj, name).map(unwrap_option) {
        None | Some(None) => Ok(None),
        Some(Some(v)) => as_i64(v, &ctx).map(Some),
    }
}

pub fn as_i64(value: &Value, context: &str) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::decode(context, format!("{} is not a signed integer", n))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| Error::decode(context, format!("`{}`: {}", s, e))),
        Value::Object(_) => {
            let negative = required_bool(value, "is_negative", context)?;
            let magnitude = required_u64(value, "value", context)?;
            let magnitude = i64::try_from(magnitude)
                .map_err(|_| Error::decode(context, "magnitude exceeds i64"))?;
            Ok(if negative { -magnitude } else { magnitude })
        }
        other => Err(Error::decode(
            context,
            format!("expected signed integer, found {}", type_name(other)),
        )),
    }
}

pub fn required_str<'a>(obj: &'a Value, name: &str, context: &str) -> Result<&'a str> {
    required(obj, name, context)?
        .as_str()
        .ok_or_else(|| Error::decode(context, format!("`{}` is not a string", name)))
}

pub fn required_bool(obj: &Value, name: &str, context: &str) -> Result<bool> {
    required(obj, name, context)?
        .as_bool()
        .ok_or_else(|| Error::decode(context, format!("`{}` is not a bool", name)))
}

/// Decode a byte vector rendered as an array of numbers or a hex string.
pub fn as_bytes(value: &Value, context: &str) -> Result<Vec<u8>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| Error::decode(context, format!("{} is not a byte", item)))
            })
            .collect(),
        Value::String(s) => {
            let digits = s.strip_prefix("0x").unwrap_or(s);
            hex::decode(digits).map_err(|e| Error::decode(context, e.to_string()))
        }
        other => Err(Error::decode(
            context,
            format!("expected bytes, found {}", type_name(other)),
        )),
    }
}

/// Entries of a Move `VecMap<K, V>` rendered as `{ contents: [{ key, value }] }`.
pub fn vec_map_entries<'a>(value: &'a Value, context: &str) -> Result<Vec<(&'a Value, &'a Value)>> {
    let contents = required(value, "contents", context)?
        .as_array()
        .ok_or_else(|| Error::decode(context, "`contents` is not an array"))?;
    contents
        .iter()
        .map(|entry| {
            let key = required(entry, "key", context)?;
            let value = required(entry, "value", context)?;
            Ok((key, value))
        })
        .collect()
}

/// Render a VecMap key (string or number) as text.
pub fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unwrap_option(value: &Value) -> Option<&Value> {
    match struct_fields(value).get("vec").and_then(Value::as_array) {
        Some(items) => items.first(),
        None => Some(value),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_struct_fields_accepts_both_shapes() {
        let wrapped = json!({ "type": "x::y::Z", "fields": { "a": "7" } });
        let bare = json!({ "a": 7 });
        assert_eq!(required_u64(&wrapped, "a", "t").unwrap(), 7);
        assert_eq!(required_u64(&bare, "a", "t").unwrap(), 7);
    }

    #[test]
    fn test_missing_required_field_fails() {
        let obj = json!({ "fields": { "a": "1" } });
        let err = required_u64(&obj, "b", "pool").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.to_string().contains("`b`"));
    }

    #[test]
    fn test_optional_fields_stay_unset() {
        let obj = json!({ "exit_price": null, "pnl": { "vec": [] } });
        assert_eq!(optional_u64(&obj, "exit_price", "t").unwrap(), None);
        assert_eq!(optional_i64(&obj, "pnl", "t").unwrap(), None);
        assert_eq!(optional_u64(&obj, "absent", "t").unwrap(), None);
    }

    #[test]
    fn test_signed_shapes() {
        let obj = json!({
            "a": -162,
            "b": "306",
            "c": { "fields": { "is_negative": true, "value": "45" } },
            "d": { "vec": ["12"] }
        });
        assert_eq!(optional_i64(&obj, "a", "t").unwrap(), Some(-162));
        assert_eq!(optional_i64(&obj, "b", "t").unwrap(), Some(306));
        assert_eq!(optional_i64(&obj, "c", "t").unwrap(), Some(-45));
        assert_eq!(optional_i64(&obj, "d", "t").unwrap(), Some(12));
    }

    #[test]
    fn test_supply_struct_unwraps() {
        let obj = json!({ "lp_supply": { "type": "0x2::balance::Supply", "fields": { "value": "1000" } } });
        assert_eq!(required_u64(&obj, "lp_supply", "pool").unwrap(), 1000);
    }

    #[test]
    fn test_bytes_from_array_and_hex() {
        assert_eq!(as_bytes(&json!([1, 2, 255]), "t").unwrap(), vec![1, 2, 255]);
        assert_eq!(as_bytes(&json!("0x0102ff"), "t").unwrap(), vec![1, 2, 255]);
        assert!(as_bytes(&json!([256]), "t").is_err());
    }

    #[test]
    fn test_vec_map_entries() {
        let map = json!({ "type": "0x2::vec_map::VecMap", "fields": { "contents": [
            { "type": "Entry", "fields": { "key": "1", "value": { "x": 1 } } },
            { "key": "2", "value": { "x": 2 } }
        ] } });
        let entries = vec_map_entries(&map, "seasons").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(key_string(entries[1].0), "2");
    }
}
