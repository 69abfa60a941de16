//! Conversion between plist values and `serde_json::Value`.
//!
//! JSON has no data, date or UID types, so these follow `plutil -convert
//! json`: data becomes a base64 string, dates RFC 3339 strings and UIDs
//! `{"CF$UID": n}` objects. Only UIDs come back as their plist type.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value as JsonValue};

use crate::{PlistDict, PlistKey, PlistValue};

/// Key of the single-entry object that stands for a UID.
pub const UID_KEY: &str = "CF$UID";

/// Convert a [`PlistValue`] to `serde_json::Value`.
///
/// Non-finite floats become `null`; integers beyond the JSON number range
/// become decimal strings.
pub fn plist_to_json(value: &PlistValue) -> JsonValue {
    match value {
        PlistValue::Null | PlistValue::Undefined => JsonValue::Null,
        PlistValue::Bool(b) => JsonValue::Bool(*b),
        PlistValue::Integer(i) => JsonValue::Number((*i).into()),
        PlistValue::BigInt(i) => match u64::try_from(*i) {
            Ok(u) => JsonValue::Number(u.into()),
            Err(_) => JsonValue::String(i.to_string()),
        },
        PlistValue::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        PlistValue::Date(date) => {
            JsonValue::String(date.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        PlistValue::Data(bytes) => JsonValue::String(STANDARD.encode(bytes)),
        PlistValue::Str(s) => JsonValue::String(s.clone()),
        PlistValue::Uid(uid) => {
            let mut map = Map::new();
            map.insert(UID_KEY.to_owned(), JsonValue::Number((*uid).into()));
            JsonValue::Object(map)
        }
        PlistValue::Array(items) | PlistValue::Set(items) => {
            JsonValue::Array(items.iter().map(plist_to_json).collect())
        }
        PlistValue::Dict(dict) => JsonValue::Object(
            dict.iter()
                .map(|(k, v)| (k.to_string(), plist_to_json(v)))
                .collect(),
        ),
        PlistValue::Typed(typed) => plist_to_json(&typed.clone().into_value()),
    }
}

/// Convert `serde_json::Value` to a [`PlistValue`].
pub fn json_to_plist(value: &JsonValue) -> PlistValue {
    match value {
        JsonValue::Null => PlistValue::Null,
        JsonValue::Bool(b) => PlistValue::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                PlistValue::Integer(i)
            } else if let Some(u) = n.as_u64() {
                PlistValue::BigInt(u as i128)
            } else {
                PlistValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => PlistValue::Str(s.clone()),
        JsonValue::Array(items) => PlistValue::Array(items.iter().map(json_to_plist).collect()),
        JsonValue::Object(map) => {
            if map.len() == 1 {
                if let Some(uid) = map.get(UID_KEY).and_then(JsonValue::as_u64) {
                    return PlistValue::Uid(uid);
                }
            }
            let dict: PlistDict = map
                .iter()
                .map(|(k, v)| (PlistKey::Str(k.clone()), json_to_plist(v)))
                .collect();
            PlistValue::Dict(dict)
        }
    }
}

impl From<&JsonValue> for PlistValue {
    fn from(value: &JsonValue) -> Self {
        json_to_plist(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_roundtrip() {
        let doc = json!({"a": 1, "b": [1, 2, "x"], "c": {"d": null, "e": 1.5, "f": true}});
        assert_eq!(plist_to_json(&json_to_plist(&doc)), doc);
    }

    #[test]
    fn plist_only_types() {
        let date = crate::date::from_core_data_seconds(0.5).unwrap();
        let value = PlistValue::dict([
            ("data", PlistValue::Data(b"hi".to_vec())),
            ("date", PlistValue::Date(date)),
            ("uid", PlistValue::Uid(7)),
            ("big", PlistValue::BigInt(-(1i128 << 70))),
            ("nan", PlistValue::Float(f64::NAN)),
        ]);
        assert_eq!(
            plist_to_json(&value),
            json!({
                "data": "aGk=",
                "date": "2001-01-01T00:00:00.500Z",
                "uid": {"CF$UID": 7},
                "big": "-1180591620717411303424",
                "nan": null,
            })
        );
    }

    #[test]
    fn uid_objects_come_back_as_uids() {
        assert_eq!(json_to_plist(&json!({"CF$UID": 3})), PlistValue::Uid(3));
        assert!(matches!(
            json_to_plist(&json!({"CF$UID": 3, "x": 1})),
            PlistValue::Dict(_)
        ));
    }

    #[test]
    fn large_unsigned() {
        assert_eq!(
            json_to_plist(&json!(u64::MAX)),
            PlistValue::BigInt(u64::MAX as i128)
        );
    }
}
