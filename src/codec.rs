//! Encoding and decoding between the caller-facing value shapes and the
//! scalar/hash representations the remote tier actually stores (§4.A).

use std::collections::BTreeMap;

use serde_json::Value as Json;

/// A single scalar value as seen by callers: string, number, or boolean.
///
/// Mirrors the teacher crate's `codecs::json::JsonCodec` choice of
/// `serde_json` as the encoding backbone, but works a level above bytes:
/// primitives round-trip through Redis string commands, not opaque blobs.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    String(String),
    Number(f64),
    Bool(bool),
}

impl Primitive {
    #[must_use]
    pub fn as_json(&self) -> Json {
        match self {
            Primitive::String(s) => Json::String(s.clone()),
            Primitive::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Primitive::Bool(b) => Json::Bool(*b),
        }
    }
}

/// An object shape: a flat mapping of field name to value. Nested objects
/// are permitted on write but are flattened to their JSON text on the wire
/// (§4.A `encodeObject`).
pub type CacheObject = BTreeMap<String, Json>;

/// Encode a primitive to its wire scalar (string form stored via `SET`).
#[must_use]
pub fn encode_primitive(value: &Primitive) -> String {
    match value {
        Primitive::String(s) => s.clone(),
        Primitive::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Primitive::Bool(b) => b.to_string(),
    }
}

/// Decode a wire scalar back into a primitive.
///
/// When `parse_type` is false the raw string is always returned unchanged.
/// When true, a best-effort JSON parse recovers numbers/booleans; a parse
/// failure (e.g. the value really is free text) silently falls back to the
/// original string rather than erroring (§4.A, §7 `DecodeFailure`).
#[must_use]
pub fn decode_primitive(raw: &str, parse_type: bool) -> Primitive {
    if !parse_type {
        return Primitive::String(raw.to_string());
    }
    if let Ok(b) = raw.parse::<bool>() {
        return Primitive::Bool(b);
    }
    if let Ok(n) = raw.parse::<f64>() {
        return Primitive::Number(n);
    }
    Primitive::String(raw.to_string())
}

/// Encode an array to the JSON text stored as a single remote scalar.
///
/// # Errors
/// Returns an error if `value` cannot be serialized, which should not
/// happen for any `serde_json::Value` built from caller data.
pub fn encode_array(value: &[Json]) -> anyhow::Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode the JSON text produced by [`encode_array`] back into a sequence.
///
/// # Errors
/// Returns an error if `raw` is not valid JSON or is not a JSON array.
pub fn decode_array(raw: &str) -> anyhow::Result<Vec<Json>> {
    let parsed: Json = serde_json::from_str(raw)?;
    match parsed {
        Json::Array(items) => Ok(items),
        other => anyhow::bail!("expected a JSON array, got {other}"),
    }
}

/// Flatten an object's top-level fields to their textual form for storage
/// via `HMSET`. Scalars use [`encode_primitive`]'s rules; nested
/// structures (objects/arrays) are stored as their JSON text.
#[must_use]
pub fn encode_object(value: &CacheObject) -> BTreeMap<String, String> {
    value
        .iter()
        .map(|(field, v)| (field.clone(), encode_field(v)))
        .collect()
}

fn encode_field(v: &Json) -> String {
    match v {
        Json::String(s) => s.clone(),
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Null => String::new(),
        Json::Array(_) | Json::Object(_) => v.to_string(),
    }
}

/// Decode a remote hash back into an object.
///
/// When `parse_type` is true each field is run through [`decode_primitive`]
/// and then re-wrapped as JSON; when false every field stays a JSON string.
#[must_use]
pub fn decode_object(fields: BTreeMap<String, String>, parse_type: bool) -> CacheObject {
    fields
        .into_iter()
        .map(|(field, raw)| {
            let v = if parse_type {
                decode_primitive(&raw, true).as_json()
            } else {
                Json::String(raw)
            };
            (field, v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_round_trip_preserves_type_when_parsed() {
        let encoded = encode_primitive(&Primitive::Number(123.0));
        assert_eq!(encoded, "123");
        assert_eq!(decode_primitive(&encoded, true), Primitive::Number(123.0));
        assert_eq!(
            decode_primitive(&encoded, false),
            Primitive::String("123".to_string())
        );
    }

    #[test]
    fn primitive_decode_falls_back_to_string_on_parse_failure() {
        assert_eq!(
            decode_primitive("hello world", true),
            Primitive::String("hello world".to_string())
        );
    }

    #[test]
    fn array_round_trip() {
        let arr = vec![Json::from(1), Json::from(2), Json::from("three")];
        let encoded = encode_array(&arr).unwrap();
        let decoded = decode_array(&encoded).unwrap();
        assert_eq!(decoded, arr);
    }

    #[test]
    fn object_round_trip_with_parse_type() {
        let mut obj = CacheObject::new();
        obj.insert("name".to_string(), Json::from("n"));
        obj.insert("age".to_string(), Json::from(55));
        let encoded = encode_object(&obj);
        assert_eq!(encoded.get("age").unwrap(), "55");
        let decoded = decode_object(encoded, true);
        assert_eq!(decoded.get("age").unwrap().as_f64(), Some(55.0));
    }
}
