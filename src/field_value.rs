//! Codec between the editor's selection and the host's stored field value.
//!
//! Reading accepts every shape the field has held over time:
//!
//! - a JSON array of `{postcode, city}` objects
//! - a string containing such an array as JSON text
//! - an object wrapping the array under `items`
//!
//! Writing always produces the JSON text form, so older shapes are replaced on
//! the next save.

use std::future::Future;
use std::sync::RwLock;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

use crate::types::{DisplayOption, PostalRecord};

/// Decode a stored field value. Anything unrecognised yields an empty selection.
pub fn decode(raw: &Value) -> Vec<PostalRecord> {
    match raw {
        Value::Array(_) => records_from(raw),
        Value::String(text) => decode_str(text),
        Value::Object(map) => match map.get("items") {
            Some(items @ Value::Array(_)) => records_from(items),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Decode a value held as JSON text. Only an array is accepted.
pub fn decode_str(text: &str) -> Vec<PostalRecord> {
    if text.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(items @ Value::Array(_)) => records_from(&items),
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::debug!("Ignoring unparseable field value: {}", e);
            Vec::new()
        }
    }
}

fn records_from(items: &Value) -> Vec<PostalRecord> {
    Vec::<PostalRecord>::deserialize(items).unwrap_or_else(|e| {
        tracing::debug!("Ignoring malformed field value: {}", e);
        Vec::new()
    })
}

/// Canonical stored form: a JSON array of `{postcode, city}` objects.
pub fn encode(records: &[PostalRecord]) -> String {
    serde_json::to_string(records).unwrap_or_else(|e| {
        tracing::error!("Failed to encode selection: {}", e);
        "[]".to_string()
    })
}

/// The host's storage slot for one field
pub trait FieldSlot: Send + Sync {
    /// Current raw value; `Value::Null` when unset.
    fn read(&self) -> Value;

    fn write(&self, raw: String) -> impl Future<Output = Result<()>> + Send;
}

/// Write the values of the chosen options back to the field.
///
/// Returns whether the write succeeded. Failures are logged, never retried.
pub async fn persist_selection<S: FieldSlot>(slot: &S, options: &[DisplayOption]) -> bool {
    let records: Vec<PostalRecord> = options.iter().map(|o| o.value.clone()).collect();
    match slot.write(encode(&records)).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Error saving field value: {:#}", e);
            false
        }
    }
}

/// A field slot held in process memory
#[derive(Debug, Default)]
pub struct MemoryFieldSlot {
    value: RwLock<Value>,
}

impl MemoryFieldSlot {
    pub fn new(value: Value) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }
}

impl FieldSlot for MemoryFieldSlot {
    fn read(&self) -> Value {
        self.value
            .read()
            .map(|v| v.clone())
            .unwrap_or(Value::Null)
    }

    async fn write(&self, raw: String) -> Result<()> {
        let mut value = self
            .value
            .write()
            .map_err(|_| anyhow::anyhow!("field slot lock poisoned"))?;
        *value = Value::String(raw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::record;

    #[test]
    fn test_decode_accepted_shapes() {
        let expected = vec![record("3000", "Leuven"), record("9000", "Gent")];
        let array = json!([
            {"postcode": "3000", "city": "Leuven"},
            {"postcode": "9000", "city": "Gent"}
        ]);

        assert_eq!(decode(&array), expected);
        assert_eq!(decode(&Value::String(array.to_string())), expected);
        assert_eq!(decode(&json!({ "items": array })), expected);
    }

    #[test]
    fn test_decode_rejects_other_shapes() {
        assert!(decode(&Value::Null).is_empty());
        assert!(decode(&json!(42)).is_empty());
        assert!(decode(&json!(true)).is_empty());
        assert!(decode(&json!("")).is_empty());
        assert!(decode(&json!("not json")).is_empty());
        assert!(decode(&json!(r#"{"items":[]}"#)).is_empty());
        assert!(decode(&json!({ "items": "nope" })).is_empty());
        assert!(decode(&json!({ "postcode": "3000", "city": "Leuven" })).is_empty());
        assert!(decode(&json!([{ "postcode": "3000" }])).is_empty());
    }

    #[test]
    fn test_encode_round_trip() {
        let records = vec![record("1000", "Brussels"), record("3000", "Leuven, Heverlee")];
        let encoded = encode(&records);

        assert_eq!(
            encoded,
            r#"[{"postcode":"1000","city":"Brussels"},{"postcode":"3000","city":"Leuven, Heverlee"}]"#
        );
        assert_eq!(decode_str(&encoded), records);
        assert_eq!(encode(&[]), "[]");
    }

    #[test]
    fn test_numeric_postcodes_survive_decode_and_resave() {
        let legacy = json!([{ "postcode": 9000, "city": "Gent" }, { "postcode": "3000", "city": "Leuven" }]);
        let records = decode(&legacy);

        assert_eq!(records, vec![record("9000", "Gent"), record("3000", "Leuven")]);
        assert_eq!(
            encode(&records),
            r#"[{"postcode":"9000","city":"Gent"},{"postcode":"3000","city":"Leuven"}]"#
        );
    }

    #[test]
    fn test_legacy_shape_is_rewritten_canonically() {
        let legacy = json!({ "items": [{ "postcode": "9000", "city": "Gent" }] });
        let encoded = encode(&decode(&legacy));
        assert_eq!(encoded, r#"[{"postcode":"9000","city":"Gent"}]"#);
    }

    struct BrokenSlot;

    impl FieldSlot for BrokenSlot {
        fn read(&self) -> Value {
            Value::Null
        }

        async fn write(&self, _raw: String) -> Result<()> {
            anyhow::bail!("host rejected value")
        }
    }

    #[tokio::test]
    async fn test_persist_selection() {
        let slot = MemoryFieldSlot::default();
        let options = vec![DisplayOption {
            label: "Gent (9000)".to_string(),
            value: record("9000", "Gent"),
        }];

        assert!(persist_selection(&slot, &options).await);
        assert_eq!(decode(&slot.read()), vec![record("9000", "Gent")]);

        assert!(!persist_selection(&BrokenSlot, &options).await);
    }
}
