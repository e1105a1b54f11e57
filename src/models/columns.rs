//! Serde adapters for column encodings that differ between storage engines.

/// 0/1 integer flags (or native booleans) read back as `bool`.
pub mod flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        from_value(Value::deserialize(d)?).map_err(D::Error::custom)
    }

    pub(super) fn from_value(value: Value) -> Result<bool, String> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f == 0.0 => Ok(false),
                Some(f) if f == 1.0 => Ok(true),
                _ => Err(format!("invalid flag: {n}")),
            },
            Value::String(s) => match s.as_str() {
                "1" | "true" | "t" => Ok(true),
                "0" | "false" | "f" => Ok(false),
                _ => Err(format!("invalid flag: {s}")),
            },
            other => Err(format!("invalid flag: {other}")),
        }
    }
}

/// Optional request flag accepting `true`/`false` or `1`/`0`.
pub mod optional_flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(v) => super::flag::from_value(v).map(Some).map_err(D::Error::custom),
        }
    }
}

/// Structured values kept in a TEXT column as JSON. Reads accept either the
/// encoded string or an already-decoded value.
pub mod json_text {
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<T: Serialize, S: Serializer>(value: &Option<T>, s: S) -> Result<S::Ok, S::Error> {
        value.serialize(s)
    }

    pub fn deserialize<'de, T, D>(d: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => serde_json::from_str(&s).map(Some).map_err(D::Error::custom),
            other => serde_json::from_value(other).map(Some).map_err(D::Error::custom),
        }
    }

    /// Encodes a value for binding into a TEXT column.
    pub fn encode<T: Serialize>(value: &T) -> Option<String> {
        serde_json::to_string(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Row {
        #[serde(with = "flag")]
        active: bool,
        #[serde(default, with = "json_text")]
        tiers: Option<Vec<i64>>,
    }

    #[test]
    fn test_flag_reads_integers_and_booleans() {
        let a: Row = serde_json::from_str(r#"{"active": 1}"#).unwrap();
        let b: Row = serde_json::from_str(r#"{"active": false}"#).unwrap();
        assert!(a.active);
        assert!(!b.active);
        assert!(serde_json::from_str::<Row>(r#"{"active": 7}"#).is_err());
    }

    #[test]
    fn test_json_text_reads_encoded_and_plain() {
        let a: Row = serde_json::from_str(r#"{"active": 1, "tiers": "[30,60]"}"#).unwrap();
        let b: Row = serde_json::from_str(r#"{"active": 1, "tiers": [90]}"#).unwrap();
        let c: Row = serde_json::from_str(r#"{"active": 1, "tiers": null}"#).unwrap();
        assert_eq!(a.tiers, Some(vec![30, 60]));
        assert_eq!(b.tiers, Some(vec![90]));
        assert_eq!(c.tiers, None);
    }
}
