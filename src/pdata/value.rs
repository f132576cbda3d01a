use core::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered string-keyed map used for attributes and caches.
pub type Map = IndexMap<String, Value>;

/// Dynamically typed value held by attributes, bodies and caches.
#[derive(Clone, Debug, PartialEq, Default, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    /// Encoded in JSON as `{"bytes": "<hex>"}`. An object of exactly that
    /// shape therefore reads back as bytes, never as a map.
    Bytes(#[serde(with = "bytes_hex")] Vec<u8>),
    Slice(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Slice(_) => "slice",
            Value::Map(_) => "map",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Slice(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(bytes) => write!(f, "{}", encode_hex(bytes)),
            Value::Slice(_) | Value::Map(_) => {
                write!(f, "{}", serde_json::to_string(self).unwrap_or_default())
            }
        }
    }
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

pub(crate) fn decode_hex(digits: &str) -> Result<Vec<u8>, String> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("invalid hex digits in {:?}", digits));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {:?}", digits));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

mod bytes_hex {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Tagged {
        bytes: String,
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        Tagged {
            bytes: super::encode_hex(bytes),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let Tagged { bytes } = Tagged::deserialize(deserializer)?;
        super::decode_hex(&bytes).map_err(de::Error::custom)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Slice(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::from("get").to_string(), "get");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Nil.to_string(), "");
        assert_eq!(Value::Bytes(vec![0x01, 0xab]).to_string(), "01ab");
        assert_eq!(
            Value::Slice(vec![Value::from("a"), Value::Int(1)]).to_string(),
            r#"["a",1]"#
        );
    }

    #[test]
    fn test_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": [true, null], "c": 1.5}"#).unwrap();
        let value = Value::from_json(json);
        let map = value.as_map().unwrap();
        assert_eq!(map["a"], Value::Int(1));
        assert_eq!(
            map["b"],
            Value::Slice(vec![Value::Bool(true), Value::Nil])
        );
        assert_eq!(map["c"], Value::Double(1.5));
    }

    #[test]
    fn test_bytes_survive_json() {
        let mut map = Map::new();
        map.insert("id".into(), Value::Bytes(vec![0x01, 0x02]));
        map.insert("ints".into(), Value::Slice(vec![Value::Int(1), Value::Int(2)]));
        let value = Value::Map(map);

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"id":{"bytes":"0102"},"ints":[1,2]}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_bytes_like_maps_stay_maps() {
        let value: Value = serde_json::from_str(r#"{"bytes":"zz"}"#).unwrap();
        assert_eq!(value.as_map().map(|m| m["bytes"].clone()), Some(Value::from("zz")));
        let value: Value = serde_json::from_str(r#"{"bytes":"01","other":1}"#).unwrap();
        assert!(value.as_map().is_some());
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("01ab"), Ok(vec![0x01, 0xab]));
        assert!(decode_hex("abc").is_err());
        assert!(decode_hex("+1").is_err());
        assert!(decode_hex("é1").is_err());
    }
}
