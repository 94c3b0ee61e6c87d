//! Header and body payloads.
//!
//! A [`Payload`] is either still in its wire form ([`Payload::Raw`]) or has
//! been decoded into a structured [`Value`]. Inbound headers and bodies start
//! out however the transport delivered them; the codec adapter turns raw
//! payloads into structured ones on the way in and back again on the way out.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A header or body payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Opaque wire representation, not yet decoded.
    Raw(String),
    /// Structured value.
    Structured(Value),
}

impl Default for Payload {
    fn default() -> Self {
        Self::Structured(Value::Null)
    }
}

impl Payload {
    /// A structured null payload (the wire equivalent of "nothing").
    pub fn null() -> Self {
        Self::Structured(Value::Null)
    }

    /// An empty structured object, the default for response headers.
    pub fn empty_object() -> Self {
        Self::Structured(Value::Object(Map::new()))
    }

    /// A raw wire payload.
    pub fn raw(data: impl Into<String>) -> Self {
        Self::Raw(data.into())
    }

    /// Returns `true` if this payload has not been decoded.
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    /// Returns `true` for a structured null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Structured(Value::Null))
    }

    /// Returns `true` if this is a structured object or array.
    ///
    /// Only table-like values go through the codec on the way out; scalars are
    /// sent as they are.
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Structured(Value::Object(_) | Value::Array(_)))
    }

    /// Returns the structured value, if decoded.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Returns the raw wire data, if not decoded.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Raw(data) => Some(data),
            Self::Structured(_) => None,
        }
    }

    /// Looks up a field of a structured object payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_value()?.as_object()?.get(key)
    }

    /// Returns the `method` field of a header payload.
    ///
    /// Raw headers and non-string methods count as absent.
    pub fn method(&self) -> Option<&str> {
        self.get("method")?.as_str()
    }

    /// Consumes the payload, returning the structured value if decoded.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self::Structured(Value::Object(map))
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Self::Structured(Value::Bool(value))
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Self::Structured(Value::from(value))
    }
}

impl From<u16> for Payload {
    fn from(value: u16) -> Self {
        Self::Structured(Value::from(value))
    }
}

// Raw payloads are strings on the wire; any other JSON value is structured.
impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Raw(data) => serializer.serialize_str(data),
            Self::Structured(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(data) => Self::Raw(data),
            other => Self::Structured(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_lookup() {
        let headers = Payload::from(json!({"method": "GET"}));
        assert_eq!(headers.method(), Some("GET"));

        assert_eq!(Payload::empty_object().method(), None);
        assert_eq!(Payload::raw(r#"{"method":"GET"}"#).method(), None);
        assert_eq!(Payload::from(json!({"method": 7})).method(), None);
    }

    #[test]
    fn test_is_table() {
        assert!(Payload::from(json!({"a": 1})).is_table());
        assert!(Payload::from(json!([1, 2])).is_table());
        assert!(!Payload::from(json!("text")).is_table());
        assert!(!Payload::raw("text").is_table());
        assert!(!Payload::null().is_table());
    }

    #[test]
    fn test_wire_strings_deserialize_as_raw() {
        let payload: Payload = serde_json::from_str(r#""{\"method\":\"GET\"}""#).unwrap();
        assert!(payload.is_raw());

        let payload: Payload = serde_json::from_str(r#"{"method":"GET"}"#).unwrap();
        assert_eq!(payload.method(), Some("GET"));
    }
}
