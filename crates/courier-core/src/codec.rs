//! Payload codec boundary.
//!
//! A [`PayloadCodec`] converts structured values to and from the opaque string
//! payloads the transport carries. [`JsonCodec`] is the stock implementation.

use serde_json::Value;

use crate::error::{CodecError, CodecResult};
use crate::payload::Payload;

/// Encodes and decodes structured payloads.
pub trait PayloadCodec: Send + Sync {
    /// Short codec name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Encodes a structured value into its wire form.
    fn encode(&self, value: &Value) -> CodecResult<String>;

    /// Decodes a wire payload into a structured value.
    fn decode(&self, raw: &str) -> CodecResult<Value>;
}

/// JSON payload codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value) -> CodecResult<String> {
        serde_json::to_string(value).map_err(|e| CodecError::Encode {
            codec: self.name(),
            reason: e.to_string(),
        })
    }

    fn decode(&self, raw: &str) -> CodecResult<Value> {
        serde_json::from_str(raw).map_err(|e| CodecError::Decode {
            codec: self.name(),
            reason: e.to_string(),
        })
    }
}

impl Payload {
    /// Decodes a raw payload; structured payloads are returned unchanged.
    pub fn decode_with(self, codec: &dyn PayloadCodec) -> CodecResult<Payload> {
        match self {
            Self::Raw(data) => codec.decode(&data).map(Payload::Structured),
            structured => Ok(structured),
        }
    }

    /// Encodes a table-like payload; scalars and raw payloads pass through.
    pub fn encode_with(self, codec: &dyn PayloadCodec) -> CodecResult<Payload> {
        match self {
            Self::Structured(value @ (Value::Object(_) | Value::Array(_))) => {
                codec.encode(&value).map(Payload::Raw)
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_raw_payload() {
        let payload = Payload::raw(r#"{"method":"POST"}"#)
            .decode_with(&JsonCodec)
            .unwrap();
        assert_eq!(payload.method(), Some("POST"));
    }

    #[test]
    fn test_decode_leaves_structured_alone() {
        let payload = Payload::from(json!({"a": 1}));
        assert_eq!(payload.clone().decode_with(&JsonCodec).unwrap(), payload);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = Payload::raw("{not json").decode_with(&JsonCodec).unwrap_err();
        assert!(matches!(err, CodecError::Decode { codec: "json", .. }));
    }

    #[test]
    fn test_encode_only_tables() {
        let encoded = Payload::from(json!({"pong": true}))
            .encode_with(&JsonCodec)
            .unwrap();
        assert_eq!(encoded, Payload::raw(r#"{"pong":true}"#));

        let scalar = Payload::from(json!(42));
        assert_eq!(scalar.clone().encode_with(&JsonCodec).unwrap(), scalar);
    }
}
