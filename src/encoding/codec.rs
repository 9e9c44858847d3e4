//! JSON codec with configurable key strategies.

use serde_json::{Map, Value};

use crate::error::{HttpClientError, Result};

/// How object keys are rewritten on encode (and reversed on decode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Keys are written as-is.
    #[default]
    Preserve,
    /// `userId` on the Rust side becomes `user_id` on the wire.
    SnakeCase,
    /// `user_id` on the Rust side becomes `userId` on the wire.
    CamelCase,
}

/// Encoding options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonCodecOptions {
    pub key_strategy: KeyStrategy,
    /// Pretty-print encoded output.
    pub pretty: bool,
}

/// Byte-level codec used for encodable bodies and success payloads.
pub trait Codec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Value>;
}

/// Default `serde_json` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    options: JsonCodecOptions,
}

impl JsonCodec {
    pub fn new(options: JsonCodecOptions) -> Self {
        Self { options }
    }

    pub fn with_key_strategy(key_strategy: KeyStrategy) -> Self {
        Self::new(JsonCodecOptions {
            key_strategy,
            ..Default::default()
        })
    }
}

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let rewritten;
        let value = match self.options.key_strategy {
            KeyStrategy::Preserve => value,
            KeyStrategy::SnakeCase => {
                rewritten = rewrite_keys(value, &to_snake_case);
                &rewritten
            }
            KeyStrategy::CamelCase => {
                rewritten = rewrite_keys(value, &to_camel_case);
                &rewritten
            }
        };
        let out = if self.options.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        out.map_err(|e| HttpClientError::InvalidEncoding(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| HttpClientError::DecodeError(e.to_string()))?;
        Ok(match self.options.key_strategy {
            KeyStrategy::Preserve => value,
            KeyStrategy::SnakeCase => rewrite_keys(&value, &to_camel_case),
            KeyStrategy::CamelCase => rewrite_keys(&value, &to_snake_case),
        })
    }
}

fn rewrite_keys(value: &Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(rename(k), rewrite_keys(v, rename));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| rewrite_keys(v, rename)).collect()),
        other => other.clone(),
    }
}

fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for (i, ch) in key.chars().enumerate() {
        if ch == '_' && i > 0 {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preserve_strategy_is_plain_serde_json() {
        let codec = JsonCodec::default();
        let bytes = codec.encode(&json!({"userId": 1})).unwrap();
        assert_eq!(bytes, br#"{"userId":1}"#);
    }

    #[test]
    fn snake_case_strategy_rewrites_nested_keys() {
        let codec = JsonCodec::with_key_strategy(KeyStrategy::SnakeCase);
        let bytes = codec
            .encode(&json!({"userId": 1, "items": [{"createdAt": "now"}]}))
            .unwrap();
        let wire: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(wire, json!({"user_id": 1, "items": [{"created_at": "now"}]}));

        let back = codec.decode(&bytes).unwrap();
        assert_eq!(back, json!({"userId": 1, "items": [{"createdAt": "now"}]}));
    }

    #[test]
    fn camel_case_strategy_rewrites_keys() {
        let codec = JsonCodec::with_key_strategy(KeyStrategy::CamelCase);
        let bytes = codec.encode(&json!({"first_name": "Ada"})).unwrap();
        assert_eq!(bytes, br#"{"firstName":"Ada"}"#);
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let err = JsonCodec::default().decode(b"not json").unwrap_err();
        assert!(matches!(err, HttpClientError::DecodeError(_)));
    }
}
