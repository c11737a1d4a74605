//! JSON codec for stored values.
//!
//! Binary leaves are written as `{"type":"Buffer","data":"<base64>"}`, the
//! shape the protocol library itself produces, so rows stay readable by
//! other implementations sharing the same table.

use std::ops::Deref;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeStruct as _, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;

pub const BUFFER_TAG: &str = "Buffer";

/// Owned byte buffer with the tagged-base64 JSON representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Buffer(pub Vec<u8>);

impl Buffer {
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CodecError> {
        Ok(Self(STANDARD.decode(encoded)?))
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Buffer {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Serialize for Buffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tagged = serializer.serialize_struct("Buffer", 2)?;
        tagged.serialize_field("type", BUFFER_TAG)?;
        tagged.serialize_field("data", &self.to_base64())?;
        tagged.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BufferData {
    Base64(String),
    Bytes(Vec<u8>),
}

impl BufferData {
    fn into_bytes(self) -> Result<Vec<u8>, base64::DecodeError> {
        match self {
            Self::Base64(s) => STANDARD.decode(s),
            Self::Bytes(b) => Ok(b),
        }
    }
}

#[derive(Deserialize)]
struct TaggedBuffer {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    buffer: bool,
    data: Option<BufferData>,
    value: Option<BufferData>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BufferRepr {
    Tagged(TaggedBuffer),
    Data(BufferData),
}

impl<'de> Deserialize<'de> for Buffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = match BufferRepr::deserialize(deserializer)? {
            BufferRepr::Tagged(tagged) => {
                if !tagged.buffer && tagged.kind.as_deref() != Some(BUFFER_TAG) {
                    return Err(de::Error::custom("object is not a tagged buffer"));
                }
                match tagged.data.or(tagged.value) {
                    Some(data) => data,
                    None => return Ok(Self::default()),
                }
            },
            BufferRepr::Data(data) => data,
        };
        data.into_bytes().map(Self).map_err(de::Error::custom)
    }
}

/// Whether a JSON object carries the buffer tag (current or legacy shape).
fn is_tagged_buffer(map: &serde_json::Map<String, Value>) -> bool {
    map.get("type").and_then(Value::as_str) == Some(BUFFER_TAG)
        || map.get("buffer").and_then(Value::as_bool) == Some(true)
}

/// Rewrite every tagged buffer in a free-form tree into the canonical
/// base64 form. Objects whose payload is a byte array (Node's
/// `Buffer#toJSON`) or that use the legacy `{buffer: true, value}` shape are
/// converted; everything else is left alone.
pub fn normalize_buffers(value: &mut Value) {
    match value {
        Value::Object(map) if is_tagged_buffer(map) => {
            let as_value = Value::Object(map.clone());
            match serde_json::from_value::<Buffer>(as_value) {
                Ok(buffer) => {
                    if let Ok(canonical) = serde_json::to_value(&buffer) {
                        *value = canonical;
                    }
                },
                Err(err) => {
                    tracing::debug!(error = %err, "tagged object is not a decodable buffer, leaving as-is");
                },
            }
        },
        Value::Object(map) => map.values_mut().for_each(normalize_buffers),
        Value::Array(items) => items.iter_mut().for_each(normalize_buffers),
        _ => {},
    }
}

/// Serialize a value to its stored text form.
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    let mut tree = serde_json::to_value(value)?;
    normalize_buffers(&mut tree);
    Ok(serde_json::to_string(&tree)?)
}

/// Parse stored text back into a typed value.
pub fn deserialize<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Parse stored text into a free-form tree with buffers in canonical form.
pub fn deserialize_value(text: &str) -> Result<Value, CodecError> {
    let mut tree: Value = serde_json::from_str(text)?;
    normalize_buffers(&mut tree);
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Nested {
        name: String,
        blob: Buffer,
        blobs: Vec<Buffer>,
        by_key: BTreeMap<String, Buffer>,
        maybe: Option<Buffer>,
        count: u32,
    }

    fn sample() -> Nested {
        let mut by_key = BTreeMap::new();
        by_key.insert("zero".to_owned(), Buffer(vec![0; 16]));
        by_key.insert("high".to_owned(), Buffer(vec![0xff, 0xfe, 0x80]));
        Nested {
            name: "sample".to_owned(),
            blob: Buffer((0..=255).collect()),
            blobs: vec![Buffer::default(), Buffer(vec![5, 1, 2])],
            by_key,
            maybe: None,
            count: 7,
        }
    }

    #[test]
    fn binary_values_round_trip_byte_for_byte() {
        let original = sample();
        let text = serialize(&original).unwrap();
        let decoded: Nested = deserialize(&text).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn buffers_are_written_as_tagged_base64() {
        let text = serialize(&Buffer(vec![1, 2, 3])).unwrap();
        let tree: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(tree, json!({"type": "Buffer", "data": "AQID"}));
    }

    #[test]
    fn reads_node_style_byte_arrays() {
        let buffer: Buffer = deserialize(r#"{"type":"Buffer","data":[1,2,3]}"#).unwrap();
        assert_eq!(buffer.0, vec![1, 2, 3]);
    }

    #[test]
    fn reads_legacy_buffer_shape() {
        let buffer: Buffer = deserialize(r#"{"buffer":true,"value":"AQID"}"#).unwrap();
        assert_eq!(buffer.0, vec![1, 2, 3]);
        let empty: Buffer = deserialize(r#"{"buffer":true}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn rejects_untagged_objects_and_bad_base64() {
        assert!(deserialize::<Buffer>(r#"{"type":"Other","data":"AQID"}"#).is_err());
        assert!(deserialize::<Buffer>(r#"{"type":"Buffer","data":"***"}"#).is_err());
    }

    #[test]
    fn free_form_trees_get_canonical_buffers() {
        let payload = json!({
            "plain": "text",
            "nested": [{"type": "Buffer", "data": [104, 105]}, 3, null],
            "already": {"type": "Buffer", "data": "aGk="},
            "notBuffer": {"type": "Other", "data": [1]}
        });
        let text = serialize(&payload).unwrap();
        let tree = deserialize_value(&text).unwrap();
        assert_eq!(tree["nested"][0], json!({"type": "Buffer", "data": "aGk="}));
        assert_eq!(tree["already"], json!({"type": "Buffer", "data": "aGk="}));
        assert_eq!(tree["notBuffer"], json!({"type": "Other", "data": [1]}));
        assert_eq!(tree["plain"], json!("text"));
        assert_eq!(tree["nested"][1], json!(3));
    }

    #[test]
    fn scalars_pass_through() {
        let text = serialize("bar").unwrap();
        assert_eq!(text, "\"bar\"");
        let back: String = deserialize(&text).unwrap();
        assert_eq!(back, "bar");
    }
}
