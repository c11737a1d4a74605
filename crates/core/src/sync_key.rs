//! App-state sync keys and the decoder for their wire form.
//!
//! Sync keys reach the key store straight from protobuf-to-JSON conversion,
//! so fields arrive in several shapes: `keyData` as base64 text or a tagged
//! buffer, fingerprint counters as loose numbers, and `timestamp` as a
//! string, a number, or a `Long` object (`{low, high, unsigned}`).

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::Buffer;
use crate::error::CodecError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FingerprintState {
    pub raw_id: u32,
    pub current_index: u32,
    pub device_indexes: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStateSyncKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_data: Option<Buffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<FingerprintState>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<i64>,
}

const TWO_POW_32: i128 = 1 << 32;

/// JavaScript `x >>> 0`: truncate, then wrap into `0..2^32`. Anything that
/// is not numeric becomes 0.
fn to_uint32(value: Option<&Value>) -> u32 {
    let wrapped = |n: i128| u32::try_from(n.rem_euclid(TWO_POW_32)).unwrap_or(0);
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                wrapped(i128::from(i))
            } else if let Some(u) = n.as_u64() {
                wrapped(i128::from(u))
            } else {
                n.as_f64().map_or(0, float_to_uint32)
            }
        },
        Some(Value::String(s)) => s.trim().parse::<f64>().map_or(0, float_to_uint32),
        Some(Value::Bool(true)) => 1,
        _ => 0,
    }
}

#[allow(clippy::cast_possible_truncation, reason = "value is reduced below 2^32 first")]
#[allow(clippy::cast_sign_loss, reason = "rem_euclid result is non-negative")]
fn float_to_uint32(number: f64) -> u32 {
    if !number.is_finite() {
        return 0;
    }
    number.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// Base-10 integer prefix, like `parseInt(s, 10)`. Digit runs past the `i64`
/// range saturate.
fn parse_int_prefix(s: &str) -> Option<i64> {
    let trimmed = s.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

fn long_to_i64(long: &Map<String, Value>) -> Option<i64> {
    let low = long.get("low")?.as_i64()?;
    let high = long.get("high")?.as_i64()?;
    let low_bits = u64::from(u32::try_from(low & 0xFFFF_FFFF).ok()?);
    let high_bits = u64::from(u32::try_from(high & 0xFFFF_FFFF).ok()?);
    Some(((high_bits << 32) | low_bits).cast_signed())
}

#[allow(clippy::cast_possible_truncation, reason = "timestamps are far below i64::MAX")]
fn coerce_timestamp(value: &Value) -> Result<i64, CodecError> {
    match value {
        Value::String(s) => parse_int_prefix(s)
            .ok_or_else(|| CodecError::invalid("timestamp", format!("not an integer: {s:?}"))),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| CodecError::invalid("timestamp", format!("out of range: {n}"))),
        Value::Object(long) => long_to_i64(long)
            .ok_or_else(|| CodecError::invalid("timestamp", "object is not a Long")),
        other => Err(CodecError::invalid("timestamp", format!("unsupported value: {other}"))),
    }
}

/// Serde adapter accepting every timestamp shape the protocol emits.
pub(crate) fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce_timestamp(&value).map(Some).map_err(de::Error::custom),
    }
}

/// Rebuild an [`AppStateSyncKey`] from its stored wire form.
pub fn decode_app_state_sync_key(value: Value) -> Result<AppStateSyncKey, CodecError> {
    let Value::Object(mut object) = value else {
        return Err(CodecError::invalid("appStateSyncKey", "expected an object"));
    };

    let key_data = match object.remove("keyData") {
        None | Some(Value::Null) => None,
        Some(Value::String(encoded)) => Some(Buffer::from_base64(&encoded)?),
        Some(other) => Some(serde_json::from_value::<Buffer>(other)?),
    };

    let fingerprint = match object.get("fingerprint") {
        Some(Value::Object(fp)) => Some(FingerprintState {
            raw_id: to_uint32(fp.get("rawId")),
            current_index: to_uint32(fp.get("currentIndex")),
            device_indexes: match fp.get("deviceIndexes") {
                Some(Value::Array(items)) => items.iter().map(|v| to_uint32(Some(v))).collect(),
                _ => Vec::new(),
            },
        }),
        _ => None,
    };

    let timestamp = match object.get("timestamp") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(coerce_timestamp(raw)?),
    };

    Ok(AppStateSyncKey { key_data, fingerprint, timestamp })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_base64_key_data_and_string_timestamp() {
        let key = decode_app_state_sync_key(json!({
            "keyData": "AQID",
            "fingerprint": {"rawId": 7, "currentIndex": 2, "deviceIndexes": [0, 1]},
            "timestamp": "1700000000123"
        }))
        .unwrap();
        assert_eq!(key.key_data, Some(Buffer(vec![1, 2, 3])));
        assert_eq!(
            key.fingerprint,
            Some(FingerprintState { raw_id: 7, current_index: 2, device_indexes: vec![0, 1] })
        );
        assert_eq!(key.timestamp, Some(1_700_000_000_123));
    }

    #[test]
    fn decodes_tagged_and_array_key_data() {
        let tagged =
            decode_app_state_sync_key(json!({"keyData": {"type": "Buffer", "data": "AQID"}}))
                .unwrap();
        assert_eq!(tagged.key_data, Some(Buffer(vec![1, 2, 3])));

        let array = decode_app_state_sync_key(json!({"keyData": [9, 8]})).unwrap();
        assert_eq!(array.key_data, Some(Buffer(vec![9, 8])));
    }

    #[test]
    fn fingerprint_fields_wrap_like_unsigned_shift() {
        let key = decode_app_state_sync_key(json!({
            "fingerprint": {"rawId": -1, "currentIndex": null, "deviceIndexes": [4294967297_i64, 3.9, "5"]}
        }))
        .unwrap();
        let fp = key.fingerprint.unwrap();
        assert_eq!(fp.raw_id, u32::MAX);
        assert_eq!(fp.current_index, 0);
        assert_eq!(fp.device_indexes, vec![1, 3, 5]);
    }

    #[test]
    fn missing_device_indexes_default_to_empty() {
        let key = decode_app_state_sync_key(json!({"fingerprint": {"rawId": 1}})).unwrap();
        assert_eq!(key.fingerprint.unwrap().device_indexes, Vec::<u32>::new());
    }

    #[test]
    fn long_timestamps_are_combined() {
        let key = decode_app_state_sync_key(json!({
            "timestamp": {"low": 1, "high": 1, "unsigned": false}
        }))
        .unwrap();
        assert_eq!(key.timestamp, Some((1_i64 << 32) + 1));

        let negative_low = decode_app_state_sync_key(json!({
            "timestamp": {"low": -1, "high": 0, "unsigned": false}
        }))
        .unwrap();
        assert_eq!(negative_low.timestamp, Some(0xFFFF_FFFF));
    }

    #[test]
    fn numeric_timestamps_pass_through() {
        let key = decode_app_state_sync_key(json!({"timestamp": 1_700_000_000})).unwrap();
        assert_eq!(key.timestamp, Some(1_700_000_000));
        let float = decode_app_state_sync_key(json!({"timestamp": 12.75})).unwrap();
        assert_eq!(float.timestamp, Some(12));
    }

    #[test]
    fn rejects_non_objects_and_garbage_timestamps() {
        assert!(decode_app_state_sync_key(json!("nope")).is_err());
        assert!(decode_app_state_sync_key(json!({"timestamp": "soon"})).is_err());
        assert!(decode_app_state_sync_key(json!({"keyData": "***"})).is_err());
    }

    #[test]
    fn oversized_string_timestamps_saturate() {
        let key = decode_app_state_sync_key(json!({"timestamp": "99999999999999999999"})).unwrap();
        assert_eq!(key.timestamp, Some(i64::MAX));
    }

    #[test]
    fn parse_int_prefix_matches_parse_int() {
        assert_eq!(parse_int_prefix("  42abc"), Some(42));
        assert_eq!(parse_int_prefix("-17"), Some(-17));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix("-"), None);
        assert_eq!(parse_int_prefix("99999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_int_prefix("-99999999999999999999x"), Some(-i64::MAX));
    }

    #[test]
    fn encoded_key_decodes_back_to_itself() {
        let key = AppStateSyncKey {
            key_data: Some(Buffer(vec![0xAA; 32])),
            fingerprint: Some(FingerprintState {
                raw_id: 11,
                current_index: 3,
                device_indexes: vec![0, 7],
            }),
            timestamp: Some(1_690_000_000_000),
        };
        let wire = serde_json::to_value(&key).unwrap();
        assert_eq!(decode_app_state_sync_key(wire).unwrap(), key);
    }
}
