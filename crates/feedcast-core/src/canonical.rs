//! Canonical CBOR encoding for entries.
//!
//! This module implements RFC 8949 Core Deterministic Encoding for the
//! entry blob stored under each key:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)
//!
//! The same entry always produces identical bytes, so re-uploads on any peer
//! are overwrite-equivalent.

use ciborium::value::Value;

use crate::entry::Entry;
use crate::error::CoreError;

/// Current entry blob version.
pub const ENTRY_VERSION: u8 = 0;

/// Entry field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const TITLE: u64 = 1;
    pub const DESCRIPTION: u64 = 2;
    pub const LINK: u64 = 3;
    pub const PUBLISHED_AT: u64 = 4;
}

/// Encode an entry to canonical CBOR bytes.
pub fn encode_entry(entry: &Entry) -> Result<Vec<u8>, CoreError> {
    let value = entry_to_cbor_value(entry);
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value)?;
    Ok(buf)
}

/// Decode an entry from canonical CBOR bytes.
///
/// Rejects anything that does not re-encode to exactly the input, so a
/// decoded entry always has a single byte representation.
pub fn decode_entry(bytes: &[u8]) -> Result<Entry, CoreError> {
    if bytes.is_empty() {
        return Err(CoreError::MalformedEntry("empty blob".into()));
    }

    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let entry = cbor_value_to_entry(&value)?;

    if encode_entry(&entry)? != bytes {
        return Err(CoreError::MalformedEntry("non-canonical encoding".into()));
    }

    Ok(entry)
}

/// Convert an entry to a CBOR Value (map with integer keys).
fn entry_to_cbor_value(entry: &Entry) -> Value {
    Value::Map(vec![
        (
            Value::Integer(keys::VERSION.into()),
            Value::Integer(ENTRY_VERSION.into()),
        ),
        (
            Value::Integer(keys::TITLE.into()),
            Value::Text(entry.title.clone()),
        ),
        (
            Value::Integer(keys::DESCRIPTION.into()),
            Value::Text(entry.description.clone()),
        ),
        (
            Value::Integer(keys::LINK.into()),
            Value::Text(entry.link.clone()),
        ),
        (
            Value::Integer(keys::PUBLISHED_AT.into()),
            Value::Integer(entry.published_at.into()),
        ),
    ])
}

/// Convert a CBOR Value (map) back to an Entry.
fn cbor_value_to_entry(value: &Value) -> Result<Entry, CoreError> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedEntry("expected map".into())),
    };

    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    };

    let text = |key: u64, name: &str| -> Result<String, CoreError> {
        match get(key) {
            Some(Value::Text(s)) => Ok(s.clone()),
            _ => Err(CoreError::MalformedEntry(format!("missing {}", name))),
        }
    };

    let version = match get(keys::VERSION) {
        Some(Value::Integer(i)) => {
            u8::try_from(i128::from(*i)).map_err(|_| CoreError::MalformedEntry("bad version".into()))?
        }
        _ => return Err(CoreError::MalformedEntry("missing version".into())),
    };
    if version != ENTRY_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let published_at = match get(keys::PUBLISHED_AT) {
        Some(Value::Integer(i)) => i64::try_from(i128::from(*i))
            .map_err(|_| CoreError::MalformedEntry("timestamp overflow".into()))?,
        _ => return Err(CoreError::MalformedEntry("missing published_at".into())),
    };

    Ok(Entry {
        title: text(keys::TITLE, "title")?,
        description: text(keys::DESCRIPTION, "description")?,
        link: text(keys::LINK, "link")?,
        published_at,
    })
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => return Err(CoreError::EncodingError("unsupported CBOR value type".into())),
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}
