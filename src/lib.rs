// ABOUTME: BSON (Binary JSON) document encoder/decoder for Rust.
// ABOUTME: Provides serde integration and a dynamic Value/Document API.

//! # wirebson
//!
//! A BSON (Binary JSON) document encoder and decoder for Rust.
//!
//! BSON is the length-prefixed binary document format published at
//! bsonspec.org: documents and arrays are recursive, length-prefixed units
//! of `[tag][cstring key][payload]` elements, with all multi-byte fields
//! little-endian. This crate reproduces that byte layout exactly in both
//! directions.
//!
//! ## Quick Start
//!
//! ```rust
//! use wirebson::{to_vec, from_slice};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! let person = Person {
//!     name: "Alice".to_string(),
//!     age: 30,
//! };
//!
//! // Serialize to BSON
//! let bytes = to_vec(&person).unwrap();
//!
//! // Deserialize from BSON
//! let decoded: Person = from_slice(&bytes).unwrap();
//! assert_eq!(person, decoded);
//! ```
//!
//! ## Working with Dynamic Documents
//!
//! ```rust
//! use wirebson::{doc, encode_document, decode_document};
//!
//! let document = doc! {
//!     "hello": "world",
//!     "values": [1, 2, 3],
//! };
//!
//! let bytes = encode_document(&document).unwrap();
//! let decoded = decode_document(&bytes).unwrap();
//! assert_eq!(decoded, document);
//! ```
//!
//! ## Coverage
//!
//! The supported value kinds are double, string, embedded document, array,
//! binary (generic and UUID subtypes), object id, boolean, UTC datetime,
//! null, regex, int32, int64, minkey, and maxkey. The deprecated wire kinds
//! (undefined, DB-pointer, JS code, symbol, JS code with scope, timestamp)
//! have no runtime representation: the decoder fails deterministically on
//! them rather than guessing at payload lengths.

pub mod de;
pub mod decoder;
pub mod encoder;
pub mod error;
mod field;
pub mod ser;
pub mod types;
pub mod value;

// Re-export commonly used items at the crate root
pub use de::{from_slice, Deserializer};
pub use decoder::{Decoder, Element, UnitStart, MAX_DEPTH};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use ser::Serializer;
pub use types::{binary_subtype, element_type, Binary, ObjectId, Regex, RegexFlags, UtcDatetime};
pub use value::{Document, Value};

// The bson! and doc! macros are exported at crate root via #[macro_export]

use serde::Serialize;

/// Serialize a value to a BSON byte vector.
///
/// The top-level value must serialize as a map/struct (a document unit) or
/// a sequence (an array unit); the wire format has no bare-scalar form.
///
/// # Example
///
/// ```rust
/// use wirebson::to_vec;
/// use std::collections::BTreeMap;
///
/// let mut map = BTreeMap::new();
/// map.insert("hello", "world");
/// let bytes = to_vec(&map).unwrap();
/// assert_eq!(bytes.len(), 0x16);
/// ```
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new();
    let mut serializer = Serializer::new(&mut encoder);
    value.serialize(&mut serializer)?;
    encoder.finish()
}

/// Encode a [`Document`] to BSON bytes.
///
/// Encoding is deterministic and idempotent: the document's iteration order
/// is fixed, and no state leaks between calls.
pub fn encode_document(document: &Document) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.begin_document(None)?;
    for (key, value) in document {
        encoder.write_value(key, value)?;
    }
    encoder.end_document()?;
    encoder.finish()
}

/// Encode a slice of values as a top-level BSON array unit, keyed by the
/// decimal string of each element's 0-based index.
pub fn encode_array(values: &[Value]) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.begin_array(None)?;
    for (index, value) in values.iter().enumerate() {
        encoder.write_value(&index.to_string(), value)?;
    }
    encoder.end_document()?;
    encoder.finish()
}

/// Decode a BSON buffer into a [`Document`].
///
/// A buffer whose length prefix is the absent-unit sentinel (declared
/// length 1) decodes as an empty document; this mirrors the wire producer's
/// "no document here" short-circuit and is not an error. Trailing bytes
/// after a real top-level unit are.
pub fn decode_document(data: &[u8]) -> Result<Document> {
    let mut decoder = Decoder::new(data);
    match decode_keyed_unit(&mut decoder)? {
        None => Ok(Document::new()),
        Some(entries) => {
            decoder.finish()?;
            Ok(collect_document(entries))
        }
    }
}

/// Decode a BSON buffer whose top-level unit is an array.
///
/// Elements are reassembled by their parsed index keys, not arrival order;
/// a key that is not a non-negative integer is an [`Error::InvalidKey`].
pub fn decode_array(data: &[u8]) -> Result<Vec<Value>> {
    let mut decoder = Decoder::new(data);
    match decode_keyed_unit(&mut decoder)? {
        None => Ok(Vec::new()),
        Some(entries) => {
            decoder.finish()?;
            collect_array(entries)
        }
    }
}

/// Decode one keyed unit into its raw `(key, value)` entries.
///
/// Documents and arrays share this routine; whether keys are field names or
/// parsed indices is the collector's concern. `None` is the absent-unit
/// sentinel.
fn decode_keyed_unit<'a>(decoder: &mut Decoder<'a>) -> Result<Option<Vec<(&'a str, Value)>>> {
    if decoder.begin_unit()? == UnitStart::Absent {
        return Ok(None);
    }
    let mut entries = Vec::new();
    while let Some((key, element)) = decoder.next_element()? {
        entries.push((key, build_value(decoder, element)?));
    }
    decoder.end_unit()?;
    Ok(Some(entries))
}

/// Turn one decoded element into an owned [`Value`], recursing into nested
/// units.
fn build_value<'a>(decoder: &mut Decoder<'a>, element: Element<'a>) -> Result<Value> {
    match element {
        Element::Double(v) => Ok(Value::Double(v)),
        Element::String(s) => Ok(Value::String(s.to_owned())),
        Element::DocumentStart => match decode_keyed_unit(decoder)? {
            // an absent nested unit decodes as null
            None => Ok(Value::Null),
            Some(entries) => Ok(Value::Document(collect_document(entries))),
        },
        Element::ArrayStart => match decode_keyed_unit(decoder)? {
            None => Ok(Value::Null),
            Some(entries) => Ok(Value::Array(collect_array(entries)?)),
        },
        Element::Binary { subtype, bytes } => Ok(Value::Binary(Binary {
            subtype,
            bytes: bytes.to_vec(),
        })),
        Element::ObjectId(oid) => Ok(Value::ObjectId(oid)),
        Element::Boolean(b) => Ok(Value::Boolean(b)),
        Element::Datetime(dt) => Ok(Value::Datetime(dt)),
        Element::Null => Ok(Value::Null),
        Element::Regex { pattern, flags } => Ok(Value::Regex(Regex {
            pattern: pattern.to_owned(),
            flags: RegexFlags::from_wire_str(flags)?,
        })),
        Element::Int32(n) => Ok(Value::Int32(n)),
        Element::Int64(n) => Ok(Value::Int64(n)),
        Element::MinKey => Ok(Value::MinKey),
        Element::MaxKey => Ok(Value::MaxKey),
    }
}

fn collect_document(entries: Vec<(&str, Value)>) -> Document {
    // duplicate keys keep the last occurrence
    entries
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}

/// Reassemble an array unit by parsed index. The wire convention writes
/// gapless ascending indices, but reconstruction sorts defensively rather
/// than trusting arrival order.
fn collect_array(entries: Vec<(&str, Value)>) -> Result<Vec<Value>> {
    let mut indexed = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let index: usize = key
            .parse()
            .map_err(|_| Error::InvalidKey(key.to_owned()))?;
        indexed.push((index, value));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, value)| value).collect())
}
