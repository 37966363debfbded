// ABOUTME: Dynamic document value type for BSON.
// ABOUTME: A closed tagged union; encoder and decoder match it exhaustively.

use crate::types::{Binary, ObjectId, Regex, UtcDatetime};
use std::collections::BTreeMap;
use std::fmt;

/// A document: a key-unique mapping from string to [`Value`].
///
/// `BTreeMap` gives a stable, deterministic iteration order, which is what
/// makes encoding idempotent: two structurally equal documents always
/// produce byte-identical output. Keys must be valid C-strings (no embedded
/// NUL); the encoder enforces this.
pub type Document = BTreeMap<String, Value>;

/// A BSON value.
///
/// The set of variants is closed: every variant has exactly one wire type
/// tag, and both the encoder and decoder dispatch over it with exhaustive
/// matches. Wire kinds without a variant here (undefined, DB-pointer,
/// JS code, symbol, JS code with scope, timestamp) are never produced and
/// fail deterministically on decode.
#[derive(Clone, PartialEq, Default)]
pub enum Value {
    /// A 64-bit IEEE-754 float
    Double(f64),
    /// A UTF-8 string
    String(String),
    /// An embedded document
    Document(Document),
    /// An ordered sequence, wire-encoded as a document with "0","1",…  keys
    Array(Vec<Value>),
    /// Binary data with an explicit subtype byte
    Binary(Binary),
    /// A 12-byte object id
    ObjectId(ObjectId),
    /// A boolean
    Boolean(bool),
    /// UTC datetime, signed milliseconds since the Unix epoch
    Datetime(UtcDatetime),
    /// Null
    #[default]
    Null,
    /// A regular expression: pattern plus flags
    Regex(Regex),
    /// A signed 32-bit integer
    Int32(i32),
    /// A signed 64-bit integer
    Int64(i64),
    /// Sorts before every other value; payload-less
    MinKey,
    /// Sorts after every other value; payload-less
    MaxKey,
}

impl Value {
    /// Returns true if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value is a boolean.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    /// Returns true if this value is any numeric type.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Double(_) | Value::Int32(_) | Value::Int64(_))
    }

    /// Returns true if this value is a string.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Returns true if this value is a document.
    #[must_use]
    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    /// Returns true if this value is an array.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// If this is a boolean, returns the value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// If this is an integer, returns the value as i64 (widening int32).
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// If this is a number, returns the value as f64.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            Value::Int32(n) => Some(f64::from(*n)),
            Value::Int64(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// If this is a string, returns a reference to it.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// If this is a document, returns a reference to it.
    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    /// If this is a document, returns a mutable reference to it.
    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    /// If this is an array, returns a reference to it.
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// If this is an array, returns a mutable reference to it.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// If this is an object id, returns it.
    #[must_use]
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Value::ObjectId(oid) => Some(*oid),
            _ => None,
        }
    }

    /// If this is a datetime, returns it.
    #[must_use]
    pub fn as_datetime(&self) -> Option<UtcDatetime> {
        match self {
            Value::Datetime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// If this is binary data, returns a reference to it.
    #[must_use]
    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Index into an array. Returns None if not an array or out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|a| a.get(index))
    }

    /// Index into a document by key. Returns None if not a document or the
    /// key is absent.
    #[must_use]
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.as_document().and_then(|d| d.get(key))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(n) => write!(f, "Double({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Document(d) => f.debug_tuple("Document").field(d).finish(),
            Value::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Value::Binary(b) => write!(f, "Binary(subtype=0x{:02x}, {} bytes)", b.subtype, b.bytes.len()),
            Value::ObjectId(oid) => write!(f, "ObjectId({oid})"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Datetime(dt) => write!(f, "Datetime({dt})"),
            Value::Null => write!(f, "Null"),
            Value::Regex(r) => write!(f, "Regex(/{}/{})", r.pattern, r.flags.to_wire_string()),
            Value::Int32(n) => write!(f, "Int32({n})"),
            Value::Int64(n) => write!(f, "Int64({n})"),
            Value::MinKey => write!(f, "MinKey"),
            Value::MaxKey => write!(f, "MaxKey"),
        }
    }
}

// Human-readable, JSON-like diagnostic rendering. Datetimes go through the
// stateless UTC formatter; none of this touches the wire path.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "\"{}\"", s.escape_default()),
            Value::Document(d) => {
                write!(f, "{{")?;
                for (i, (k, v)) in d.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", k.escape_default(), v)?;
                }
                write!(f, "}}")
            }
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Binary(b) => write!(f, "Binary(0x{:02x}, {} bytes)", b.subtype, b.bytes.len()),
            Value::ObjectId(oid) => write!(f, "ObjectId(\"{oid}\")"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Datetime(dt) => write!(f, "Datetime(\"{dt}\")"),
            Value::Null => write!(f, "null"),
            Value::Regex(r) => write!(f, "/{}/{}", r.pattern, r.flags.to_wire_string()),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::MinKey => write!(f, "MinKey"),
            Value::MaxKey => write!(f, "MaxKey"),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i8> for Value {
    fn from(n: i8) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<i16> for Value {
    fn from(n: i16) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int64(i64::from(n))
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Double(f64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl From<ObjectId> for Value {
    fn from(oid: ObjectId) -> Self {
        Value::ObjectId(oid)
    }
}

impl From<UtcDatetime> for Value {
    fn from(dt: UtcDatetime) -> Self {
        Value::Datetime(dt)
    }
}

impl From<Binary> for Value {
    fn from(b: Binary) -> Self {
        Value::Binary(b)
    }
}

impl From<Regex> for Value {
    fn from(r: Regex) -> Self {
        Value::Regex(r)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::Array(iter.into_iter().map(Into::into).collect())
    }
}

/// Macro for creating BSON values easily.
///
/// # Examples
///
/// ```rust
/// use wirebson::bson;
///
/// let value = bson!({
///     "name": "test",
///     "values": [1, 2, 3],
///     "active": true
/// });
/// ```
#[macro_export]
macro_rules! bson {
    // null
    (null) => {
        $crate::Value::Null
    };

    // bool
    (true) => {
        $crate::Value::Boolean(true)
    };
    (false) => {
        $crate::Value::Boolean(false)
    };

    // array
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![ $( $crate::bson!($elem) ),* ])
    };

    // document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::Value::Document($crate::doc! { $($key : $value),* })
    };

    // other expressions (numbers, strings, etc.)
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

/// Macro for creating a [`Document`] directly.
///
/// # Examples
///
/// ```rust
/// use wirebson::doc;
///
/// let doc = doc! {
///     "hello": "world",
///     "count": 3,
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    { $($key:tt : $value:tt),* $(,)? } => {
        {
            let mut map = $crate::Document::new();
            $(
                map.insert(String::from($key), $crate::bson!($value));
            )*
            map
        }
    };
}
