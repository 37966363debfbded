// ABOUTME: BSON binary encoder: recursive, length-prefixed document/array writer.
// ABOUTME: Each unit reserves a 4-byte prefix up front and backpatches it on close.

use crate::error::{Error, Result};
use crate::field::{patch_i32, put_bool, put_bytes, put_cstring, put_f64, put_i32, put_i64, put_string, put_u8};
use crate::types::{element_type, Binary, ObjectId, Regex, UtcDatetime};
use crate::value::{Document, Value};

/// A BSON encoder that writes to an owned byte buffer.
///
/// Documents and arrays are "units": `begin_*` reserves 4 bytes for the
/// length prefix, element writes append `[tag][cstring key][payload]`, and
/// closing the unit patches the prefix with the total unit length (prefix
/// and trailing terminator included) before appending the terminator.
///
/// Encoding never mutates its input and is idempotent: the only iteration
/// order in play is the document's own deterministic order.
pub struct Encoder {
    buf: Vec<u8>,
    /// Start offsets of the currently open units, innermost last.
    units: Vec<usize>,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            units: Vec::new(),
        }
    }

    /// Finish encoding and return the buffer.
    /// Fails if any unit is still open.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.units.is_empty() {
            return Err(Error::UnbalancedUnits);
        }
        Ok(self.buf)
    }

    /// Number of currently open units.
    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.units.len()
    }

    /// Begin a document unit. With a key, the document is an element of the
    /// enclosing unit; without one it is the top-level unit.
    pub fn begin_document(&mut self, key: Option<&str>) -> Result<()> {
        if let Some(key) = key {
            self.write_element_header(element_type::DOCUMENT, key)?;
        }
        self.begin_unit();
        Ok(())
    }

    /// Begin an array unit. On the wire an array is a document whose keys
    /// are the decimal element indices; only the element tag differs.
    pub fn begin_array(&mut self, key: Option<&str>) -> Result<()> {
        if let Some(key) = key {
            self.write_element_header(element_type::ARRAY, key)?;
        }
        self.begin_unit();
        Ok(())
    }

    /// Close the innermost open unit (document or array): patch its length
    /// prefix and append the terminator.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_possible_wrap)]
    pub fn end_document(&mut self) -> Result<()> {
        let start = self.units.pop().ok_or(Error::UnbalancedUnits)?;
        // +1 for the terminator about to be appended
        let total = (self.buf.len() - start + 1) as i32;
        patch_i32(&mut self.buf, start, total);
        put_u8(&mut self.buf, 0x00);
        Ok(())
    }

    /// Write one element into the innermost open unit, recursing for nested
    /// documents and arrays.
    pub fn write_value(&mut self, key: &str, value: &Value) -> Result<()> {
        match value {
            Value::Double(v) => self.write_double(key, *v),
            Value::String(v) => self.write_string(key, v),
            Value::Document(d) => self.write_document(key, d),
            Value::Array(a) => self.write_array(key, a),
            Value::Binary(b) => self.write_binary(key, b),
            Value::ObjectId(oid) => self.write_object_id(key, *oid),
            Value::Boolean(b) => self.write_boolean(key, *b),
            Value::Datetime(dt) => self.write_datetime(key, *dt),
            Value::Null => self.write_null(key),
            Value::Regex(r) => self.write_regex(key, r),
            Value::Int32(n) => self.write_int32(key, *n),
            Value::Int64(n) => self.write_int64(key, *n),
            Value::MinKey => self.write_min_key(key),
            Value::MaxKey => self.write_max_key(key),
        }
    }

    pub fn write_double(&mut self, key: &str, value: f64) -> Result<()> {
        self.write_element_header(element_type::DOUBLE, key)?;
        put_f64(&mut self.buf, value);
        Ok(())
    }

    pub fn write_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.write_element_header(element_type::STRING, key)?;
        put_string(&mut self.buf, value);
        Ok(())
    }

    pub fn write_document(&mut self, key: &str, doc: &Document) -> Result<()> {
        self.begin_document(Some(key))?;
        for (k, v) in doc {
            self.write_value(k, v)?;
        }
        self.end_document()
    }

    pub fn write_array(&mut self, key: &str, values: &[Value]) -> Result<()> {
        self.begin_array(Some(key))?;
        for (index, v) in values.iter().enumerate() {
            self.write_value(&index.to_string(), v)?;
        }
        self.end_document()
    }

    /// The length prefix covers the payload bytes only, not the subtype.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_possible_wrap)]
    pub fn write_binary(&mut self, key: &str, value: &Binary) -> Result<()> {
        self.write_element_header(element_type::BINARY, key)?;
        put_i32(&mut self.buf, value.bytes.len() as i32);
        put_u8(&mut self.buf, value.subtype);
        put_bytes(&mut self.buf, &value.bytes);
        Ok(())
    }

    pub fn write_object_id(&mut self, key: &str, value: ObjectId) -> Result<()> {
        self.write_element_header(element_type::OBJECT_ID, key)?;
        put_bytes(&mut self.buf, &value.bytes());
        Ok(())
    }

    pub fn write_boolean(&mut self, key: &str, value: bool) -> Result<()> {
        self.write_element_header(element_type::BOOLEAN, key)?;
        put_bool(&mut self.buf, value);
        Ok(())
    }

    pub fn write_datetime(&mut self, key: &str, value: UtcDatetime) -> Result<()> {
        self.write_element_header(element_type::UTC_DATETIME, key)?;
        put_i64(&mut self.buf, value.timestamp_millis());
        Ok(())
    }

    pub fn write_null(&mut self, key: &str) -> Result<()> {
        self.write_element_header(element_type::NULL, key)
    }

    /// Pattern and flag string are both C-strings; the flags are emitted in
    /// the wire's canonical letter order.
    pub fn write_regex(&mut self, key: &str, value: &Regex) -> Result<()> {
        self.write_element_header(element_type::REGEX, key)?;
        put_cstring(&mut self.buf, &value.pattern)?;
        put_cstring(&mut self.buf, &value.flags.to_wire_string())?;
        Ok(())
    }

    pub fn write_int32(&mut self, key: &str, value: i32) -> Result<()> {
        self.write_element_header(element_type::INT32, key)?;
        put_i32(&mut self.buf, value);
        Ok(())
    }

    pub fn write_int64(&mut self, key: &str, value: i64) -> Result<()> {
        self.write_element_header(element_type::INT64, key)?;
        put_i64(&mut self.buf, value);
        Ok(())
    }

    /// Identity is carried entirely by the type tag; the payload is empty.
    pub fn write_min_key(&mut self, key: &str) -> Result<()> {
        self.write_element_header(element_type::MIN_KEY, key)
    }

    /// Identity is carried entirely by the type tag; the payload is empty.
    pub fn write_max_key(&mut self, key: &str) -> Result<()> {
        self.write_element_header(element_type::MAX_KEY, key)
    }

    // -------------------------------------------------------------------------
    // Internal encoding methods
    // -------------------------------------------------------------------------

    /// Write `[tag][cstring key]`; the caller appends the payload.
    fn write_element_header(&mut self, tag: u8, key: &str) -> Result<()> {
        put_u8(&mut self.buf, tag);
        put_cstring(&mut self.buf, key)
    }

    /// Reserve the 4-byte length prefix and remember where it lives.
    fn begin_unit(&mut self) {
        self.units.push(self.buf.len());
        put_i32(&mut self.buf, 0);
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
