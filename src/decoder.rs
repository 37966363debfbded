// ABOUTME: BSON binary decoder: pull-based reader over the length-prefixed wire layout.
// ABOUTME: Every primitive read is bounds-checked; unknown tags fail fast, never skip.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use crate::error::{Error, Result};
use crate::field::ByteReader;
use crate::types::{binary_subtype, element_type, ObjectId, UtcDatetime};

/// The outcome of reading a unit's length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStart {
    /// A regular unit; elements follow until the declared end.
    Open,
    /// The absent-unit sentinel: a declared length of 1, a degenerate span
    /// that cannot even hold its own prefix. Some producers emit this as a
    /// "no document here" marker; it is not an error.
    Absent,
}

/// One decoded element, borrowing payload bytes from the input buffer.
///
/// Nested documents and arrays are not decoded inline: they surface as
/// `DocumentStart`/`ArrayStart` and the caller recurses with
/// [`Decoder::begin_unit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Element<'a> {
    Double(f64),
    String(&'a str),
    DocumentStart,
    ArrayStart,
    Binary { subtype: u8, bytes: &'a [u8] },
    ObjectId(ObjectId),
    Boolean(bool),
    Datetime(UtcDatetime),
    Null,
    /// Flags arrive as the raw wire letter string; interpretation is the
    /// caller's concern.
    Regex { pattern: &'a str, flags: &'a str },
    Int32(i32),
    Int64(i64),
    MinKey,
    MaxKey,
}

/// Offsets of one open unit.
#[derive(Clone, Copy)]
struct Unit {
    /// Offset of the unit's length prefix.
    start: usize,
    /// Scan bound: `start + declared - 1`, i.e. the terminator's offset.
    end: usize,
}

impl Unit {
    #[inline]
    fn declared(&self) -> i64 {
        (self.end - self.start + 1) as i64
    }
}

/// Maximum unit nesting depth the decoder accepts.
///
/// Stops adversarial deeply-nested buffers before the tree builder's
/// recursion can exhaust the stack.
pub const MAX_DEPTH: usize = 512;

/// A BSON decoder that reads from a byte slice.
///
/// Usage is begin/next/end per unit: [`Decoder::begin_unit`] consumes a
/// length prefix, [`Decoder::next_element`] yields elements until the
/// declared end, and [`Decoder::end_unit`] verifies the terminator and
/// repositions the cursor by the *declared* length — parent and child both
/// trust the same length-prefix contract.
pub struct Decoder<'a> {
    reader: ByteReader<'a>,
    /// Open units, innermost last.
    units: Vec<Unit>,
}

impl<'a> Decoder<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(data),
            units: Vec::new(),
        }
    }

    /// Read a unit's length prefix and open it for element reads.
    pub fn begin_unit(&mut self) -> Result<UnitStart> {
        if self.units.len() >= MAX_DEPTH {
            return Err(Error::DepthLimitExceeded);
        }
        let start = self.reader.position();
        let declared = self.reader.read_i32()?;

        if declared == 1 {
            // Resume exactly where a parent's declared-length advance lands.
            self.reader.seek(start + 1);
            return Ok(UnitStart::Absent);
        }
        // A real unit holds at least its prefix and terminator.
        if declared < 5 {
            return Err(Error::MalformedLength(i64::from(declared)));
        }
        let len = declared as usize;
        if len > self.reader.len() - start {
            return Err(Error::MalformedLength(i64::from(declared)));
        }
        let unit = Unit {
            start,
            end: start + len - 1,
        };
        // a nested unit claiming to outgrow its parent is lying
        if let Some(parent) = self.units.last() {
            if unit.end > parent.end {
                return Err(Error::MalformedLength(i64::from(declared)));
            }
        }
        self.units.push(unit);
        Ok(UnitStart::Open)
    }

    /// Read the next `[tag][cstring key][payload]` element of the innermost
    /// open unit, or `None` once the declared end is reached.
    pub fn next_element(&mut self) -> Result<Option<(&'a str, Element<'a>)>> {
        let unit = *self.units.last().ok_or(Error::UnbalancedUnits)?;
        if self.reader.position() >= unit.end {
            return Ok(None);
        }

        let tag = self.reader.read_u8()?;
        let key = self.reader.read_cstr()?;
        let element = self.read_payload(tag)?;

        // A fixed-width payload that crossed the unit's declared end means
        // the prefix lied; fail here rather than desyncing every sibling.
        let entered_unit = matches!(element, Element::DocumentStart | Element::ArrayStart);
        if !entered_unit && self.reader.position() > unit.end {
            return Err(Error::MalformedLength(unit.declared()));
        }

        Ok(Some((key, element)))
    }

    /// Close the innermost open unit: verify its terminator and advance the
    /// cursor to the declared end, whatever element reads consumed.
    pub fn end_unit(&mut self) -> Result<()> {
        let unit = self.units.pop().ok_or(Error::UnbalancedUnits)?;
        if self.reader.byte_at(unit.end) != 0x00 {
            return Err(Error::MissingTerminator);
        }
        self.reader.seek(unit.end + 1);
        Ok(())
    }

    /// Finish decoding: all units closed, no bytes left over.
    pub fn finish(&self) -> Result<()> {
        if !self.units.is_empty() {
            return Err(Error::UnbalancedUnits);
        }
        if self.reader.position() < self.reader.len() {
            return Err(Error::TrailingBytes);
        }
        Ok(())
    }

    /// Decode one payload according to its type tag. The six legacy kinds
    /// with no runtime representation fail here: their payload lengths are
    /// unknowable, so skipping is impossible and fail-fast is the only
    /// correct policy.
    fn read_payload(&mut self, tag: u8) -> Result<Element<'a>> {
        match tag {
            element_type::DOUBLE => Ok(Element::Double(self.reader.read_f64()?)),
            element_type::STRING => Ok(Element::String(self.reader.read_string()?)),
            element_type::DOCUMENT => Ok(Element::DocumentStart),
            element_type::ARRAY => Ok(Element::ArrayStart),
            element_type::BINARY => {
                let len = self.reader.read_i32()?;
                if len < 0 {
                    return Err(Error::MalformedLength(i64::from(len)));
                }
                let subtype = self.reader.read_u8()?;
                if subtype != binary_subtype::GENERIC && subtype != binary_subtype::UUID {
                    return Err(Error::UnsupportedBinarySubtype(subtype));
                }
                let bytes = self.reader.read_bytes(len as usize)?;
                Ok(Element::Binary { subtype, bytes })
            }
            element_type::OBJECT_ID => {
                let bytes = self.reader.read_bytes(12)?;
                let mut oid = [0u8; 12];
                oid.copy_from_slice(bytes);
                Ok(Element::ObjectId(ObjectId::new(oid)))
            }
            element_type::BOOLEAN => Ok(Element::Boolean(self.reader.read_bool()?)),
            element_type::UTC_DATETIME => Ok(Element::Datetime(UtcDatetime::from_millis(
                self.reader.read_i64()?,
            ))),
            element_type::NULL => Ok(Element::Null),
            element_type::REGEX => {
                let pattern = self.reader.read_cstr()?;
                let flags = self.reader.read_cstr()?;
                Ok(Element::Regex { pattern, flags })
            }
            element_type::INT32 => Ok(Element::Int32(self.reader.read_i32()?)),
            element_type::INT64 => Ok(Element::Int64(self.reader.read_i64()?)),
            element_type::MIN_KEY => Ok(Element::MinKey),
            element_type::MAX_KEY => Ok(Element::MaxKey),
            tag if element_type::is_unsupported(tag) => Err(Error::UnsupportedElementType(tag)),
            tag => Err(Error::InvalidElementType(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD: &[u8] = &[
        0x16, 0x00, 0x00, 0x00, 0x02, b'h', b'e', b'l', b'l', b'o', 0x00, 0x06, 0x00, 0x00, 0x00,
        b'w', b'o', b'r', b'l', b'd', 0x00, 0x00,
    ];

    #[test]
    fn test_pull_hello_world() {
        let mut dec = Decoder::new(HELLO_WORLD);
        assert_eq!(dec.begin_unit().unwrap(), UnitStart::Open);

        let (key, element) = dec.next_element().unwrap().unwrap();
        assert_eq!(key, "hello");
        assert_eq!(element, Element::String("world"));

        assert_eq!(dec.next_element().unwrap(), None);
        dec.end_unit().unwrap();
        dec.finish().unwrap();
    }

    #[test]
    fn test_empty_document() {
        let mut dec = Decoder::new(&[0x05, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(dec.begin_unit().unwrap(), UnitStart::Open);
        assert_eq!(dec.next_element().unwrap(), None);
        dec.end_unit().unwrap();
        dec.finish().unwrap();
    }

    #[test]
    fn test_absent_unit_sentinel() {
        let mut dec = Decoder::new(&[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(dec.begin_unit().unwrap(), UnitStart::Absent);
    }

    #[test]
    fn test_nested_document() {
        // {"d": {"x": 7}}
        let data = [
            0x14, 0x00, 0x00, 0x00, // outer: 20
            0x03, b'd', 0x00, // document element "d"
            0x0c, 0x00, 0x00, 0x00, // inner: 12
            0x10, b'x', 0x00, 0x07, 0x00, 0x00, 0x00, // "x": int32 7
            0x00, // inner terminator
            0x00, // outer terminator
        ];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();

        let (key, element) = dec.next_element().unwrap().unwrap();
        assert_eq!(key, "d");
        assert_eq!(element, Element::DocumentStart);

        assert_eq!(dec.begin_unit().unwrap(), UnitStart::Open);
        let (key, element) = dec.next_element().unwrap().unwrap();
        assert_eq!(key, "x");
        assert_eq!(element, Element::Int32(7));
        assert_eq!(dec.next_element().unwrap(), None);
        dec.end_unit().unwrap();

        assert_eq!(dec.next_element().unwrap(), None);
        dec.end_unit().unwrap();
        dec.finish().unwrap();
    }

    #[test]
    fn test_unsupported_tags_fail() {
        for tag in [0x06u8, 0x0c, 0x0d, 0x0e, 0x0f, 0x11] {
            let data = [0x08, 0x00, 0x00, 0x00, tag, b'k', 0x00, 0x00];
            let mut dec = Decoder::new(&data);
            dec.begin_unit().unwrap();
            assert_eq!(
                dec.next_element(),
                Err(Error::UnsupportedElementType(tag)),
                "tag 0x{tag:02x}"
            );
        }
    }

    #[test]
    fn test_unknown_tag_fails() {
        let data = [0x08, 0x00, 0x00, 0x00, 0x42, b'k', 0x00, 0x00];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        assert_eq!(dec.next_element(), Err(Error::InvalidElementType(0x42)));
    }

    #[test]
    fn test_length_prefix_exceeding_buffer() {
        let mut dec = Decoder::new(&[0x20, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(dec.begin_unit(), Err(Error::MalformedLength(32)));
    }

    #[test]
    fn test_impossible_length_prefix() {
        let mut dec = Decoder::new(&[0x03, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(dec.begin_unit(), Err(Error::MalformedLength(3)));

        let mut dec = Decoder::new(&[0xff, 0xff, 0xff, 0xff, 0x00]);
        assert_eq!(dec.begin_unit(), Err(Error::MalformedLength(-1)));
    }

    #[test]
    fn test_truncated_prefix() {
        let mut dec = Decoder::new(&[0x16, 0x00]);
        assert_eq!(dec.begin_unit(), Err(Error::Truncated));
    }

    #[test]
    fn test_truncated_string_payload() {
        // unit fits the buffer, but the string inside declares 6 bytes
        // where only the terminator remains
        let data = [0x0b, 0x00, 0x00, 0x00, 0x02, b's', 0x00, 0x06, 0x00, 0x00, 0x00];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        assert_eq!(dec.next_element(), Err(Error::Truncated));
    }

    #[test]
    fn test_element_overrunning_unit() {
        // outer declares 9 bytes, but the int32 element needs 7 + prefix 4
        let data = [
            0x09, 0x00, 0x00, 0x00, // declares end at offset 8
            0x10, b'k', 0x00, 0x07, 0x00, 0x00, 0x00, // 7-byte element
            0x00,
        ];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        assert_eq!(dec.next_element(), Err(Error::MalformedLength(9)));
    }

    #[test]
    fn test_missing_terminator() {
        let data = [0x05, 0x00, 0x00, 0x00, 0xab];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        assert_eq!(dec.next_element().unwrap(), None);
        assert_eq!(dec.end_unit(), Err(Error::MissingTerminator));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut data = HELLO_WORLD.to_vec();
        data.push(0x00);
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        dec.next_element().unwrap().unwrap();
        assert_eq!(dec.next_element().unwrap(), None);
        dec.end_unit().unwrap();
        assert_eq!(dec.finish(), Err(Error::TrailingBytes));
    }

    #[test]
    fn test_invalid_boolean_byte() {
        let data = [0x09, 0x00, 0x00, 0x00, 0x08, b'b', 0x00, 0x02, 0x00];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        assert_eq!(dec.next_element(), Err(Error::InvalidBoolean(0x02)));
    }

    #[test]
    fn test_unsupported_binary_subtype() {
        let data = [
            0x0e, 0x00, 0x00, 0x00, // unit
            0x05, b'b', 0x00, // binary element
            0x01, 0x00, 0x00, 0x00, // payload length 1
            0x05, // subtype: md5
            0xaa, 0x00,
        ];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        assert_eq!(dec.next_element(), Err(Error::UnsupportedBinarySubtype(0x05)));
    }

    #[test]
    fn test_min_max_key_have_no_payload() {
        let data = [
            0x0b, 0x00, 0x00, 0x00, //
            0xff, b'a', 0x00, // minkey
            0x7f, b'b', 0x00, // maxkey
            0x00,
        ];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        assert_eq!(dec.next_element().unwrap(), Some(("a", Element::MinKey)));
        assert_eq!(dec.next_element().unwrap(), Some(("b", Element::MaxKey)));
        assert_eq!(dec.next_element().unwrap(), None);
        dec.end_unit().unwrap();
        dec.finish().unwrap();
    }

    #[test]
    fn test_nested_unit_cannot_outgrow_parent() {
        // inner length runs past the end of the whole buffer
        let data = [
            0x0d, 0x00, 0x00, 0x00, // outer: 13
            0x03, b'd', 0x00, // document element
            0x40, 0x00, 0x00, 0x00, // inner claims 64
            0x00, 0x00,
        ];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        let (_, element) = dec.next_element().unwrap().unwrap();
        assert_eq!(element, Element::DocumentStart);
        assert_eq!(dec.begin_unit(), Err(Error::MalformedLength(64)));

        // inner length fits the buffer but crosses the parent's end
        let data = [
            0x0d, 0x00, 0x00, 0x00, // outer: 13 (end at offset 12)
            0x03, b'd', 0x00, // document element
            0x0c, 0x00, 0x00, 0x00, // inner claims 12 (end at offset 18)
            0x00, 0x00, // outer's last two bytes
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // slack the inner points into
        ];
        let mut dec = Decoder::new(&data);
        dec.begin_unit().unwrap();
        let (_, element) = dec.next_element().unwrap().unwrap();
        assert_eq!(element, Element::DocumentStart);
        assert_eq!(dec.begin_unit(), Err(Error::MalformedLength(12)));
    }
}
