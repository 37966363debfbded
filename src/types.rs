// ABOUTME: Defines BSON element type tags, binary subtypes, and carrier types.
// ABOUTME: Tag values map directly to the BSON specification byte values.

use crate::error::{Error, Result};
use std::fmt;
use std::ops::BitOr;

/// Element type tags for BSON values.
/// These match the BSON specification exactly.
pub mod element_type {
    pub const DOUBLE: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const DOCUMENT: u8 = 0x03;
    pub const ARRAY: u8 = 0x04;
    pub const BINARY: u8 = 0x05;

    /// Deprecated in the BSON specification; never produced, never decoded.
    pub const UNDEFINED: u8 = 0x06;

    pub const OBJECT_ID: u8 = 0x07;
    pub const BOOLEAN: u8 = 0x08;
    pub const UTC_DATETIME: u8 = 0x09;
    pub const NULL: u8 = 0x0a;
    pub const REGEX: u8 = 0x0b;

    /// Deprecated in the BSON specification; never produced, never decoded.
    pub const DB_POINTER: u8 = 0x0c;

    pub const JS_CODE: u8 = 0x0d;

    /// Deprecated in the BSON specification; never produced, never decoded.
    pub const SYMBOL: u8 = 0x0e;

    pub const JS_CODE_WITH_SCOPE: u8 = 0x0f;
    pub const INT32: u8 = 0x10;
    pub const TIMESTAMP: u8 = 0x11;
    pub const INT64: u8 = 0x12;
    pub const MIN_KEY: u8 = 0xff;
    pub const MAX_KEY: u8 = 0x7f;

    /// Check if a tag is in the table but has no runtime representation.
    /// The decoder fails deterministically on these; skipping is impossible
    /// because their payload lengths are unknowable.
    #[inline]
    pub const fn is_unsupported(tag: u8) -> bool {
        matches!(
            tag,
            UNDEFINED | DB_POINTER | JS_CODE | SYMBOL | JS_CODE_WITH_SCOPE | TIMESTAMP
        )
    }

    /// Check if a tag is in the dispatch table at all.
    #[inline]
    pub const fn is_known(tag: u8) -> bool {
        matches!(tag, 0x01..=0x12 | MIN_KEY | MAX_KEY)
    }
}

/// Subtype bytes for binary elements.
pub mod binary_subtype {
    pub const GENERIC: u8 = 0x00;
    pub const FUNCTION: u8 = 0x01;
    pub const BINARY_OLD: u8 = 0x02;
    pub const UUID_OLD: u8 = 0x03;
    pub const UUID: u8 = 0x04;
    pub const MD5: u8 = 0x05;
    pub const USER_DEFINED: u8 = 0x80;
}

/// A 12-byte BSON object id.
///
/// The codec treats the id as opaque identity bytes; it does not generate
/// ids or interpret the timestamp/counter fields inside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }
}

impl From<[u8; 12]> for ObjectId {
    fn from(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A UTC datetime carried as signed milliseconds since the Unix epoch.
///
/// The full i64 range round-trips losslessly; `Display` renders the
/// ISO-8601 form used for diagnostics and falls back to the raw millisecond
/// count outside chrono's representable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtcDatetime(i64);

impl UtcDatetime {
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    #[inline]
    #[must_use]
    pub const fn timestamp_millis(&self) -> i64 {
        self.0
    }

    /// The current wall-clock time, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }
}

impl From<i64> for UtcDatetime {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl fmt::Display for UtcDatetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp_millis(self.0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// A binary value: an explicit subtype byte plus raw payload bytes.
///
/// The wire length prefix covers the payload only, not the subtype byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

impl Binary {
    /// Generic binary (subtype 0x00).
    #[must_use]
    pub fn generic(bytes: Vec<u8>) -> Self {
        Self {
            subtype: binary_subtype::GENERIC,
            bytes,
        }
    }

    /// A UUID (subtype 0x04) from its 128-bit value split into the most and
    /// least significant 64-bit halves. The payload is the least significant
    /// half first, then the most significant, each as a little-endian word.
    #[must_use]
    pub fn uuid(msb: u64, lsb: u64) -> Self {
        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(&lsb.to_le_bytes());
        bytes.extend_from_slice(&msb.to_le_bytes());
        Self {
            subtype: binary_subtype::UUID,
            bytes,
        }
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Self::generic(bytes)
    }
}

/// The regular-expression flags this codec can carry.
///
/// The set is closed over the four flags with a defined wire letter here:
/// case-insensitive `i`, multiline `m`, dot-all `s`, unicode-case `u`.
/// Letters are always emitted in that (alphabetical) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegexFlags(u8);

impl RegexFlags {
    pub const NONE: RegexFlags = RegexFlags(0);
    pub const CASE_INSENSITIVE: RegexFlags = RegexFlags(1);
    pub const MULTILINE: RegexFlags = RegexFlags(1 << 1);
    pub const DOT_ALL: RegexFlags = RegexFlags(1 << 2);
    pub const UNICODE_CASE: RegexFlags = RegexFlags(1 << 3);

    const LETTERS: [(RegexFlags, char); 4] = [
        (Self::CASE_INSENSITIVE, 'i'),
        (Self::MULTILINE, 'm'),
        (Self::DOT_ALL, 's'),
        (Self::UNICODE_CASE, 'u'),
    ];

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, other: RegexFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// The canonical wire form: one letter per set flag, alphabetical.
    #[must_use]
    pub fn to_wire_string(&self) -> String {
        let mut s = String::new();
        for (flag, letter) in Self::LETTERS {
            if self.contains(flag) {
                s.push(letter);
            }
        }
        s
    }

    /// Parse a wire flag string. Letters outside the supported set
    /// (including the valid-but-uncarried BSON letters `l` and `x`) fail.
    pub fn from_wire_str(s: &str) -> Result<Self> {
        let mut flags = Self::NONE;
        for c in s.chars() {
            match Self::LETTERS.iter().find(|(_, letter)| *letter == c) {
                Some((flag, _)) => flags = flags | *flag,
                None => return Err(Error::UnsupportedRegexFlag(c)),
            }
        }
        Ok(flags)
    }
}

impl BitOr for RegexFlags {
    type Output = RegexFlags;

    fn bitor(self, rhs: RegexFlags) -> RegexFlags {
        RegexFlags(self.0 | rhs.0)
    }
}

/// A regular expression value: pattern plus flags.
///
/// This is a wire carrier, not a matcher; the codec never compiles the
/// pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Regex {
    pub pattern: String,
    pub flags: RegexFlags,
}

impl Regex {
    #[must_use]
    pub fn new(pattern: impl Into<String>, flags: RegexFlags) -> Self {
        Self {
            pattern: pattern.into(),
            flags,
        }
    }
}
