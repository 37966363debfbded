// ABOUTME: Error types for BSON encoding and decoding.
// ABOUTME: All errors are fail-fast; the codec never returns partial results.

use std::fmt;

/// The result type for BSON operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during BSON encoding or decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A primitive read ran past the end of the input buffer.
    Truncated,

    /// Unconsumed bytes remain after the top-level document.
    TrailingBytes,

    /// A length prefix implies a span that does not fit the buffer or
    /// cannot hold the unit it claims to describe.
    MalformedLength(i64),

    /// A document/array unit or string payload does not end with the
    /// 0x00 terminator its length prefix promises.
    MissingTerminator,

    /// Element type tag with no entry in the dispatch table.
    InvalidElementType(u8),

    /// Recognized wire kind that has no runtime representation
    /// (undefined, DB-pointer, JS code, symbol, JS code w/ scope, timestamp).
    UnsupportedElementType(u8),

    /// Binary subtype the codec does not handle.
    UnsupportedBinarySubtype(u8),

    /// Boolean payload byte other than 0x00 or 0x01.
    InvalidBoolean(u8),

    /// Regex flag letter outside the supported set (i, m, s, u).
    UnsupportedRegexFlag(char),

    /// Invalid UTF-8 byte sequence in a string or C-string.
    InvalidUtf8,

    /// A document key contains an embedded NUL byte, or an array element
    /// key does not parse as a non-negative integer index.
    InvalidKey(String),

    /// A value with no wire mapping was handed to the encoder.
    UnencodableValue(String),

    /// Mismatched begin/end calls on the encoder's unit stack.
    UnbalancedUnits,

    /// Unit nesting deeper than [`crate::decoder::MAX_DEPTH`].
    DepthLimitExceeded,

    /// Custom error message (for serde integration).
    Custom(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "unexpected end of input"),
            Error::TrailingBytes => write!(f, "trailing bytes after document"),
            Error::MalformedLength(len) => write!(f, "malformed length prefix: {len}"),
            Error::MissingTerminator => write!(f, "missing 0x00 terminator"),
            Error::InvalidElementType(tag) => write!(f, "invalid element type: 0x{tag:02x}"),
            Error::UnsupportedElementType(tag) => {
                write!(f, "unsupported element type: 0x{tag:02x}")
            }
            Error::UnsupportedBinarySubtype(subtype) => {
                write!(f, "unsupported binary subtype: 0x{subtype:02x}")
            }
            Error::InvalidBoolean(byte) => write!(f, "invalid boolean byte: 0x{byte:02x}"),
            Error::UnsupportedRegexFlag(flag) => write!(f, "unsupported regex flag: {flag:?}"),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            Error::InvalidKey(key) => write!(f, "invalid key: {key:?}"),
            Error::UnencodableValue(what) => write!(f, "don't know how to encode: {what}"),
            Error::UnbalancedUnits => write!(f, "unbalanced document units"),
            Error::DepthLimitExceeded => write!(f, "maximum nesting depth exceeded"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
