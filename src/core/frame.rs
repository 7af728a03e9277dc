//! RESP (`REdis` Serialization Protocol) frame types
//!
//! A [`Frame`] is one complete protocol value, RESP2 or RESP3. The two
//! generations share one type because every frame kind is self-describing
//! on the wire; a reply parsed from a RESP2 stream and its RESP3
//! counterpart differ only in which variants can appear.

use crate::core::error::{WireError, WireResult};
use bytes::Bytes;

/// One complete protocol frame
///
/// Aggregate variants preserve server ordering: `Map` is a vector of
/// pairs and `Set` a vector of members, in wire order. `Null` is its own
/// variant and is never represented as an empty `Bulk` or `Array`.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Simple string: `+OK\r\n`
    Simple(String),
    /// Error reply: `-ERR message\r\n` (also RESP3 blob errors)
    Error {
        /// Leading word of the error line, e.g. `ERR` or `WRONGTYPE`
        code: String,
        /// Remainder of the error line
        message: String,
    },
    /// Integer: `:1000\r\n`
    Integer(i64),
    /// Bulk string: `$6\r\nfoobar\r\n`
    Bulk(Bytes),
    /// Array: `*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n`
    Array(Vec<Frame>),
    /// Null: `$-1\r\n`, `*-1\r\n` or `_\r\n`
    Null,
    /// Boolean: `#t\r\n` or `#f\r\n`
    Boolean(bool),
    /// Double: `,1.23\r\n`
    Double(f64),
    /// Big number: `(3492890328409238509324850943850943825024385\r\n`
    BigNumber(String),
    /// Verbatim string: `=15\r\ntxt:Some string\r\n`
    Verbatim {
        /// Three-letter format tag, e.g. `txt` or `mkd`
        format: String,
        /// Payload after the `format:` prefix
        text: Bytes,
    },
    /// Map: `%2\r\n+first\r\n:1\r\n+second\r\n:2\r\n`
    Map(Vec<(Frame, Frame)>),
    /// Set: `~3\r\n+orange\r\n+apple\r\n+one\r\n`
    Set(Vec<Frame>),
    /// Push: `>4\r\n+pubsub\r\n+message\r\n+channel\r\n+hello\r\n`
    Push(Vec<Frame>),
}

impl Frame {
    /// Build an `Error` frame from the raw error line of a reply,
    /// splitting the leading word off as the code.
    #[must_use]
    pub fn error_from_line(line: &str) -> Self {
        match line.split_once(' ') {
            Some((code, message)) => Self::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
            None => Self::Error {
                code: line.to_string(),
                message: String::new(),
            },
        }
    }

    /// Convert to a string if possible
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be converted to a string.
    pub fn as_string(&self) -> WireResult<String> {
        match self {
            Self::Simple(s) => Ok(s.clone()),
            Self::Bulk(b) | Self::Verbatim { text: b, .. } => String::from_utf8(b.to_vec())
                .map_err(|e| WireError::Type(format!("Invalid UTF-8: {e}"))),
            Self::Integer(n) => Ok(n.to_string()),
            Self::BigNumber(s) => Ok(s.clone()),
            Self::Null => Err(WireError::Type("Frame is null".to_string())),
            _ => Err(WireError::Type(format!(
                "Cannot convert {self:?} to string"
            ))),
        }
    }

    /// Convert to an integer if possible
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be converted to an integer.
    pub fn as_int(&self) -> WireResult<i64> {
        match self {
            Self::Integer(n) => Ok(*n),
            Self::Simple(s) => s
                .parse::<i64>()
                .map_err(|e| WireError::Type(format!("Cannot parse integer: {e}"))),
            Self::Bulk(b) => {
                let s = std::str::from_utf8(b)
                    .map_err(|e| WireError::Type(format!("Invalid UTF-8: {e}")))?;
                s.parse::<i64>()
                    .map_err(|e| WireError::Type(format!("Cannot parse integer: {e}")))
            }
            _ => Err(WireError::Type(format!(
                "Cannot convert {self:?} to integer"
            ))),
        }
    }

    /// Convert to bytes if possible
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be converted to bytes.
    pub fn as_bytes(&self) -> WireResult<Bytes> {
        match self {
            Self::Bulk(b) | Self::Verbatim { text: b, .. } => Ok(b.clone()),
            Self::Simple(s) => Ok(Bytes::from(s.as_bytes().to_vec())),
            Self::Null => Err(WireError::Type("Frame is null".to_string())),
            _ => Err(WireError::Type(format!("Cannot convert {self:?} to bytes"))),
        }
    }

    /// Convert to a list of frames if possible
    ///
    /// Accepts `Array`, `Set` and `Push`, all of which carry an ordered
    /// sequence of elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not an aggregate of elements.
    pub fn into_items(self) -> WireResult<Vec<Self>> {
        match self {
            Self::Array(items) | Self::Set(items) | Self::Push(items) => Ok(items),
            _ => Err(WireError::Type(format!(
                "Cannot convert {self:?} to a list of elements"
            ))),
        }
    }

    /// Check if this is a null frame
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this is an error reply
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
