//! Reply builders
//!
//! A builder maps a raw [`Frame`] to the value shape a call site
//! expects. Builders are pure and never see the transport; a frame
//! whose shape does not match produces a [`WireError::Type`] failure
//! local to that request, never a protocol error.
//!
//! RESP3 encodes some logical values with dedicated frame kinds that
//! RESP2 spells as integers, strings or flat arrays. Every frame kind
//! is self-describing, so each builder simply accepts both spellings:
//! the boolean builder takes `:1` as well as `#t`, the pairs builder a
//! flat array as well as a native map. Call sites select a builder by
//! choosing `T`; they never branch on the negotiated protocol version.

use crate::core::error::{WireError, WireResult};
use crate::core::frame::Frame;
use bytes::Bytes;
use std::collections::HashMap;

/// Conversion from a reply frame into a typed value
pub trait FromFrame: Sized {
    /// Build `Self` from a reply frame
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Type`] when the frame's shape does not
    /// match.
    fn from_frame(frame: Frame) -> WireResult<Self>;
}

impl FromFrame for Frame {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        Ok(frame)
    }
}

impl FromFrame for () {
    fn from_frame(_frame: Frame) -> WireResult<Self> {
        Ok(())
    }
}

impl FromFrame for String {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        frame.as_string()
    }
}

impl FromFrame for Bytes {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        frame.as_bytes()
    }
}

impl FromFrame for i64 {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        match frame {
            Frame::Boolean(b) => Ok(Self::from(b)),
            other => other.as_int(),
        }
    }
}

impl FromFrame for u64 {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        let n = i64::from_frame(frame)?;
        Self::try_from(n).map_err(|_| WireError::Type(format!("Integer {n} is negative")))
    }
}

impl FromFrame for bool {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        match frame {
            Frame::Boolean(b) => Ok(b),
            Frame::Integer(1) => Ok(true),
            Frame::Integer(0) => Ok(false),
            Frame::Simple(s) if s == "OK" => Ok(true),
            other => Err(WireError::Type(format!("Cannot convert {other:?} to bool"))),
        }
    }
}

impl FromFrame for f64 {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        match frame {
            Frame::Double(d) => Ok(d),
            #[allow(clippy::cast_precision_loss)]
            Frame::Integer(n) => Ok(n as Self),
            Frame::Simple(s) => s
                .parse::<Self>()
                .map_err(|e| WireError::Type(format!("Cannot parse double: {e}"))),
            Frame::Bulk(b) => {
                let s = std::str::from_utf8(&b)
                    .map_err(|e| WireError::Type(format!("Invalid UTF-8: {e}")))?;
                s.parse::<Self>()
                    .map_err(|e| WireError::Type(format!("Cannot parse double: {e}")))
            }
            other => Err(WireError::Type(format!(
                "Cannot convert {other:?} to double"
            ))),
        }
    }
}

/// `Null` becomes `None`; any other frame builds the inner type
impl<T: FromFrame> FromFrame for Option<T> {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        if frame.is_null() {
            Ok(None)
        } else {
            T::from_frame(frame).map(Some)
        }
    }
}

/// Ordered list of elements from an `Array`, `Set` or `Push` frame
///
/// `Null` is rejected: an absent list and an empty list are different
/// replies. Use `Option<Vec<T>>` where the server may send either.
impl<T: FromFrame> FromFrame for Vec<T> {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        frame
            .into_items()?
            .into_iter()
            .map(T::from_frame)
            .collect()
    }
}

/// Ordered key-value pairs, preserving server order
///
/// Accepts a native map frame as well as the flat `[k1, v1, k2, v2]`
/// array RESP2 uses for the same replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairs<K, V>(pub Vec<(K, V)>);

impl<K: FromFrame, V: FromFrame> FromFrame for Pairs<K, V> {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        match frame {
            Frame::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_frame(k)?, V::from_frame(v)?)))
                .collect::<WireResult<Vec<_>>>()
                .map(Pairs),
            Frame::Array(items) => {
                if items.len() % 2 != 0 {
                    return Err(WireError::Type(format!(
                        "Flat pair array has odd length {}",
                        items.len()
                    )));
                }
                let mut pairs = Vec::with_capacity(items.len() / 2);
                let mut iter = items.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    pairs.push((K::from_frame(k)?, V::from_frame(v)?));
                }
                Ok(Pairs(pairs))
            }
            other => Err(WireError::Type(format!(
                "Cannot convert {other:?} to pairs"
            ))),
        }
    }
}

/// Unordered map keyed by raw bytes
///
/// `Bytes` is the value-comparable key type: binary keys hash and
/// compare by content with no wrapper.
impl<V: FromFrame> FromFrame for HashMap<Bytes, V> {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        let Pairs(pairs) = Pairs::<Bytes, V>::from_frame(frame)?;
        Ok(pairs.into_iter().collect())
    }
}

/// Cursor reply of `SCAN`-family commands
///
/// The wire shape is a fixed-position two-element array: the next
/// cursor as a textual bulk string, then the page of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReply {
    /// Cursor to pass to the next call; `0` means the scan is complete
    pub cursor: u64,
    /// Keys returned by this page
    pub keys: Vec<Bytes>,
}

impl FromFrame for ScanReply {
    fn from_frame(frame: Frame) -> WireResult<Self> {
        let items = frame.into_items()?;
        if items.len() != 2 {
            return Err(WireError::Type(format!(
                "SCAN reply has {} elements, expected 2",
                items.len()
            )));
        }
        let mut iter = items.into_iter();
        let cursor_frame = iter.next().ok_or_else(|| {
            WireError::Type("SCAN reply missing cursor".to_string())
        })?;
        let keys_frame = iter.next().ok_or_else(|| {
            WireError::Type("SCAN reply missing key page".to_string())
        })?;

        let cursor_text = cursor_frame.as_string()?;
        let cursor = cursor_text
            .parse::<u64>()
            .map_err(|e| WireError::Type(format!("Invalid SCAN cursor: {e}")))?;
        Ok(Self {
            cursor,
            keys: Vec::from_frame(keys_frame)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(text: &str) -> Frame {
        Frame::Bulk(Bytes::copy_from_slice(text.as_bytes()))
    }

    #[test]
    fn test_bool_accepts_both_protocol_spellings() {
        assert!(bool::from_frame(Frame::Integer(1)).unwrap());
        assert!(!bool::from_frame(Frame::Integer(0)).unwrap());
        assert!(bool::from_frame(Frame::Boolean(true)).unwrap());
        assert!(!bool::from_frame(Frame::Boolean(false)).unwrap());
        assert!(bool::from_frame(Frame::Simple("OK".to_string())).unwrap());
    }

    #[test]
    fn test_bool_shape_mismatch_is_a_type_error() {
        assert!(matches!(
            bool::from_frame(Frame::Integer(5)),
            Err(WireError::Type(_))
        ));
        assert!(matches!(
            bool::from_frame(bulk("yes")),
            Err(WireError::Type(_))
        ));
    }

    #[test]
    fn test_error_predicate_distinguishes_error_replies() {
        let err = Frame::error_from_line("WRONGTYPE Operation against a key");
        assert!(err.is_error());
        assert!(!err.is_null());

        assert!(!bulk("value").is_error());
        assert!(!Frame::Null.is_error());
        assert!(!Frame::Simple("OK".to_string()).is_error());
    }

    #[test]
    fn test_string_from_simple_and_bulk() {
        assert_eq!(
            String::from_frame(Frame::Simple("OK".to_string())).unwrap(),
            "OK"
        );
        assert_eq!(String::from_frame(bulk("value")).unwrap(), "value");
    }

    #[test]
    fn test_option_maps_null_to_none() {
        assert_eq!(Option::<String>::from_frame(Frame::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_frame(bulk("v")).unwrap(),
            Some("v".to_string())
        );
    }

    #[test]
    fn test_integers_from_both_spellings() {
        assert_eq!(i64::from_frame(Frame::Integer(-5)).unwrap(), -5);
        assert_eq!(i64::from_frame(bulk("123")).unwrap(), 123);
        assert_eq!(u64::from_frame(Frame::Integer(7)).unwrap(), 7);
        assert!(matches!(
            u64::from_frame(Frame::Integer(-1)),
            Err(WireError::Type(_))
        ));
    }

    #[test]
    fn test_double_from_both_spellings() {
        assert_eq!(f64::from_frame(Frame::Double(3.25)).unwrap(), 3.25);
        assert_eq!(f64::from_frame(bulk("3.25")).unwrap(), 3.25);
        assert_eq!(f64::from_frame(Frame::Integer(3)).unwrap(), 3.0);
    }

    #[test]
    fn test_list_from_array_and_set() {
        let array = Frame::Array(vec![bulk("a"), bulk("b")]);
        assert_eq!(
            Vec::<Bytes>::from_frame(array).unwrap(),
            vec![Bytes::from("a"), Bytes::from("b")]
        );

        let set = Frame::Set(vec![bulk("x")]);
        assert_eq!(
            Vec::<String>::from_frame(set).unwrap(),
            vec!["x".to_string()]
        );
    }

    #[test]
    fn test_empty_list_is_not_null() {
        assert_eq!(
            Vec::<Bytes>::from_frame(Frame::Array(vec![])).unwrap(),
            Vec::<Bytes>::new()
        );
        assert!(matches!(
            Vec::<Bytes>::from_frame(Frame::Null),
            Err(WireError::Type(_))
        ));
        assert_eq!(
            Option::<Vec<Bytes>>::from_frame(Frame::Null).unwrap(),
            None
        );
    }

    #[test]
    fn test_pairs_from_flat_array_and_map() {
        let flat = Frame::Array(vec![bulk("f1"), bulk("v1"), bulk("f2"), bulk("v2")]);
        let from_flat = Pairs::<String, String>::from_frame(flat).unwrap();

        let map = Frame::Map(vec![
            (bulk("f1"), bulk("v1")),
            (bulk("f2"), bulk("v2")),
        ]);
        let from_map = Pairs::<String, String>::from_frame(map).unwrap();

        let expected = vec![
            ("f1".to_string(), "v1".to_string()),
            ("f2".to_string(), "v2".to_string()),
        ];
        assert_eq!(from_flat.0, expected);
        assert_eq!(from_map.0, expected);
    }

    #[test]
    fn test_odd_flat_array_is_a_type_error() {
        let flat = Frame::Array(vec![bulk("f1"), bulk("v1"), bulk("f2")]);
        assert!(matches!(
            Pairs::<String, String>::from_frame(flat),
            Err(WireError::Type(_))
        ));
    }

    #[test]
    fn test_byte_keyed_map() {
        let map = Frame::Map(vec![(bulk("k"), Frame::Integer(1))]);
        let built = HashMap::<Bytes, i64>::from_frame(map).unwrap();
        assert_eq!(built.get(&Bytes::from("k")), Some(&1));
    }

    #[test]
    fn test_scan_reply_fixed_positions() {
        let frame = Frame::Array(vec![
            bulk("17"),
            Frame::Array(vec![bulk("key:1"), bulk("key:2")]),
        ]);
        let scan = ScanReply::from_frame(frame).unwrap();
        assert_eq!(scan.cursor, 17);
        assert_eq!(scan.keys, vec![Bytes::from("key:1"), Bytes::from("key:2")]);
    }

    #[test]
    fn test_scan_reply_wrong_arity_is_a_type_error() {
        let frame = Frame::Array(vec![bulk("17")]);
        assert!(matches!(
            ScanReply::from_frame(frame),
            Err(WireError::Type(_))
        ));
    }
}
