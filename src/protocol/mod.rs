//! RESP wire codec
//!
//! This module implements both generations of the Redis Serialization
//! Protocol over asynchronous byte streams. [`reader::FrameReader`]
//! decodes one [`Frame`](crate::core::frame::Frame) at a time from a
//! buffered read half; [`writer::RequestWriter`] encodes requests as
//! arrays of bulk strings onto the write half.
//!
//! Frame kinds are selected by a one-byte prefix: `+` simple string,
//! `-` error, `:` integer, `$` bulk string, `*` array (RESP2), plus the
//! RESP3 additions `_` null, `#` boolean, `,` double, `(` big number,
//! `!` blob error, `=` verbatim string, `%` map, `~` set, `>` push and
//! `|` attribute. Every line-oriented value ends in CRLF; bulk payloads
//! are read by declared byte count and still carry a trailing CRLF.

pub mod reader;
pub mod writer;

pub use reader::FrameReader;
pub use writer::RequestWriter;
