//! Buffered frame decoder for the read half of a connection
//!
//! [`FrameReader`] owns a fixed-capacity buffer and refills it with at
//! most one `read()` per refill. The protocol requires every byte it
//! asks for to eventually arrive, so a clean end-of-stream in the middle
//! of a frame is an error, not a normal condition. After any error from
//! this module the stream position is unknown and the connection must be
//! discarded.

use crate::core::error::{WireError, WireResult};
use crate::core::frame::Frame;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default capacity of the read buffer in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default upper bound on a bulk payload length or aggregate element
/// count (the protocol's historical 512MB bulk limit)
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 512 * 1024 * 1024;

/// Decodes one [`Frame`] at a time from an asynchronous byte stream
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    limit: usize,
    max_frame_length: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a reader with the default buffer capacity
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    /// Create a reader with the given buffer capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be non-zero");
        Self {
            inner,
            buf: vec![0; capacity].into_boxed_slice(),
            pos: 0,
            limit: 0,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }

    /// Set the maximum accepted bulk payload length and aggregate
    /// element count
    #[must_use]
    pub fn with_max_frame_length(mut self, max: usize) -> Self {
        self.max_frame_length = max;
        self
    }

    /// Return the next byte without consuming it
    ///
    /// # Errors
    ///
    /// Returns a connection error if the stream ends or fails.
    pub async fn peek_byte(&mut self) -> WireResult<u8> {
        self.fill().await?;
        Ok(self.buf[self.pos])
    }

    /// Decode exactly one frame
    ///
    /// RESP3 attributes (`|`) annotate the reply that follows them;
    /// nothing above the codec consumes them, so they are decoded and
    /// dropped here.
    ///
    /// # Errors
    ///
    /// Returns a connection error on transport failure, end-of-stream
    /// mid-frame or any violation of the protocol grammar. The reader
    /// must not be used again after an error.
    pub async fn read_frame(&mut self) -> WireResult<Frame> {
        loop {
            let prefix = self.read_byte().await?;
            if prefix == b'|' {
                self.skip_attribute().await?;
                continue;
            }
            return self.read_frame_body(prefix).await;
        }
    }

    async fn read_frame_body(&mut self, prefix: u8) -> WireResult<Frame> {
        match prefix {
            b'+' => {
                let line = self.read_line().await?;
                let text = String::from_utf8(line).map_err(|e| {
                    WireError::Protocol(format!("Invalid UTF-8 in simple string: {e}"))
                })?;
                Ok(Frame::Simple(text))
            }
            b'-' => {
                let line = self.read_line().await?;
                Ok(Frame::error_from_line(&String::from_utf8_lossy(&line)))
            }
            b':' => Ok(Frame::Integer(self.read_long().await?)),
            b'$' => {
                let len = self.read_long().await?;
                if len == -1 {
                    return Ok(Frame::Null);
                }
                let len = self.checked_len(len, "bulk string")?;
                Ok(Frame::Bulk(self.read_payload(len).await?))
            }
            b'*' => {
                let len = self.read_long().await?;
                if len == -1 {
                    return Ok(Frame::Null);
                }
                let count = self.checked_len(len, "array")?;
                Ok(Frame::Array(self.read_aggregate(count).await?))
            }
            b'_' => {
                self.expect_crlf().await?;
                Ok(Frame::Null)
            }
            b'#' => {
                let b = self.read_byte().await?;
                self.expect_crlf().await?;
                match b {
                    b't' => Ok(Frame::Boolean(true)),
                    b'f' => Ok(Frame::Boolean(false)),
                    _ => Err(WireError::Protocol(format!(
                        "Invalid boolean value: {}",
                        b as char
                    ))),
                }
            }
            b',' => {
                let line = self.read_line().await?;
                let text = std::str::from_utf8(&line)
                    .map_err(|e| WireError::Protocol(format!("Invalid UTF-8 in double: {e}")))?;
                let value = text
                    .parse::<f64>()
                    .map_err(|_| WireError::Protocol(format!("Invalid double: {text}")))?;
                Ok(Frame::Double(value))
            }
            b'(' => {
                let line = self.read_line().await?;
                let text = String::from_utf8(line).map_err(|e| {
                    WireError::Protocol(format!("Invalid UTF-8 in big number: {e}"))
                })?;
                if !is_big_number(&text) {
                    return Err(WireError::Protocol(format!("Invalid big number: {text}")));
                }
                Ok(Frame::BigNumber(text))
            }
            b'!' => {
                let len = self.read_long().await?;
                let len = self.checked_len(len, "blob error")?;
                let payload = self.read_payload(len).await?;
                Ok(Frame::error_from_line(&String::from_utf8_lossy(&payload)))
            }
            b'=' => {
                let len = self.read_long().await?;
                let len = self.checked_len(len, "verbatim string")?;
                let payload = self.read_payload(len).await?;
                // Payload is "<3-letter format>:<text>"
                if len < 4 || payload[3] != b':' {
                    return Err(WireError::Protocol(
                        "Malformed verbatim string".to_string(),
                    ));
                }
                let format = std::str::from_utf8(&payload[..3])
                    .map_err(|_| WireError::Protocol("Malformed verbatim string".to_string()))?
                    .to_string();
                Ok(Frame::Verbatim {
                    format,
                    text: payload.slice(4..),
                })
            }
            b'%' => {
                let len = self.read_long().await?;
                let count = self.checked_len(len, "map")?;
                let mut pairs = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    let key = Box::pin(self.read_frame()).await?;
                    let value = Box::pin(self.read_frame()).await?;
                    pairs.push((key, value));
                }
                Ok(Frame::Map(pairs))
            }
            b'~' => {
                let len = self.read_long().await?;
                let count = self.checked_len(len, "set")?;
                Ok(Frame::Set(self.read_aggregate(count).await?))
            }
            b'>' => {
                let len = self.read_long().await?;
                let count = self.checked_len(len, "push")?;
                Ok(Frame::Push(self.read_aggregate(count).await?))
            }
            _ => Err(WireError::Protocol(format!(
                "Invalid frame prefix: {}",
                prefix as char
            ))),
        }
    }

    async fn read_aggregate(&mut self, count: usize) -> WireResult<Vec<Frame>> {
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(Box::pin(self.read_frame()).await?);
        }
        Ok(items)
    }

    async fn skip_attribute(&mut self) -> WireResult<()> {
        let len = self.read_long().await?;
        let count = self.checked_len(len, "attribute")?;
        for _ in 0..count {
            Box::pin(self.read_frame()).await?;
            Box::pin(self.read_frame()).await?;
        }
        Ok(())
    }

    /// Read a counted payload plus its trailing CRLF
    async fn read_payload(&mut self, len: usize) -> WireResult<Bytes> {
        let mut payload = BytesMut::with_capacity(len);
        while payload.len() < len {
            self.fill().await?;
            let take = (len - payload.len()).min(self.limit - self.pos);
            payload.extend_from_slice(&self.buf[self.pos..self.pos + take]);
            self.pos += take;
        }
        self.expect_crlf().await?;
        Ok(payload.freeze())
    }

    /// Read a line up to CRLF, excluding the terminator
    ///
    /// Fast path for the common case where the whole line is already
    /// buffered: one scan, one copy. Otherwise falls back to collecting
    /// byte by byte across refills.
    async fn read_line(&mut self) -> WireResult<Vec<u8>> {
        self.fill().await?;
        let mut i = self.pos;
        while i + 1 < self.limit {
            if self.buf[i] == b'\r' && self.buf[i + 1] == b'\n' {
                let line = self.buf[self.pos..i].to_vec();
                self.pos = i + 2;
                return Ok(line);
            }
            i += 1;
        }
        self.read_line_slowly().await
    }

    async fn read_line_slowly(&mut self) -> WireResult<Vec<u8>> {
        let mut line = Vec::with_capacity(16);
        loop {
            let b = self.read_byte().await?;
            if b == b'\r' {
                let c = self.read_byte().await?;
                if c == b'\n' {
                    break;
                }
                line.push(b);
                line.push(c);
            } else {
                line.push(b);
            }
        }
        Ok(line)
    }

    /// Read a CRLF-terminated decimal integer without an intermediate
    /// string allocation
    async fn read_long(&mut self) -> WireResult<i64> {
        let negative = self.peek_byte().await? == b'-';
        if negative {
            self.pos += 1;
        }

        let mut value: i64 = 0;
        let mut digits = 0usize;
        loop {
            let b = self.read_byte().await?;
            if b == b'\r' {
                if self.read_byte().await? != b'\n' {
                    return Err(WireError::Protocol(
                        "Expected LF after CR in integer".to_string(),
                    ));
                }
                break;
            }
            if !b.is_ascii_digit() {
                return Err(WireError::Protocol(format!(
                    "Invalid byte in integer: {}",
                    b as char
                )));
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(i64::from(b - b'0')))
                .ok_or_else(|| WireError::Protocol("Integer out of range".to_string()))?;
            digits += 1;
        }

        if digits == 0 {
            return Err(WireError::Protocol("Empty integer".to_string()));
        }
        Ok(if negative { -value } else { value })
    }

    async fn expect_crlf(&mut self) -> WireResult<()> {
        if self.read_byte().await? != b'\r' || self.read_byte().await? != b'\n' {
            return Err(WireError::Protocol("Expected CRLF terminator".to_string()));
        }
        Ok(())
    }

    async fn read_byte(&mut self) -> WireResult<u8> {
        self.fill().await?;
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Refill the buffer with exactly one `read()` if it is empty
    ///
    /// Every call site needs at least one more byte, so `Ok(0)` here
    /// means the peer closed the stream mid-frame.
    async fn fill(&mut self) -> WireResult<()> {
        if self.pos >= self.limit {
            let n = self.inner.read(&mut self.buf).await?;
            if n == 0 {
                return Err(WireError::UnexpectedEof);
            }
            self.pos = 0;
            self.limit = n;
        }
        Ok(())
    }

    fn checked_len(&self, len: i64, what: &str) -> WireResult<usize> {
        usize::try_from(len)
            .ok()
            .filter(|len| *len <= self.max_frame_length)
            .ok_or_else(|| WireError::Protocol(format!("Invalid {what} length: {len}")))
    }
}

fn is_big_number(text: &str) -> bool {
    let digits = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
