//! Buffered request writer for the write half of a connection

use crate::core::error::WireResult;
use crate::request::Request;
use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Encodes requests into a staging buffer and flushes them in batches
///
/// Requests are staged in memory by [`write_request`] or
/// [`write_encoded`] and hit the transport only on [`flush`]. The
/// dispatcher relies on this: everything written for a batch of tasks
/// must be flushed before the matching replies are read, because
/// write-then-read ordering is the only correlation between the two.
///
/// [`write_request`]: RequestWriter::write_request
/// [`write_encoded`]: RequestWriter::write_encoded
/// [`flush`]: RequestWriter::flush
#[derive(Debug)]
pub struct RequestWriter<W> {
    inner: W,
    buf: BytesMut,
}

impl<W: AsyncWrite + Unpin> RequestWriter<W> {
    /// Create a writer with a default staging buffer
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(8192),
        }
    }

    /// Stage one request in the write buffer
    pub fn write_request(&mut self, request: &Request) {
        request.encode_into(&mut self.buf);
    }

    /// Stage pre-encoded request bytes in the write buffer
    ///
    /// The bytes must already be a complete wire encoding; they are
    /// passed through untouched.
    pub fn write_encoded(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of staged bytes not yet flushed
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Write all staged bytes to the transport and flush it
    ///
    /// # Errors
    ///
    /// Returns the transport error; the connection is no longer usable
    /// after a failed flush.
    pub async fn flush(&mut self) -> WireResult<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf).await?;
            self.buf.clear();
        }
        self.inner.flush().await?;
        Ok(())
    }
}
