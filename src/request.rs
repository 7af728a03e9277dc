//! Request construction
//!
//! A [`Request`] is an ordered, non-empty list of binary-safe byte
//! strings, the first of which is the command name. Arguments reach the
//! wire exactly as given: no escaping, no re-encoding, arbitrary bytes
//! including NUL and CRLF are legal.

use bytes::{BufMut, Bytes, BytesMut};

const CRLF: &[u8] = b"\r\n";

/// A single command invocation
#[derive(Debug, Clone)]
pub struct Request {
    args: Vec<Bytes>,
}

impl Request {
    /// Start a request for the given command name
    pub fn new(command: impl IntoArg) -> Self {
        Self {
            args: vec![command.into_arg()],
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl IntoArg) -> Self {
        self.args.push(arg.into_arg());
        self
    }

    /// Append a sequence of arguments in order
    #[must_use]
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        for arg in args {
            self.args.push(arg.into_arg());
        }
        self
    }

    /// Number of byte strings including the command name
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Always false; a request carries at least the command name
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Encode as an array of bulk strings, ready for the wire
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Encode into an existing buffer
    pub fn encode_into(&self, buf: &mut BytesMut) {
        let mut itoa_buf = itoa::Buffer::new();

        buf.put_u8(b'*');
        buf.put_slice(itoa_buf.format(self.args.len()).as_bytes());
        buf.put_slice(CRLF);

        for arg in &self.args {
            buf.put_u8(b'$');
            buf.put_slice(itoa_buf.format(arg.len()).as_bytes());
            buf.put_slice(CRLF);
            buf.put_slice(arg);
            buf.put_slice(CRLF);
        }
    }

    /// Exact size of the wire encoding
    fn encoded_len(&self) -> usize {
        let mut len = 1 + decimal_width(self.args.len()) + 2;
        for arg in &self.args {
            len += 1 + decimal_width(arg.len()) + 2 + arg.len() + 2;
        }
        len
    }
}

fn decimal_width(mut n: usize) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

/// Conversion into a binary-safe request argument
pub trait IntoArg {
    /// Produce the raw argument bytes
    fn into_arg(self) -> Bytes;
}

impl IntoArg for Bytes {
    fn into_arg(self) -> Bytes {
        self
    }
}
impl IntoArg for &Bytes {
    fn into_arg(self) -> Bytes {
        self.clone()
    }
}
impl IntoArg for Vec<u8> {
    fn into_arg(self) -> Bytes {
        Bytes::from(self)
    }
}
impl IntoArg for &[u8] {
    fn into_arg(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}
impl IntoArg for String {
    fn into_arg(self) -> Bytes {
        Bytes::from(self.into_bytes())
    }
}
impl IntoArg for &String {
    fn into_arg(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}
impl IntoArg for &str {
    fn into_arg(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}
impl IntoArg for i64 {
    fn into_arg(self) -> Bytes {
        let mut buf = itoa::Buffer::new();
        Bytes::copy_from_slice(buf.format(self).as_bytes())
    }
}
impl IntoArg for u64 {
    fn into_arg(self) -> Bytes {
        let mut buf = itoa::Buffer::new();
        Bytes::copy_from_slice(buf.format(self).as_bytes())
    }
}
impl IntoArg for f64 {
    fn into_arg(self) -> Bytes {
        Bytes::from(self.to_string().into_bytes())
    }
}
