//! High-level client facade
//!
//! A thin typed layer over the dispatcher: every method marshals its
//! arguments into a [`Request`], submits it and lets a reply builder
//! shape the answer. No protocol logic lives here.

use crate::connection::{self, Transport};
use crate::core::config::{ConnectionConfig, ProtocolVersion};
use crate::core::error::{WireError, WireResult};
use crate::core::frame::Frame;
use crate::dispatcher::Dispatcher;
use crate::reply::{Pairs, ScanReply};
use crate::request::{IntoArg, Request};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Asynchronous client over a single dispatched connection
///
/// Cheap to clone; all clones share one connection and submit through
/// the same queue, so replies are never misattributed even under
/// concurrent use.
#[derive(Clone, Debug)]
pub struct Client {
    dispatcher: Arc<Dispatcher>,
    protocol: ProtocolVersion,
}

impl Client {
    /// Connect to the configured server and perform the handshake
    ///
    /// When RESP3 is preferred this sends `HELLO 3` and falls back to
    /// RESP2 if the server rejects it. Authentication and database
    /// selection run before the client is handed out.
    ///
    /// # Errors
    ///
    /// Fails on connection errors or a rejected `AUTH`/`SELECT`.
    pub async fn connect(config: ConnectionConfig) -> WireResult<Self> {
        info!("Connecting to {}", config.addr);
        let stream = connection::connect(&config).await?;
        Self::over_transport(stream, &config).await
    }

    /// Build a client over an already-connected transport
    ///
    /// Runs the same handshake as [`connect`](Client::connect). Useful
    /// with an in-memory stream when no server is around.
    pub async fn over_transport<T>(transport: T, config: &ConnectionConfig) -> WireResult<Self>
    where
        T: Transport + 'static,
    {
        let dispatcher = Arc::new(Dispatcher::start(transport, config));
        let protocol = Self::handshake(&dispatcher, config).await?;
        debug!("Client ready, speaking {protocol}");
        Ok(Self {
            dispatcher,
            protocol,
        })
    }

    async fn handshake(
        dispatcher: &Dispatcher,
        config: &ConnectionConfig,
    ) -> WireResult<ProtocolVersion> {
        if config.protocol_version == ProtocolVersion::Resp3 {
            let mut hello = Request::new("HELLO").arg(3i64);
            if let Some(password) = &config.password {
                hello = hello.arg("AUTH").arg("default").arg(password);
            }
            match dispatcher.submit::<()>(&hello).await {
                Ok(()) => {
                    if config.database != 0 {
                        Self::select(dispatcher, config.database).await?;
                    }
                    return Ok(ProtocolVersion::Resp3);
                }
                Err(WireError::Server { code, message }) => {
                    // Pre-6.0 servers answer HELLO with an error; stay
                    // on RESP2 and authenticate the old way
                    debug!("HELLO rejected ({code} {message}), staying on RESP2");
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(password) = &config.password {
            dispatcher
                .submit::<()>(&Request::new("AUTH").arg(password))
                .await?;
        }
        if config.database != 0 {
            Self::select(dispatcher, config.database).await?;
        }
        Ok(ProtocolVersion::Resp2)
    }

    async fn select(dispatcher: &Dispatcher, database: u8) -> WireResult<()> {
        dispatcher
            .submit::<()>(&Request::new("SELECT").arg(i64::from(database)))
            .await
    }

    /// Protocol version in effect after negotiation
    #[must_use]
    pub const fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// Whether the underlying connection is still being serviced
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.dispatcher.is_running()
    }

    /// Stop the dispatcher and close the connection
    ///
    /// Requests already on the wire finish; queued ones fail with
    /// [`WireError::Closed`]. Affects every clone of this client.
    pub async fn close(&self) {
        self.dispatcher.stop().await;
    }

    /// Run a request without any typed interpretation
    ///
    /// The escape hatch for commands this facade does not cover; the
    /// raw reply frame comes back as-is.
    pub async fn raw_command(&self, request: &Request) -> WireResult<Frame> {
        self.dispatcher.submit(request).await
    }

    // Connection commands

    /// Ping the server
    pub async fn ping(&self) -> WireResult<String> {
        self.dispatcher.submit(&Request::new("PING")).await
    }

    /// Echo a message back from the server
    pub async fn echo(&self, message: impl IntoArg) -> WireResult<Bytes> {
        self.dispatcher
            .submit(&Request::new("ECHO").arg(message))
            .await
    }

    // String commands

    /// Get the value of a key
    pub async fn get(&self, key: impl IntoArg) -> WireResult<Option<Bytes>> {
        self.dispatcher.submit(&Request::new("GET").arg(key)).await
    }

    /// Set the value of a key
    pub async fn set(&self, key: impl IntoArg, value: impl IntoArg) -> WireResult<()> {
        self.dispatcher
            .submit(&Request::new("SET").arg(key).arg(value))
            .await
    }

    /// Set the value of a key with a time to live
    pub async fn set_ex(
        &self,
        key: impl IntoArg,
        value: impl IntoArg,
        ttl: Duration,
    ) -> WireResult<()> {
        self.dispatcher
            .submit(
                &Request::new("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl.as_millis() as u64),
            )
            .await
    }

    /// Set the value of a key only if it does not exist yet
    ///
    /// Returns `false` when the key was already present.
    pub async fn set_nx(&self, key: impl IntoArg, value: impl IntoArg) -> WireResult<bool> {
        let reply: Option<String> = self
            .dispatcher
            .submit(&Request::new("SET").arg(key).arg(value).arg("NX"))
            .await?;
        Ok(reply.is_some())
    }

    /// Append to a string value, returning the new length
    pub async fn append(&self, key: impl IntoArg, value: impl IntoArg) -> WireResult<i64> {
        self.dispatcher
            .submit(&Request::new("APPEND").arg(key).arg(value))
            .await
    }

    /// Length of the string stored at a key
    pub async fn strlen(&self, key: impl IntoArg) -> WireResult<i64> {
        self.dispatcher
            .submit(&Request::new("STRLEN").arg(key))
            .await
    }

    /// Delete keys, returning how many existed
    pub async fn del<I>(&self, keys: I) -> WireResult<i64>
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        self.dispatcher
            .submit(&Request::new("DEL").args(keys))
            .await
    }

    /// Count how many of the given keys exist
    pub async fn exists<I>(&self, keys: I) -> WireResult<i64>
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        self.dispatcher
            .submit(&Request::new("EXISTS").args(keys))
            .await
    }

    /// Increment the integer value of a key by one
    pub async fn incr(&self, key: impl IntoArg) -> WireResult<i64> {
        self.dispatcher.submit(&Request::new("INCR").arg(key)).await
    }

    /// Increment the integer value of a key
    pub async fn incr_by(&self, key: impl IntoArg, delta: i64) -> WireResult<i64> {
        self.dispatcher
            .submit(&Request::new("INCRBY").arg(key).arg(delta))
            .await
    }

    /// Increment the float value of a key
    pub async fn incr_by_float(&self, key: impl IntoArg, delta: f64) -> WireResult<f64> {
        self.dispatcher
            .submit(&Request::new("INCRBYFLOAT").arg(key).arg(delta))
            .await
    }

    // Key commands

    /// Set a key's time to live
    ///
    /// Returns `false` when the key does not exist.
    pub async fn expire(&self, key: impl IntoArg, ttl: Duration) -> WireResult<bool> {
        self.dispatcher
            .submit(&Request::new("EXPIRE").arg(key).arg(ttl.as_secs() as i64))
            .await
    }

    /// Remaining time to live of a key in seconds
    ///
    /// `-1` means no expiry, `-2` means the key does not exist.
    pub async fn ttl(&self, key: impl IntoArg) -> WireResult<i64> {
        self.dispatcher.submit(&Request::new("TTL").arg(key)).await
    }

    /// Type of the value stored at a key
    pub async fn key_type(&self, key: impl IntoArg) -> WireResult<String> {
        self.dispatcher.submit(&Request::new("TYPE").arg(key)).await
    }

    /// Incrementally iterate the key space
    pub async fn scan(
        &self,
        cursor: u64,
        pattern: Option<&str>,
        count: Option<u64>,
    ) -> WireResult<ScanReply> {
        let mut request = Request::new("SCAN").arg(cursor);
        if let Some(pattern) = pattern {
            request = request.arg("MATCH").arg(pattern);
        }
        if let Some(count) = count {
            request = request.arg("COUNT").arg(count);
        }
        self.dispatcher.submit(&request).await
    }

    // Hash commands

    /// Set a hash field, returning how many fields were newly created
    pub async fn hset(
        &self,
        key: impl IntoArg,
        field: impl IntoArg,
        value: impl IntoArg,
    ) -> WireResult<i64> {
        self.dispatcher
            .submit(&Request::new("HSET").arg(key).arg(field).arg(value))
            .await
    }

    /// Get a hash field
    pub async fn hget(&self, key: impl IntoArg, field: impl IntoArg) -> WireResult<Option<Bytes>> {
        self.dispatcher
            .submit(&Request::new("HGET").arg(key).arg(field))
            .await
    }

    /// Get all fields and values of a hash
    ///
    /// Accepts both the RESP2 flat-array shape and the RESP3 map shape.
    pub async fn hgetall(&self, key: impl IntoArg) -> WireResult<HashMap<Bytes, Bytes>> {
        self.dispatcher
            .submit(&Request::new("HGETALL").arg(key))
            .await
    }

    /// Get all fields and values of a hash in reply order
    pub async fn hgetall_pairs(&self, key: impl IntoArg) -> WireResult<Pairs<Bytes, Bytes>> {
        self.dispatcher
            .submit(&Request::new("HGETALL").arg(key))
            .await
    }

    // List commands

    /// Prepend values to a list, returning its new length
    pub async fn lpush<I>(&self, key: impl IntoArg, values: I) -> WireResult<i64>
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        self.dispatcher
            .submit(&Request::new("LPUSH").arg(key).args(values))
            .await
    }

    /// Append values to a list, returning its new length
    pub async fn rpush<I>(&self, key: impl IntoArg, values: I) -> WireResult<i64>
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        self.dispatcher
            .submit(&Request::new("RPUSH").arg(key).args(values))
            .await
    }

    /// Length of a list
    pub async fn llen(&self, key: impl IntoArg) -> WireResult<i64> {
        self.dispatcher.submit(&Request::new("LLEN").arg(key)).await
    }

    /// Range of elements from a list
    pub async fn lrange(
        &self,
        key: impl IntoArg,
        start: i64,
        stop: i64,
    ) -> WireResult<Vec<Bytes>> {
        self.dispatcher
            .submit(&Request::new("LRANGE").arg(key).arg(start).arg(stop))
            .await
    }

    // Set commands

    /// Add members to a set, returning how many were new
    pub async fn sadd<I>(&self, key: impl IntoArg, members: I) -> WireResult<i64>
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        self.dispatcher
            .submit(&Request::new("SADD").arg(key).args(members))
            .await
    }

    /// All members of a set
    ///
    /// Accepts both the RESP2 array shape and the RESP3 set shape.
    pub async fn smembers(&self, key: impl IntoArg) -> WireResult<Vec<Bytes>> {
        self.dispatcher
            .submit(&Request::new("SMEMBERS").arg(key))
            .await
    }

    /// Whether a value is a member of a set
    pub async fn sismember(&self, key: impl IntoArg, member: impl IntoArg) -> WireResult<bool> {
        self.dispatcher
            .submit(&Request::new("SISMEMBER").arg(key).arg(member))
            .await
    }

    // Sorted set commands

    /// Add a member to a sorted set, returning how many were new
    pub async fn zadd(
        &self,
        key: impl IntoArg,
        score: f64,
        member: impl IntoArg,
    ) -> WireResult<i64> {
        self.dispatcher
            .submit(&Request::new("ZADD").arg(key).arg(score).arg(member))
            .await
    }

    /// Score of a sorted set member
    pub async fn zscore(&self, key: impl IntoArg, member: impl IntoArg) -> WireResult<Option<f64>> {
        self.dispatcher
            .submit(&Request::new("ZSCORE").arg(key).arg(member))
            .await
    }
}
