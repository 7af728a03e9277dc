//! Async Redis client core built around a single pipelined connection
//!
//! `redis-wire` speaks RESP2 and RESP3 over one connection owned by a
//! background worker. Requests are queued, written in order and matched
//! to replies purely by that order, so any number of tasks can share
//! the connection without replies crossing wires.
//!
//! # Features
//!
//! - Full RESP2/RESP3 frame reader with binary-safe bulk strings
//! - Strict-FIFO dispatcher that pipelines queued requests
//! - Typed replies through composable [`FromFrame`] builders
//! - RESP3 negotiation via `HELLO` with automatic RESP2 fallback
//! - Async/await support with Tokio
//!
//! # Quick Start
//!
//! ```no_run
//! use redis_wire::{Client, ConnectionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::new("redis://localhost:6379");
//!     let client = Client::connect(config).await?;
//!
//!     client.set("mykey", "myvalue").await?;
//!     let value = client.get("mykey").await?;
//!     println!("Value: {:?}", value);
//!
//!     Ok(())
//! }
//! ```

#![deny(warnings)]
#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::future_not_send)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::unused_async)]

pub mod client;
pub mod connection;
pub mod dispatcher;
pub mod protocol;
pub mod reply;
pub mod request;

pub use client::Client;
pub mod core;

pub use crate::core::{
    config::{ConnectionConfig, ProtocolVersion},
    error::{WireError, WireResult},
    frame::Frame,
};
pub use connection::Transport;
pub use dispatcher::{Dispatcher, Task};
pub use protocol::{FrameReader, RequestWriter};
pub use reply::{FromFrame, Pairs, ScanReply};
pub use request::{IntoArg, Request};
