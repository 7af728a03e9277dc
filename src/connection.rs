//! TCP connection establishment
//!
//! Opens and configures the socket a dispatcher will own. Protocol
//! negotiation is not done here; the returned stream has not sent or
//! received a single byte.

use crate::core::config::ConnectionConfig;
use crate::core::error::{WireError, WireResult};
use socket2::{Socket, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Anything a dispatcher can own as its connection
///
/// Blanket-implemented; a TCP stream and an in-memory duplex stream
/// both qualify.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Open a TCP connection to the configured server
///
/// Bounded by `connect_timeout`; applies TCP keepalive and
/// `TCP_NODELAY` per the configuration.
///
/// # Errors
///
/// Returns `TimedOut` when the connect deadline passes, `Config` for an
/// unusable address and `Io` for socket failures.
pub async fn connect(config: &ConnectionConfig) -> WireResult<TcpStream> {
    let (host, port) = config.endpoint()?;
    let addr = format!("{host}:{port}");
    debug!("Connecting to {addr}");

    let stream = timeout(config.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| WireError::TimedOut)??;

    let stream = match config.tcp_keepalive {
        Some(interval) => {
            let socket = Socket::from(stream.into_std()?);
            let keepalive = TcpKeepalive::new().with_time(interval);
            socket.set_tcp_keepalive(&keepalive)?;
            TcpStream::from_std(socket.into())?
        }
        None => stream,
    };

    if config.tcp_nodelay {
        stream.set_nodelay(true)?;
    }

    debug!("Connected to {addr}");
    Ok(stream)
}
