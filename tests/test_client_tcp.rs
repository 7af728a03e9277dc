//! End-to-end client test over a real TCP socket
//!
//! A scripted server on a loopback listener stands in for Redis, so the
//! full path is exercised: address parsing, socket setup, dispatch and
//! typed replies.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]

use bytes::Bytes;
use redis_wire::{Client, ConnectionConfig, Frame, FrameReader};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

fn command_name(request: Frame) -> String {
    let args = request.into_items().expect("request is an array");
    match args.first() {
        Some(Frame::Bulk(bytes)) => String::from_utf8(bytes.to_vec()).expect("command is UTF-8"),
        other => panic!("unexpected first argument: {other:?}"),
    }
}

#[tokio::test]
async fn test_client_round_trip_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut reader = FrameReader::new(read_half);

        let first = reader.read_frame().await.unwrap();
        assert_eq!(command_name(first), "PING");
        write_half.write_all(b"+PONG\r\n").await.unwrap();

        let second = reader.read_frame().await.unwrap();
        assert_eq!(command_name(second), "GET");
        write_half.write_all(b"$5\r\nvalue\r\n").await.unwrap();

        let third = reader.read_frame().await.unwrap();
        assert_eq!(command_name(third), "LRANGE");
        write_half
            .write_all(b"*2\r\n$1\r\na\r\n$1\r\nb\r\n")
            .await
            .unwrap();
    });

    let config = ConnectionConfig::new(format!("redis://127.0.0.1:{port}"));
    let client = Client::connect(config).await.unwrap();

    assert_eq!(client.ping().await.unwrap(), "PONG");
    assert_eq!(client.get("k").await.unwrap(), Some(Bytes::from("value")));
    assert_eq!(
        client.lrange("l", 0, -1).await.unwrap(),
        vec![Bytes::from("a"), Bytes::from("b")]
    );

    client.close().await;
    assert!(!client.is_connected());
    server.await.unwrap();
}
