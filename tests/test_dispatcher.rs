//! Ordering and pipelining behavior of the dispatcher
//!
//! These tests run against an in-memory echo server that understands
//! real request frames, so reply correlation is exercised end to end
//! without a Redis instance.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]

use bytes::Bytes;
use redis_wire::{ConnectionConfig, Dispatcher, Frame, FrameReader, Request};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> ConnectionConfig {
    ConnectionConfig::new("test").with_response_timeout(Some(Duration::from_secs(5)))
}

/// Reply to every request with its last argument as a bulk string
async fn run_echo_server(stream: DuplexStream) {
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = FrameReader::new(read_half);

    while let Ok(frame) = reader.read_frame().await {
        let args = frame.into_items().expect("request is an array");
        let payload = match args.last() {
            Some(Frame::Bulk(bytes)) => bytes.clone(),
            other => panic!("unexpected request argument: {other:?}"),
        };
        let mut reply = Vec::with_capacity(payload.len() + 16);
        reply.extend_from_slice(format!("${}\r\n", payload.len()).as_bytes());
        reply.extend_from_slice(&payload);
        reply.extend_from_slice(b"\r\n");
        write_half.write_all(&reply).await.expect("server write");
    }
}

#[tokio::test]
async fn test_concurrent_submitters_never_get_crossed_replies() {
    init_tracing();
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    tokio::spawn(run_echo_server(server_io));
    let dispatcher = Arc::new(Dispatcher::start(client_io, &config()));

    let mut submitters = Vec::new();
    for worker in 0..8 {
        let dispatcher = Arc::clone(&dispatcher);
        submitters.push(tokio::spawn(async move {
            for seq in 0..25 {
                let message = format!("w{worker}-{seq}");
                let reply: Bytes = dispatcher
                    .submit(&Request::new("ECHO").arg(message.as_str()))
                    .await
                    .expect("echo reply");
                assert_eq!(reply, message.as_bytes());
            }
        }));
    }
    for submitter in submitters {
        submitter.await.expect("submitter task");
    }
}

#[tokio::test]
async fn test_single_caller_replies_arrive_in_submit_order() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    tokio::spawn(run_echo_server(server_io));
    let dispatcher = Dispatcher::start(client_io, &config());

    // Enqueue everything before awaiting anything
    let futures: Vec<_> = (0..50)
        .map(|i| dispatcher.submit::<Bytes>(&Request::new("ECHO").arg(format!("m{i}"))))
        .collect();

    for (i, future) in futures.into_iter().enumerate() {
        assert_eq!(future.await.expect("echo reply"), format!("m{i}").as_bytes());
    }
}

#[tokio::test]
async fn test_requests_go_out_before_any_reply_exists() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let dispatcher = Dispatcher::start(client_io, &config());

    // This server refuses to answer until it has seen all ten requests,
    // so a dispatcher that waited for reply N before writing request
    // N+1 would deadlock here
    let server = tokio::spawn(async move {
        let (read_half, mut write_half) = tokio::io::split(server_io);
        let mut reader = FrameReader::new(read_half);

        let mut payloads = Vec::new();
        for _ in 0..10 {
            let args = reader
                .read_frame()
                .await
                .expect("request frame")
                .into_items()
                .expect("request is an array");
            match args.last() {
                Some(Frame::Bulk(bytes)) => payloads.push(bytes.clone()),
                other => panic!("unexpected request argument: {other:?}"),
            }
        }
        for payload in payloads {
            let mut reply = Vec::new();
            reply.extend_from_slice(format!("${}\r\n", payload.len()).as_bytes());
            reply.extend_from_slice(&payload);
            reply.extend_from_slice(b"\r\n");
            write_half.write_all(&reply).await.expect("server write");
        }
    });

    let futures: Vec<_> = (0..10)
        .map(|i| dispatcher.submit::<Bytes>(&Request::new("ECHO").arg(format!("p{i}"))))
        .collect();

    let all = async move {
        for (i, future) in futures.into_iter().enumerate() {
            assert_eq!(future.await.expect("echo reply"), format!("p{i}").as_bytes());
        }
    };
    tokio::time::timeout(Duration::from_secs(5), all)
        .await
        .expect("pipelined batch must not deadlock");
    server.await.expect("server task");
}

#[tokio::test]
async fn test_reply_split_across_tiny_writes() {
    let (client_io, server_io) = tokio::io::duplex(1024);
    let dispatcher = Dispatcher::start(client_io, &config());

    let server = tokio::spawn(async move {
        let (read_half, mut write_half) = tokio::io::split(server_io);
        let mut reader = FrameReader::new(read_half);
        let _ = reader.read_frame().await.expect("request frame");

        let reply = b"*2\r\n$5\r\nhello\r\n$5\r\nworld\r\n";
        for chunk in reply.chunks(3) {
            write_half.write_all(chunk).await.expect("server write");
            write_half.flush().await.expect("server flush");
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    });

    let reply: Vec<Bytes> = dispatcher
        .submit(&Request::new("LRANGE").arg("k").arg(0i64).arg(-1i64))
        .await
        .expect("list reply");
    assert_eq!(reply, vec![Bytes::from("hello"), Bytes::from("world")]);
    server.await.expect("server task");
}
