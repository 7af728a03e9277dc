//! Shutdown semantics
//!
//! Stopping is not a drain: whatever the worker has not started when it
//! observes the shutdown flag completes with `Closed`. The one request
//! that may already be on the wire finishes first, because abandoning
//! its pending reply would leave the stream position unknown.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]

use redis_wire::{ConnectionConfig, Dispatcher, Request, WireError};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn config() -> ConnectionConfig {
    ConnectionConfig::new("test").with_response_timeout(Some(Duration::from_secs(5)))
}

#[tokio::test]
async fn test_stop_finishes_in_flight_task_and_fails_queued_ones() {
    let (client_io, mut server) = tokio::io::duplex(4096);
    let dispatcher = Arc::new(Dispatcher::start(client_io, &config()));

    // Gets written immediately; its reply is withheld so it stays in
    // flight while the rest of the test runs
    let in_flight = dispatcher.submit::<String>(&Request::new("GET").arg("a"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let queued_one = dispatcher.submit::<String>(&Request::new("GET").arg("b"));
    let queued_two = dispatcher.submit::<String>(&Request::new("GET").arg("c"));

    let stopper = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.stop().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Only now does the withheld reply arrive
    server.write_all(b"+done\r\n").await.unwrap();

    assert_eq!(in_flight.await.unwrap(), "done");
    assert!(matches!(queued_one.await.unwrap_err(), WireError::Closed));
    assert!(matches!(queued_two.await.unwrap_err(), WireError::Closed));

    stopper.await.unwrap();
    assert!(!dispatcher.is_running());
}

#[tokio::test]
async fn test_stop_on_idle_dispatcher_closes_the_connection() {
    let (client_io, mut server) = tokio::io::duplex(4096);
    let dispatcher = Dispatcher::start(client_io, &config());

    dispatcher.stop().await;
    assert!(!dispatcher.is_running());

    // The worker dropped its halves of the stream, so the server side
    // reads a clean EOF with nothing in between
    let mut leftover = Vec::new();
    server.read_to_end(&mut leftover).await.unwrap();
    assert!(leftover.is_empty());
}

#[tokio::test]
async fn test_submissions_racing_stop_all_resolve() {
    let (client_io, server) = tokio::io::duplex(4096);
    let dispatcher = Arc::new(Dispatcher::start(client_io, &config()));
    drop(server);

    let mut submitters = Vec::new();
    for _ in 0..4 {
        let dispatcher = Arc::clone(&dispatcher);
        submitters.push(tokio::spawn(async move {
            let mut outcomes = Vec::new();
            for _ in 0..10 {
                outcomes.push(dispatcher.submit::<String>(&Request::new("PING")).await);
            }
            outcomes
        }));
    }
    let stopper = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.stop().await })
    };

    // Every submission resolves with some outcome; none hangs or is
    // silently dropped
    for submitter in submitters {
        for outcome in submitter.await.unwrap() {
            let err = outcome.unwrap_err();
            assert!(
                matches!(err, WireError::Closed) || err.is_connection_error(),
                "unexpected outcome: {err:?}"
            );
        }
    }
    stopper.await.unwrap();
}
