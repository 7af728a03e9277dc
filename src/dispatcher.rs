//! Single-connection task dispatcher
//!
//! One worker owns the connection and is the only thing that touches
//! the socket. Callers enqueue [`Task`]s from any number of
//! asynchronous tasks or threads; the worker writes requests in queue
//! order and reads exactly one reply per request. The protocol has no
//! request identifiers, so this write-then-read ordering is the only
//! correlation between a request and its reply.
//!
//! The worker drains whatever is already queued into a bounded batch,
//! writes the whole batch with a single flush, and only then reads the
//! replies in order. Requests therefore go out while earlier replies
//! are still in flight whenever callers submit faster than the server
//! answers.

use crate::connection::Transport;
use crate::core::config::ConnectionConfig;
use crate::core::error::{WireError, WireResult};
use crate::core::frame::Frame;
use crate::protocol::{FrameReader, RequestWriter};
use crate::reply::FromFrame;
use crate::request::Request;
use bytes::Bytes;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Upper bound on requests written per batch before replies are read
const MAX_PIPELINE_BATCH: usize = 64;

/// One queued command execution
///
/// A task owns its already-encoded request bytes and a completion
/// callback. The callback observes exactly one outcome: the reply
/// frame, a per-request failure, or the connection error that tore the
/// dispatcher down.
pub struct Task {
    request: Bytes,
    complete: Box<dyn FnOnce(WireResult<Frame>) + Send>,
    enqueued_at: Instant,
}

impl Task {
    /// Create a task from a request and a completion callback
    pub fn new(
        request: &Request,
        complete: impl FnOnce(WireResult<Frame>) + Send + 'static,
    ) -> Self {
        Self {
            request: request.encode(),
            complete: Box::new(complete),
            enqueued_at: Instant::now(),
        }
    }

    fn finish(self, result: WireResult<Frame>) {
        (self.complete)(result);
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("request_len", &self.request.len())
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

enum WorkItem {
    Task(Task),
    /// Wakes a worker parked on an empty queue so it re-checks the
    /// shutdown flag
    Wake,
}

/// Dispatches tasks over one exclusively owned connection
///
/// Created in the running state by [`start`](Dispatcher::start);
/// [`stop`](Dispatcher::stop) requests shutdown and waits for the
/// worker to exit. Shutdown is not a drain: tasks that have not started
/// when the worker observes the flag complete with
/// [`WireError::Closed`]. A task whose request is already on the wire
/// finishes first, because abandoning a pending reply would leave the
/// stream position unknown.
#[derive(Debug)]
pub struct Dispatcher {
    queue_tx: mpsc::UnboundedSender<WorkItem>,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawn the worker over a connected transport and start
    /// dispatching
    pub fn start<T>(transport: T, config: &ConnectionConfig) -> Self
    where
        T: Transport + 'static,
    {
        let (read_half, write_half) = tokio::io::split(transport);
        let reader = FrameReader::with_capacity(read_half, config.read_buffer_size)
            .with_max_frame_length(config.max_frame_length);
        let writer = RequestWriter::new(write_half);

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = tokio::spawn(worker_loop(
            reader,
            writer,
            queue_rx,
            Arc::clone(&shutdown),
            config.response_timeout,
        ));

        Self {
            queue_tx,
            shutdown,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Submit a request and receive the reply built as `T`
    ///
    /// The task is enqueued before this returns; the returned future
    /// only waits for its completion. Two `submit` calls made in order
    /// from the same caller are therefore processed in that order,
    /// whether or not the first future has been polled.
    pub fn submit<T>(&self, request: &Request) -> impl Future<Output = WireResult<T>>
    where
        T: FromFrame + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task = Task::new(request, move |result: WireResult<Frame>| {
            let _ = tx.send(result.and_then(T::from_frame));
        });
        self.submit_task(task);

        async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(WireError::Closed),
            }
        }
    }

    /// Enqueue a task with a raw completion callback
    ///
    /// Safe to call from any number of tasks or threads concurrently.
    /// Racing submitters get some total order; once enqueued, the
    /// processing order is fixed. If the dispatcher is shutting down or
    /// the worker has exited, the task completes immediately with
    /// [`WireError::Closed`].
    pub fn submit_task(&self, task: Task) {
        if self.shutdown.load(Ordering::Acquire) {
            task.finish(Err(WireError::Closed));
            return;
        }
        if let Err(mpsc::error::SendError(item)) = self.queue_tx.send(WorkItem::Task(task)) {
            if let WorkItem::Task(task) = item {
                task.finish(Err(WireError::Closed));
            }
        }
    }

    /// Whether the worker is alive and accepting tasks
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire) && !self.queue_tx.is_closed()
    }

    /// Request shutdown and wait for the worker to exit
    ///
    /// Sets the shutdown flag, wakes the worker and joins it. Queued
    /// tasks the worker has not started complete with
    /// [`WireError::Closed`]; a mid-flight task finishes first. Calling
    /// `stop` twice is harmless.
    pub async fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.queue_tx.send(WorkItem::Wake);

        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if handle.await.is_err() {
                warn!("Dispatcher worker panicked during shutdown");
            }
        }
    }
}

async fn worker_loop<R, W>(
    mut reader: FrameReader<R>,
    mut writer: RequestWriter<W>,
    mut queue_rx: mpsc::UnboundedReceiver<WorkItem>,
    shutdown: Arc<AtomicBool>,
    response_timeout: Option<Duration>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    debug!("Dispatcher worker started");

    let exit_error = loop {
        if shutdown.load(Ordering::Acquire) {
            break WireError::Closed;
        }
        let Some(item) = queue_rx.recv().await else {
            // Every handle dropped; nothing can be queued anymore
            break WireError::Closed;
        };
        let WorkItem::Task(task) = item else {
            continue;
        };
        if shutdown.load(Ordering::Acquire) {
            task.finish(Err(WireError::Closed));
            break WireError::Closed;
        }

        let mut batch = VecDeque::with_capacity(8);
        batch.push_back(task);
        while batch.len() < MAX_PIPELINE_BATCH {
            match queue_rx.try_recv() {
                Ok(WorkItem::Task(task)) => batch.push_back(task),
                Ok(WorkItem::Wake) | Err(_) => break,
            }
        }

        if let Err(e) = process_batch(&mut reader, &mut writer, batch, response_timeout).await {
            shutdown.store(true, Ordering::Release);
            warn!("Connection failed, stopping dispatcher: {e}");
            break e;
        }
    };

    drain_queue(&mut queue_rx, &exit_error);
    debug!("Dispatcher worker stopped");
}

/// Write every request in the batch, flush once, then read and deliver
/// the replies in order
///
/// Returns `Err` only for connection errors; the batch's tasks have all
/// been completed by then, the caller just has to fail the rest of the
/// queue and exit.
async fn process_batch<R, W>(
    reader: &mut FrameReader<R>,
    writer: &mut RequestWriter<W>,
    mut batch: VecDeque<Task>,
    response_timeout: Option<Duration>,
) -> WireResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    for task in &batch {
        writer.write_encoded(&task.request);
    }
    if let Err(e) = writer.flush().await {
        return fail_tasks(batch, e);
    }

    while let Some(task) = batch.pop_front() {
        trace!("Reading reply for task queued {:?} ago", task.enqueued_at.elapsed());
        match read_reply(reader, response_timeout).await {
            Ok(Frame::Error { code, message }) => {
                // A well-formed error reply fails only its own task
                task.finish(Err(WireError::Server { code, message }));
            }
            Ok(frame) => task.finish(Ok(frame)),
            Err(e) => {
                let fatal = e.replicate();
                task.finish(Err(e));
                return fail_tasks(batch, fatal);
            }
        }
    }
    Ok(())
}

async fn read_reply<R>(
    reader: &mut FrameReader<R>,
    response_timeout: Option<Duration>,
) -> WireResult<Frame>
where
    R: AsyncRead + Unpin,
{
    match response_timeout {
        Some(limit) => tokio::time::timeout(limit, reader.read_frame())
            .await
            .map_err(|_| WireError::TimedOut)?,
        None => reader.read_frame().await,
    }
}

fn fail_tasks(tasks: impl IntoIterator<Item = Task>, error: WireError) -> WireResult<()> {
    for task in tasks {
        task.finish(Err(error.replicate()));
    }
    Err(error)
}

fn drain_queue(queue_rx: &mut mpsc::UnboundedReceiver<WorkItem>, error: &WireError) {
    queue_rx.close();
    let mut failed = 0usize;
    while let Ok(item) = queue_rx.try_recv() {
        if let WorkItem::Task(task) = item {
            task.finish(Err(error.replicate()));
            failed += 1;
        }
    }
    if failed > 0 {
        debug!("Completed {failed} queued tasks with {error}");
    }
}
