//! Progress-tracked dispatch.
//!
//! A `ProgressDispatcher` owns one long-lived `TransferSession` (one connection
//! pool) and multiplexes every tracked transfer over it. Each transfer gets a
//! `TaskId` and a `ProgressTaskContext` in a mutex-guarded registry; session
//! callbacks look the context up by id, update the caller's `ProgressSink`, and
//! resolve the waiting caller on completion. Removing the entry is the
//! boundary after which no further progress updates happen for that transfer.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::HeaderMap;
use tokio::sync::{oneshot, watch};
use tokio::task::AbortHandle;

use crate::error::{HttpClientError, Result};
use crate::execution::http::transport::{HttpTransportRequest, HttpTransportResponse, WireBody};
use crate::types::request::BodyStream;
use crate::utils::cancel::CancelHandle;

/// Receives fraction-completed updates in `[0.0, 1.0]`.
///
/// Called from I/O tasks after the registry lock is released, so a sink may
/// query the dispatcher.
pub trait ProgressSink: Send + Sync {
    fn set_fraction_completed(&self, fraction: f64);
}

/// A `ProgressSink` backed by a `tokio::sync::watch` channel.
#[derive(Debug)]
pub struct TransferProgress {
    tx: watch::Sender<f64>,
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferProgress {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self { tx }
    }

    /// Latest fraction.
    pub fn fraction_completed(&self) -> f64 {
        *self.tx.borrow()
    }

    /// Observe updates.
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.tx.subscribe()
    }
}

impl ProgressSink for TransferProgress {
    fn set_fraction_completed(&self, fraction: f64) {
        self.tx.send_replace(fraction);
    }
}

/// Identifier of one in-flight transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Callbacks a `TransferSession` reports a transfer's life through.
pub trait TransferDelegate: Send + Sync {
    /// Cumulative request-body bytes handed to the connection.
    fn did_send_body_data(&self, task: TaskId, total_sent: u64, expected: Option<u64>);
    /// Status line and headers arrived.
    fn did_receive_response(&self, task: TaskId, status: u16, headers: HeaderMap, expected_length: Option<u64>);
    /// A chunk of the response body arrived.
    fn did_receive_data(&self, task: TaskId, chunk: Bytes);
    /// The transfer finished; no further callbacks follow for `task`.
    fn did_complete(&self, task: TaskId, result: Result<()>);
}

/// A long-lived connection facility able to run many transfers at once.
pub trait TransferSession: Send + Sync {
    /// Start `request` in the background and report to `delegate`.
    ///
    /// Must be called from within a Tokio runtime.
    fn start_transfer(
        &self,
        task: TaskId,
        request: HttpTransportRequest,
        delegate: Arc<dyn TransferDelegate>,
    ) -> AbortHandle;
}

/// Per-transfer state, owned by the registry while the transfer is in flight.
pub struct ProgressTaskContext {
    sink: Arc<dyn ProgressSink>,
    body: BytesMut,
    status: Option<u16>,
    headers: HeaderMap,
    expected_upload: Option<u64>,
    expected_download: Option<u64>,
    received: u64,
    completion: Option<oneshot::Sender<Result<HttpTransportResponse>>>,
    abort: Option<AbortHandle>,
}

impl ProgressTaskContext {
    fn new(
        sink: Arc<dyn ProgressSink>,
        expected_upload: Option<u64>,
        completion: oneshot::Sender<Result<HttpTransportResponse>>,
    ) -> Self {
        Self {
            sink,
            body: BytesMut::new(),
            status: None,
            headers: HeaderMap::new(),
            expected_upload,
            expected_download: None,
            received: 0,
            completion: Some(completion),
            abort: None,
        }
    }

    /// The sink and fraction to report, delivered after the registry lock is released.
    fn report(&self, done: u64, expected: Option<u64>) -> Option<(Arc<dyn ProgressSink>, f64)> {
        fraction(done, expected).map(|fraction| (self.sink.clone(), fraction))
    }

    fn finish(mut self, result: Result<()>) {
        let outcome = result.and_then(|()| {
            let status = self.status.ok_or_else(|| {
                HttpClientError::InvalidResponse("transfer completed without a response".into())
            })?;
            self.sink.set_fraction_completed(1.0);
            Ok(HttpTransportResponse {
                status,
                headers: std::mem::take(&mut self.headers),
                body: std::mem::take(&mut self.body).freeze(),
            })
        });
        if let Some(completion) = self.completion.take() {
            // Receiver gone means the caller stopped waiting.
            let _ = completion.send(outcome);
        }
    }
}

/// `done / expected` clamped to `[0, 1]`; `None` when the total is unknown or zero.
fn fraction(done: u64, expected: Option<u64>) -> Option<f64> {
    match expected {
        Some(total) if total > 0 => Some((done as f64 / total as f64).clamp(0.0, 1.0)),
        _ => None,
    }
}

#[derive(Default)]
struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, ProgressTaskContext>>,
}

impl TaskRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, ProgressTaskContext>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(&self, task: TaskId, context: ProgressTaskContext) {
        self.lock().insert(task, context);
        tracing::trace!(target: "wirecall::http", %task, "progress task registered");
    }

    /// Store the abort handle; if the transfer already finished the handle is dropped.
    fn attach_abort(&self, task: TaskId, abort: AbortHandle) {
        if let Some(context) = self.lock().get_mut(&task) {
            context.abort = Some(abort);
        }
    }

    fn remove(&self, task: TaskId) -> Option<ProgressTaskContext> {
        let removed = self.lock().remove(&task);
        if removed.is_some() {
            tracing::trace!(target: "wirecall::http", %task, "progress task removed");
        }
        removed
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

impl TransferDelegate for TaskRegistry {
    fn did_send_body_data(&self, task: TaskId, total_sent: u64, expected: Option<u64>) {
        let update = self
            .lock()
            .get(&task)
            .and_then(|context| context.report(total_sent, expected.or(context.expected_upload)));
        if let Some((sink, fraction)) = update {
            sink.set_fraction_completed(fraction);
        }
    }

    fn did_receive_response(&self, task: TaskId, status: u16, headers: HeaderMap, expected_length: Option<u64>) {
        let mut tasks = self.lock();
        if let Some(context) = tasks.get_mut(&task) {
            context.status = Some(status);
            context.headers = headers;
            context.expected_download = expected_length;
        }
    }

    fn did_receive_data(&self, task: TaskId, chunk: Bytes) {
        let update = self.lock().get_mut(&task).and_then(|context| {
            context.received += chunk.len() as u64;
            context.body.extend_from_slice(&chunk);
            context.report(context.received, context.expected_download)
        });
        if let Some((sink, fraction)) = update {
            sink.set_fraction_completed(fraction);
        }
    }

    fn did_complete(&self, task: TaskId, result: Result<()>) {
        // Finish outside the lock so the waiting caller can't contend with us.
        if let Some(context) = self.remove(task) {
            context.finish(result);
        }
    }
}

/// Removes the registry entry and aborts the transfer if the caller stops
/// waiting before completion (cancellation or a dropped future).
struct Registration<'a> {
    registry: &'a TaskRegistry,
    task: TaskId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if let Some(abort) = self.registry.remove(self.task).and_then(|context| context.abort) {
            abort.abort();
        }
    }
}

/// Shared dispatcher for progress-tracked transfers.
pub struct ProgressDispatcher {
    session: Arc<dyn TransferSession>,
    registry: Arc<TaskRegistry>,
    next_task: AtomicU64,
}

impl fmt::Debug for ProgressDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressDispatcher")
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl ProgressDispatcher {
    pub fn new(session: Arc<dyn TransferSession>) -> Self {
        Self {
            session,
            registry: Arc::new(TaskRegistry::default()),
            next_task: AtomicU64::new(1),
        }
    }

    /// Dispatcher over a `reqwest::Client`'s connection pool.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self::new(Arc::new(ReqwestSession::new(client)))
    }

    /// Number of registered transfers.
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }

    /// Run `request` through the shared session, reporting progress to `sink`.
    pub async fn execute(
        &self,
        request: HttpTransportRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancelHandle,
    ) -> Result<HttpTransportResponse> {
        cancel.check()?;
        let task = TaskId(self.next_task.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.registry
            .insert(task, ProgressTaskContext::new(sink, request.content_length, tx));
        let _registration = Registration {
            registry: &self.registry,
            task,
        };

        let delegate: Arc<dyn TransferDelegate> = self.registry.clone();
        let abort = self.session.start_transfer(task, request, delegate);
        self.registry.attach_abort(task, abort);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HttpClientError::Cancelled),
            outcome = rx => outcome.unwrap_or_else(|_| {
                Err(HttpClientError::TransportError(format!("{task} ended without completion")))
            }),
        }
    }
}

/// `TransferSession` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestSession {
    client: reqwest::Client,
    chunk_size: usize,
}

impl ReqwestSession {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            chunk_size: crate::defaults::transfer::UPLOAD_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl TransferSession for ReqwestSession {
    fn start_transfer(
        &self,
        task: TaskId,
        request: HttpTransportRequest,
        delegate: Arc<dyn TransferDelegate>,
    ) -> AbortHandle {
        let client = self.client.clone();
        let chunk_size = self.chunk_size;
        let handle = tokio::spawn(async move {
            let result = run_transfer(&client, task, request, chunk_size, delegate.clone()).await;
            delegate.did_complete(task, result);
        });
        handle.abort_handle()
    }
}

async fn run_transfer(
    client: &reqwest::Client,
    task: TaskId,
    request: HttpTransportRequest,
    chunk_size: usize,
    delegate: Arc<dyn TransferDelegate>,
) -> Result<()> {
    let expected = request.content_length;
    let upload: Option<BodyStream> = match &request.body {
        WireBody::Empty => None,
        WireBody::Bytes(bytes) => Some(chunked(bytes.clone(), chunk_size)),
        WireBody::Stream(source) => Some(source.open()),
    };

    let mut builder = client
        .request(request.method.into(), request.url)
        .headers(request.headers);
    if let Some(stream) = upload {
        let sent = Arc::new(AtomicU64::new(0));
        let upload_delegate = delegate.clone();
        let counted = stream.map(move |chunk| {
            if let Ok(bytes) = &chunk {
                let len = bytes.len() as u64;
                let total = sent.fetch_add(len, Ordering::Relaxed) + len;
                upload_delegate.did_send_body_data(task, total, expected);
            }
            chunk
        });
        builder = builder.body(reqwest::Body::wrap_stream(counted));
    }

    let mut response = builder.send().await?;
    delegate.did_receive_response(
        task,
        response.status().as_u16(),
        response.headers().clone(),
        response.content_length(),
    );
    while let Some(chunk) = response.chunk().await? {
        delegate.did_receive_data(task, chunk);
    }
    Ok(())
}

fn chunked(bytes: Bytes, chunk_size: usize) -> BodyStream {
    let mut chunks = Vec::with_capacity(bytes.len() / chunk_size + 1);
    let mut offset = 0;
    while offset < bytes.len() {
        let end = (offset + chunk_size).min(bytes.len());
        chunks.push(Ok(bytes.slice(offset..end)));
        offset = end;
    }
    Box::pin(futures::stream::iter(chunks))
}
