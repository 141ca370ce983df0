use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt as _;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::decoder::FrameDecoder;
use crate::errors::{StreamError, StreamFailure, failure_from_transport};
use crate::request::{ChatReply, ChatRequest, ClosePolicy, StreamOptions};
use crate::router::{ChatEvent, EventRouter};
use crate::transport::StreamTransport;

/// Lifecycle of one streaming session.
///
/// `Idle → Connecting → Streaming → {Completed | Cancelled | Failed}`;
/// terminal states are final and a session is never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl StreamState {
    /// Returns true for states that admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

// Single source of truth per session, shared between the session task, the
// stream handle, and cancel handles. Transitions out of a terminal state are
// refused, which is what makes the terminal event at-most-once and cancel
// idempotent.
#[derive(Clone)]
struct SharedState(Arc<Mutex<StreamState>>);

impl SharedState {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(StreamState::Idle)))
    }

    fn get(&self) -> StreamState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, to: StreamState) -> bool {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_terminal() {
            return false;
        }
        *state = to;
        true
    }
}

/// Normalized events delivered to the consumer, in decode order.
///
/// Exactly one `Completed` or `Failed` ends a session, always after every
/// `Chunk` that preceded it.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// One increment of assistant text.
    Chunk { text: String },
    /// Terminal success with completion metadata (empty when omitted).
    Completed { metadata: Map<String, Value> },
    /// Terminal failure (server-declared or transport-declared).
    Failed { error: StreamFailure },
}

/// Handle used to request cancellation of an in-flight session.
#[derive(Clone)]
pub struct CancelHandle {
    state: SharedState,
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation.
    ///
    /// Idempotent, and a no-op once the session is terminal. The state moves
    /// to `Cancelled` immediately; the underlying request is aborted
    /// asynchronously and no further events are delivered, including events
    /// already queued.
    pub fn cancel(&self) {
        if self.state.transition(StreamState::Cancelled) {
            let _ = self.tx.send(true);
        }
    }
}

/// Consumer handle for one streaming session.
pub struct ChatStream {
    session_id: uuid::Uuid,
    rx: mpsc::Receiver<StreamEvent>,
    state: SharedState,
    cancel: CancelHandle,
}

impl ChatStream {
    /// Returns the session id (carried in log output).
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Returns the current session state.
    pub fn state(&self) -> StreamState {
        self.state.get()
    }

    /// Returns a handle that can cancel the session.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Waits for and returns the next event.
    ///
    /// Returns `None` after the terminal event was delivered or the session
    /// was cancelled; a cancelled session yields nothing further even when
    /// events were already queued.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.state.get() == StreamState::Cancelled {
            self.drop_queued();
            return None;
        }
        let event = self.rx.recv().await?;
        if self.state.get() == StreamState::Cancelled {
            self.drop_queued();
            return None;
        }
        Some(event)
    }

    /// Drains the session to its terminal event and returns the aggregated
    /// reply.
    pub async fn collect(mut self) -> Result<ChatReply, StreamError> {
        let mut text = String::new();
        while let Some(event) = self.next_event().await {
            match event {
                StreamEvent::Chunk { text: chunk } => text.push_str(&chunk),
                StreamEvent::Completed { metadata } => return Ok(ChatReply { text, metadata }),
                StreamEvent::Failed { error } => return Err(StreamError::Failed(error)),
            }
        }
        if self.state.get() == StreamState::Cancelled {
            Err(StreamError::Cancelled)
        } else {
            Err(StreamError::Protocol(
                "session ended without a terminal event".into(),
            ))
        }
    }

    fn drop_queued(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

pub(crate) fn spawn(
    transport: Arc<dyn StreamTransport>,
    request: ChatRequest,
    token: String,
    options: StreamOptions,
) -> ChatStream {
    let session_id = uuid::Uuid::new_v4();
    let state = SharedState::new();
    let (tx, rx) = mpsc::channel(options.buffer_capacity);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel = CancelHandle {
        state: state.clone(),
        tx: cancel_tx,
    };
    tokio::spawn(session_task(
        transport,
        request,
        token,
        options,
        session_id,
        state.clone(),
        tx,
        cancel_rx,
    ));
    ChatStream {
        session_id,
        rx,
        state,
        cancel,
    }
}

// Drives one session: open the transport, then decode, route, and dispatch
// inside the delta arm. All work for a session happens on this task, so the
// decoder is never fed concurrently.
#[allow(clippy::too_many_arguments)]
async fn session_task(
    transport: Arc<dyn StreamTransport>,
    request: ChatRequest,
    token: String,
    options: StreamOptions,
    session_id: uuid::Uuid,
    state: SharedState,
    tx: mpsc::Sender<StreamEvent>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    if !state.transition(StreamState::Connecting) {
        return; // cancelled before the request was issued
    }
    debug!(session_id = %session_id, kind = ?request.kind, "opening chat stream");

    let opened = tokio::select! {
        _ = cancelled(&mut cancel_rx) => return,
        opened = transport.open(&request, &token) => opened,
    };
    let mut deltas = match opened {
        Ok(deltas) => deltas,
        Err(err) => {
            fail(&state, &tx, failure_from_transport(err)).await;
            return;
        }
    };

    let mut decoder = FrameDecoder::default();
    let mut router = EventRouter::default();

    loop {
        let next = tokio::select! {
            _ = cancelled(&mut cancel_rx) => return,
            next = deltas.next() => next,
        };
        match next {
            Some(Ok(delta)) => {
                state.transition(StreamState::Streaming);
                for frame in decoder.feed(&delta) {
                    match router.route(&frame) {
                        Some(ChatEvent::Chunk { text }) => {
                            debug!(session_id = %session_id, len = text.len(), "chat stream chunk");
                            if tx.send(StreamEvent::Chunk { text }).await.is_err() {
                                return; // consumer dropped the handle
                            }
                        }
                        Some(ChatEvent::Completion { metadata }) => {
                            complete(&state, &tx, metadata).await;
                            return;
                        }
                        Some(ChatEvent::ServerError { message }) => {
                            fail(&state, &tx, StreamFailure::Server { message }).await;
                            return;
                        }
                        None => {}
                    }
                }
            }
            Some(Err(err)) => {
                fail(&state, &tx, failure_from_transport(err)).await;
                return;
            }
            None => {
                if let Some(frame) = decoder.flush() {
                    match router.route(&frame) {
                        Some(ChatEvent::Chunk { text }) => {
                            let _ = tx.send(StreamEvent::Chunk { text }).await;
                        }
                        Some(ChatEvent::Completion { metadata }) => {
                            complete(&state, &tx, metadata).await;
                            return;
                        }
                        Some(ChatEvent::ServerError { message }) => {
                            fail(&state, &tx, StreamFailure::Server { message }).await;
                            return;
                        }
                        None => {}
                    }
                }
                match options.close_policy {
                    ClosePolicy::CompleteOnCleanClose => {
                        debug!(session_id = %session_id, "stream closed cleanly without completion frame");
                        complete(&state, &tx, Map::new()).await;
                    }
                    ClosePolicy::RequireCompletionFrame => {
                        fail(&state, &tx, StreamFailure::Truncated).await;
                    }
                }
                return;
            }
        }
    }
}

// Resolves once cancellation is requested; never resolves otherwise.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // every cancel handle is gone; cancellation can no longer happen
            std::future::pending::<()>().await;
        }
    }
}

// Terminal transitions go through `SharedState::transition` so that a session
// which was cancelled (or already terminal) emits nothing.
async fn complete(state: &SharedState, tx: &mpsc::Sender<StreamEvent>, metadata: Map<String, Value>) {
    if state.transition(StreamState::Completed) {
        let _ = tx.send(StreamEvent::Completed { metadata }).await;
    }
}

async fn fail(state: &SharedState, tx: &mpsc::Sender<StreamEvent>, error: StreamFailure) {
    if state.transition(StreamState::Failed) {
        let _ = tx.send(StreamEvent::Failed { error }).await;
    }
}
