//! Bounded asynchronous write path.
//!
//! A single worker task owns the transport's write half exclusively, so
//! frames are never interleaved or reordered. Producers enqueue without
//! blocking and learn immediately when the buffer is saturated or shutdown
//! has begun.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use haptic_proto::{encode_frame, ClientMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{SendError, TransportError};
use crate::transport::FrameSink;

/// Messages buffered before [`OutboundQueue::send`] reports `QueueFull`.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Bounded queue in front of the transport's write half.
pub struct OutboundQueue {
    queue: mpsc::Sender<ClientMessage>,
    stopping: Arc<AtomicBool>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl OutboundQueue {
    /// Take ownership of the write half and start the write worker.
    pub fn new(sink: impl FrameSink) -> Self {
        let (queue, queue_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(write_loop(sink, queue_rx, cancel.clone()));
        Self {
            queue,
            stopping: Arc::new(AtomicBool::new(false)),
            cancel,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueue `message` for transmission in submission order.
    ///
    /// Never blocks: fails fast with [`SendError::QueueFull`] when the
    /// buffer is saturated and [`SendError::Stopped`] once shutdown has
    /// begun. A failed send is never silently dropped into the queue.
    pub fn send(&self, message: ClientMessage) -> Result<(), SendError> {
        if self.stopping.load(Ordering::SeqCst) {
            return Err(SendError::Stopped);
        }
        self.queue.try_send(message).map_err(|error| match error {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::Stopped,
        })
    }

    /// Stop accepting messages, drain what is already queued to the
    /// transport, send the transport-level close, and return.
    ///
    /// Idempotent and safe to call concurrently; late callers wait for the
    /// drain started by the first.
    pub async fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.cancel.cancel();
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn write_loop(
    mut sink: impl FrameSink,
    mut queue: mpsc::Receiver<ClientMessage>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            message = queue.recv() => match message {
                Some(message) => {
                    if !write_one(&mut sink, message).await {
                        return;
                    }
                }
                None => break,
            },
            _ = cancel.cancelled() => break,
        }
    }

    // Shutdown: drain whatever was accepted before the stop, in FIFO order.
    while let Ok(message) = queue.try_recv() {
        if !write_one(&mut sink, message).await {
            return;
        }
    }
    if let Err(error) = sink.close().await {
        tracing::debug!(%error, "error closing transport");
    }
}

/// Write one message as its own frame. Returns false when the transport is
/// gone and the worker should exit.
async fn write_one(sink: &mut impl FrameSink, message: ClientMessage) -> bool {
    let frame = match encode_frame(std::slice::from_ref(&message)) {
        Ok(frame) => frame,
        Err(error) => {
            tracing::warn!(%error, kind = message.kind(), "failed to encode message");
            return true;
        }
    };
    match sink.write_frame(frame).await {
        Ok(()) => true,
        Err(TransportError::Closed) => false,
        Err(error) => {
            tracing::warn!(%error, "error during write");
            true
        }
    }
}
