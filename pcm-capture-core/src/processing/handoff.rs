//! Bounded hand-off queue between the acquisition thread and the consumer.
//!
//! Unlike a ring buffer this never drops: a full queue blocks the producer
//! until the consumer pops, or until a stop is requested.

use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender, TryRecvError};
use thiserror::Error;

use crate::models::sample_buffer::SampleBuffer;

/// The other end of the queue is gone and nothing is left to receive.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("hand-off queue closed")]
pub struct QueueClosed;

/// Result of a blocking push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// A stop was requested while waiting; the buffer was dropped.
    Stopped,
    /// The consumer end was dropped; the buffer was dropped.
    ConsumerGone,
}

/// Create a queue holding at most `capacity` buffers.
pub fn handoff_queue(capacity: usize) -> (BufferProducer, BufferConsumer) {
    let (tx, rx) = bounded(capacity);
    (BufferProducer { tx }, BufferConsumer { rx, capacity })
}

/// Sending end, owned by the acquisition thread.
#[derive(Debug)]
pub struct BufferProducer {
    tx: Sender<SampleBuffer>,
}

impl BufferProducer {
    /// Move `buffer` into the queue, blocking while it is full.
    ///
    /// The wait has no deadline; only `stop` or a dropped consumer ends it.
    pub fn push(&self, buffer: SampleBuffer, stop: &StopToken) -> PushOutcome {
        select! {
            send(self.tx, buffer) -> res => match res {
                Ok(()) => PushOutcome::Delivered,
                Err(_) => PushOutcome::ConsumerGone,
            },
            recv(stop.rx) -> _ => PushOutcome::Stopped,
        }
    }
}

/// Receiving end. Buffers come out in the order they were pushed.
#[derive(Debug)]
pub struct BufferConsumer {
    rx: Receiver<SampleBuffer>,
    capacity: usize,
}

impl BufferConsumer {
    /// Wait up to `timeout` for the oldest buffer.
    ///
    /// `Ok(None)` means the timeout elapsed. Buffers still queued when the
    /// producer goes away are delivered before `QueueClosed`.
    pub fn pop(&self, timeout: Duration) -> Result<Option<SampleBuffer>, QueueClosed> {
        match self.rx.recv_timeout(timeout) {
            Ok(buffer) => Ok(Some(buffer)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(QueueClosed),
        }
    }

    /// Wait without a deadline.
    pub fn pop_blocking(&self) -> Result<SampleBuffer, QueueClosed> {
        self.rx.recv().map_err(|_| QueueClosed)
    }

    pub fn try_pop(&self) -> Result<Option<SampleBuffer>, QueueClosed> {
        match self.rx.try_recv() {
            Ok(buffer) => Ok(Some(buffer)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(QueueClosed),
        }
    }

    /// Discard everything currently queued. Returns the number dropped.
    pub fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Create a linked stop handle and token.
///
/// Triggering (or dropping) the handle is observed by every clone of the
/// token, including one blocked inside [`BufferProducer::push`].
pub fn stop_signal() -> (StopHandle, StopToken) {
    let (tx, rx) = bounded(0);
    (StopHandle { tx: Some(tx) }, StopToken { rx })
}

#[derive(Debug)]
pub struct StopHandle {
    tx: Option<Sender<()>>,
}

impl StopHandle {
    pub fn trigger(&mut self) {
        self.tx.take();
    }

    pub fn is_triggered(&self) -> bool {
        self.tx.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct StopToken {
    rx: Receiver<()>,
}

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}
