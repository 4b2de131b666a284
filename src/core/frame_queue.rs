//! Bounded hand-off between the capture callback and the voice mixer.
//!
//! The producer never blocks: the capture callback runs on the audio host's
//! realtime thread. When the consumer falls behind, the oldest frame is
//! discarded so latency stays bounded by the queue capacity.

use crate::domain::model::{PcmFrame, StreamStats};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn frame_queue(capacity: usize, stats: Arc<StreamStats>) -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let closed = Arc::new(AtomicBool::new(false));
    let producer = FrameProducer {
        tx,
        evict: rx.clone(),
        closed: Arc::clone(&closed),
        stats: Arc::clone(&stats),
    };
    let consumer = FrameConsumer { rx, closed, stats };
    (producer, consumer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued after evicting the oldest frame.
    Evicted,
    /// Consumer is gone.
    Closed,
}

#[derive(Debug, PartialEq)]
pub enum Pop {
    Frame(PcmFrame),
    Empty,
    Closed,
}

pub struct FrameProducer {
    tx: Sender<PcmFrame>,
    // 只用來丟棄最舊的 frame；它會讓 channel 一直有 receiver，
    // 所以 consumer 是否還在要看 `closed`
    evict: Receiver<PcmFrame>,
    closed: Arc<AtomicBool>,
    stats: Arc<StreamStats>,
}

impl FrameProducer {
    pub fn push(&self, frame: PcmFrame) -> PushOutcome {
        if self.is_closed() {
            return PushOutcome::Closed;
        }
        self.stats.record_captured();

        let frame = match self.tx.try_send(frame) {
            Ok(()) => return PushOutcome::Queued,
            Err(TrySendError::Disconnected(_)) => return PushOutcome::Closed,
            Err(TrySendError::Full(frame)) => frame,
        };

        if self.evict.try_recv().is_ok() {
            self.stats.record_dropped();
        }

        match self.tx.try_send(frame) {
            Ok(()) => PushOutcome::Evicted,
            Err(TrySendError::Disconnected(_)) => PushOutcome::Closed,
            Err(TrySendError::Full(_)) => {
                self.stats.record_dropped();
                PushOutcome::Evicted
            }
        }
    }

    /// True once the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> &Arc<StreamStats> {
        &self.stats
    }
}

pub struct FrameConsumer {
    rx: Receiver<PcmFrame>,
    closed: Arc<AtomicBool>,
    stats: Arc<StreamStats>,
}

impl Drop for FrameConsumer {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl FrameConsumer {
    pub fn try_pop(&self) -> Pop {
        match self.rx.try_recv() {
            Ok(frame) => Pop::Frame(frame),
            Err(crossbeam_channel::TryRecvError::Empty) => Pop::Empty,
            Err(crossbeam_channel::TryRecvError::Disconnected) => Pop::Closed,
        }
    }

    /// Waits at most `wait` for a frame. A zero wait never blocks.
    pub fn pop_timeout(&self, wait: Duration) -> Pop {
        if wait.is_zero() {
            return self.try_pop();
        }
        match self.rx.recv_timeout(wait) {
            Ok(frame) => Pop::Frame(frame),
            Err(RecvTimeoutError::Timeout) => Pop::Empty,
            Err(RecvTimeoutError::Disconnected) => Pop::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn stats(&self) -> &Arc<StreamStats> {
        &self.stats
    }
}
