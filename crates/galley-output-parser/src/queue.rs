//! The output queue shared by every producer of [`OutputEvent`]s
//!
//! Producers (the output handlers on the build worker, and the file monitor)
//! hold cloned [`OutputSender`]s and never block. A single consumer owns the
//! [`OutputReceiver`] and drains it on a timer.

use crate::types::OutputEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use thiserror::Error;

/// All producers are gone and nothing is left to drain
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("output queue closed")]
pub struct QueueClosed;

/// Create a new unbounded output queue
pub fn output_queue() -> (OutputSender, OutputReceiver) {
    let (tx, rx) = mpsc::channel();
    (OutputSender::new(tx), OutputReceiver { rx })
}

/// Producer side of the output queue
///
/// Clones share one closed flag: once any of them finds the consumer gone,
/// all of them stop sending.
#[derive(Debug, Clone)]
pub struct OutputSender {
    tx: Sender<OutputEvent>,
    closed: Arc<AtomicBool>,
}

impl OutputSender {
    pub fn new(tx: Sender<OutputEvent>) -> Self {
        Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Push an event onto the queue
    ///
    /// Returns false if the consumer has gone away. The event is dropped in
    /// that case.
    pub fn send(&self, event: impl Into<OutputEvent>) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.tx.send(event.into()) {
            Ok(()) => true,
            Err(e) => {
                if !self.closed.swap(true, Ordering::Relaxed) {
                    log::debug!("Output queue disconnected, dropping {:?}", e.0);
                }
                false
            }
        }
    }

    /// Whether a send has already found the consumer gone
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

/// Consumer side of the output queue
#[derive(Debug)]
pub struct OutputReceiver {
    rx: Receiver<OutputEvent>,
}

impl OutputReceiver {
    /// Take the next event if one is available, without blocking
    pub fn try_next(&self) -> Option<OutputEvent> {
        self.rx.try_recv().ok()
    }

    /// Take every event that is currently available, without blocking
    ///
    /// Returns `Err(QueueClosed)` once every sender has been dropped and the
    /// queue is empty.
    pub fn drain(&self) -> Result<Vec<OutputEvent>, QueueClosed> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return Ok(events),
                Err(TryRecvError::Disconnected) if events.is_empty() => return Err(QueueClosed),
                Err(TryRecvError::Disconnected) => return Ok(events),
            }
        }
    }
}
