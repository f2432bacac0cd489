//! One-shot rendezvous between a synchronous remote read and the stack task.

use crate::error::{Result, ZigbeeError};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

/// Last value seen for one remote attribute plus an optional waiting reader.
///
/// Arming replaces any previous waiter, so a timed-out read never satisfies
/// the next one. Late responses still update `last()`.
pub struct ReadSlot<T> {
    last: Mutex<Option<T>>,
    waiter: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Default for ReadSlot<T> {
    fn default() -> Self {
        Self {
            last: Mutex::new(None),
            waiter: Mutex::new(None),
        }
    }
}

impl<T: Clone + Send> ReadSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader for the next value.
    pub fn arm(&self) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        *self.waiter.lock() = Some(tx);
        rx
    }

    /// Drop the pending reader without a value.
    pub fn disarm(&self) {
        self.waiter.lock().take();
    }

    /// Store a value from the stack task and wake the reader, if any.
    pub fn fulfil(&self, value: T) {
        *self.last.lock() = Some(value.clone());
        if let Some(tx) = self.waiter.lock().take() {
            // reader may have timed out already
            let _ = tx.send(value);
        }
    }

    pub fn last(&self) -> Option<T> {
        self.last.lock().clone()
    }

    pub fn is_armed(&self) -> bool {
        self.waiter.lock().is_some()
    }

    /// Wait for an armed receiver with an explicit timeout.
    pub async fn wait(rx: oneshot::Receiver<T>, timeout: Duration) -> Result<T> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ZigbeeError::ResponseDropped),
            Err(_) => Err(ZigbeeError::Timeout(timeout)),
        }
    }
}
