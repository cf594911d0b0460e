//! Multicast channel that replays the latest value to new subscribers.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Default number of values a slow subscriber may fall behind before it
/// starts skipping.
pub const DEFAULT_CAPACITY: usize = 8;

/// A broadcast channel with a latest-value slot.
///
/// The slot and the channel are updated under one lock, so a subscriber sees
/// the value current at subscription time followed by every later value, with
/// no gap and no duplicate.
#[derive(Debug)]
pub struct Broadcast<T> {
    latest: Mutex<Option<T>>,
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Broadcast<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            latest: Mutex::new(None),
            tx,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<T>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` as the latest and send it to every subscriber.
    pub fn publish(&self, value: T) {
        let mut latest = self.slot();
        *latest = Some(value.clone());
        // No receivers is not an error; the value stays in the slot.
        let _ = self.tx.send(value);
    }

    pub fn latest(&self) -> Option<T> {
        self.slot().clone()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let latest = self.slot();
        Subscription {
            replay: latest.clone(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving end returned by [`Broadcast::subscribe`].
#[derive(Debug)]
pub struct Subscription<T> {
    replay: Option<T>,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Next value if one is ready.
    pub fn try_recv(&mut self) -> Option<T> {
        if let Some(value) = self.replay.take() {
            return Some(value);
        }
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Subscriber lagged, skipped {} value(s)", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next value. Returns `None` once the channel is gone.
    ///
    /// Must not be called from inside an async runtime; use [`recv`](Self::recv).
    pub fn recv_blocking(&mut self) -> Option<T> {
        if let Some(value) = self.replay.take() {
            return Some(value);
        }
        loop {
            match self.rx.blocking_recv() {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Subscriber lagged, skipped {} value(s)", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub async fn recv(&mut self) -> Option<T> {
        if let Some(value) = self.replay.take() {
            return Some(value);
        }
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Subscriber lagged, skipped {} value(s)", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
