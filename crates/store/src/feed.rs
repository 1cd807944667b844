//! Watch-channel plumbing shared by the store implementations.
//!
//! Every subscription is a `tokio::sync::watch` channel carrying the full
//! current snapshot; writers publish a fresh snapshot after each change.
//! Receivers that lag simply skip to the latest value, which is safe because
//! snapshots are self-contained.

use std::collections::HashMap;
use std::pin::Pin;

use common::CustomerId;
use futures_core::Stream;
use futures_util::stream;
use tokio::sync::{Mutex, watch};

/// A boxed stream of snapshots, for consumers that prefer `Stream` over a
/// raw watch receiver.
pub type SnapshotStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Adapts a watch receiver into a stream that yields the current snapshot
/// immediately and then once per change, ending when the sender is dropped.
pub fn into_stream<T>(rx: watch::Receiver<T>) -> SnapshotStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    Box::pin(stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let snapshot = rx.borrow_and_update().clone();
        Some((snapshot, (rx, false)))
    }))
}

/// Per-customer fan-out of watch senders.
///
/// Channels are created on first subscription and pruned on publish once
/// every receiver has been dropped.
pub(crate) struct Hub<T> {
    channels: Mutex<HashMap<CustomerId, watch::Sender<T>>>,
}

impl<T: Clone> Hub<T> {
    pub(crate) fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a receiver for `key`, creating the channel seeded with
    /// `initial` if nobody is watching yet.
    pub(crate) async fn subscribe(&self, key: &CustomerId, initial: T) -> watch::Receiver<T> {
        let mut channels = self.channels.lock().await;
        match channels.get(key) {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = watch::channel(initial);
                channels.insert(key.clone(), tx);
                rx
            }
        }
    }

    /// Pushes a new snapshot to `key`'s watchers, dropping the channel when
    /// none remain.
    pub(crate) async fn publish(&self, key: &CustomerId, snapshot: T) {
        let mut channels = self.channels.lock().await;
        if let Some(tx) = channels.get(key) {
            if tx.receiver_count() == 0 {
                channels.remove(key);
            } else {
                tx.send_replace(snapshot);
            }
        }
    }
}
