//! Event publisher trait and in-process event bus.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::stream;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::SagaError;

/// A lazy, unbounded stream of messages received on one channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = Value> + Send>>;

/// Trait for the message broker binding.
///
/// Publishing is fire-and-forget from the saga's point of view: the
/// returned delivery flag is logged, never awaited for correctness.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Sends `message` to `channel`.
    ///
    /// Returns whether any consumer received it.
    async fn publish(&self, channel: &str, message: Value) -> Result<bool, SagaError>;

    /// Subscribes to `channel`. Only messages published after this call are seen.
    fn subscribe(&self, channel: &str) -> MessageStream;
}

/// Capacity of each broadcast channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Default)]
struct BusState {
    channels: Mutex<HashMap<String, broadcast::Sender<Value>>>,
    published: Mutex<Vec<(String, Value)>>,
    fail_on_publish: AtomicBool,
}

/// In-process event bus with one broadcast channel per channel name.
///
/// Every published message is also recorded so tests can inspect what the
/// saga emitted.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    state: Arc<BusState>,
}

impl InMemoryEventBus {
    /// Creates a new event bus with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<Value> {
        let mut channels = self
            .state
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Configures the bus to refuse every publish.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Returns the messages published on `channel`, oldest first.
    pub fn published(&self, channel: &str) -> Vec<Value> {
        self.state
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(name, _)| name == channel)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Closes `channel`; its subscription streams end once drained.
    pub fn close_channel(&self, channel: &str) {
        self.state
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(channel);
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, channel: &str, message: Value) -> Result<bool, SagaError> {
        if self.state.fail_on_publish.load(Ordering::SeqCst) {
            return Err(SagaError::EventPublisher(format!(
                "broker refused message on {channel}"
            )));
        }

        self.state
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((channel.to_string(), message.clone()));

        // An error only means nobody is subscribed right now
        Ok(self.sender(channel).send(message).is_ok())
    }

    fn subscribe(&self, channel: &str) -> MessageStream {
        let receiver = self.sender(channel).subscribe();
        let channel = channel.to_string();

        Box::pin(stream::unfold(receiver, move |mut receiver| {
            let channel = channel.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(message) => return Some((message, receiver)),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(%channel, skipped, "subscriber lagged, messages dropped");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        }))
    }
}
