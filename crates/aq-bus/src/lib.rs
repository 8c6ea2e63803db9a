// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aq-bus: the EventBus. Every publish is written through a durable
//! [`EventSink`] first, then fanned out on a `tokio::sync::broadcast`
//! channel — the Store is always the record of truth, the broadcast
//! channel is a best-effort live tail.

use aq_core::Event;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

/// Durable event storage the bus writes through before fanning out.
///
/// Implemented by `aq-store::Store` in the full daemon; kept as a narrow
/// trait here so aq-bus never depends on aq-store.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append_event(&self, event: &Event) -> Result<(), EventSinkError>;
}

#[derive(Debug, Error)]
#[error("event sink write failed: {0}")]
pub struct EventSinkError(pub String);

/// Default channel capacity: generous enough that a normal SSE client
/// never lags during a single heartbeat's worth of events, small enough
/// that a genuinely stuck subscriber is detected quickly instead of
/// growing memory unbounded.
pub const DEFAULT_CAPACITY: usize = 1024;

/// The durable-write-then-fan-out event bus described in spec.md §4.8.
pub struct EventBus {
    sink: Arc<dyn EventSink>,
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_capacity(sink, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(sink: Arc<dyn EventSink>, capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sink, sender }
    }

    /// Persist `event` and fan it out to current subscribers.
    ///
    /// Persistence failure is returned to the caller; fan-out failure
    /// (no subscribers) is not an error — `broadcast::Sender::send`
    /// returning `Err` just means nobody is listening right now.
    pub async fn publish(&self, event: Event) -> Result<(), EventSinkError> {
        self.sink.append_event(&event).await?;
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Subscribe to the live tail. A subscriber that falls behind the
    /// channel capacity receives `RecvError::Lagged` on its next `recv`
    /// and should treat that as a signal to resync via the REST surface
    /// rather than an error to propagate, per spec.md §4.8 and §9.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aq_core::EventKind;
    use parking_lot::Mutex;

    struct RecordingSink {
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn append_event(&self, event: &Event) -> Result<(), EventSinkError> {
            self.events.lock().push(event.clone());
            Ok(())
        }
    }

    fn sample_event() -> Event {
        EventKind::TaskCreated.into_event("task", "tsk-1", 0)
    }

    #[tokio::test]
    async fn publish_writes_through_the_sink() {
        let sink = Arc::new(RecordingSink { events: Mutex::new(Vec::new()) });
        let bus = EventBus::new(sink.clone());
        bus.publish(sample_event()).await.unwrap();
        assert_eq!(sink.events.lock().len(), 1);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let sink = Arc::new(RecordingSink { events: Mutex::new(Vec::new()) });
        let bus = EventBus::new(sink);
        let mut receiver = bus.subscribe();
        bus.publish(sample_event()).await.unwrap();
        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type, "task.created");
    }

    #[tokio::test]
    async fn publish_succeeds_with_zero_subscribers() {
        let sink = Arc::new(RecordingSink { events: Mutex::new(Vec::new()) });
        let bus = EventBus::new(sink);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(sample_event()).await.unwrap();
    }

    #[tokio::test]
    async fn a_lagging_subscriber_observes_lagged_not_a_panic() {
        let sink = Arc::new(RecordingSink { events: Mutex::new(Vec::new()) });
        let bus = EventBus::with_capacity(sink, 2);
        let mut receiver = bus.subscribe();
        for _ in 0..5 {
            bus.publish(sample_event()).await.unwrap();
        }
        let result = receiver.recv().await;
        assert!(matches!(result, Err(broadcast::error::RecvError::Lagged(_))));
    }
}
