// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`EventSink`] for tests that exercise an [`EventBus`] without
//! wiring up a real Store.

use crate::{EventBus, EventSink, EventSinkError};
use aq_core::Event;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
pub struct FakeEventSink {
    events: Mutex<Vec<Event>>,
}

impl FakeEventSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn recorded(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventSink for FakeEventSink {
    async fn append_event(&self, event: &Event) -> Result<(), EventSinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Build an `EventBus` backed by a fresh `FakeEventSink`, returning both so
/// callers can assert on durable writes independently of subscriptions.
pub fn bus_with_fake_sink() -> (EventBus, Arc<FakeEventSink>) {
    let sink = FakeEventSink::new();
    (EventBus::new(sink.clone()), sink)
}
