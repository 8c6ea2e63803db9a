// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::row::event_from_row;
use crate::{Store, StoreError};
use aq_bus::{EventSink, EventSinkError};
use aq_core::Event;
use async_trait::async_trait;
use sqlx::Row;

impl Store {
    /// Insert an event and return its assigned id (spec.md §4.1
    /// `append_event(evt) -> id`).
    pub async fn append_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO events (id, event_type, entity_type, entity_id, payload, created_at_ms)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.as_str())
        .bind(&event.event_type)
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(serde_json::to_string(&event.payload).unwrap_or_else(|_| "null".into()))
        .bind(event.created_at_ms)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn list_events_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM events WHERE entity_type = ? AND entity_id = ? ORDER BY created_at_ms ASC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(event_from_row).collect()
    }

    pub async fn list_recent_events(&self, limit: i64) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query("SELECT * FROM events ORDER BY created_at_ms DESC LIMIT ?")
            .bind(limit)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(event_from_row).collect()
    }
}

/// Lets `Store` back an `aq-bus::EventBus` directly: every bus publish is
/// durably appended here before fan-out, per spec.md §4.8.
#[async_trait]
impl EventSink for Store {
    async fn append_event(&self, event: &Event) -> Result<(), EventSinkError> {
        Store::append_event(self, event).await.map_err(|e| EventSinkError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aq_core::EventKind;

    #[tokio::test]
    async fn append_and_list_round_trips() {
        let store = Store::open_in_memory().await.unwrap();
        let event = EventKind::TaskCreated.into_event("task", "tsk-1", 5);
        store.append_event(&event).await.unwrap();

        let events = store.list_events_for_entity("task", "tsk-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "task.created");
    }

    #[tokio::test]
    async fn event_sink_impl_delegates_to_append_event() {
        let store = Store::open_in_memory().await.unwrap();
        let event = EventKind::SessionStarted.into_event("session", "ses-1", 0);
        EventSink::append_event(&store, &event).await.unwrap();
        assert_eq!(store.list_recent_events(10).await.unwrap().len(), 1);
    }
}
