use crate::common::{EventEnvelope, EventStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps journal streams in memory; used when no journal directory is configured.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    streams: RwLock<HashMap<String, Vec<EventEnvelope>>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryJournal {
    async fn append_events(&self, stream_id: &str, events: Vec<EventEnvelope>) -> Result<(), String> {
        let mut streams = self.streams.write().await;
        streams.entry(stream_id.to_string()).or_default().extend(events);
        Ok(())
    }

    async fn load_events(&self, stream_id: &str) -> Result<Vec<EventEnvelope>, String> {
        let streams = self.streams.read().await;
        Ok(streams.get(stream_id).cloned().unwrap_or_default())
    }

    async fn load_events_by_type(
        &self,
        event_type: &str,
        from_timestamp: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventEnvelope>, String> {
        let streams = self.streams.read().await;
        let mut found: Vec<EventEnvelope> = streams
            .values()
            .flatten()
            .filter(|e| e.event_type == event_type)
            .filter(|e| from_timestamp.map_or(true, |ts| e.occurred_at >= ts))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));
        Ok(found)
    }
}
