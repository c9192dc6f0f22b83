use crate::common::{EventEnvelope, EventStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Append-only run journal in JSON Lines format, one file per stream.
///
/// Stream ids are destination names, so they're mapped to safe file names.
pub struct FileJournal {
    base_path: PathBuf,
}

impl FileJournal {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn stream_path(&self, stream_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", file_stem(stream_id)))
    }

    async fn ensure_base_dir(&self) -> Result<(), String> {
        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("Failed to create journal directory: {}", e))
    }
}

/// "Coop 3.0 Mirandola" -> "coop_3_0_mirandola"
fn file_stem(stream_id: &str) -> String {
    stream_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

async fn read_envelopes(path: &Path) -> Result<Vec<EventEnvelope>, String> {
    let file = File::open(path)
        .await
        .map_err(|e| format!("Failed to open journal file {}: {}", path.display(), e))?;
    let mut lines = BufReader::new(file).lines();
    let mut events = Vec::new();
    let mut line_number = 0u64;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("Failed to read line: {}", e))?
    {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let event: EventEnvelope = serde_json::from_str(&line).map_err(|e| {
            format!(
                "Failed to deserialize event at {}:{}: {}",
                path.display(),
                line_number,
                e
            )
        })?;
        events.push(event);
    }
    Ok(events)
}

#[async_trait]
impl EventStore for FileJournal {
    async fn append_events(&self, stream_id: &str, events: Vec<EventEnvelope>) -> Result<(), String> {
        self.ensure_base_dir().await?;
        let path = self.stream_path(stream_id);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| format!("Failed to open journal file {}: {}", path.display(), e))?;

        for event in events {
            let mut line = serde_json::to_string(&event)
                .map_err(|e| format!("Failed to serialize event: {}", e))?;
            line.push('\n');
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| format!("Failed to write event: {}", e))?;
        }

        file.flush()
            .await
            .map_err(|e| format!("Failed to flush journal file: {}", e))
    }

    async fn load_events(&self, stream_id: &str) -> Result<Vec<EventEnvelope>, String> {
        let path = self.stream_path(stream_id);
        if !path.exists() {
            return Ok(vec![]);
        }
        // Sanitized names can collide, so a file may hold more than one stream
        let mut events = read_envelopes(&path).await?;
        events.retain(|e| e.stream_id == stream_id);
        Ok(events)
    }

    async fn load_events_by_type(
        &self,
        event_type: &str,
        from_timestamp: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventEnvelope>, String> {
        self.ensure_base_dir().await?;

        let mut found = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.base_path)
            .await
            .map_err(|e| format!("Failed to read journal directory: {}", e))?;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| format!("Failed to read directory entry: {}", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
                continue;
            }
            for event in read_envelopes(&path).await? {
                if event.event_type != event_type {
                    continue;
                }
                if from_timestamp.map_or(true, |ts| event.occurred_at >= ts) {
                    found.push(event);
                }
            }
        }

        found.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));
        Ok(found)
    }
}
