//! Execution history
//!
//! Single-request executions emit one [`HistoryEntry`] each. Recording is
//! fire-and-forget: sinks log their own failures and never return them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::models::{RequestKind, RequestResponse, SentRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub request_name: String,
    pub request_kind: RequestKind,
    pub environment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    pub sent_request: SentRequest,
    pub response: RequestResponse,
}

pub trait HistorySink: Send + Sync {
    fn record(&self, entry: HistoryEntry);
}

/// Discards every entry
pub struct NoHistory;

impl HistorySink for NoHistory {
    fn record(&self, _entry: HistoryEntry) {}
}

/// Keeps entries in memory, oldest first
#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl HistorySink for MemoryHistory {
    fn record(&self, entry: HistoryEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// Appends one JSON object per line to a file
pub struct JsonlHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &HistoryEntry) -> std::io::Result<()> {
        let line = serde_json::to_string(entry)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl HistorySink for JsonlHistory {
    fn record(&self, entry: HistoryEntry) {
        if let Err(e) = self.append(&entry) {
            warn!(path = %self.path.display(), error = %e, "failed to write history entry");
        }
    }
}
