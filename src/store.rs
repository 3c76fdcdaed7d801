//! Persistence of the cumulative record set.
//!
//! The store is a single JSON document: an array of [`Record`]s, newest run
//! first, pretty-printed UTF-8.
//!
//! ```text
//! scraped_articles.json
//! [
//!   { "id": "sed_04_Iun", "source": "gov", ... },
//!   { "id": "ms_0_2025-06-04", "source": "ms", ... }
//! ]
//! ```
//!
//! The coordinator is the only writer. Writes go to a sibling temporary file
//! that is then renamed over the document, so a failed write leaves the
//! previous content intact.

use crate::errors::{IngestError, Result};
use crate::models::Record;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};

/// Read and replace the whole persisted record set.
pub trait RecordStore {
    /// Every persisted record, in store order.
    async fn load(&self) -> Result<Vec<Record>>;

    /// Replace the persisted set with `records`.
    async fn save(&self, records: &[Record]) -> Result<()>;
}

/// Store backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RecordStore for JsonStore {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Vec<Record>> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store yet; starting fresh");
                return Ok(Vec::new());
            }
            Err(e) => return Err(IngestError::Store(format!("cannot read store: {e}"))),
        };
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<Record> = serde_json::from_str(&json)
            .map_err(|e| IngestError::Store(format!("corrupt store: {e}")))?;
        info!(count = records.len(), "Loaded stored records");
        Ok(records)
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = records.len()))]
    async fn save(&self, records: &[Record]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.temp_path();
        if let Err(e) = fs::write(&tmp, json).await {
            error!(tmp = %tmp.display(), error = %e, "Failed writing temporary store file");
            return Err(IngestError::Store(format!("cannot write {}: {e}", tmp.display())));
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            warn!(error = %e, "Rename failed; removing temporary file");
            let _ = fs::remove_file(&tmp).await;
            return Err(IngestError::Store(format!("cannot replace store: {e}")));
        }
        info!("Saved records");
        Ok(())
    }
}

/// In-memory store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<Vec<Record>>,
    pub saves: RefCell<usize>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: RefCell::new(records),
            ..Default::default()
        }
    }

    #[cfg(test)]
    /// Make every `load` fail, as an unreadable store would.
    pub fn with_failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    #[cfg(test)]
    /// Make every `save` fail, leaving the contents untouched.
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.records.borrow().clone()
    }
}

impl RecordStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Record>> {
        if self.fail_reads {
            return Err(IngestError::Store("reads disabled".into()));
        }
        Ok(self.snapshot())
    }

    async fn save(&self, records: &[Record]) -> Result<()> {
        if self.fail_writes {
            return Err(IngestError::Store("writes disabled".into()));
        }
        *self.records.borrow_mut() = records.to_vec();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
