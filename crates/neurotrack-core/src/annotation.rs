//! User annotations tagged with a band-power snapshot
//!
//! The sink is an injected collaborator: whoever builds the monitor picks an
//! implementation and hands a reference to the code that records entries.

use crate::bands::BandPowers;
use crate::error::{TrackerError, TrackerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// One annotation: what the user wrote and the band powers at that moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub band_powers: BandPowers,
    pub description: String,
}

impl AnnotationEntry {
    pub fn new(band_powers: BandPowers, description: impl Into<String>) -> Self {
        AnnotationEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            band_powers,
            description: description.into(),
        }
    }
}

/// Append-only destination for annotations
pub trait AnnotationSink: Send + Sync {
    fn append(&self, entry: AnnotationEntry) -> TrackerResult<()>;
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct InMemoryAnnotationLog {
    entries: Mutex<Vec<AnnotationEntry>>,
}

impl InMemoryAnnotationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry appended so far, oldest first
    pub fn entries(&self) -> Vec<AnnotationEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnnotationSink for InMemoryAnnotationLog {
    fn append(&self, entry: AnnotationEntry) -> TrackerResult<()> {
        self.entries
            .lock()
            .map_err(|_| TrackerError::Io { reason: "annotation log lock poisoned".to_string() })?
            .push(entry);
        Ok(())
    }
}

/// Appends one JSON object per line to a file
pub struct JsonLinesAnnotationLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesAnnotationLog {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(JsonLinesAnnotationLog {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AnnotationSink for JsonLinesAnnotationLog {
    fn append(&self, entry: AnnotationEntry) -> TrackerResult<()> {
        let line = serde_json::to_string(&entry)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TrackerError::Io { reason: "annotation file lock poisoned".to_string() })?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        tracing::debug!(path = %self.path.display(), description = %entry.description, "annotation written");
        Ok(())
    }
}
