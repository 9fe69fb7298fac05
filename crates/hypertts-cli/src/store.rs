//! File-backed record and media stores.
//!
//! Records live in a JSON array of `{"id": 1, "fields": {...}}` objects.
//! Field writes are kept in memory and the file is rewritten once every
//! `flush_every` writes, on [`JsonRecordStore::flush`], and on drop. Each
//! rewrite goes through a temporary sibling and a rename, so a crash never
//! leaves a truncated file behind.

use hypertts_batch::{MediaStore, RecordFields, RecordStore, StoreError};
use hypertts_types::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Number of field writes buffered before the record file is rewritten.
pub const DEFAULT_FLUSH_EVERY: usize = 50;

#[derive(Debug, Serialize, Deserialize)]
struct RecordEntry {
    id: RecordId,
    fields: RecordFields,
}

#[derive(Debug)]
struct RecordFile {
    records: BTreeMap<RecordId, RecordFields>,
    unsaved: usize,
}

/// [`RecordStore`] over a JSON file.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    flush_every: usize,
    file: Mutex<RecordFile>,
}

impl JsonRecordStore {
    /// Reads all records from `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read and
    /// `StoreError::Backend` if it is not a valid record list or repeats an id.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)?;
        let entries: Vec<RecordEntry> = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Backend(format!("invalid record file: {e}")))?;

        let mut records = BTreeMap::new();
        for entry in entries {
            if records.insert(entry.id, entry.fields).is_some() {
                return Err(StoreError::Backend(format!(
                    "duplicate record id {}",
                    entry.id
                )));
            }
        }

        tracing::debug!(path = %path.display(), count = records.len(), "loaded records");
        Ok(Self {
            path,
            flush_every: DEFAULT_FLUSH_EVERY,
            file: Mutex::new(RecordFile {
                records,
                unsaved: 0,
            }),
        })
    }

    /// Rewrites the file after every `count` field writes (at least 1).
    pub fn with_flush_every(mut self, count: usize) -> Self {
        self.flush_every = count.max(1);
        self
    }

    /// All record ids in ascending order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.lock().records.keys().copied().collect()
    }

    /// Field writes not yet on disk.
    pub fn unsaved(&self) -> usize {
        self.lock().unsaved
    }

    /// Writes buffered changes to disk. Does nothing when there are none.
    pub fn flush(&self) -> Result<(), StoreError> {
        let mut file = self.lock();
        if file.unsaved == 0 {
            return Ok(());
        }
        self.persist(&file.records)?;
        tracing::debug!(path = %self.path.display(), writes = file.unsaved, "record file saved");
        file.unsaved = 0;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, RecordFile> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, records: &BTreeMap<RecordId, RecordFields>) -> Result<(), StoreError> {
        let entries: Vec<RecordEntry> = records
            .iter()
            .map(|(id, fields)| RecordEntry {
                id: *id,
                fields: fields.clone(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RecordStore for JsonRecordStore {
    fn get_fields(&self, id: RecordId) -> Result<RecordFields, StoreError> {
        self.lock()
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::RecordNotFound(id))
    }

    fn write_field(&self, id: RecordId, field: &str, value: &str) -> Result<(), StoreError> {
        let mut file = self.lock();
        let slot = file
            .records
            .get_mut(&id)
            .ok_or(StoreError::RecordNotFound(id))?
            .get_mut(field)
            .ok_or_else(|| StoreError::FieldNotFound {
                record: id,
                field: field.to_string(),
            })?;
        let previous = std::mem::replace(slot, value.to_string());
        file.unsaved += 1;

        if file.unsaved < self.flush_every {
            return Ok(());
        }
        match self.persist(&file.records) {
            Ok(()) => {
                file.unsaved = 0;
                Ok(())
            }
            Err(e) => {
                // Only this write is rolled back; earlier ones stay buffered.
                if let Some(slot) = file.records.get_mut(&id).and_then(|r| r.get_mut(field)) {
                    *slot = previous;
                }
                file.unsaved -= 1;
                Err(e)
            }
        }
    }
}

impl Drop for JsonRecordStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::error!(path = %self.path.display(), error = %e, "failed to save record file");
        }
    }
}

/// [`MediaStore`] writing audio files into one directory.
#[derive(Debug, Clone)]
pub struct DirMediaStore {
    dir: PathBuf,
}

impl DirMediaStore {
    /// Creates the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MediaStore for DirMediaStore {
    fn store_audio(&self, filename: &str, audio: &[u8]) -> Result<(), StoreError> {
        let plain = Path::new(filename)
            .file_name()
            .is_some_and(|name| name == filename);
        if !plain {
            return Err(StoreError::Backend(format!(
                "refusing media filename with path components: {filename}"
            )));
        }
        std::fs::write(self.dir.join(filename), audio)?;
        tracing::debug!(file = filename, bytes = audio.len(), "stored audio");
        Ok(())
    }
}
