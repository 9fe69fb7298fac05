//! Contracts for the host's record and media storage.
//!
//! The executor reads and writes records only through [`RecordStore`] and
//! stores audio only through [`MediaStore`]. Both are synchronous; the
//! executor calls them on the blocking thread pool.

use crate::error::StoreError;
use hypertts_types::RecordId;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Field name to field content for one record.
pub type RecordFields = BTreeMap<String, String>;

/// Read/write access to flashcard records.
pub trait RecordStore: Send + Sync {
    fn get_fields(&self, id: RecordId) -> Result<RecordFields, StoreError>;

    /// Overwrites a single existing field.
    fn write_field(&self, id: RecordId, field: &str, value: &str) -> Result<(), StoreError>;
}

/// Storage for synthesized audio files.
pub trait MediaStore: Send + Sync {
    /// Stores `audio` under `filename`. Storing the same name twice replaces
    /// the earlier file.
    fn store_audio(&self, filename: &str, audio: &[u8]) -> Result<(), StoreError>;
}

/// In-memory [`RecordStore`], used by tests and previews.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<RecordId, RecordFields>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: RecordId, fields: RecordFields) {
        self.lock().insert(id, fields);
    }

    /// A snapshot of one record.
    pub fn fields(&self, id: RecordId) -> Option<RecordFields> {
        self.lock().get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.lock().keys().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<RecordId, RecordFields>> {
        // A panic while holding the lock cannot leave a map half-updated.
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl RecordStore for MemoryRecordStore {
    fn get_fields(&self, id: RecordId) -> Result<RecordFields, StoreError> {
        self.fields(id).ok_or(StoreError::RecordNotFound(id))
    }

    fn write_field(&self, id: RecordId, field: &str, value: &str) -> Result<(), StoreError> {
        let mut records = self.lock();
        let record = records.get_mut(&id).ok_or(StoreError::RecordNotFound(id))?;
        let slot = record
            .get_mut(field)
            .ok_or_else(|| StoreError::FieldNotFound {
                record: id,
                field: field.to_string(),
            })?;
        *slot = value.to_string();
        Ok(())
    }
}

/// In-memory [`MediaStore`].
#[derive(Debug, Default)]
pub struct MemoryMediaStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filename: &str) -> Option<Vec<u8>> {
        self.lock().get(filename).cloned()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl MediaStore for MemoryMediaStore {
    fn store_audio(&self, filename: &str, audio: &[u8]) -> Result<(), StoreError> {
        self.lock().insert(filename.to_string(), audio.to_vec());
        Ok(())
    }
}
