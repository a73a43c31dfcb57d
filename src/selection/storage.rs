// Durable slot storage
//
// A slot is a named blob of text (the bucket list is one JSON array in one
// slot). Reads and writes are synchronous: a mutation of the selection store
// is not finished until its slot write returned.
//
// FileStorage keeps one `<slot>.json` file per slot in the data directory.
// Writes go to a uniquely named temp file in the same directory and are then
// renamed over the target, so a reader never observes a half-written blob.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Errors from durable storage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage I/O error on slot '{slot}': {reason}")]
    Io { slot: String, reason: String },
    #[error("invalid storage slot name '{0}'")]
    InvalidSlot(String),
    #[error("failed to serialize slot '{slot}': {reason}")]
    Serialize { slot: String, reason: String },
}

/// Named-slot durable storage
pub trait SlotStorage {
    /// Read a slot. `Ok(None)` means the slot was never written.
    fn read(&self, slot: &str) -> Result<Option<String>, StorageError>;

    /// Replace a slot's contents
    fn write(&mut self, slot: &str, contents: &str) -> Result<(), StorageError>;

    /// Delete a slot. Deleting an absent slot is not an error.
    fn clear(&mut self, slot: &str) -> Result<(), StorageError>;
}

impl<T: SlotStorage + ?Sized> SlotStorage for Box<T> {
    fn read(&self, slot: &str) -> Result<Option<String>, StorageError> {
        (**self).read(slot)
    }

    fn write(&mut self, slot: &str, contents: &str) -> Result<(), StorageError> {
        (**self).write(slot, contents)
    }

    fn clear(&mut self, slot: &str) -> Result<(), StorageError> {
        (**self).clear(slot)
    }
}

/// Slot names become file names, so keep them to a safe alphabet
fn validate_slot(slot: &str) -> Result<(), StorageError> {
    let valid = !slot.is_empty()
        && slot
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidSlot(slot.to_string()))
    }
}

fn io_error(slot: &str, e: std::io::Error) -> StorageError {
    StorageError::Io {
        slot: slot.to_string(),
        reason: e.to_string(),
    }
}

// ============================================================================
// File-backed storage
// ============================================================================

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::Io {
            slot: String::new(),
            reason: format!("failed to create data directory {}: {}", dir.display(), e),
        })?;
        log::debug!("Slot storage at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing a slot
    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slot))
    }
}

impl SlotStorage for FileStorage {
    fn read(&self, slot: &str) -> Result<Option<String>, StorageError> {
        validate_slot(slot)?;
        match fs::read_to_string(self.slot_path(slot)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(slot, e)),
        }
    }

    fn write(&mut self, slot: &str, contents: &str) -> Result<(), StorageError> {
        validate_slot(slot)?;
        let target = self.slot_path(slot);
        let temp = self.dir.join(format!(".{}.{}.tmp", slot, Uuid::new_v4()));

        if let Err(e) = fs::write(&temp, contents) {
            let _ = fs::remove_file(&temp);
            return Err(io_error(slot, e));
        }
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(io_error(slot, e));
        }

        log::trace!("Wrote slot '{}' ({} bytes)", slot, contents.len());
        Ok(())
    }

    fn clear(&mut self, slot: &str) -> Result<(), StorageError> {
        validate_slot(slot)?;
        match fs::remove_file(self.slot_path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(slot, e)),
        }
    }
}

// ============================================================================
// In-memory storage (ephemeral sessions and tests)
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one slot
    pub fn with_slot(slot: &str, contents: &str) -> Self {
        let mut storage = Self::new();
        storage.slots.insert(slot.to_string(), contents.to_string());
        storage
    }

    /// Make every subsequent write fail (simulates a full or read-only disk)
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl SlotStorage for MemoryStorage {
    fn read(&self, slot: &str) -> Result<Option<String>, StorageError> {
        validate_slot(slot)?;
        Ok(self.slots.get(slot).cloned())
    }

    fn write(&mut self, slot: &str, contents: &str) -> Result<(), StorageError> {
        validate_slot(slot)?;
        if self.fail_writes {
            return Err(StorageError::Io {
                slot: slot.to_string(),
                reason: "write rejected".to_string(),
            });
        }
        self.slots.insert(slot.to_string(), contents.to_string());
        Ok(())
    }

    fn clear(&mut self, slot: &str) -> Result<(), StorageError> {
        validate_slot(slot)?;
        self.slots.remove(slot);
        Ok(())
    }
}
