// =============================================================================
// Selection Store - The Persisted Bucket List
// =============================================================================
//
// The store is the single authority on which countries are on the bucket list.
// UI layers read from it (or subscribe to its events); they never keep their
// own copy.
//
// Invariants:
// - Entries are keyed by CanonicalKey; at most one snapshot per key.
// - Every mutation writes the FULL set to the storage slot before it returns.
//   If the write fails, the in-memory mutation is rolled back, so memory and
//   disk never disagree.
// - Subscribers are notified only after the write completed.
//
// Re-adding a key that is already present never adds a second entry. If the
// new snapshot differs (fresher detail data, different display name) it
// replaces the stored one: last add wins. An identical snapshot is a no-op.
//
// Restore never fails: a missing slot is an empty list, an unreadable or
// unparsable slot is an empty list plus one diagnostic.

pub mod storage;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::catalog::Entity;
use crate::identity::CanonicalKey;

pub use storage::{FileStorage, MemoryStorage, SlotStorage, StorageError};

/// Storage slot the bucket list lives in
pub const BUCKET_LIST_SLOT: &str = "worldwander_bucketlist";

/// O(1) membership test used by the map and the catalog browser
pub trait SelectionLookup {
    fn contains(&self, key: &CanonicalKey) -> bool;
}

impl SelectionLookup for HashSet<CanonicalKey> {
    fn contains(&self, key: &CanonicalKey) -> bool {
        HashSet::contains(self, key)
    }
}

/// Errors from selection mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("bucket list was not saved: {0}")]
    Storage(#[from] StorageError),
}

/// What `add` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddOutcome {
    /// New key inserted
    Inserted,
    /// Key was present; its snapshot was replaced
    Refreshed,
    /// Key was present with an identical snapshot; nothing happened
    Unchanged,
}

/// What `toggle` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Toggled {
    Added,
    Removed,
}

/// Mutation notifications delivered to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    Added(CanonicalKey),
    Removed(CanonicalKey),
    Refreshed(CanonicalKey),
}

impl SelectionEvent {
    pub fn key(&self) -> CanonicalKey {
        match self {
            SelectionEvent::Added(key) | SelectionEvent::Removed(key) | SelectionEvent::Refreshed(key) => *key,
        }
    }
}

/// Problems found while restoring the persisted bucket list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreDiagnostic {
    /// The slot could not be read or parsed; the list starts empty
    StorageCorrupt { reason: String },
    /// Some snapshots were unusable and were dropped
    SkippedEntries { restored: usize, skipped: usize },
}

impl std::fmt::Display for RestoreDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestoreDiagnostic::StorageCorrupt { reason } => {
                write!(f, "Saved bucket list was unreadable and has been reset: {}", reason)
            }
            RestoreDiagnostic::SkippedEntries { restored, skipped } => write!(
                f,
                "Restored {} bucket list entries, skipped {} unreadable entries",
                restored, skipped
            ),
        }
    }
}

/// The persisted, deduplicated bucket list
pub struct SelectionStore<S: SlotStorage> {
    entries: HashMap<CanonicalKey, Entity>,
    storage: S,
    slot: String,
    subscribers: Vec<mpsc::UnboundedSender<SelectionEvent>>,
    diagnostic: Option<RestoreDiagnostic>,
}

impl<S: SlotStorage> SelectionStore<S> {
    /// Restore the bucket list from the default slot
    pub fn restore(storage: S) -> Self {
        Self::restore_slot(storage, BUCKET_LIST_SLOT)
    }

    /// Restore the bucket list from a named slot
    pub fn restore_slot(storage: S, slot: impl Into<String>) -> Self {
        let slot = slot.into();
        let (entries, diagnostic) = match storage.read(&slot) {
            Ok(None) => {
                log::debug!("No saved bucket list in slot '{}'", slot);
                (HashMap::new(), None)
            }
            Ok(Some(blob)) => parse_snapshots(&blob),
            Err(e) => (
                HashMap::new(),
                Some(RestoreDiagnostic::StorageCorrupt { reason: e.to_string() }),
            ),
        };

        match &diagnostic {
            Some(d) => log::warn!("{}", d),
            None => log::info!("Restored bucket list: {} countries", entries.len()),
        }

        Self {
            entries,
            storage,
            slot,
            subscribers: Vec::new(),
            diagnostic,
        }
    }

    /// The restore diagnostic, if any. Returns it once; later calls get `None`.
    pub fn take_diagnostic(&mut self) -> Option<RestoreDiagnostic> {
        self.diagnostic.take()
    }

    /// Add a country (or refresh its snapshot if already present)
    pub fn add(&mut self, entity: Entity) -> Result<AddOutcome, StoreError> {
        let key = entity.code;
        if self.entries.get(&key) == Some(&entity) {
            return Ok(AddOutcome::Unchanged);
        }

        let previous = self.entries.insert(key, entity);
        if let Err(e) = self.persist() {
            match previous {
                Some(p) => {
                    self.entries.insert(key, p);
                }
                None => {
                    self.entries.remove(&key);
                }
            }
            log::error!("Failed to save bucket list after adding {}: {}", key, e);
            return Err(e.into());
        }

        if previous.is_some() {
            log::debug!("Refreshed bucket list snapshot for {}", key);
            self.notify(SelectionEvent::Refreshed(key));
            Ok(AddOutcome::Refreshed)
        } else {
            log::info!("Added {} to bucket list", key);
            self.notify(SelectionEvent::Added(key));
            Ok(AddOutcome::Inserted)
        }
    }

    /// Remove a country. Returns `false` if it was not on the list.
    pub fn remove(&mut self, key: &CanonicalKey) -> Result<bool, StoreError> {
        let Some(previous) = self.entries.remove(key) else {
            return Ok(false);
        };

        if let Err(e) = self.persist() {
            self.entries.insert(*key, previous);
            log::error!("Failed to save bucket list after removing {}: {}", key, e);
            return Err(e.into());
        }

        log::info!("Removed {} from bucket list", key);
        self.notify(SelectionEvent::Removed(*key));
        Ok(true)
    }

    /// Detail-page action: remove if present, add otherwise
    pub fn toggle(&mut self, entity: Entity) -> Result<Toggled, StoreError> {
        if self.contains(&entity.code) {
            self.remove(&entity.code)?;
            Ok(Toggled::Removed)
        } else {
            self.add(entity)?;
            Ok(Toggled::Added)
        }
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&Entity> {
        self.entries.get(key)
    }

    /// Snapshot of the list, ordered by display name then code
    pub fn list(&self) -> Vec<Entity> {
        let mut list: Vec<Entity> = self.entries.values().cloned().collect();
        list.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.code.cmp(&b.code)));
        list
    }

    /// Keys on the list in code order
    pub fn keys(&self) -> Vec<CanonicalKey> {
        let mut keys: Vec<CanonicalKey> = self.entries.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of selected entities matching a predicate
    pub fn count_where(&self, pred: impl Fn(&Entity) -> bool) -> usize {
        self.entries.values().filter(|e| pred(e)).count()
    }

    /// Receive an event after every persisted mutation
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SelectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Serialize the full set (code order, so the blob is stable) and write it
    fn persist(&mut self) -> Result<(), StorageError> {
        let mut snapshots: Vec<&Entity> = self.entries.values().collect();
        snapshots.sort_by_key(|e| e.code);

        let blob = serde_json::to_string(&snapshots).map_err(|e| StorageError::Serialize {
            slot: self.slot.clone(),
            reason: e.to_string(),
        })?;
        self.storage.write(&self.slot, &blob)
    }

    fn notify(&mut self, event: SelectionEvent) {
        // Drop subscribers whose receiver went away
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

impl<S: SlotStorage> SelectionLookup for SelectionStore<S> {
    fn contains(&self, key: &CanonicalKey) -> bool {
        self.entries.contains_key(key)
    }
}

/// Parse a persisted blob; bad snapshots are skipped, a bad blob yields nothing
fn parse_snapshots(blob: &str) -> (HashMap<CanonicalKey, Entity>, Option<RestoreDiagnostic>) {
    let values: Vec<serde_json::Value> = match serde_json::from_str(blob) {
        Ok(values) => values,
        Err(e) => {
            return (
                HashMap::new(),
                Some(RestoreDiagnostic::StorageCorrupt { reason: e.to_string() }),
            )
        }
    };

    let mut entries = HashMap::with_capacity(values.len());
    let mut skipped = 0;
    for value in values {
        match serde_json::from_value::<Entity>(value) {
            Ok(entity) => {
                // Later duplicates win
                entries.insert(entity.code, entity);
            }
            Err(e) => {
                log::warn!("Skipping unreadable bucket list entry: {}", e);
                skipped += 1;
            }
        }
    }

    let diagnostic = (skipped > 0).then(|| RestoreDiagnostic::SkippedEntries {
        restored: entries.len(),
        skipped,
    });
    (entries, diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Coordinates;
    use crate::identity::normalize;

    fn key(code: &str) -> CanonicalKey {
        normalize(code).unwrap()
    }

    fn country(code: &str, name: &str) -> Entity {
        let mut e = Entity::new(key(code), name);
        e.region = "Europe".to_string();
        e.population = 1_000_000;
        e.flag_url = format!("https://flagcdn.com/w320/{}.png", code.to_lowercase());
        e
    }

    fn empty_store() -> SelectionStore<MemoryStorage> {
        SelectionStore::restore(MemoryStorage::new())
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut store = empty_store();
        let france = country("FRA", "France");

        assert_eq!(store.add(france.clone()).unwrap(), AddOutcome::Inserted);
        let once = store.list();
        let blob_once = store.storage().read(BUCKET_LIST_SLOT).unwrap();

        assert_eq!(store.add(france).unwrap(), AddOutcome::Unchanged);
        assert_eq!(store.list(), once);
        assert_eq!(store.storage().read(BUCKET_LIST_SLOT).unwrap(), blob_once);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_then_remove_restores_previous_set() {
        let mut store = empty_store();
        store.add(country("DEU", "Germany")).unwrap();
        let before = store.list();

        let france = country("FRA", "France");
        store.add(france.clone()).unwrap();
        assert!(store.remove(&france.code).unwrap());

        assert_eq!(store.list(), before);
        assert!(!store.contains(&france.code));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut store = empty_store();
        assert!(!store.remove(&key("FRA")).unwrap());
        // Nothing was written
        assert_eq!(store.storage().read(BUCKET_LIST_SLOT).unwrap(), None);
    }

    #[test]
    fn test_same_code_different_names_is_one_entry() {
        let mut store = empty_store();
        store.add(country("CIV", "Ivory Coast")).unwrap();
        // Alpha-2 input normalizes to the same key
        let mut renamed = country("CIV", "Côte d'Ivoire");
        renamed.code = key("ci");

        assert_eq!(store.add(renamed).unwrap(), AddOutcome::Refreshed);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("CIV")).unwrap().display_name, "Côte d'Ivoire");
    }

    #[test]
    fn test_persistence_round_trip() {
        let mut store = empty_store();
        let mut japan = country("JPN", "Japan");
        japan.capital = Some("Tokyo".to_string());
        japan.languages = vec!["Japanese".to_string()];
        japan.currencies = vec!["Japanese yen".to_string()];
        japan.coordinates = Some(Coordinates::new(36.0, 138.0));
        store.add(japan).unwrap();
        store.add(country("FRA", "France")).unwrap();
        let original = store.list();

        let mut restored = SelectionStore::restore(store.into_storage());
        assert_eq!(restored.list(), original);
        assert_eq!(restored.take_diagnostic(), None);
    }

    #[test]
    fn test_malformed_storage_restores_empty() {
        let storage = MemoryStorage::with_slot(BUCKET_LIST_SLOT, "not-json");
        let mut store = SelectionStore::restore(storage);

        assert!(store.is_empty());
        assert!(matches!(
            store.take_diagnostic(),
            Some(RestoreDiagnostic::StorageCorrupt { .. })
        ));
        // Surfaced once
        assert_eq!(store.take_diagnostic(), None);

        // The store is fully usable afterwards
        store.add(country("FRA", "France")).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_quoted_string_blob_is_corrupt() {
        let storage = MemoryStorage::with_slot(BUCKET_LIST_SLOT, "\"not-json\"");
        let mut store = SelectionStore::restore(storage);
        assert!(store.is_empty());
        assert!(store.take_diagnostic().is_some());
    }

    #[test]
    fn test_restore_skips_bad_entries() {
        let blob = r#"[
            {"code": "FRA", "displayName": "France"},
            {"code": "-99", "displayName": "Nowhere"},
            {"displayName": "No code"},
            {"alpha3Code": "DEU", "name": "Germany", "flag": "https://flagcdn.com/w320/de.png"}
        ]"#;
        let mut store = SelectionStore::restore(MemoryStorage::with_slot(BUCKET_LIST_SLOT, blob));

        assert_eq!(store.keys(), vec![key("DEU"), key("FRA")]);
        assert_eq!(
            store.take_diagnostic(),
            Some(RestoreDiagnostic::SkippedEntries { restored: 2, skipped: 2 })
        );
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut store = empty_store();
        store.add(country("FRA", "France")).unwrap();

        let mut storage = store.into_storage();
        storage.set_fail_writes(true);
        let mut store = SelectionStore::restore(storage);

        assert!(store.add(country("DEU", "Germany")).is_err());
        assert!(!store.contains(&key("DEU")));

        assert!(store.remove(&key("FRA")).is_err());
        assert!(store.contains(&key("FRA")));

        assert!(store.add(country("FRA", "République française")).is_err());
        assert_eq!(store.get(&key("FRA")).unwrap().display_name, "France");
    }

    #[test]
    fn test_toggle() {
        let mut store = empty_store();
        let italy = country("ITA", "Italy");
        assert_eq!(store.toggle(italy.clone()).unwrap(), Toggled::Added);
        assert!(store.contains(&italy.code));
        assert_eq!(store.toggle(italy.clone()).unwrap(), Toggled::Removed);
        assert!(!store.contains(&italy.code));
    }

    #[test]
    fn test_count_where() {
        let mut store = empty_store();
        store.add(country("FRA", "France")).unwrap();
        let mut japan = country("JPN", "Japan");
        japan.region = "Asia".to_string();
        store.add(japan).unwrap();
        assert_eq!(store.count_where(|e| e.region == "Europe"), 1);
        assert_eq!(store.count_where(|_| true), 2);
    }

    #[test]
    fn test_subscribers_see_persisted_mutations() {
        let mut store = empty_store();
        let mut events = store.subscribe();

        store.add(country("FRA", "France")).unwrap();
        store.add(country("FRA", "France")).unwrap();
        store.add(country("FRA", "French Republic")).unwrap();
        store.remove(&key("FRA")).unwrap();

        assert_eq!(events.try_recv().unwrap(), SelectionEvent::Added(key("FRA")));
        assert_eq!(events.try_recv().unwrap(), SelectionEvent::Refreshed(key("FRA")));
        assert_eq!(events.try_recv().unwrap(), SelectionEvent::Removed(key("FRA")));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut store = empty_store();
        drop(store.subscribe());
        store.add(country("FRA", "France")).unwrap();
        assert!(store.subscribers.is_empty());
    }

    #[test]
    fn test_persisted_blob_is_a_json_array() {
        let mut store = empty_store();
        store.add(country("FRA", "France")).unwrap();
        let blob = store.storage().read(BUCKET_LIST_SLOT).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["code"], "FRA");
    }

    #[test]
    fn test_file_backed_store_survives_restart() {
        let dir = std::env::temp_dir().join(format!("worldwander-test-{}", uuid::Uuid::new_v4()));
        {
            let mut store = SelectionStore::restore(FileStorage::open(&dir).unwrap());
            store.add(country("PER", "Peru")).unwrap();
        }
        let store = SelectionStore::restore(FileStorage::open(&dir).unwrap());
        assert!(store.contains(&key("PER")));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
