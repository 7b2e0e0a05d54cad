//! Persistence adapters.
//!
//! Two implementations of [`PersistencePort`]: an in-memory store for tests
//! and ephemeral sessions, and a JSON-file store that writes one file per
//! slot under a directory. Both round-trip the full persisted shape - typed
//! flags, ordered inventory, progress, settings, metadata.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use taleweave_domain::SaveSlotId;

use crate::application::ports::{PersistenceError, PersistencePort, SaveGame, SaveSlot};

// =============================================================================
// In-memory store
// =============================================================================

/// Keeps saves in a map. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemorySaveStore {
    slots: RwLock<HashMap<SaveSlotId, SaveGame>>,
}

impl InMemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistencePort for InMemorySaveStore {
    async fn save(&self, save: &SaveGame) -> Result<(), PersistenceError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| PersistenceError::Backend("save store lock poisoned".to_string()))?;
        slots.insert(save.slot_id, save.clone());
        Ok(())
    }

    async fn load(&self, slot: SaveSlotId) -> Result<SaveGame, PersistenceError> {
        let slots = self
            .slots
            .read()
            .map_err(|_| PersistenceError::Backend("save store lock poisoned".to_string()))?;
        slots
            .get(&slot)
            .cloned()
            .ok_or(PersistenceError::SlotNotFound(slot))
    }

    async fn list_slots(&self) -> Result<Vec<SaveSlot>, PersistenceError> {
        let slots = self
            .slots
            .read()
            .map_err(|_| PersistenceError::Backend("save store lock poisoned".to_string()))?;
        let mut listing: Vec<SaveSlot> = slots.values().map(SaveSlot::describing).collect();
        listing.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(listing)
    }

    async fn delete(&self, slot: SaveSlotId) -> Result<(), PersistenceError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| PersistenceError::Backend("save store lock poisoned".to_string()))?;
        slots
            .remove(&slot)
            .map(|_| ())
            .ok_or(PersistenceError::SlotNotFound(slot))
    }
}

// =============================================================================
// JSON file store
// =============================================================================

/// Writes each slot as `<uuid>.json` under a directory.
#[derive(Debug)]
pub struct JsonFileSaveStore {
    directory: PathBuf,
}

impl JsonFileSaveStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn slot_path(&self, slot: SaveSlotId) -> PathBuf {
        self.directory.join(format!("{}.json", slot))
    }
}

#[async_trait]
impl PersistencePort for JsonFileSaveStore {
    async fn save(&self, save: &SaveGame) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        let payload = serde_json::to_vec_pretty(save)
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        let path = self.slot_path(save.slot_id);
        tokio::fs::write(&path, payload)
            .await
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        debug!(path = %path.display(), "Wrote save file");
        Ok(())
    }

    async fn load(&self, slot: SaveSlotId) -> Result<SaveGame, PersistenceError> {
        let path = self.slot_path(slot);
        let payload = match tokio::fs::read(&path).await {
            Ok(payload) => payload,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::SlotNotFound(slot));
            }
            Err(e) => return Err(PersistenceError::Backend(e.to_string())),
        };
        serde_json::from_slice(&payload).map_err(|e| PersistenceError::Corrupt(e.to_string()))
    }

    async fn list_slots(&self) -> Result<Vec<SaveSlot>, PersistenceError> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::Backend(e.to_string())),
        };

        let mut listing = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PersistenceError::Backend(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let payload = tokio::fs::read(&path)
                .await
                .map_err(|e| PersistenceError::Backend(e.to_string()))?;
            match serde_json::from_slice::<SaveGame>(&payload) {
                Ok(save) => listing.push(SaveSlot::describing(&save)),
                // A corrupt file hides one slot from the listing; it does
                // not break enumeration of the others.
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable save"),
            }
        }
        listing.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(listing)
    }

    async fn delete(&self, slot: SaveSlotId) -> Result<(), PersistenceError> {
        let path = self.slot_path(slot);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PersistenceError::SlotNotFound(slot))
            }
            Err(e) => Err(PersistenceError::Backend(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use taleweave_domain::{GameSettings, GameState};

    fn sample_save() -> SaveGame {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut state =
            GameState::new("riverhollow".into(), "gate".into(), GameSettings::default(), at);
        state.flags.set("met_wizard", true).expect("set");
        state.flags.set("debt", 12.5).expect("set");
        state.relationships.adjust(&"elder_mira".into(), 30);
        state.progress.record_visit("intro".into());
        state.progress.record_visit("gate".into());
        state.progress.add_playtime(345);
        SaveGame {
            slot_id: SaveSlotId::new(),
            name: Some("at the gate".to_string()),
            saved_at: at,
            state,
        }
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = InMemorySaveStore::new();
        let save = sample_save();
        store.save(&save).await.expect("save");

        let loaded = store.load(save.slot_id).await.expect("load");
        assert_eq!(loaded, save);

        let slots = store.list_slots().await.expect("list");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].playtime_seconds, 345);
    }

    #[tokio::test]
    async fn memory_store_missing_slot() {
        let store = InMemorySaveStore::new();
        let result = store.load(SaveSlotId::new()).await;
        assert!(matches!(result, Err(PersistenceError::SlotNotFound(_))));
    }

    #[tokio::test]
    async fn file_store_round_trips_full_shape() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileSaveStore::new(dir.path());
        let save = sample_save();

        store.save(&save).await.expect("save");
        let loaded = store.load(save.slot_id).await.expect("load");

        // The full persisted shape survives: typed flags, ordered inventory,
        // progress, settings, metadata.
        assert_eq!(loaded, save);

        let slots = store.list_slots().await.expect("list");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].scene_id, "gate".into());
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_payload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileSaveStore::new(dir.path());
        let slot = SaveSlotId::new();
        tokio::fs::create_dir_all(dir.path()).await.expect("mkdir");
        tokio::fs::write(dir.path().join(format!("{}.json", slot)), b"not json")
            .await
            .expect("write");

        let result = store.load(slot).await;
        assert!(matches!(result, Err(PersistenceError::Corrupt(_))));
    }

    #[tokio::test]
    async fn file_store_delete_removes_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileSaveStore::new(dir.path());
        let save = sample_save();
        store.save(&save).await.expect("save");

        store.delete(save.slot_id).await.expect("delete");
        assert!(matches!(
            store.load(save.slot_id).await,
            Err(PersistenceError::SlotNotFound(_))
        ));
    }
}
