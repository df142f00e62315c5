use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::Title;
use crate::storage::SlotStorage;

pub const FAVORITES_KEY: &str = "favorites";

/// Copy of a title's display fields taken when it was favorited. Later changes
/// on the provider side never reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

impl From<&Title> for FavoriteEntry {
    fn from(title: &Title) -> Self {
        Self {
            id: title.id,
            title: title.title.clone(),
            poster_path: title.poster_path.clone(),
            backdrop_path: title.backdrop_path.clone(),
            release_date: title.release_date.clone(),
            vote_average: title.vote_average,
            genre_ids: title.genre_ids.clone(),
        }
    }
}

/// Ordered set of favorites keyed by title id, mirrored in full to one durable
/// slot after every change.
///
/// Single writer: the store is owned by whoever constructed it and shared by
/// handle, never looked up globally.
pub struct FavoritesStore {
    storage: Arc<dyn SlotStorage>,
    entries: Vec<FavoriteEntry>,
}

impl FavoritesStore {
    /// Reads the slot. Missing, unreadable or malformed data all mean "no favorites".
    pub fn load(storage: Arc<dyn SlotStorage>) -> Self {
        let entries = match storage.get(FAVORITES_KEY) {
            Ok(Some(raw)) => parse_entries(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not read favorites, starting empty: {:#}", e);
                Vec::new()
            }
        };
        info!("Loaded {} favorites", entries.len());
        Self { storage, entries }
    }

    /// Appends a snapshot of `title` unless its id is already present.
    /// Returns whether anything changed.
    pub fn add(&mut self, title: &Title) -> bool {
        if self.is_favorite(title.id) {
            return false;
        }
        self.entries.push(FavoriteEntry::from(title));
        debug!(id = title.id, title = %title.title, "favorite added");
        self.persist();
        true
    }

    pub fn remove(&mut self, id: i32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return false;
        }
        debug!(id, "favorite removed");
        self.persist();
        true
    }

    pub fn is_favorite(&self, id: i32) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn list(&self) -> &[FavoriteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // A failed write leaves the in-memory list authoritative; the next
    // successful mutation rewrites the full snapshot anyway.
    fn persist(&self) {
        let serialized = match serde_json::to_string(&self.entries) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize favorites: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(FAVORITES_KEY, &serialized) {
            warn!("Failed to persist favorites: {:#}", e);
        }
    }
}

fn parse_entries(raw: &str) -> Vec<FavoriteEntry> {
    let parsed: Vec<FavoriteEntry> = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("Stored favorites are unreadable, starting empty: {}", e);
            return Vec::new();
        }
    };
    let mut entries: Vec<FavoriteEntry> = Vec::with_capacity(parsed.len());
    for entry in parsed {
        if entries.iter().any(|e| e.id == entry.id) {
            continue;
        }
        entries.push(entry);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use anyhow::{anyhow, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Slot that fails every read and write.
    #[derive(Default)]
    struct BrokenStorage {
        writes: AtomicUsize,
    }

    impl SlotStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("io"))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("disk full"))
        }
    }

    fn title(id: i32, name: &str) -> Title {
        Title {
            id,
            title: name.to_string(),
            poster_path: Some(format!("/{id}.jpg")),
            backdrop_path: None,
            release_date: Some("2020-01-01".to_string()),
            vote_average: 7.5,
            genre_ids: vec![28],
        }
    }

    fn ids(store: &FavoritesStore) -> Vec<i32> {
        store.list().iter().map(|e| e.id).collect()
    }

    fn empty_store() -> (Arc<MemoryStorage>, FavoritesStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = FavoritesStore::load(storage.clone());
        (storage, store)
    }

    #[test]
    fn insertion_order_is_kept() {
        let (_, mut store) = empty_store();
        store.add(&title(1, "A"));
        store.add(&title(2, "B"));
        store.add(&title(3, "C"));
        assert_eq!(ids(&store), vec![1, 2, 3]);

        assert!(store.remove(2));
        assert_eq!(ids(&store), vec![1, 3]);
    }

    #[test]
    fn add_is_idempotent() {
        let (_, mut store) = empty_store();
        assert!(store.add(&title(1, "A")));
        let once = store.list().to_vec();
        assert!(!store.add(&title(1, "A renamed")));
        assert_eq!(store.list(), once.as_slice());
        assert_eq!(store.list()[0].title, "A");
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let (storage, mut store) = empty_store();
        assert!(!store.remove(42));
        assert!(store.is_empty());
        assert_eq!(storage.get(FAVORITES_KEY).unwrap(), None);
    }

    #[test]
    fn membership_tracks_net_effect() {
        let (_, mut store) = empty_store();
        store.add(&title(5, "E"));
        store.remove(5);
        store.add(&title(5, "E"));
        store.add(&title(6, "F"));
        store.remove(6);
        assert!(store.is_favorite(5));
        assert!(!store.is_favorite(6));
        assert!(!store.is_favorite(7));
    }

    #[test]
    fn every_mutation_rewrites_the_slot() {
        let (storage, mut store) = empty_store();
        store.add(&title(1, "A"));
        store.add(&title(2, "B"));
        let raw = storage.get(FAVORITES_KEY).unwrap().unwrap();
        let saved: Vec<FavoriteEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.as_slice(), store.list());

        store.remove(1);
        let raw = storage.get(FAVORITES_KEY).unwrap().unwrap();
        let saved: Vec<FavoriteEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn reload_reproduces_list_and_order() {
        let (storage, mut store) = empty_store();
        for (id, name) in [(3, "C"), (1, "A"), (2, "B")] {
            store.add(&title(id, name));
        }
        store.remove(1);
        store.add(&title(9, "I"));

        let reloaded = FavoritesStore::load(storage.clone());
        assert_eq!(reloaded.list(), store.list());
        assert_eq!(ids(&reloaded), vec![3, 2, 9]);
    }

    #[test]
    fn corrupt_slot_loads_empty() {
        for raw in ["not json at all", "{\"id\": 1}", "[{\"title\": \"no id\"}]", ""] {
            let storage = Arc::new(MemoryStorage::with_slot(FAVORITES_KEY, raw));
            let store = FavoritesStore::load(storage);
            assert!(store.is_empty(), "expected empty list for {raw:?}");
        }
    }

    #[test]
    fn duplicate_ids_in_slot_collapse_to_first() {
        let raw = r#"[{"id":1,"title":"First"},{"id":2,"title":"Two"},{"id":1,"title":"Again"}]"#;
        let storage = Arc::new(MemoryStorage::with_slot(FAVORITES_KEY, raw));
        let store = FavoritesStore::load(storage);
        assert_eq!(ids(&store), vec![1, 2]);
        assert_eq!(store.list()[0].title, "First");
    }

    #[test]
    fn random_sequences_match_a_reference_model() {
        let (storage, mut store) = empty_store();
        let mut model: Vec<i32> = Vec::new();
        let mut seed: u64 = 0x5eed;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let id = ((seed >> 33) % 12) as i32;
            if (seed >> 20) & 1 == 0 {
                store.add(&title(id, "x"));
                if !model.contains(&id) {
                    model.push(id);
                }
            } else {
                store.remove(id);
                model.retain(|m| *m != id);
            }
            assert_eq!(ids(&store), model);
        }
        for id in 0..12 {
            assert_eq!(store.is_favorite(id), model.contains(&id));
        }
        assert_eq!(ids(&FavoritesStore::load(storage)), model);
    }

    #[test]
    fn snapshot_is_detached_from_source_title() {
        let (_, mut store) = empty_store();
        let mut source = title(1, "Original");
        store.add(&source);
        source.title = "Changed upstream".to_string();
        source.vote_average = 1.0;
        assert_eq!(store.list()[0].title, "Original");
        assert_eq!(store.list()[0].vote_average, 7.5);
    }

    #[test]
    fn unreadable_slot_loads_empty() {
        let store = FavoritesStore::load(Arc::new(BrokenStorage::default()));
        assert!(store.is_empty());
    }

    #[test]
    fn failed_writes_leave_memory_authoritative() {
        let storage = Arc::new(BrokenStorage::default());
        let mut store = FavoritesStore::load(storage.clone());

        assert!(store.add(&title(1, "A")));
        assert!(store.add(&title(2, "B")));
        assert!(store.is_favorite(1));
        assert_eq!(ids(&store), vec![1, 2]);

        assert!(store.remove(1));
        assert!(!store.is_favorite(1));
        assert_eq!(ids(&store), vec![2]);
        assert_eq!(storage.writes.load(Ordering::SeqCst), 3);
    }
}
