use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::AppError;
use crate::models::Session;

pub const SESSION_KEY: &str = "eventhub_session";

/// Process-local key-value storage. Clones share the same entries, the way
/// two tabs share one origin's storage.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: String) {
        self.entries.lock().insert(key.to_string(), value);
    }

    pub fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// Key-value storage persisted as a single JSON object on disk.
#[derive(Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<HashMap<String, String>, AppError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Storage(format!("Corrupt storage file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {e}", self.path.display())))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set(&self, key: &str, value: String) -> Result<(), AppError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub enum StorageBackend {
    Memory(MemoryStorage),
    File(FileStorage),
}

impl StorageBackend {
    pub fn from_path(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::File(FileStorage::new(p)),
            None => Self::Memory(MemoryStorage::new()),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        match self {
            Self::Memory(s) => Ok(s.get(key)),
            Self::File(s) => s.get(key),
        }
    }

    pub fn set(&self, key: &str, value: String) -> Result<(), AppError> {
        match self {
            Self::Memory(s) => {
                s.set(key, value);
                Ok(())
            }
            Self::File(s) => s.set(key, value),
        }
    }

    pub fn remove(&self, key: &str) -> Result<(), AppError> {
        match self {
            Self::Memory(s) => {
                s.remove(key);
                Ok(())
            }
            Self::File(s) => s.remove(key),
        }
    }
}

/// Reads and writes the serialized [`Session`] under a fixed storage key.
#[derive(Clone)]
pub struct SessionStore {
    backend: StorageBackend,
    key: String,
}

impl SessionStore {
    pub fn new(backend: StorageBackend) -> Self {
        Self {
            backend,
            key: SESSION_KEY.to_string(),
        }
    }

    /// Returns the stored session, if any. An unreadable record is dropped
    /// and reported as absent.
    pub fn load(&self) -> Result<Option<Session>, AppError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(key = %self.key, "discarding unreadable session: {e}");
                self.backend.remove(&self.key)?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), AppError> {
        let raw = serde_json::to_string(session)?;
        self.backend.set(&self.key, raw)
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.backend.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::{SessionUser, UserRole};

    fn session() -> Session {
        Session::new(
            SessionUser {
                id: 7,
                username: "maija".into(),
                email: "maija@example.com".into(),
                first_name: "Maija".into(),
                last_name: "Meikäläinen".into(),
                role: UserRole::User,
                created_at: Utc::now(),
            },
            Duration::hours(24),
        )
    }

    #[test]
    fn memory_clones_share_entries() {
        let storage = MemoryStorage::new();
        let store = SessionStore::new(StorageBackend::Memory(storage.clone()));
        store.save(&session()).unwrap();

        let other_tab = SessionStore::new(StorageBackend::Memory(storage));
        assert_eq!(other_tab.load().unwrap().unwrap().user.id, 7);

        other_tab.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn file_storage_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = SessionStore::new(StorageBackend::File(FileStorage::new(&path)));
        let saved = session();
        store.save(&saved).unwrap();

        let reopened = SessionStore::new(StorageBackend::File(FileStorage::new(&path)));
        assert_eq!(reopened.load().unwrap(), Some(saved));

        reopened.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn unreadable_record_is_discarded() {
        let storage = MemoryStorage::new();
        storage.set(SESSION_KEY, "{not json".into());

        let store = SessionStore::new(StorageBackend::Memory(storage.clone()));
        assert!(store.load().unwrap().is_none());
        assert!(storage.get(SESSION_KEY).is_none());
    }

    #[test]
    fn file_storage_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileStorage::new(dir.path().join("storage.json"));
        file.set("theme", "dark".into()).unwrap();

        let store = SessionStore::new(StorageBackend::File(file.clone()));
        store.save(&session()).unwrap();
        store.clear().unwrap();

        assert_eq!(file.get("theme").unwrap().as_deref(), Some("dark"));
    }
}
