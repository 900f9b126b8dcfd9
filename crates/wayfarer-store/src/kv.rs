//! Key-value persistence backends.
//!
//! The store persists three things: the session list, the active session id,
//! and boolean UI settings. All operations are synchronous; values are JSON
//! in a single `kv` table.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use tracing::info;
use uuid::Uuid;

use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::types::Session;

const SESSIONS_KEY: &str = "sessions";
const ACTIVE_ID_KEY: &str = "active_session_id";

/// Synchronous key-value persistence for session state.
pub trait KvStore: Send + Sync {
    /// Load the persisted session list, `None` on first launch.
    fn load_sessions(&self) -> Result<Option<Vec<Session>>>;

    /// Persist the full session list.
    fn save_sessions(&self, sessions: &[Session]) -> Result<()>;

    /// Load the persisted active session id.
    fn load_active_id(&self) -> Result<Option<Uuid>>;

    /// Persist the active session id.
    fn save_active_id(&self, id: Uuid) -> Result<()>;

    /// Load a boolean setting by key.
    fn load_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Persist a boolean setting by key.
    fn save_bool(&self, key: &str, value: bool) -> Result<()>;
}

/// SQLite-backed key-value store.
///
/// A single `kv` table with JSON values. The connection is wrapped in a
/// Mutex since rusqlite `Connection` is not `Sync`.
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| WayfarerError::Store(format!("Failed to open database: {}", e)))?;
        Self::init(conn, Some(path))
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| WayfarerError::Store(format!("Failed to open in-memory db: {}", e)))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<&Path>) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS kv (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )
        .map_err(|e| WayfarerError::Store(format!("Failed to initialize kv table: {}", e)))?;

        if let Some(p) = path {
            info!("Session database opened at {}", p.display());
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("kv mutex poisoned");
        conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| WayfarerError::Store(format!("Failed to read key {}: {}", key, e)))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().expect("kv mutex poisoned");
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )
        .map_err(|e| WayfarerError::Store(format!("Failed to write key {}: {}", key, e)))?;
        Ok(())
    }
}

impl KvStore for SqliteKv {
    fn load_sessions(&self) -> Result<Option<Vec<Session>>> {
        match self.get(SESSIONS_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_sessions(&self, sessions: &[Session]) -> Result<()> {
        self.put(SESSIONS_KEY, &serde_json::to_string(sessions)?)
    }

    fn load_active_id(&self) -> Result<Option<Uuid>> {
        match self.get(ACTIVE_ID_KEY)? {
            Some(raw) => Uuid::parse_str(&raw)
                .map(Some)
                .map_err(|e| WayfarerError::Store(format!("Corrupt active id: {}", e))),
            None => Ok(None),
        }
    }

    fn save_active_id(&self, id: Uuid) -> Result<()> {
        self.put(ACTIVE_ID_KEY, &id.to_string())
    }

    fn load_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(raw == "true")),
            None => Ok(None),
        }
    }

    fn save_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, if value { "true" } else { "false" })
    }
}

/// In-memory key-value store for testing.
#[derive(Default)]
pub struct MemoryKv {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn load_sessions(&self) -> Result<Option<Vec<Session>>> {
        let map = self.map.lock().expect("kv mutex poisoned");
        match map.get(SESSIONS_KEY) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save_sessions(&self, sessions: &[Session]) -> Result<()> {
        let json = serde_json::to_string(sessions)?;
        self.map
            .lock()
            .expect("kv mutex poisoned")
            .insert(SESSIONS_KEY.to_string(), json);
        Ok(())
    }

    fn load_active_id(&self) -> Result<Option<Uuid>> {
        let map = self.map.lock().expect("kv mutex poisoned");
        match map.get(ACTIVE_ID_KEY) {
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|e| WayfarerError::Store(format!("Corrupt active id: {}", e))),
            None => Ok(None),
        }
    }

    fn save_active_id(&self, id: Uuid) -> Result<()> {
        self.map
            .lock()
            .expect("kv mutex poisoned")
            .insert(ACTIVE_ID_KEY.to_string(), id.to_string());
        Ok(())
    }

    fn load_bool(&self, key: &str) -> Result<Option<bool>> {
        let map = self.map.lock().expect("kv mutex poisoned");
        Ok(map.get(key).map(|v| v == "true"))
    }

    fn save_bool(&self, key: &str, value: bool) -> Result<()> {
        self.map
            .lock()
            .expect("kv mutex poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(kv: &dyn KvStore) {
        assert!(kv.load_sessions().unwrap().is_none());

        let sessions = vec![Session::new("en-US"), Session::new("ja-JP")];
        kv.save_sessions(&sessions).unwrap();
        let loaded = kv.load_sessions().unwrap().unwrap();
        assert_eq!(loaded, sessions);

        let id = sessions[1].id;
        assert!(kv.load_active_id().unwrap().is_none());
        kv.save_active_id(id).unwrap();
        assert_eq!(kv.load_active_id().unwrap(), Some(id));

        assert!(kv.load_bool("tts_enabled").unwrap().is_none());
        kv.save_bool("tts_enabled", true).unwrap();
        assert_eq!(kv.load_bool("tts_enabled").unwrap(), Some(true));
        kv.save_bool("tts_enabled", false).unwrap();
        assert_eq!(kv.load_bool("tts_enabled").unwrap(), Some(false));
    }

    #[test]
    fn test_memory_kv_round_trip() {
        round_trip(&MemoryKv::new());
    }

    #[test]
    fn test_sqlite_kv_round_trip() {
        round_trip(&SqliteKv::in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_kv_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wayfarer.db");

        let sessions = vec![Session::new("es-ES")];
        {
            let kv = SqliteKv::open(&path).unwrap();
            kv.save_sessions(&sessions).unwrap();
            kv.save_active_id(sessions[0].id).unwrap();
        }

        let kv = SqliteKv::open(&path).unwrap();
        assert_eq!(kv.load_sessions().unwrap().unwrap(), sessions);
        assert_eq!(kv.load_active_id().unwrap(), Some(sessions[0].id));
    }

    #[test]
    fn test_sqlite_kv_overwrite() {
        let kv = SqliteKv::in_memory().unwrap();
        let first = vec![Session::new("en-US")];
        let second = vec![Session::new("fr-FR"), Session::new("de-DE")];
        kv.save_sessions(&first).unwrap();
        kv.save_sessions(&second).unwrap();
        assert_eq!(kv.load_sessions().unwrap().unwrap(), second);
    }

    #[test]
    fn test_sqlite_kv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/wayfarer.db");
        let kv = SqliteKv::open(&path).unwrap();
        kv.save_bool("k", true).unwrap();
        assert!(path.exists());
    }
}
