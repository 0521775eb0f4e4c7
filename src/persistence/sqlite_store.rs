use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};

use super::PersistenceError;
use super::store::{PersistentStore, check_key};

/// Stores every key as a row of a single SQLite table. Each `put` is one
/// transaction, so replacement is atomic.
#[derive(Debug)]
pub struct SqliteStore {
    connection: Mutex<Connection>,
    location: String,
}

impl SqliteStore {
    /// Open or create the database file, including parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let connection = Connection::open(path)?;
        Self::init(connection, path.display().to_string())
    }

    /// Default database file inside a store directory.
    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join("intentwise.db")
    }

    fn init(connection: Connection, location: String) -> Result<Self, PersistenceError> {
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout=5000;
             CREATE TABLE IF NOT EXISTS documents (
                key TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                updated_at INTEGER NOT NULL
             );",
        )?;
        Ok(Self {
            connection: Mutex::new(connection),
            location,
        })
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, PersistenceError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| PersistenceError::Unavailable("SQLite connection lock poisoned".into()))?;
        Ok(f(&mut guard)?)
    }
}

impl PersistentStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        check_key(key)?;
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT data FROM documents WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        check_key(key)?;
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO documents (key, data, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![key, bytes, now],
            )?;
            tx.commit()
        })
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.location)
    }
}
