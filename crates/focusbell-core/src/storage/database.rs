//! SQLite-backed settings storage.
//!
//! Settings live in a small key-value table as a JSON record under
//! [`SETTINGS_KEY`]. The table is generic so other host state can share the
//! same database file.

use std::path::Path;

use rusqlite::{params, Connection};
use tracing::debug;

use super::{data_dir, SettingsRecord, SettingsStore, SETTINGS_KEY};
use crate::error::SettingsError;
use crate::timer::TimerSettings;

/// SQLite database holding the settings record.
pub struct SqliteSettingsStore {
    conn: Connection,
}

impl SqliteSettingsStore {
    /// Open the database at `~/.config/focusbell/focusbell.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, SettingsError> {
        Self::open_at(data_dir()?.join("focusbell.db"))
    }

    /// Open (or create) a database file at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let conn = Connection::open(path.as_ref())?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, SettingsError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn load(&self) -> Result<Option<TimerSettings>, SettingsError> {
        let Some(json) = self.kv_get(SETTINGS_KEY)? else {
            return Ok(None);
        };
        let record: SettingsRecord =
            serde_json::from_str(&json).map_err(|e| SettingsError::Corrupt(e.to_string()))?;
        record.into_settings().map(Some)
    }

    fn save(&self, settings: &TimerSettings) -> Result<(), SettingsError> {
        let json = serde_json::to_string(&SettingsRecord::stamped(settings))
            .map_err(|e| SettingsError::Database(e.to_string()))?;
        self.kv_set(SETTINGS_KEY, &json)?;
        debug!(key = SETTINGS_KEY, "settings saved to sqlite");
        Ok(())
    }
}
