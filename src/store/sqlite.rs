//! SQLite-backed cache store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::http::{CacheKey, OriginKind, Response};

use super::traits::{CacheStore, CachedResponse};

/// Durable cache store on a single SQLite database.
///
/// All access goes through one mutex-guarded connection; per-key operations
/// are serialized there, which is the only atomicity the engine relies on.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

/// Schema for the generation and entry tables.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS generations (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored response snapshots, keyed by request identity within a generation
CREATE TABLE IF NOT EXISTS entries (
    generation TEXT NOT NULL,
    key_hash TEXT NOT NULL,
    request TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    origin_kind TEXT NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation, key_hash),
    FOREIGN KEY (generation) REFERENCES generations(name) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_entries_key ON entries(key_hash);
"#;

impl SqliteStore {
  /// Open or create the store at the default location
  /// (`<data_dir>/larder/cache.db`).
  pub fn open() -> Result<Self, StoreError> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let conn = Connection::open(path)?;
    Self::from_connection(conn)
  }

  /// In-memory store, handy for tests and short-lived hosts.
  pub fn open_in_memory() -> Result<Self, StoreError> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch(SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Default database path.
  fn default_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or(StoreError::NoDataDir)?;

    Ok(data_dir.join("larder").join("cache.db"))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
    self.conn.lock().map_err(|_| StoreError::LockPoisoned)
  }
}

impl CacheStore for SqliteStore {
  fn open(&self, generation: &str) -> Result<(), StoreError> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT OR IGNORE INTO generations (name) VALUES (?)",
      params![generation],
    )?;
    Ok(())
  }

  fn lookup(&self, key: &CacheKey) -> Result<Option<CachedResponse>, StoreError> {
    let conn = self.lock()?;

    let row: Option<(String, u16, String, Vec<u8>, String, String)> = conn
      .query_row(
        "SELECT generation, status, headers, body, origin_kind, stored_at
         FROM entries WHERE key_hash = ?
         ORDER BY stored_at DESC, generation DESC LIMIT 1",
        params![key.hash()],
        |row| {
          Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
          ))
        },
      )
      .optional()?;

    let (generation, status, headers_json, body, origin_kind_str, stored_at_str) = match row {
      Some(row) => row,
      None => return Ok(None),
    };

    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    let origin_kind = OriginKind::parse(&origin_kind_str)
      .ok_or_else(|| StoreError::Corrupt(format!("unknown origin kind {origin_kind_str:?}")))?;
    let stored_at = parse_datetime(&stored_at_str)?;

    Ok(Some(CachedResponse {
      response: Response {
        status,
        headers,
        body,
        origin_kind,
      },
      generation,
      stored_at,
    }))
  }

  fn put(&self, generation: &str, key: &CacheKey, response: &Response) -> Result<(), StoreError> {
    let headers_json = serde_json::to_string(&response.headers)?;
    let conn = self.lock()?;

    conn.execute("BEGIN TRANSACTION", [])?;

    let result = conn
      .execute(
        "INSERT OR IGNORE INTO generations (name) VALUES (?)",
        params![generation],
      )
      .and_then(|_| {
        conn.execute(
          "INSERT OR REPLACE INTO entries
             (generation, key_hash, request, status, headers, body, origin_kind, stored_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
          params![
            generation,
            key.hash(),
            key.canonical(),
            response.status,
            headers_json,
            response.body,
            response.origin_kind.as_str(),
          ],
        )
      });

    match result {
      Ok(_) => {
        conn.execute("COMMIT", [])?;
        Ok(())
      }
      Err(err) => {
        let _ = conn.execute("ROLLBACK", []);
        Err(err.into())
      }
    }
  }

  fn list_generations(&self) -> Result<Vec<String>, StoreError> {
    let conn = self.lock()?;

    let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at, name")?;
    let names = stmt
      .query_map([], |row| row.get(0))?
      .collect::<Result<Vec<String>, _>>()?;

    Ok(names)
  }

  fn delete_generation(&self, generation: &str) -> Result<bool, StoreError> {
    let conn = self.lock()?;

    conn.execute("BEGIN TRANSACTION", [])?;

    let result = conn
      .execute(
        "DELETE FROM entries WHERE generation = ?",
        params![generation],
      )
      .and_then(|_| {
        conn.execute(
          "DELETE FROM generations WHERE name = ?",
          params![generation],
        )
      });

    match result {
      Ok(deleted) => {
        conn.execute("COMMIT", [])?;
        Ok(deleted > 0)
      }
      Err(err) => {
        let _ = conn.execute("ROLLBACK", []);
        Err(err.into())
      }
    }
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| StoreError::Corrupt(format!("bad stored_at {s:?}: {e}")))
}
