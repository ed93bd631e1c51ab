//! SQLite-backed storage.
//!
//! Provides persistent storage for:
//! - Key-value records (active session snapshot, agent mirror, rest timer end)
//! - History of finished workouts

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations, KeyValueStore};
use crate::error::StorageError;

/// A finished workout, as stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: u64,
    pub exercise_count: usize,
    pub set_count: usize,
    pub total_volume: f64,
    pub program_name: Option<String>,
    pub day_name: Option<String>,
    /// Final snapshot JSON.
    #[serde(skip_serializing)]
    pub snapshot: String,
}

/// SQLite database.
///
/// The connection sits behind a mutex so the store can be shared between the
/// runtime and the host.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/repkeeper/repkeeper.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Self::open_at(&dir.join("repkeeper.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        migrations::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        migrations::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("database mutex poisoned".into()))
    }

    /// Append a finished workout to history.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_workout(&self, record: &WorkoutRecord) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO workouts
                (id, started_at, finished_at, elapsed_secs, exercise_count, set_count,
                 total_volume, program_name, day_name, snapshot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.started_at.to_rfc3339(),
                record.finished_at.to_rfc3339(),
                record.elapsed_secs as i64,
                record.exercise_count as i64,
                record.set_count as i64,
                record.total_volume,
                record.program_name,
                record.day_name,
                record.snapshot,
            ],
        )?;
        Ok(())
    }

    /// Most recent finished workouts, newest first.
    pub fn workout_history(&self, limit: usize) -> Result<Vec<WorkoutRecord>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, started_at, finished_at, elapsed_secs, exercise_count, set_count,
                    total_volume, program_name, day_name, snapshot
             FROM workouts
             ORDER BY finished_at DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, String>(9)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, started, finished, elapsed, exercises, sets, volume, program, day, snapshot) = row?;
            records.push(WorkoutRecord {
                id,
                started_at: parse_datetime(&started)?,
                finished_at: parse_datetime(&finished)?,
                elapsed_secs: u64::try_from(elapsed).unwrap_or(0),
                exercise_count: usize::try_from(exercises).unwrap_or(0),
                set_count: usize::try_from(sets).unwrap_or(0),
                total_volume: volume,
                program_name: program,
                day_name: day,
                snapshot,
            });
        }
        Ok(records)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::QueryFailed(format!("invalid datetime '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.get("test").unwrap().is_none());
        db.set("test", "hello").unwrap();
        assert_eq!(db.get("test").unwrap().unwrap(), "hello");
        db.remove("test").unwrap();
        assert!(db.get("test").unwrap().is_none());
    }

    #[test]
    fn history_is_newest_first() {
        let db = Database::open_memory().unwrap();
        let base = Utc::now();
        for (i, id) in ["older", "newer"].iter().enumerate() {
            db.record_workout(&WorkoutRecord {
                id: (*id).into(),
                started_at: base,
                finished_at: base + chrono::Duration::minutes(i as i64 + 1),
                elapsed_secs: 3600,
                exercise_count: 4,
                set_count: 12,
                total_volume: 5400.0,
                program_name: None,
                day_name: Some("Legs".into()),
                snapshot: "{}".into(),
            })
            .unwrap();
        }

        let history = db.workout_history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, "newer");
        assert_eq!(history[0].day_name.as_deref(), Some("Legs"));
    }
}
