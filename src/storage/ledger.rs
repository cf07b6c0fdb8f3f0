//! SQLite run ledger
//!
//! The ledger records one row per ingestion run (range, config hash, final
//! status and counters) and keeps a miss counter for every key whose page
//! answered "not found". It never stores records: the checkpoint file stays
//! the only authority on which identifiers are done.

use crate::source::IdentifierRange;
use crate::state::RunCounters;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// SQLite-backed history of runs and not-found misses
pub struct RunLedger {
    conn: Connection,
}

impl fmt::Debug for RunLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLedger").finish_non_exhaustive()
    }
}

impl RunLedger {
    /// Opens or creates the ledger database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory ledger (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Run Management =====

    /// Records the start of a run and returns its ID
    pub fn begin_run(&mut self, config_hash: &str, range: IdentifierRange) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, range_start, range_end, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                now,
                config_hash,
                to_sql_int(range.start())?,
                to_sql_int(range.end())?,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Stores the final status and counters of a run
    pub fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: &RunCounters,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, attempted = ?3, succeeded = ?4,
             skipped = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                counters.attempted as i64,
                counters.succeeded as i64,
                counters.skipped() as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets a run by ID
    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, range_start, range_end,
                 status, attempted, succeeded, skipped FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::RunNotFound(run_id),
                other => StorageError::Sqlite(other),
            })
    }

    /// Gets the most recent runs, newest first
    pub fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, range_start, range_end,
             status, attempted, succeeded, skipped FROM runs ORDER BY id DESC LIMIT ?1",
        )?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Miss Tracking =====

    /// Counts one more "not found" answer for `source_key`
    ///
    /// # Returns
    ///
    /// The total number of not-found answers recorded for the key
    pub fn record_miss(&mut self, source_key: &str, run_id: i64) -> StorageResult<u32> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO misses (source_key, not_found_count, first_seen_at, last_seen_at, last_run)
             VALUES (?1, 1, ?2, ?2, ?3)
             ON CONFLICT(source_key) DO UPDATE SET
                not_found_count = not_found_count + 1,
                last_seen_at = excluded.last_seen_at,
                last_run = excluded.last_run",
            params![source_key, now, run_id],
        )?;

        let count: i64 = self.conn.query_row(
            "SELECT not_found_count FROM misses WHERE source_key = ?1",
            params![source_key],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Forgets earlier misses for a key that has now been fetched
    pub fn clear_miss(&mut self, source_key: &str) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM misses WHERE source_key = ?1",
            params![source_key],
        )?;
        Ok(())
    }

    /// Keys with at least `threshold` recorded not-found answers
    pub fn tombstoned_keys(&self, threshold: u32) -> StorageResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source_key FROM misses WHERE not_found_count >= ?1")?;

        let keys = stmt
            .query_map(params![threshold as i64], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(keys)
    }

    /// Number of keys with at least one recorded miss
    pub fn count_misses(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM misses", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn to_sql_int(value: u64) -> rusqlite::Result<i64> {
    i64::try_from(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_sql_int(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(index)?;
    u64::try_from(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(e))
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        range_start: from_sql_int(row, 4)?,
        range_end: from_sql_int(row, 5)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(RunStatus::Failed),
        attempted: row.get::<_, i64>(7)? as u64,
        succeeded: row.get::<_, i64>(8)? as u64,
        skipped: row.get::<_, i64>(9)? as u64,
    })
}
