//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::{AscentRow, RawAscentRow, DATE_FORMAT};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, RunSummary};
use crate::CragError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, duration_ms, config_hash, reason, status, routes_failed, ascents";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`
    ///
    /// Missing parent directories are created.
    pub fn new(path: &Path) -> Result<Self, CragError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CragError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            duration_ms: row.get(3)?,
            config_hash: row.get(4)?,
            reason: row.get(5)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(6)?)
                .unwrap_or(RunStatus::Failed),
            routes_failed: row.get(7)?,
            ascents: row.get(8)?,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Dataset =====

    fn read_raw(&self) -> StorageResult<Vec<RawAscentRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT boulder, route, grade, route_url, climber, ascent_date, ascent_type
             FROM ascents ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(RawAscentRow {
                    boulder: row.get(0)?,
                    route: row.get(1)?,
                    grade: row.get(2)?,
                    route_url: row.get(3)?,
                    climber: row.get(4)?,
                    date: row.get(5)?,
                    ascent_type: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn last_updated(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let stamp: Option<String> = self
            .conn
            .query_row("SELECT last_updated FROM dataset WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        stamp
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        StorageError::Serialization(format!("bad last_updated '{}': {}", s, e))
                    })
            })
            .transpose()
    }

    fn write(&mut self, rows: &[AscentRow], timestamp: DateTime<Utc>) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM ascents", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO ascents
                 (boulder, route, grade, route_url, climber, ascent_date, ascent_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.boulder,
                    row.route,
                    row.grade.as_str(),
                    row.route_url,
                    row.climber,
                    row.date.format(DATE_FORMAT).to_string(),
                    row.ascent_type.to_db_string(),
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO dataset (id, last_updated) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET last_updated = excluded.last_updated",
            params![timestamp.to_rfc3339()],
        )?;

        tx.commit()?;
        tracing::debug!("Wrote {} ascent rows", rows.len());
        Ok(())
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, reason: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, reason, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, reason, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], Self::run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self
            .conn
            .query_row(&sql, [], Self::run_from_row)
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus, summary: RunSummary) -> StorageResult<()> {
        let run = self.get_run(run_id)?;
        let finished = Utc::now();
        let duration_ms = DateTime::parse_from_rfc3339(&run.started_at)
            .map(|started| (finished - started.with_timezone(&Utc)).num_milliseconds())
            .ok();

        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, duration_ms = ?3,
             routes_failed = ?4, ascents = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                finished.to_rfc3339(),
                duration_ms,
                summary.routes_failed,
                summary.ascents,
                run_id
            ],
        )?;
        Ok(())
    }
}
