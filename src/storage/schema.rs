//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Crag-Leader
//! dataset. Ascent columns are nullable so that damaged rows can still be
//! read back and reported instead of silently dropped.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track scrape runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    duration_ms INTEGER,
    config_hash TEXT NOT NULL,
    reason TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    routes_failed INTEGER NOT NULL DEFAULT 0,
    ascents INTEGER NOT NULL DEFAULT 0
);

-- Flattened ascent rows; grade is always text
CREATE TABLE IF NOT EXISTS ascents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    boulder TEXT,
    route TEXT,
    grade TEXT,
    route_url TEXT,
    climber TEXT,
    ascent_date TEXT,
    ascent_type TEXT
);

CREATE INDEX IF NOT EXISTS idx_ascents_climber ON ascents(climber);
CREATE INDEX IF NOT EXISTS idx_ascents_grade ON ascents(grade);

-- Single-row dataset metadata
CREATE TABLE IF NOT EXISTS dataset (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_updated TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
