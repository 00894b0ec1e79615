pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

pub use schema::StoreKind;

/// Open (or create) one of the store databases at the given path, with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>, kind: StoreKind) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(5000))?;

    schema::init_schema(&conn, kind).context("failed to initialize schema")?;
    migrations::run_migrations(&conn, kind).context("failed to run migrations")?;

    tracing::debug!(path = %path.display(), store = kind.as_str(), "database opened");
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug)]
pub struct HealthReport {
    pub schema_version: u32,
    /// `(table, row_count)` for every table the store owns.
    pub table_counts: Vec<(String, u64)>,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Run `PRAGMA integrity_check` and gather row counts for a store database.
pub fn check_database_health(conn: &Connection, kind: StoreKind) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;

    let mut table_counts = Vec::new();
    for table in kind.tables() {
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        table_counts.push((table.to_string(), count as u64));
    }

    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    let integrity_ok = integrity == "ok";

    Ok(HealthReport {
        schema_version,
        table_counts,
        integrity_ok,
        integrity_details: integrity,
    })
}
