//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring either store up to [`CURRENT_SCHEMA_VERSION`].

use rusqlite::Connection;

use super::schema::StoreKind;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations.
pub fn run_migrations(conn: &Connection, kind: StoreKind) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(
        store = kind.as_str(),
        schema_version = version,
        target = CURRENT_SCHEMA_VERSION,
        "checking migrations"
    );

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(store = kind.as_str(), from = version, to = next, "running migration");

        match next {
            2 => migrate_v1_to_v2(conn, kind)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }

        update_schema_version(conn, next)?;
        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: timestamp indexes for retention cleanup and recency ordering.
fn migrate_v1_to_v2(conn: &Connection, kind: StoreKind) -> rusqlite::Result<()> {
    match kind {
        StoreKind::Coordinates => conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_coordinates_timestamp ON coordinates(timestamp);",
        ),
        StoreKind::Healing => conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_healing_last_used ON healing_locations(last_used);",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db(kind: StoreKind) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        crate::db::schema::init_schema(&conn, kind).unwrap();
        conn
    }

    fn index_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'index' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn get_schema_version_returns_1_on_fresh_db() {
        let conn = test_db(StoreKind::Coordinates);
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn run_migrations_upgrades_to_current() {
        let conn = test_db(StoreKind::Healing);
        run_migrations(&conn, StoreKind::Healing).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
        assert!(index_exists(&conn, "idx_healing_last_used"));
    }

    #[test]
    fn migration_v1_to_v2_adds_timestamp_index() {
        let conn = test_db(StoreKind::Coordinates);
        assert!(!index_exists(&conn, "idx_coordinates_timestamp"));

        run_migrations(&conn, StoreKind::Coordinates).unwrap();

        assert!(index_exists(&conn, "idx_coordinates_timestamp"));
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_db(StoreKind::Coordinates);
        run_migrations(&conn, StoreKind::Coordinates).unwrap();
        run_migrations(&conn, StoreKind::Coordinates).unwrap(); // second call should not error
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }
}
