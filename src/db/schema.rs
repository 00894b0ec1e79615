//! SQL DDL for the coordinate and healing databases.
//!
//! Each store lives in its own SQLite file. All DDL uses `IF NOT EXISTS` so
//! opening a database is always safe to repeat.

use rusqlite::Connection;

/// Which of the two SQL stores a database file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Coordinates,
    Healing,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coordinates => "coordinates",
            Self::Healing => "healing",
        }
    }

    /// Tables reported by the health check, in display order.
    pub fn tables(&self) -> &'static [&'static str] {
        match self {
            Self::Coordinates => &["coordinates", "movement_connections", "map_metadata"],
            Self::Healing => &["healing_locations", "healing_sessions"],
        }
    }
}

/// Visited cells, confirmed movements, and per-map bounding boxes.
const COORDINATE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS coordinates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    map_id INTEGER NOT NULL,
    x INTEGER NOT NULL,
    y INTEGER NOT NULL,
    screenshot_ref TEXT NOT NULL DEFAULT '',
    timestamp TEXT NOT NULL,
    session_id TEXT NOT NULL,
    map_name TEXT NOT NULL DEFAULT '',
    scene_type TEXT NOT NULL DEFAULT 'overworld',
    valid_movements TEXT NOT NULL DEFAULT '[]',
    UNIQUE(map_id, x, y, session_id)
);

CREATE INDEX IF NOT EXISTS idx_coordinates_map ON coordinates(map_id, x, y);

CREATE TABLE IF NOT EXISTS movement_connections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_map_id INTEGER NOT NULL,
    from_x INTEGER NOT NULL,
    from_y INTEGER NOT NULL,
    to_map_id INTEGER NOT NULL,
    to_x INTEGER NOT NULL,
    to_y INTEGER NOT NULL,
    direction TEXT NOT NULL CHECK(direction IN ('up','down','left','right')),
    session_id TEXT NOT NULL,
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    last_used TEXT NOT NULL,
    UNIQUE(from_map_id, from_x, from_y, to_map_id, to_x, to_y, direction)
);

CREATE INDEX IF NOT EXISTS idx_connections_from ON movement_connections(from_map_id, from_x, from_y);

CREATE TABLE IF NOT EXISTS map_metadata (
    map_id INTEGER PRIMARY KEY,
    map_name TEXT NOT NULL DEFAULT '',
    min_x INTEGER NOT NULL,
    max_x INTEGER NOT NULL,
    min_y INTEGER NOT NULL,
    max_y INTEGER NOT NULL,
    total_coordinates INTEGER NOT NULL DEFAULT 0,
    last_visited TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Healing locations plus the append-only attempt log.
const HEALING_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS healing_locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    map_id INTEGER NOT NULL,
    x INTEGER NOT NULL,
    y INTEGER NOT NULL,
    map_name TEXT NOT NULL DEFAULT '',
    location_name TEXT NOT NULL DEFAULT '',
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    average_healing_time REAL NOT NULL DEFAULT 0.0,
    last_used TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(map_id, x, y)
);

CREATE INDEX IF NOT EXISTS idx_healing_map ON healing_locations(map_id);

CREATE TABLE IF NOT EXISTS healing_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id INTEGER NOT NULL REFERENCES healing_locations(id),
    session_id TEXT NOT NULL,
    before_state TEXT NOT NULL,
    after_state TEXT NOT NULL,
    duration REAL NOT NULL,
    success INTEGER NOT NULL CHECK(success IN (0, 1)),
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_location ON healing_sessions(location_id);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all tables for the given store. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection, kind: StoreKind) -> rusqlite::Result<()> {
    match kind {
        StoreKind::Coordinates => conn.execute_batch(COORDINATE_SCHEMA_SQL)?,
        StoreKind::Healing => conn.execute_batch(HEALING_SCHEMA_SQL)?,
    }

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn coordinate_schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, StoreKind::Coordinates).unwrap();

        let tables = table_names(&conn);
        for table in StoreKind::Coordinates.tables() {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
        assert!(tables.contains(&"schema_meta".to_string()));
        assert!(!tables.contains(&"healing_locations".to_string()));
    }

    #[test]
    fn healing_schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, StoreKind::Healing).unwrap();

        let tables = table_names(&conn);
        for table in StoreKind::Healing.tables() {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, StoreKind::Coordinates).unwrap();
        init_schema(&conn, StoreKind::Coordinates).unwrap(); // second call should not error
    }

    #[test]
    fn movement_direction_is_constrained() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, StoreKind::Coordinates).unwrap();

        let result = conn.execute(
            "INSERT INTO movement_connections \
             (from_map_id, from_x, from_y, to_map_id, to_x, to_y, direction, session_id, last_used) \
             VALUES (1, 0, 0, 1, 1, 0, 'diagonal', 's', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
