//! Coordinate store: durable memory of every cell the agent has stood on.
//!
//! Each public method opens the database, does its work, and drops the
//! connection before returning. Storage faults are logged and reported as
//! `false` / empty results; callers treat "no data" as a normal outcome.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::types::{
    CoordinateRecord, Direction, MapMetadata, MovementConnection, NearbyCoordinate, Position,
    SceneInfo,
};
use crate::db::{self, StoreKind};

/// Summary counts for the whole coordinate database.
#[derive(Debug, Default, Serialize)]
pub struct CoordinateStats {
    pub total_coordinates: u64,
    pub unique_maps: u64,
    pub total_connections: u64,
    /// `(map_id, map_name, total_coordinates)` for the five busiest maps.
    pub top_maps_by_coordinate_count: Vec<(i64, String, u64)>,
}

/// Result of a retention cleanup run.
#[derive(Debug, Default, Serialize)]
pub struct CleanupResult {
    pub candidates: u64,
    pub deleted: u64,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct CoordinateStore {
    path: PathBuf,
}

impl CoordinateStore {
    /// Create a store backed by the database file at `path`, initializing the
    /// schema so that a bad path fails here rather than on the first turn.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        db::open_database(&path, StoreKind::Coordinates)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        db::open_database(&self.path, StoreKind::Coordinates)
    }

    /// Upsert the coordinate for this session and widen the map's bounding box.
    pub fn record(
        &self,
        position: &Position,
        screenshot_ref: &str,
        session_id: &str,
        scene: &SceneInfo,
    ) -> bool {
        match self.try_record(position, screenshot_ref, session_id, scene) {
            Ok(()) => {
                tracing::debug!(
                    map_id = position.map_id,
                    x = position.x,
                    y = position.y,
                    "coordinate recorded"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, %position, "failed to record coordinate");
                false
            }
        }
    }

    fn try_record(
        &self,
        position: &Position,
        screenshot_ref: &str,
        session_id: &str,
        scene: &SceneInfo,
    ) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().to_rfc3339();
        let movements = serde_json::to_string(&scene.valid_movements)?;

        tx.execute(
            "INSERT INTO coordinates \
             (map_id, x, y, screenshot_ref, timestamp, session_id, map_name, scene_type, valid_movements) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(map_id, x, y, session_id) DO UPDATE SET \
                screenshot_ref = excluded.screenshot_ref, \
                timestamp = excluded.timestamp, \
                map_name = excluded.map_name, \
                scene_type = excluded.scene_type, \
                valid_movements = excluded.valid_movements",
            params![
                position.map_id,
                position.x,
                position.y,
                screenshot_ref,
                now,
                session_id,
                scene.map_name,
                scene.scene_type,
                movements,
            ],
        )?;

        let total: i64 = tx.query_row(
            "SELECT COUNT(*) FROM coordinates WHERE map_id = ?1",
            params![position.map_id],
            |row| row.get(0),
        )?;

        // Bounding box only ever widens.
        tx.execute(
            "INSERT INTO map_metadata \
             (map_id, map_name, min_x, max_x, min_y, max_y, total_coordinates, last_visited) \
             VALUES (?1, ?2, ?3, ?3, ?4, ?4, ?5, ?6) \
             ON CONFLICT(map_id) DO UPDATE SET \
                map_name = CASE WHEN excluded.map_name != '' THEN excluded.map_name ELSE map_name END, \
                min_x = MIN(min_x, excluded.min_x), \
                max_x = MAX(max_x, excluded.max_x), \
                min_y = MIN(min_y, excluded.min_y), \
                max_y = MAX(max_y, excluded.max_y), \
                total_coordinates = excluded.total_coordinates, \
                last_visited = excluded.last_visited",
            params![position.map_id, scene.map_name, position.x, position.y, total, now],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Upsert a movement edge, bumping the success or failure counter.
    pub fn record_movement(
        &self,
        from: &Position,
        to: &Position,
        direction: Direction,
        session_id: &str,
        success: bool,
    ) -> bool {
        match self.try_record_movement(from, to, direction, session_id, success) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, %from, %to, "failed to record movement");
                false
            }
        }
    }

    fn try_record_movement(
        &self,
        from: &Position,
        to: &Position,
        direction: Direction,
        session_id: &str,
        success: bool,
    ) -> Result<()> {
        let conn = self.connect()?;
        let now = chrono::Utc::now().to_rfc3339();
        let (successes, failures) = if success { (1, 0) } else { (0, 1) };

        conn.execute(
            "INSERT INTO movement_connections \
             (from_map_id, from_x, from_y, to_map_id, to_x, to_y, direction, session_id, \
              success_count, failure_count, last_used) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT(from_map_id, from_x, from_y, to_map_id, to_x, to_y, direction) DO UPDATE SET \
                success_count = success_count + excluded.success_count, \
                failure_count = failure_count + excluded.failure_count, \
                session_id = excluded.session_id, \
                last_used = excluded.last_used",
            params![
                from.map_id,
                from.x,
                from.y,
                to.map_id,
                to.x,
                to.y,
                direction.as_str(),
                session_id,
                successes,
                failures,
                now,
            ],
        )?;
        Ok(())
    }

    /// Coordinates inside the square `|Δx| <= radius && |Δy| <= radius`,
    /// closest first by Manhattan distance.
    pub fn query_near(&self, map_id: i64, x: i64, y: i64, radius: i64) -> Vec<NearbyCoordinate> {
        match self.try_query_near(map_id, x, y, radius) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, map_id, x, y, "coordinate proximity query failed");
                Vec::new()
            }
        }
    }

    fn try_query_near(
        &self,
        map_id: i64,
        x: i64,
        y: i64,
        radius: i64,
    ) -> Result<Vec<NearbyCoordinate>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT map_id, x, y, screenshot_ref, timestamp, session_id, map_name, scene_type, valid_movements \
             FROM coordinates \
             WHERE map_id = ?1 AND x BETWEEN ?2 AND ?3 AND y BETWEEN ?4 AND ?5",
        )?;

        let radius = radius.max(0);
        let here = Position::new(map_id, x, y);
        let mut nearby: Vec<NearbyCoordinate> = stmt
            .query_map(
                params![
                    map_id,
                    x.saturating_sub(radius),
                    x.saturating_add(radius),
                    y.saturating_sub(radius),
                    y.saturating_add(radius)
                ],
                row_to_record,
            )?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|record| {
                let distance = here.manhattan(record.x, record.y);
                NearbyCoordinate { record, distance }
            })
            .collect();

        // Most recent visit first among equally distant cells.
        nearby.sort_by(|a, b| {
            a.distance
                .cmp(&b.distance)
                .then_with(|| b.record.timestamp.cmp(&a.record.timestamp))
        });
        Ok(nearby)
    }

    /// Confirmed movements leaving `from`, most successful first.
    pub fn movement_connections_from(&self, from: &Position) -> Vec<MovementConnection> {
        match self.try_connections_from(from) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, %from, "movement connection query failed");
                Vec::new()
            }
        }
    }

    fn try_connections_from(&self, from: &Position) -> Result<Vec<MovementConnection>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT from_map_id, from_x, from_y, to_map_id, to_x, to_y, direction, session_id, \
                    success_count, failure_count, last_used \
             FROM movement_connections \
             WHERE from_map_id = ?1 AND from_x = ?2 AND from_y = ?3 \
             ORDER BY success_count DESC, last_used DESC",
        )?;

        let rows = stmt
            .query_map(params![from.map_id, from.x, from.y], |row| {
                let direction: String = row.get(6)?;
                Ok(MovementConnection {
                    from: Position::new(row.get(0)?, row.get(1)?, row.get(2)?),
                    to: Position::new(row.get(3)?, row.get(4)?, row.get(5)?),
                    direction: direction
                        .parse()
                        .map_err(|_| rusqlite::Error::InvalidQuery)?,
                    session_id: row.get(7)?,
                    success_count: row.get(8)?,
                    failure_count: row.get(9)?,
                    last_used: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn map_metadata(&self, map_id: i64) -> Option<MapMetadata> {
        let result = self.connect().and_then(|conn| {
            conn.query_row(
                "SELECT map_id, map_name, min_x, max_x, min_y, max_y, total_coordinates, last_visited \
                 FROM map_metadata WHERE map_id = ?1",
                params![map_id],
                |row| {
                    Ok(MapMetadata {
                        map_id: row.get(0)?,
                        map_name: row.get(1)?,
                        min_x: row.get(2)?,
                        max_x: row.get(3)?,
                        min_y: row.get(4)?,
                        max_y: row.get(5)?,
                        total_coordinates: row.get::<_, i64>(6)? as u64,
                        last_visited: row.get(7)?,
                    })
                },
            )
            .optional()
            .context("map metadata query failed")
        });

        match result {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(error = %e, map_id, "failed to load map metadata");
                None
            }
        }
    }

    pub fn statistics(&self) -> CoordinateStats {
        match self.try_statistics() {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "failed to compute coordinate statistics");
                CoordinateStats::default()
            }
        }
    }

    fn try_statistics(&self) -> Result<CoordinateStats> {
        let conn = self.connect()?;
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        let total_coordinates = count("SELECT COUNT(*) FROM coordinates")?;
        let unique_maps = count("SELECT COUNT(DISTINCT map_id) FROM coordinates")?;
        let total_connections = count("SELECT COUNT(*) FROM movement_connections")?;

        let mut stmt = conn.prepare(
            "SELECT map_id, map_name, total_coordinates FROM map_metadata \
             ORDER BY total_coordinates DESC, map_id ASC LIMIT 5",
        )?;
        let top_maps_by_coordinate_count = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CoordinateStats {
            total_coordinates,
            unique_maps,
            total_connections,
            top_maps_by_coordinate_count,
        })
    }

    /// Delete coordinates last visited more than `days` ago.
    ///
    /// `total_coordinates` is recomputed for every map; bounding boxes keep
    /// their widest extent.
    pub fn cleanup_older_than(&self, days: u64, dry_run: bool) -> CleanupResult {
        match self.run_cleanup(days, dry_run) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, days, "coordinate retention cleanup failed");
                CleanupResult {
                    dry_run,
                    ..Default::default()
                }
            }
        }
    }

    /// Like [`cleanup_older_than`](Self::cleanup_older_than), but storage
    /// failures are returned to the caller instead of logged.
    pub fn run_cleanup(&self, days: u64, dry_run: bool) -> Result<CleanupResult> {
        let cutoff = i64::try_from(days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .and_then(|window| chrono::Utc::now().checked_sub_signed(window))
            .with_context(|| format!("retention window of {days} days is out of range"))?
            .to_rfc3339();
        let mut conn = self.connect()?;

        let candidates: i64 = conn.query_row(
            "SELECT COUNT(*) FROM coordinates WHERE timestamp < ?1",
            params![cutoff],
            |row| row.get(0),
        )?;

        if dry_run || candidates == 0 {
            return Ok(CleanupResult {
                candidates: candidates as u64,
                deleted: 0,
                dry_run,
            });
        }

        let tx = conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM coordinates WHERE timestamp < ?1",
            params![cutoff],
        )?;
        tx.execute(
            "UPDATE map_metadata SET total_coordinates = \
             (SELECT COUNT(*) FROM coordinates WHERE coordinates.map_id = map_metadata.map_id)",
            [],
        )?;
        tx.commit()?;

        tracing::info!(deleted, days, "coordinate retention cleanup complete");
        Ok(CleanupResult {
            candidates: candidates as u64,
            deleted: deleted as u64,
            dry_run,
        })
    }

    /// Every stored coordinate, oldest first. Used by export.
    pub fn all_records(&self) -> Result<Vec<CoordinateRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT map_id, x, y, screenshot_ref, timestamp, session_id, map_name, scene_type, valid_movements \
             FROM coordinates ORDER BY timestamp",
        )?;
        let rows = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CoordinateRecord> {
    let movements: String = row.get(8)?;
    let valid_movements: BTreeSet<Direction> =
        serde_json::from_str(&movements).unwrap_or_default();
    Ok(CoordinateRecord {
        map_id: row.get(0)?,
        x: row.get(1)?,
        y: row.get(2)?,
        screenshot_ref: row.get(3)?,
        timestamp: row.get(4)?,
        session_id: row.get(5)?,
        map_name: row.get(6)?,
        scene_type: row.get(7)?,
        valid_movements,
    })
}
