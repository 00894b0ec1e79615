//! Healing location registry.
//!
//! Remembers where the party was restored (Pokémon Centers and similar),
//! how often each spot worked, and how long a visit took. Every attempt is
//! appended to `healing_sessions`; locations are upserted on `(map_id, x, y)`.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::types::{HealingLocation, HealingSession, PartySnapshot, Position};
use crate::db::{self, StoreKind};

/// Where a healing attempt happened.
#[derive(Debug, Clone, Default)]
pub struct HealingSite {
    pub position: Option<Position>,
    pub map_name: String,
    pub location_name: String,
}

impl HealingSite {
    pub fn at(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }
}

/// Aggregate view of the registry.
#[derive(Debug, Default, Serialize)]
pub struct HealingStats {
    pub total_locations: u64,
    pub total_sessions: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub overall_success_rate: f64,
    pub most_reliable_location: Option<HealingLocation>,
}

/// Decide whether the party was healed between two snapshots.
///
/// Any one of these is enough: status moved from poor/critical to healthy,
/// fewer fainted members, more healthy members, or `needs_healing` cleared.
pub fn detect_healing_success(before: &PartySnapshot, after: &PartySnapshot) -> bool {
    let status_restored = before.party_health_status.is_degraded()
        && after.party_health_status == super::types::HealthStatus::Healthy;
    let fewer_fainted = after.fainted_pokemon < before.fainted_pokemon;
    let more_healthy = after.healthy_pokemon > before.healthy_pokemon;
    let flag_cleared = before.needs_healing && !after.needs_healing;

    status_restored || fewer_fainted || more_healthy || flag_cleared
}

#[derive(Debug, Clone)]
pub struct HealingRegistry {
    path: PathBuf,
}

impl HealingRegistry {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        db::open_database(&path, StoreKind::Healing)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        db::open_database(&self.path, StoreKind::Healing)
    }

    /// Record a healing attempt at `site`.
    ///
    /// Returns `false` when the site has no position or storage fails; the
    /// outcome of the heal itself is stored, not returned.
    pub fn bookmark_location(
        &self,
        site: &HealingSite,
        before: &PartySnapshot,
        after: &PartySnapshot,
        session_id: &str,
        duration: f64,
    ) -> bool {
        let Some(position) = site.position else {
            tracing::warn!("healing attempt without position data, not recorded");
            return false;
        };

        let success = detect_healing_success(before, after);
        match self.try_bookmark(&position, site, before, after, session_id, duration, success) {
            Ok(location_id) => {
                tracing::info!(
                    location_id,
                    %position,
                    success,
                    duration,
                    "healing attempt recorded"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, %position, "failed to record healing attempt");
                false
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn try_bookmark(
        &self,
        position: &Position,
        site: &HealingSite,
        before: &PartySnapshot,
        after: &PartySnapshot,
        session_id: &str,
        duration: f64,
        success: bool,
    ) -> Result<i64> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().to_rfc3339();
        let (successes, failures) = if success { (1, 0) } else { (0, 1) };
        let initial_average = if success { duration } else { 0.0 };

        // The average is a pairwise blend, (old + new) / 2, seeded by the first
        // successful sample. Failed visits leave it untouched.
        tx.execute(
            "INSERT INTO healing_locations \
             (map_id, x, y, map_name, location_name, success_count, failure_count, \
              average_healing_time, last_used, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
             ON CONFLICT(map_id, x, y) DO UPDATE SET \
                map_name = CASE WHEN excluded.map_name != '' THEN excluded.map_name ELSE map_name END, \
                location_name = CASE WHEN excluded.location_name != '' THEN excluded.location_name ELSE location_name END, \
                average_healing_time = CASE \
                    WHEN excluded.success_count = 0 THEN average_healing_time \
                    WHEN success_count = 0 THEN excluded.average_healing_time \
                    ELSE (average_healing_time + excluded.average_healing_time) / 2.0 END, \
                success_count = success_count + excluded.success_count, \
                failure_count = failure_count + excluded.failure_count, \
                last_used = excluded.last_used",
            params![
                position.map_id,
                position.x,
                position.y,
                site.map_name,
                site.location_name,
                successes,
                failures,
                initial_average,
                now,
            ],
        )?;

        let location_id: i64 = tx.query_row(
            "SELECT id FROM healing_locations WHERE map_id = ?1 AND x = ?2 AND y = ?3",
            params![position.map_id, position.x, position.y],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO healing_sessions \
             (location_id, session_id, before_state, after_state, duration, success, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                location_id,
                session_id,
                serde_json::to_string(before)?,
                serde_json::to_string(after)?,
                duration,
                success,
                now,
            ],
        )?;

        tx.commit()?;
        Ok(location_id)
    }

    /// Closest proven healing spot on the same map within `max_distance`.
    ///
    /// Spots that have never healed are skipped even when they are closest.
    pub fn nearest(&self, position: &Position, max_distance: i64) -> Option<HealingLocation> {
        let result = self.connect().and_then(|conn| {
            let location = conn
                .query_row(
                    "SELECT id, map_id, x, y, map_name, location_name, success_count, failure_count, \
                            average_healing_time, last_used \
                     FROM healing_locations \
                     WHERE map_id = ?1 AND success_count > 0 \
                       AND ABS(x - ?2) + ABS(y - ?3) <= ?4 \
                     ORDER BY ABS(x - ?2) + ABS(y - ?3) ASC, success_count DESC \
                     LIMIT 1",
                    params![position.map_id, position.x, position.y, max_distance],
                    row_to_location,
                )
                .optional()?;
            Ok(location)
        });

        match result {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(error = %e, %position, "nearest healing lookup failed");
                None
            }
        }
    }

    /// All known spots, most successful first, optionally limited to one map.
    pub fn all(&self, map_id: Option<i64>) -> Vec<HealingLocation> {
        match self.try_all(map_id) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, ?map_id, "failed to list healing locations");
                Vec::new()
            }
        }
    }

    fn try_all(&self, map_id: Option<i64>) -> Result<Vec<HealingLocation>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, map_id, x, y, map_name, location_name, success_count, failure_count, \
                    average_healing_time, last_used \
             FROM healing_locations \
             WHERE ?1 IS NULL OR map_id = ?1 \
             ORDER BY success_count DESC, last_used DESC",
        )?;
        let rows = stmt
            .query_map(params![map_id], row_to_location)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The attempt log for one location, oldest first.
    pub fn sessions_for(&self, location_id: i64) -> Vec<HealingSession> {
        match self.try_sessions_for(location_id) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, location_id, "failed to load healing sessions");
                Vec::new()
            }
        }
    }

    fn try_sessions_for(&self, location_id: i64) -> Result<Vec<HealingSession>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, location_id, session_id, before_state, after_state, duration, success, timestamp \
             FROM healing_sessions WHERE location_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![location_id], |row| {
                let before: String = row.get(3)?;
                let after: String = row.get(4)?;
                Ok(HealingSession {
                    id: row.get(0)?,
                    location_id: row.get(1)?,
                    session_id: row.get(2)?,
                    before: serde_json::from_str(&before).unwrap_or_default(),
                    after: serde_json::from_str(&after).unwrap_or_default(),
                    duration: row.get(5)?,
                    success: row.get(6)?,
                    timestamp: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn statistics(&self) -> HealingStats {
        match self.try_statistics() {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "failed to compute healing statistics");
                HealingStats::default()
            }
        }
    }

    fn try_statistics(&self) -> Result<HealingStats> {
        let locations = self.try_all(None)?;
        let conn = self.connect()?;
        let total_sessions: i64 =
            conn.query_row("SELECT COUNT(*) FROM healing_sessions", [], |row| row.get(0))?;

        let total_successes: u64 = locations.iter().map(|l| l.success_count as u64).sum();
        let total_failures: u64 = locations.iter().map(|l| l.failure_count as u64).sum();
        let attempts = total_successes + total_failures;
        let overall_success_rate = if attempts == 0 {
            0.0
        } else {
            total_successes as f64 / attempts as f64
        };

        let most_reliable_location = locations
            .iter()
            .filter(|l| l.total_attempts() > 0)
            .max_by(|a, b| {
                a.success_rate()
                    .total_cmp(&b.success_rate())
                    .then_with(|| a.success_count.cmp(&b.success_count))
            })
            .cloned();

        Ok(HealingStats {
            total_locations: locations.len() as u64,
            total_sessions: total_sessions as u64,
            total_successes,
            total_failures,
            overall_success_rate,
            most_reliable_location,
        })
    }
}

fn row_to_location(row: &Row<'_>) -> rusqlite::Result<HealingLocation> {
    Ok(HealingLocation {
        id: row.get(0)?,
        map_id: row.get(1)?,
        x: row.get(2)?,
        y: row.get(3)?,
        map_name: row.get(4)?,
        location_name: row.get(5)?,
        success_count: row.get(6)?,
        failure_count: row.get(7)?,
        average_healing_time: row.get(8)?,
        last_used: row.get(9)?,
    })
}
