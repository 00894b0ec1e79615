//! CLI `cleanup` command: age-based retention for the coordinate store.

use anyhow::{Context, Result};

use crate::config::PokenavConfig;
use crate::spatial::coordinates::CoordinateStore;

/// Delete coordinate rows older than `days` (default: `maintenance.retention_days`).
pub fn cleanup(config: &PokenavConfig, days: Option<u64>, dry_run: bool) -> Result<()> {
    let days = days.unwrap_or(config.maintenance.retention_days);
    let store = CoordinateStore::open(config.resolved_coordinate_db_path())?;

    let result = store
        .run_cleanup(days, dry_run)
        .with_context(|| format!("cleanup of coordinates older than {days} days failed"))?;

    if result.candidates == 0 {
        println!("No coordinates older than {days} days.");
        return Ok(());
    }

    if dry_run {
        println!(
            "Found {} coordinate(s) older than {days} days (dry run, nothing deleted).",
            result.candidates
        );
    } else {
        println!("Deleted {} coordinate(s) older than {days} days.", result.deleted);
    }

    Ok(())
}
