//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::PokenavConfig;
use crate::db::{self, StoreKind};
use crate::spatial::bookmarks::BookmarkStore;

/// Run diagnostics on both databases and the bookmark file.
pub fn doctor(config: &PokenavConfig) -> Result<()> {
    println!("pokenav Health Report");
    println!("=====================");

    let coordinates_ok = check_store(&config.resolved_coordinate_db_path(), StoreKind::Coordinates)?;
    let healing_ok = check_store(&config.resolved_healing_db_path(), StoreKind::Healing)?;

    println!();
    let bookmark_path = config.resolved_bookmark_path();
    println!("Bookmarks:         {}", bookmark_path.display());
    if bookmark_path.exists() {
        let store = BookmarkStore::load(&bookmark_path);
        println!("  Bookmarks:       {}", store.list().len());
        println!("  Connections:     {}", store.connections().len());
    } else {
        println!("  (not created yet)");
    }

    if !(coordinates_ok && healing_ok) {
        println!();
        println!("Recovery steps:");
        println!("  1. Export what is still readable: pokenav export > backup.json");
        println!("  2. Move the damaged database aside; it is recreated empty on next start");
    }

    Ok(())
}

/// Print the report for one database. Returns whether its integrity check passed.
fn check_store(path: &Path, kind: StoreKind) -> Result<bool> {
    println!();
    println!("{} database:  {}", kind.as_str(), path.display());

    if !path.exists() {
        println!("  (not created yet; run `pokenav serve` to initialize)");
        return Ok(true);
    }

    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(path, kind)
        .with_context(|| format!("failed to open {} database (may be corrupt)", kind.as_str()))?;
    let report = db::check_database_health(&conn, kind).context("failed to run health check")?;

    println!("  File size:       {}", format_bytes(file_size));
    println!("  Schema version:  {}", report.schema_version);
    println!("  Row counts:");
    for (table, count) in &report.table_counts {
        println!("    {:<22} {}", table, count);
    }
    if report.integrity_ok {
        println!("  Integrity check: PASSED");
    } else {
        println!("  Integrity check: FAILED ({})", report.integrity_details);
    }

    Ok(report.integrity_ok)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_byte_sizes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
