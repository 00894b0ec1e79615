use anyhow::Result;

use crate::config::PokenavConfig;
use crate::spatial::bookmarks::BookmarkStore;

/// List bookmarks and known map connections, optionally removing one first.
pub fn bookmarks(config: &PokenavConfig, remove: Option<&str>) -> Result<()> {
    let mut store = BookmarkStore::load(config.resolved_bookmark_path());

    if let Some(name) = remove {
        let removed = store.remove(name)?;
        println!(
            "Removed bookmark '{}' (map {} at ({}, {}))",
            removed.name,
            removed.map_key().label(),
            removed.x,
            removed.y
        );
        println!();
    }

    let bookmarks = store.list();

    if bookmarks.is_empty() {
        println!("No bookmarks saved.");
    } else {
        println!("{:<20} {:<8} {:<10} {:<6} {}", "Name", "Map", "Position", "Visits", "Location");
        println!("{}", "-".repeat(70));
        for b in &bookmarks {
            println!(
                "{:<20} {:<8} {:<10} {:<6} {}",
                b.name,
                b.map_key().label(),
                format!("({}, {})", b.x, b.y),
                b.visit_count,
                b.location_name
            );
        }
    }

    let connections = store.connections();
    if !connections.is_empty() {
        println!();
        println!("Map connections:");
        for c in connections {
            println!(
                "  {} -> {} ({}, {}, confidence {:.1})",
                c.from_map, c.to_map, c.direction, c.method, c.confidence
            );
        }
    }

    Ok(())
}
