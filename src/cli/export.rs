use anyhow::Result;
use serde::Serialize;

use crate::config::PokenavConfig;
use crate::spatial::bookmarks::BookmarkStore;
use crate::spatial::coordinates::CoordinateStore;
use crate::spatial::healing::HealingRegistry;
use crate::spatial::types::{Bookmark, CoordinateRecord, HealingLocation, HealingSession, MapConnection};

/// Export format: everything pokenav remembers.
#[derive(Debug, Serialize)]
struct ExportData {
    coordinates: Vec<CoordinateRecord>,
    healing_locations: Vec<HealingLocation>,
    healing_sessions: Vec<HealingSession>,
    bookmarks: Vec<Bookmark>,
    map_connections: Vec<MapConnection>,
}

/// Export all spatial memory as JSON to stdout.
pub fn export(config: &PokenavConfig) -> Result<()> {
    let coordinates = CoordinateStore::open(config.resolved_coordinate_db_path())?;
    let healing = HealingRegistry::open(config.resolved_healing_db_path())?;
    let bookmarks = BookmarkStore::load(config.resolved_bookmark_path());

    let healing_locations = healing.all(None);
    let healing_sessions = healing_locations
        .iter()
        .flat_map(|loc| healing.sessions_for(loc.id))
        .collect();

    let data = ExportData {
        coordinates: coordinates.all_records()?,
        healing_locations,
        healing_sessions,
        bookmarks: bookmarks.list(),
        map_connections: bookmarks.connections().to_vec(),
    };

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!(
        "Exported {} coordinates, {} healing locations ({} sessions), {} bookmarks, {} connections.",
        data.coordinates.len(),
        data.healing_locations.len(),
        data.healing_sessions.len(),
        data.bookmarks.len(),
        data.map_connections.len(),
    );

    Ok(())
}
