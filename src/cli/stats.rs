use anyhow::Result;

use crate::config::PokenavConfig;
use crate::spatial::bookmarks::BookmarkStore;
use crate::spatial::coordinates::CoordinateStore;
use crate::spatial::healing::HealingRegistry;

/// Display spatial memory statistics in the terminal.
pub fn stats(config: &PokenavConfig) -> Result<()> {
    let coordinates = CoordinateStore::open(config.resolved_coordinate_db_path())?;
    let healing = HealingRegistry::open(config.resolved_healing_db_path())?;
    let bookmarks = BookmarkStore::load(config.resolved_bookmark_path());

    let coord_stats = coordinates.statistics();
    let healing_stats = healing.statistics();

    println!("Coordinate Memory");
    println!("{}", "=".repeat(40));
    println!("  Coordinates:         {}", coord_stats.total_coordinates);
    println!("  Maps:                {}", coord_stats.unique_maps);
    println!("  Movement edges:      {}", coord_stats.total_connections);
    println!();

    if !coord_stats.top_maps_by_coordinate_count.is_empty() {
        println!("Most explored maps:");
        for (map_id, name, count) in &coord_stats.top_maps_by_coordinate_count {
            let label = if name.is_empty() {
                format!("map {map_id}")
            } else {
                name.clone()
            };
            println!("  {:<24} {}", label, count);
        }
        println!();
    }

    println!("Healing Locations");
    println!("{}", "=".repeat(40));
    println!("  Locations:           {}", healing_stats.total_locations);
    println!("  Sessions:            {}", healing_stats.total_sessions);
    println!(
        "  Success rate:        {:.0}% ({} ok / {} failed)",
        healing_stats.overall_success_rate * 100.0,
        healing_stats.total_successes,
        healing_stats.total_failures
    );
    if let Some(ref best) = healing_stats.most_reliable_location {
        println!(
            "  Most reliable:       {} (map {} at {}, {})",
            best.display_name(),
            best.map_id,
            best.x,
            best.y
        );
    }
    println!();

    println!("Bookmarks:             {}", bookmarks.list().len());
    println!("Map connections:       {}", bookmarks.connections().len());

    Ok(())
}
