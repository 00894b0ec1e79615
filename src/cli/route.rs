use anyhow::Result;

use crate::config::PokenavConfig;
use crate::spatial::bookmarks::BookmarkStore;
use crate::spatial::types::MapKey;

/// Print the fewest-hop map route between two `bank-id` labels.
pub fn route(config: &PokenavConfig, from: &str, to: &str) -> Result<()> {
    let from: MapKey = from.parse().map_err(anyhow::Error::msg)?;
    let to: MapKey = to.parse().map_err(anyhow::Error::msg)?;

    let store = BookmarkStore::load(config.resolved_bookmark_path());
    match store.find_route(from, to) {
        Some(path) if path.is_empty() => println!("{from} and {to} are the same map."),
        Some(path) => {
            println!("{} hop(s): {from} -> {}", path.len(), path.join(" -> "));
        }
        None => println!("No known route from {from} to {to}."),
    }

    Ok(())
}
