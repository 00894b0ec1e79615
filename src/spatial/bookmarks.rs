//! Named landmark memory and the coarse inter-map connection graph.
//!
//! Bookmarks and connections live in one JSON file that is read whole at
//! construction and rewritten whole after every mutation. Writes go to a
//! temporary sibling first and are renamed into place.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use super::types::{Bookmark, MapConnection, MapKey};
use crate::error::NavError;

/// Confidence added each time an already known connection is observed again.
pub const CONFIDENCE_INCREMENT: f64 = 0.1;

/// Confidence of a connection on its first observation.
pub const INITIAL_CONFIDENCE: f64 = 0.5;

/// Position fields as read from emulator RAM; any of them may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionData {
    pub map_bank: Option<i64>,
    pub map_id: Option<i64>,
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub location_name: Option<String>,
}

impl PositionData {
    pub fn new(map_bank: i64, map_id: i64, x: i64, y: i64) -> Self {
        Self {
            map_bank: Some(map_bank),
            map_id: Some(map_id),
            x: Some(x),
            y: Some(y),
            location_name: None,
        }
    }

    /// `(map, x, y)` when every required field is present.
    fn require(&self) -> Result<(MapKey, i64, i64), NavError> {
        let mut missing = Vec::new();
        if self.map_bank.is_none() {
            missing.push("map_bank".to_string());
        }
        if self.map_id.is_none() {
            missing.push("map_id".to_string());
        }
        if self.x.is_none() {
            missing.push("x".to_string());
        }
        if self.y.is_none() {
            missing.push("y".to_string());
        }

        match (self.map_bank, self.map_id, self.x, self.y) {
            (Some(bank), Some(id), Some(x), Some(y)) => Ok((MapKey::new(bank, id), x, y)),
            _ => Err(NavError::MissingData(missing)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkAction {
    Created,
    Updated,
}

#[derive(Debug, Serialize)]
pub struct BookmarkOutcome {
    pub success: bool,
    pub action: BookmarkAction,
    pub bookmark: Bookmark,
}

/// Directions to a bookmark.
#[derive(Debug, Serialize)]
pub struct NavigateOutcome {
    pub success: bool,
    pub target: Bookmark,
    /// Per-axis step instructions such as `right 3`, only on the same map.
    pub directions: Vec<String>,
    /// Maps to pass through when the target is elsewhere and a route is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Vec<String>>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectionOutcome {
    pub success: bool,
    pub action: BookmarkAction,
    pub connection: MapConnection,
}

/// On-disk layout of the bookmark file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BookmarkFile {
    #[serde(default)]
    bookmarks: BTreeMap<String, Bookmark>,
    #[serde(default)]
    connections: Vec<MapConnection>,
}

#[derive(Debug)]
pub struct BookmarkStore {
    path: PathBuf,
    data: BookmarkFile,
}

impl BookmarkStore {
    /// Load the store from `path`. A missing file starts empty; an unreadable
    /// or corrupt one is moved aside to `<name>.corrupt` and the store starts
    /// empty, so the next write cannot clobber it.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = match read_file(&path) {
            Ok(data) => data,
            Err(e) => {
                let aside = path.with_extension("corrupt");
                match std::fs::rename(&path, &aside) {
                    Ok(()) => tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        moved_to = %aside.display(),
                        "bookmark file unreadable, moved aside and starting empty"
                    ),
                    Err(rename_err) => tracing::warn!(
                        error = %e,
                        rename_error = %rename_err,
                        path = %path.display(),
                        "bookmark file unreadable and could not be moved aside, starting empty"
                    ),
                }
                BookmarkFile::default()
            }
        };
        tracing::debug!(
            bookmarks = data.bookmarks.len(),
            connections = data.connections.len(),
            "bookmark store loaded"
        );
        Self { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create or refresh a named bookmark.
    pub fn bookmark(
        &mut self,
        name: &str,
        position: &PositionData,
        notes: &str,
    ) -> Result<BookmarkOutcome, NavError> {
        let (map, x, y) = position.require()?;
        let now = chrono::Utc::now().to_rfc3339();
        let location_name = position.location_name.clone().unwrap_or_default();

        let action = match self.data.bookmarks.get_mut(name) {
            Some(existing) => {
                existing.map_bank = map.bank;
                existing.map_id = map.id;
                existing.x = x;
                existing.y = y;
                if !location_name.is_empty() {
                    existing.location_name = location_name;
                }
                existing.timestamp = now;
                existing.notes = notes.to_string();
                existing.visit_count += 1;
                BookmarkAction::Updated
            }
            None => {
                self.data.bookmarks.insert(
                    name.to_string(),
                    Bookmark {
                        name: name.to_string(),
                        map_bank: map.bank,
                        map_id: map.id,
                        x,
                        y,
                        location_name,
                        timestamp: now,
                        notes: notes.to_string(),
                        visit_count: 1,
                    },
                );
                BookmarkAction::Created
            }
        };

        self.persist();
        let bookmark = self.data.bookmarks[name].clone();
        tracing::info!(name, ?action, map = %bookmark.map_key(), "bookmark saved");

        Ok(BookmarkOutcome {
            success: true,
            action,
            bookmark,
        })
    }

    /// Directions from `current` (if known) to the bookmark called `name`.
    pub fn navigate_to(
        &self,
        name: &str,
        current: Option<&PositionData>,
    ) -> Result<NavigateOutcome, NavError> {
        let target = self
            .data
            .bookmarks
            .get(name)
            .cloned()
            .ok_or_else(|| NavError::NotFound(name.to_string()))?;

        let Some(current) = current else {
            let message = format!(
                "{} is on map {} at ({}, {})",
                name,
                target.map_key(),
                target.x,
                target.y
            );
            return Ok(NavigateOutcome {
                success: true,
                target,
                directions: Vec::new(),
                route: None,
                message,
            });
        };

        let (here, x, y) = current.require()?;

        if here == target.map_key() {
            let directions = step_directions((x, y), (target.x, target.y));
            let message = if directions.is_empty() {
                format!("Already at {name}")
            } else {
                format!("Go {} to reach {name}", directions.join(", "))
            };
            return Ok(NavigateOutcome {
                success: true,
                target,
                directions,
                route: None,
                message,
            });
        }

        let route = self.find_route(here, target.map_key());
        let message = match &route {
            Some(path) => format!(
                "Travel {} -> {} to reach {name}",
                here.label(),
                path.join(" -> ")
            ),
            None => format!(
                "No known route from map {} to map {}; explore to find a connection",
                here.label(),
                target.map_key().label()
            ),
        };

        Ok(NavigateOutcome {
            success: true,
            target,
            directions: Vec::new(),
            route,
            message,
        })
    }

    /// Record that `to` was reached from `from`. Repeat sightings raise confidence.
    pub fn track_connection(
        &mut self,
        from: MapKey,
        to: MapKey,
        direction: &str,
        method: &str,
    ) -> ConnectionOutcome {
        let now = chrono::Utc::now().to_rfc3339();

        let existing = self
            .data
            .connections
            .iter_mut()
            .find(|c| c.from_map == from && c.to_map == to && c.direction == direction);

        let (action, connection) = match existing {
            Some(conn) => {
                // No ceiling: confidence keeps growing with every sighting.
                conn.confidence += CONFIDENCE_INCREMENT;
                conn.timestamp = now;
                if !method.is_empty() {
                    conn.method = method.to_string();
                }
                (BookmarkAction::Updated, conn.clone())
            }
            None => {
                let conn = MapConnection {
                    from_map: from,
                    to_map: to,
                    direction: direction.to_string(),
                    method: method.to_string(),
                    confidence: INITIAL_CONFIDENCE,
                    timestamp: now,
                };
                self.data.connections.push(conn.clone());
                (BookmarkAction::Created, conn)
            }
        };

        self.persist();
        tracing::debug!(from = %from, to = %to, direction, ?action, "map connection tracked");

        ConnectionOutcome {
            success: true,
            action,
            connection,
        }
    }

    /// Breadth-first search over directed connections.
    ///
    /// Returns the maps after `from` up to and including `to` (fewest hops),
    /// an empty path when `from == to`, or `None` when unreachable.
    pub fn find_route(&self, from: MapKey, to: MapKey) -> Option<Vec<String>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut adjacency: HashMap<MapKey, Vec<MapKey>> = HashMap::new();
        for conn in &self.data.connections {
            adjacency.entry(conn.from_map).or_default().push(conn.to_map);
        }

        let mut parents: HashMap<MapKey, MapKey> = HashMap::new();
        let mut visited: HashSet<MapKey> = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            let Some(neighbors) = adjacency.get(&current) else {
                continue;
            };
            for &next in neighbors {
                if !visited.insert(next) {
                    continue;
                }
                parents.insert(next, current);
                if next == to {
                    let mut path = vec![to];
                    let mut node = to;
                    while let Some(&parent) = parents.get(&node) {
                        if parent == from {
                            break;
                        }
                        path.push(parent);
                        node = parent;
                    }
                    path.reverse();
                    return Some(path.iter().map(MapKey::label).collect());
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// All bookmarks sorted by name.
    pub fn list(&self) -> Vec<Bookmark> {
        self.data.bookmarks.values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Bookmark> {
        self.data.bookmarks.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Result<Bookmark, NavError> {
        let removed = self
            .data
            .bookmarks
            .remove(name)
            .ok_or_else(|| NavError::NotFound(name.to_string()))?;
        self.persist();
        Ok(removed)
    }

    pub fn connections(&self) -> &[MapConnection] {
        &self.data.connections
    }

    /// Best-effort write of the whole store. Failures are logged, the
    /// in-memory state stays authoritative for this process.
    fn persist(&self) {
        if let Err(e) = write_file(&self.path, &self.data) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to persist bookmarks");
        }
    }
}

/// Horizontal first, then vertical, e.g. `["right 3", "up 2"]`.
fn step_directions((x, y): (i64, i64), (to_x, to_y): (i64, i64)) -> Vec<String> {
    let mut steps = Vec::new();
    match to_x.cmp(&x) {
        Ordering::Greater => steps.push(format!("right {}", x.abs_diff(to_x))),
        Ordering::Less => steps.push(format!("left {}", x.abs_diff(to_x))),
        Ordering::Equal => {}
    }
    match to_y.cmp(&y) {
        Ordering::Greater => steps.push(format!("down {}", y.abs_diff(to_y))),
        Ordering::Less => steps.push(format!("up {}", y.abs_diff(to_y))),
        Ordering::Equal => {}
    }
    steps
}

fn read_file(path: &Path) -> Result<BookmarkFile> {
    if !path.exists() {
        return Ok(BookmarkFile::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).context("failed to parse bookmark JSON")
}

fn write_file(path: &Path, data: &BookmarkFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(data)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path).context("failed to rename temp bookmark file")?;
    Ok(())
}
