//! Core spatial type definitions.
//!
//! Defines the movement vocabulary ([`Direction`], [`Button`]), grid positions,
//! the records persisted by the coordinate and healing databases, the party
//! health snapshot used for healing detection, and the bookmark-file records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One of the four grid movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// The two directions on the other axis.
    pub fn perpendicular(&self) -> [Direction; 2] {
        match self {
            Self::Up | Self::Down => [Self::Left, Self::Right],
            Self::Left | Self::Right => [Self::Up, Self::Down],
        }
    }

    /// Direction of a single grid step from `from` to `to`, if they are
    /// adjacent cells of the same map.
    pub fn between(from: &Position, to: &Position) -> Option<Direction> {
        if from.map_id != to.map_id {
            return None;
        }
        let dx = to.x.checked_sub(from.x)?;
        let dy = to.y.checked_sub(from.y)?;
        match (dx, dy) {
            (1, 0) => Some(Self::Right),
            (-1, 0) => Some(Self::Left),
            (0, 1) => Some(Self::Down),
            (0, -1) => Some(Self::Up),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(format!("unknown direction: {s}")),
        }
    }
}

/// The fixed emulator button vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

impl Button {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::A => "a",
            Self::B => "b",
            Self::Start => "start",
            Self::Select => "select",
        }
    }

    /// The movement direction for d-pad buttons, `None` for everything else.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::Up => Some(Direction::Up),
            Self::Down => Some(Direction::Down),
            Self::Left => Some(Direction::Left),
            Self::Right => Some(Direction::Right),
            _ => None,
        }
    }
}

impl From<Direction> for Button {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Up => Self::Up,
            Direction::Down => Self::Down,
            Direction::Left => Self::Left,
            Direction::Right => Self::Right,
        }
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            "start" => Ok(Self::Start),
            "select" => Ok(Self::Select),
            _ => Err(format!("unknown button: {s}")),
        }
    }
}

/// A cell on a map, as read from emulator RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub map_id: i64,
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn new(map_id: i64, x: i64, y: i64) -> Self {
        Self { map_id, x, y }
    }

    /// `|Δx| + |Δy|`, saturating at `i64::MAX`. The map is not compared.
    pub fn manhattan(&self, x: i64, y: i64) -> i64 {
        let distance = self.x.abs_diff(x).saturating_add(self.y.abs_diff(y));
        i64::try_from(distance).unwrap_or(i64::MAX)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "map {} ({}, {})", self.map_id, self.x, self.y)
    }
}

/// What the agent knows about the scene at the moment a coordinate is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneInfo {
    pub map_name: String,
    pub scene_type: String,
    pub valid_movements: BTreeSet<Direction>,
}

impl Default for SceneInfo {
    fn default() -> Self {
        Self {
            map_name: String::new(),
            scene_type: "overworld".into(),
            valid_movements: BTreeSet::new(),
        }
    }
}

/// A visited cell, matching the `coordinates` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRecord {
    pub map_id: i64,
    pub x: i64,
    pub y: i64,
    pub screenshot_ref: String,
    /// RFC 3339 time of the latest visit in this session.
    pub timestamp: String,
    pub session_id: String,
    pub map_name: String,
    pub scene_type: String,
    pub valid_movements: BTreeSet<Direction>,
}

/// A coordinate returned by a proximity query.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyCoordinate {
    #[serde(flatten)]
    pub record: CoordinateRecord,
    pub distance: i64,
}

/// An empirically observed step between two cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementConnection {
    pub from: Position,
    pub to: Position,
    pub direction: Direction,
    pub session_id: String,
    pub success_count: u32,
    pub failure_count: u32,
    pub last_used: String,
}

/// Per-map rollup maintained alongside coordinate inserts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMetadata {
    pub map_id: i64,
    pub map_name: String,
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
    pub total_coordinates: u64,
    pub last_visited: String,
}

/// Coarse party health classification read from the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Fair,
    Poor,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

impl HealthStatus {
    /// Statuses from which a transition to `Healthy` counts as a heal.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Poor | Self::Critical)
    }
}

/// Party health before or after a healing attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PartySnapshot {
    pub party_health_status: HealthStatus,
    pub fainted_pokemon: u32,
    pub healthy_pokemon: u32,
    pub needs_healing: bool,
}

/// A place where healing has been attempted, matching `healing_locations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealingLocation {
    pub id: i64,
    pub map_id: i64,
    pub x: i64,
    pub y: i64,
    pub map_name: String,
    pub location_name: String,
    pub success_count: u32,
    pub failure_count: u32,
    /// Seconds, updated as `(old + sample) / 2` on each success.
    pub average_healing_time: f64,
    pub last_used: String,
}

impl HealingLocation {
    pub fn total_attempts(&self) -> u32 {
        self.success_count + self.failure_count
    }

    /// Fraction of attempts that healed the party; 0.0 when never attempted.
    pub fn success_rate(&self) -> f64 {
        match self.total_attempts() {
            0 => 0.0,
            total => self.success_count as f64 / total as f64,
        }
    }

    pub fn display_name(&self) -> &str {
        if !self.location_name.is_empty() {
            &self.location_name
        } else if !self.map_name.is_empty() {
            &self.map_name
        } else {
            "healing spot"
        }
    }
}

/// One logged healing attempt. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealingSession {
    pub id: i64,
    pub location_id: i64,
    pub session_id: String,
    pub before: PartySnapshot,
    pub after: PartySnapshot,
    pub duration: f64,
    pub success: bool,
    pub timestamp: String,
}

/// A map identified by its ROM bank and number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MapKey {
    pub bank: i64,
    pub id: i64,
}

impl MapKey {
    pub fn new(bank: i64, id: i64) -> Self {
        Self { bank, id }
    }

    /// Label used in routes and on the command line, e.g. `3-1`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.bank, self.id)
    }
}

impl std::fmt::Display for MapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.bank, self.id)
    }
}

impl std::str::FromStr for MapKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (bank, id) = s
            .split_once('-')
            .ok_or_else(|| format!("map label must look like BANK-ID: {s}"))?;
        let bank = bank
            .trim()
            .parse()
            .map_err(|_| format!("invalid map bank in {s}"))?;
        let id = id
            .trim()
            .parse()
            .map_err(|_| format!("invalid map id in {s}"))?;
        Ok(Self { bank, id })
    }
}

/// A named location in the bookmark file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    pub map_bank: i64,
    pub map_id: i64,
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub location_name: String,
    pub timestamp: String,
    #[serde(default)]
    pub notes: String,
    pub visit_count: u32,
}

impl Bookmark {
    pub fn map_key(&self) -> MapKey {
        MapKey::new(self.map_bank, self.map_id)
    }
}

/// A directed edge between two maps in the bookmark graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConnection {
    pub from_map: MapKey,
    pub to_map: MapKey,
    pub direction: String,
    pub method: String,
    pub confidence: f64,
    pub timestamp: String,
}
