use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::spatial::types::{Direction, PartySnapshot, Position, SceneInfo};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecordPositionParams {
    #[schemars(description = "Current map id")]
    pub map_id: i64,

    #[schemars(description = "Current tile x coordinate")]
    pub x: i64,

    #[schemars(description = "Current tile y coordinate")]
    pub y: i64,

    #[schemars(description = "Human-readable map name, if known")]
    pub map_name: Option<String>,

    #[schemars(description = "Scene type, e.g. 'overworld', 'building', 'cave'. Defaults to 'overworld'.")]
    pub scene_type: Option<String>,

    #[schemars(description = "Directions that are open from this tile: up, down, left, right")]
    pub valid_movements: Option<Vec<String>>,

    #[schemars(description = "Path or id of the screenshot taken at this position")]
    pub screenshot_ref: Option<String>,

    #[schemars(description = "Map id before the last step, to record the attempted move")]
    pub from_map_id: Option<i64>,

    #[schemars(description = "Tile x before the last step")]
    pub from_x: Option<i64>,

    #[schemars(description = "Tile y before the last step")]
    pub from_y: Option<i64>,

    #[schemars(description = "Direction of the last step. Success means the position changed. Inferred when from_* is one tile away.")]
    pub direction: Option<String>,
}

/// A step the agent attempted before arriving at the reported position.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptedStep {
    pub from: Position,
    pub direction: Direction,
}

impl AttemptedStep {
    /// A step succeeded when the agent ended up somewhere else.
    pub fn succeeded(&self, current: &Position) -> bool {
        self.from != *current
    }
}

/// A `record_position` call translated into domain types.
#[derive(Debug, Clone)]
pub struct PositionReport {
    pub current: Position,
    pub scene: SceneInfo,
    pub screenshot_ref: String,
    pub step: Option<AttemptedStep>,
}

impl RecordPositionParams {
    /// Validate direction tokens and assemble the report. The step direction
    /// falls back to the single-tile move from `from_*` to the current tile.
    pub fn into_report(self) -> Result<PositionReport, String> {
        let current = Position::new(self.map_id, self.x, self.y);

        let valid_movements = self
            .valid_movements
            .unwrap_or_default()
            .iter()
            .map(|t| t.parse::<Direction>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        let direction = self
            .direction
            .as_deref()
            .map(str::parse::<Direction>)
            .transpose()?;

        let from = match (self.from_x, self.from_y) {
            (Some(fx), Some(fy)) => Some(Position::new(
                self.from_map_id.unwrap_or(self.map_id),
                fx,
                fy,
            )),
            _ => None,
        };
        let step = from.and_then(|from| {
            direction
                .or_else(|| Direction::between(&from, &current))
                .map(|direction| AttemptedStep { from, direction })
        });

        let mut scene = SceneInfo {
            map_name: self.map_name.unwrap_or_default(),
            valid_movements,
            ..Default::default()
        };
        if let Some(scene_type) = self.scene_type {
            scene.scene_type = scene_type;
        }

        Ok(PositionReport {
            current,
            scene,
            screenshot_ref: self.screenshot_ref.unwrap_or_default(),
            step,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TagLocationParams {
    #[schemars(description = "Current map id")]
    pub map_id: i64,

    #[schemars(description = "Current tile x coordinate")]
    pub x: i64,

    #[schemars(description = "Current tile y coordinate")]
    pub y: i64,

    #[schemars(description = "Kind of place, e.g. 'pokemon_center', 'shop', 'gym', 'exit'")]
    pub location_type: String,

    #[schemars(description = "Name to remember the place by")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecordHealingVisitParams {
    #[schemars(description = "Map id of the healing spot. All of map_id, x, y are required to record it.")]
    pub map_id: Option<i64>,

    #[schemars(description = "Tile x of the healing spot")]
    pub x: Option<i64>,

    #[schemars(description = "Tile y of the healing spot")]
    pub y: Option<i64>,

    #[schemars(description = "Map name, if known")]
    pub map_name: Option<String>,

    #[schemars(description = "Place name, e.g. 'Viridian City Pokemon Center'")]
    pub location_name: Option<String>,

    #[schemars(description = "Party health before the attempt")]
    pub before: PartySnapshot,

    #[schemars(description = "Party health after the attempt")]
    pub after: PartySnapshot,

    #[schemars(description = "Seconds the attempt took. Defaults to 0.")]
    pub duration: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecordTurnParams {
    #[schemars(description = "Monotonic turn counter")]
    pub turn_number: u64,

    #[schemars(description = "Path to the screenshot taken after the buttons were pressed")]
    pub screenshot_path: String,

    #[schemars(description = "Buttons pressed this turn: up, down, left, right, a, b, start, select")]
    pub buttons: Vec<String>,

    #[schemars(description = "The model's reasoning for this turn")]
    pub reasoning: Option<String>,
}
