use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spatial::bookmarks::PositionData;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BookmarkLocationParams {
    #[schemars(description = "Bookmark name; re-using a name updates it")]
    pub name: String,

    #[schemars(description = "Current map bank")]
    pub map_bank: Option<i64>,

    #[schemars(description = "Current map id")]
    pub map_id: Option<i64>,

    #[schemars(description = "Current tile x coordinate")]
    pub x: Option<i64>,

    #[schemars(description = "Current tile y coordinate")]
    pub y: Option<i64>,

    #[schemars(description = "Place name, if known")]
    pub location_name: Option<String>,

    #[schemars(description = "Free-form notes")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct NavigateToBookmarkParams {
    #[schemars(description = "Name of the bookmark to navigate to")]
    pub name: String,

    #[schemars(description = "Current map bank. Omit all current fields to just look the bookmark up.")]
    pub map_bank: Option<i64>,

    #[schemars(description = "Current map id")]
    pub map_id: Option<i64>,

    #[schemars(description = "Current tile x coordinate")]
    pub x: Option<i64>,

    #[schemars(description = "Current tile y coordinate")]
    pub y: Option<i64>,
}

impl NavigateToBookmarkParams {
    /// The caller's position, or `None` when no current field was given.
    /// A partial position is kept so the store can report what is missing.
    pub fn current_position(&self) -> Option<PositionData> {
        if self.map_bank.is_none() && self.map_id.is_none() && self.x.is_none() && self.y.is_none()
        {
            return None;
        }
        Some(PositionData {
            map_bank: self.map_bank,
            map_id: self.map_id,
            x: self.x,
            y: self.y,
            location_name: None,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TrackMapConnectionParams {
    #[schemars(description = "Map bank the agent left")]
    pub from_bank: i64,

    #[schemars(description = "Map id the agent left")]
    pub from_id: i64,

    #[schemars(description = "Map bank the agent arrived on")]
    pub to_bank: i64,

    #[schemars(description = "Map id the agent arrived on")]
    pub to_id: i64,

    #[schemars(description = "Direction of travel, e.g. 'north' or 'up'")]
    pub direction: String,

    #[schemars(description = "How the maps connect, e.g. 'walk', 'door', 'warp'")]
    pub method: Option<String>,
}
