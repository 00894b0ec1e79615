use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct NavigationContextParams {
    #[schemars(description = "Current map id")]
    pub map_id: i64,

    #[schemars(description = "Current tile x coordinate")]
    pub x: i64,

    #[schemars(description = "Current tile y coordinate (grows downward)")]
    pub y: i64,

    #[schemars(
        description = "Free-text goal, e.g. 'heal at pokemon center', 'find the exit', 'battle trainer'"
    )]
    pub goal: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct NearbyLandmarksParams {
    #[schemars(description = "Current map id")]
    pub map_id: i64,

    #[schemars(description = "Current tile x coordinate")]
    pub x: i64,

    #[schemars(description = "Current tile y coordinate")]
    pub y: i64,

    #[schemars(description = "Search radius in tiles. Defaults to the configured landmark radius.")]
    pub radius: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct NavigationStatsParams {
    #[schemars(description = "How many recent turns to critique. Defaults to the full history.")]
    pub critique_window: Option<usize>,
}
