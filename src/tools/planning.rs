use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlanRouteParams {
    #[schemars(description = "Current map id")]
    pub map_id: i64,

    #[schemars(description = "Current tile x coordinate")]
    pub x: i64,

    #[schemars(description = "Current tile y coordinate")]
    pub y: i64,

    #[schemars(description = "Target tile x coordinate")]
    pub target_x: i64,

    #[schemars(description = "Target tile y coordinate")]
    pub target_y: i64,

    #[schemars(
        description = "Target map id. Omit for the current map; a different map is rejected."
    )]
    pub target_map_id: Option<i64>,

    #[schemars(description = "Why the agent wants to go there, echoed in the reasoning")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlanToHealingParams {
    #[schemars(description = "Current map id")]
    pub map_id: i64,

    #[schemars(description = "Current tile x coordinate")]
    pub x: i64,

    #[schemars(description = "Current tile y coordinate")]
    pub y: i64,
}
