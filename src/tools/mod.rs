pub mod bookmarks;
pub mod context;
pub mod feedback;
pub mod planning;

use bookmarks::{BookmarkLocationParams, NavigateToBookmarkParams, TrackMapConnectionParams};
use context::{NavigationContextParams, NavigationStatsParams, NearbyLandmarksParams};
use feedback::{
    PositionReport, RecordHealingVisitParams, RecordPositionParams, RecordTurnParams,
    TagLocationParams,
};
use planning::{PlanRouteParams, PlanToHealingParams};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::PokenavConfig;
use crate::error::NavError;
use crate::navigation::enhancer::LoopEnhancer;
use crate::spatial::bookmarks::PositionData;
use crate::spatial::healing::{detect_healing_success, HealingSite};
use crate::spatial::planner::Planner;
use crate::spatial::types::{Button, MapKey, Position};

/// The pokenav MCP tool handler. Holds the shared planner, loop enhancer and
/// config, and exposes all MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct PokenavTools {
    tool_router: ToolRouter<Self>,
    planner: Arc<Mutex<Planner>>,
    enhancer: Arc<Mutex<LoopEnhancer>>,
    config: Arc<PokenavConfig>,
}

#[tool_router]
impl PokenavTools {
    pub fn new(
        planner: Arc<Mutex<Planner>>,
        enhancer: Arc<Mutex<LoopEnhancer>>,
        config: Arc<PokenavConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            planner,
            enhancer,
            config,
        }
    }

    #[tool(description = "Short navigation advisory for the current position and goal: map, nearby landmarks, and a healing route or battle/exit hint when the goal asks for one. Empty when nothing is known.")]
    async fn navigation_context(
        &self,
        Parameters(params): Parameters<NavigationContextParams>,
    ) -> Result<String, String> {
        let current = Position::new(params.map_id, params.x, params.y);
        let goal = params.goal.unwrap_or_default();
        tracing::debug!(%current, goal = %goal, "navigation_context called");

        self.with_planner(move |planner| {
            let context = planner.navigation_context_text(&current, &goal);
            serde_json::json!({ "success": true, "context": context })
        })
        .await
    }

    #[tool(description = "List up to 8 visited tiles and healing spots near the current position, closest first.")]
    async fn nearby_landmarks(
        &self,
        Parameters(params): Parameters<NearbyLandmarksParams>,
    ) -> Result<String, String> {
        let current = Position::new(params.map_id, params.x, params.y);
        let radius = params
            .radius
            .unwrap_or(self.config.navigation.landmark_radius);
        tracing::debug!(%current, radius, "nearby_landmarks called");

        self.with_planner(move |planner| planner.nearby_landmarks(&current, radius))
            .await
    }

    #[tool(description = "Plan a button sequence from the current tile to a target tile on the same map (horizontal moves first, then vertical).")]
    async fn plan_route(
        &self,
        Parameters(params): Parameters<PlanRouteParams>,
    ) -> Result<String, String> {
        let current = Position::new(params.map_id, params.x, params.y);
        let target = Position::new(
            params.target_map_id.unwrap_or(params.map_id),
            params.target_x,
            params.target_y,
        );
        let reason = params.reason.unwrap_or_else(|| "route".to_string());
        tracing::info!(%current, %target, "plan_route called");

        self.with_planner(move |planner| {
            if current.map_id != target.map_id {
                planner.route_between(&current, &target)
            } else {
                planner.plan_to(&current, target.x, target.y, &reason)
            }
        })
        .await
    }

    #[tool(description = "Plan a route to the closest healing spot on this map that has healed the party before.")]
    async fn plan_to_healing(
        &self,
        Parameters(params): Parameters<PlanToHealingParams>,
    ) -> Result<String, String> {
        let current = Position::new(params.map_id, params.x, params.y);
        tracing::info!(%current, "plan_to_healing called");

        self.with_planner(move |planner| planner.plan_to_healing(&current))
            .await
    }

    #[tool(description = "Record the agent's current tile. Pass from_* and direction to also record the step that led here.")]
    async fn record_position(
        &self,
        Parameters(params): Parameters<RecordPositionParams>,
    ) -> Result<String, String> {
        let report = match params.into_report() {
            Ok(report) => report,
            Err(e) => return Ok(failure(e)),
        };
        tracing::debug!(current = %report.current, "record_position called");

        self.with_planner(move |planner| record_report(planner, &report))
            .await
    }

    #[tool(description = "Tag the current tile with a location type and name, e.g. a Pokemon Center entrance or a gym door.")]
    async fn tag_location(
        &self,
        Parameters(params): Parameters<TagLocationParams>,
    ) -> Result<String, String> {
        let current = Position::new(params.map_id, params.x, params.y);
        tracing::info!(%current, name = %params.name, "tag_location called");

        self.with_planner(move |planner| {
            planner.bookmark_here(&current, &params.location_type, &params.name)
        })
        .await
    }

    #[tool(description = "Record a healing attempt at a location. Success is derived from the before/after party health.")]
    async fn record_healing_visit(
        &self,
        Parameters(params): Parameters<RecordHealingVisitParams>,
    ) -> Result<String, String> {
        let position = match (params.map_id, params.x, params.y) {
            (Some(map_id), Some(x), Some(y)) => Some(Position::new(map_id, x, y)),
            _ => None,
        };
        let site = HealingSite {
            position,
            map_name: params.map_name.unwrap_or_default(),
            location_name: params.location_name.unwrap_or_default(),
        };
        let before = params.before;
        let after = params.after;
        let duration = params.duration.unwrap_or(0.0);

        self.with_planner(move |planner| {
            let healed = detect_healing_success(&before, &after);
            let recorded = planner.record_healing_visit(&site, &before, &after, duration);
            let mut response = serde_json::json!({
                "success": recorded,
                "healed": healed,
            });
            if site.position.is_none() {
                response["error"] =
                    NavError::MissingData(vec!["map_id".into(), "x".into(), "y".into()])
                        .to_string()
                        .into();
            }
            response
        })
        .await
    }

    #[tool(description = "Save the current position under a name. Re-using a name updates the bookmark and bumps its visit count.")]
    async fn bookmark_location(
        &self,
        Parameters(params): Parameters<BookmarkLocationParams>,
    ) -> Result<String, String> {
        tracing::info!(name = %params.name, "bookmark_location called");
        let position = PositionData {
            map_bank: params.map_bank,
            map_id: params.map_id,
            x: params.x,
            y: params.y,
            location_name: params.location_name,
        };
        let notes = params.notes.unwrap_or_default();
        let name = params.name;

        self.with_planner(move |planner| {
            planner
                .bookmarks_mut()
                .and_then(|store| store.bookmark(&name, &position, &notes))
                .map_or_else(|e| e.to_json(), to_value)
        })
        .await
    }

    #[tool(description = "Directions from the current position to a named bookmark, or a map-to-map route when it is on another map.")]
    async fn navigate_to_bookmark(
        &self,
        Parameters(params): Parameters<NavigateToBookmarkParams>,
    ) -> Result<String, String> {
        tracing::info!(name = %params.name, "navigate_to_bookmark called");
        let current = params.current_position();
        let name = params.name;

        self.with_planner(move |planner| {
            planner
                .bookmarks()
                .and_then(|store| store.navigate_to(&name, current.as_ref()))
                .map_or_else(|e| e.to_json(), to_value)
        })
        .await
    }

    #[tool(description = "Record that walking or warping from one map led to another. Repeat sightings raise the connection's confidence.")]
    async fn track_map_connection(
        &self,
        Parameters(params): Parameters<TrackMapConnectionParams>,
    ) -> Result<String, String> {
        let from = MapKey::new(params.from_bank, params.from_id);
        let to = MapKey::new(params.to_bank, params.to_id);
        let method = params.method.unwrap_or_else(|| "walk".to_string());
        let direction = params.direction;
        tracing::info!(from = %from, to = %to, "track_map_connection called");

        self.with_planner(move |planner| {
            planner
                .bookmarks_mut()
                .map(|store| store.track_connection(from, to, &direction, &method))
                .map_or_else(|e| e.to_json(), to_value)
        })
        .await
    }

    #[tool(description = "Report the turn just played (screenshot and buttons). Returns loop/stuck detection, a recovery suggestion when stuck, and a confidence score.")]
    async fn record_turn(
        &self,
        Parameters(params): Parameters<RecordTurnParams>,
    ) -> Result<String, String> {
        let buttons = match parse_tokens::<Button>(params.buttons) {
            Ok(buttons) => buttons,
            Err(e) => return Ok(failure(e)),
        };
        let screenshot = PathBuf::from(params.screenshot_path);
        let reasoning = params.reasoning.unwrap_or_default();
        let turn_number = params.turn_number;

        let enhancer = Arc::clone(&self.enhancer);
        let analysis = tokio::task::spawn_blocking(move || {
            let mut enhancer = enhancer
                .lock()
                .map_err(|e| format!("enhancer lock poisoned: {e}"))?;
            Ok::<_, String>(enhancer.ingest_turn(turn_number, &screenshot, &buttons, &reasoning))
        })
        .await
        .map_err(|e| format!("enhancer task failed: {e}"))??;

        serde_json::to_string(&analysis).map_err(|e| format!("serialization failed: {e}"))
    }

    #[tool(description = "Statistics for spatial memory (coordinates, healing spots, bookmarks) and a critique of recent navigation turns.")]
    async fn navigation_stats(
        &self,
        Parameters(params): Parameters<NavigationStatsParams>,
    ) -> Result<String, String> {
        let window = params
            .critique_window
            .unwrap_or(self.config.navigation.history_size);

        let spatial = self
            .with_planner(|planner| planner.statistics().map_or_else(|e| e.to_json(), to_value))
            .await?;

        let enhancer = Arc::clone(&self.enhancer);
        let navigation = tokio::task::spawn_blocking(move || {
            let enhancer = enhancer
                .lock()
                .map_err(|e| format!("enhancer lock poisoned: {e}"))?;
            Ok::<_, String>(serde_json::json!({
                "state": enhancer.state(),
                "confidence": enhancer.confidence(),
                "turns_recorded": enhancer.history().len(),
                "critique": enhancer.critique(window),
            }))
        })
        .await
        .map_err(|e| format!("enhancer task failed: {e}"))??;

        let spatial: serde_json::Value =
            serde_json::from_str(&spatial).map_err(|e| format!("serialization failed: {e}"))?;
        Ok(serde_json::json!({ "spatial": spatial, "navigation": navigation }).to_string())
    }
}

impl PokenavTools {
    /// Run `f` against the planner on the blocking pool and serialize its result.
    async fn with_planner<T, F>(&self, f: F) -> Result<String, String>
    where
        F: FnOnce(&mut Planner) -> T + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let planner = Arc::clone(&self.planner);
        let result = tokio::task::spawn_blocking(move || {
            let mut planner = planner
                .lock()
                .map_err(|e| format!("planner lock poisoned: {e}"))?;
            Ok::<_, String>(f(&mut planner))
        })
        .await
        .map_err(|e| format!("planner task failed: {e}"))??;

        serde_json::to_string(&result).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for PokenavTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "pokenav is spatial memory for a game-playing agent. Call record_position and \
                 record_turn every turn, navigation_context before deciding, and plan_route or \
                 plan_to_healing when you know where to go."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

/// Store a reported position and, when present, the step that led to it.
fn record_report(planner: &Planner, report: &PositionReport) -> serde_json::Value {
    let recorded = planner.record_position(&report.current, &report.scene, &report.screenshot_ref);
    let step_recorded = report.step.as_ref().map(|step| {
        planner.record_step(
            &step.from,
            &report.current,
            step.direction,
            step.succeeded(&report.current),
        )
    });
    serde_json::json!({
        "success": recorded,
        "position": report.current,
        "step_recorded": step_recorded,
    })
}

fn to_value<T: Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        NavError::Storage(format!("serialization failed: {e}")).to_json()
    })
}

fn failure(message: impl std::fmt::Display) -> String {
    serde_json::json!({ "success": false, "error": message.to_string() }).to_string()
}

fn parse_tokens<T>(tokens: Vec<String>) -> Result<Vec<T>, String>
where
    T: std::str::FromStr<Err = String>,
{
    tokens.iter().map(|t| t.parse::<T>()).collect()
}
