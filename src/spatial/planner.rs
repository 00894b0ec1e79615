//! Pathfinding planner: turns coordinate goals into button sequences and
//! short advisory text for the decision prompt.
//!
//! Paths are greedy and axis-sequential: every horizontal step first, then
//! every vertical step. Nothing here knows about walls, so a plan is a
//! suggestion for the decision function, not a guaranteed route. Cross-map
//! travel is the bookmark graph's job ([`BookmarkStore::find_route`]).

use anyhow::Result;
use serde::Serialize;

use super::bookmarks::BookmarkStore;
use super::coordinates::{CoordinateStats, CoordinateStore};
use super::healing::{HealingRegistry, HealingSite, HealingStats};
use super::types::{Button, Direction, PartySnapshot, Position, SceneInfo};
use crate::config::PokenavConfig;
use crate::error::NavError;

/// Maximum coordinate neighbours merged into a landmark report.
const MAX_COORDINATE_LANDMARKS: usize = 5;
/// Maximum landmarks returned after merging.
const MAX_LANDMARKS: usize = 8;
/// Landmarks listed in the prompt context.
const CONTEXT_LANDMARKS: usize = 3;
/// Longest button sequence a plan may contain. Real maps are far smaller.
pub const MAX_PLAN_STEPS: i64 = 512;
/// Widest landmark search; larger radii are clamped to this.
pub const MAX_LANDMARK_RADIUS: i64 = 256;

/// Tunables copied out of [`PokenavConfig`].
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub session_id: String,
    pub step_time_secs: f64,
    pub healing_search_distance: i64,
    pub landmark_radius: i64,
}

impl PlannerSettings {
    pub fn from_config(config: &PokenavConfig) -> Self {
        Self {
            session_id: config.resolved_session_id(),
            step_time_secs: config.navigation.step_time_secs,
            healing_search_distance: config.navigation.healing_search_distance,
            landmark_radius: config.navigation.landmark_radius,
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self::from_config(&PokenavConfig::default())
    }
}

/// A movement suggestion.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub success: bool,
    pub button_sequence: Vec<Button>,
    pub distance: i64,
    pub reasoning: String,
    pub observations: Vec<String>,
    /// Seconds, at a fixed time per step.
    pub estimated_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanResult {
    fn failure(error: &NavError) -> Self {
        Self {
            success: false,
            button_sequence: Vec::new(),
            distance: 0,
            reasoning: error.to_string(),
            observations: Vec::new(),
            estimated_time: 0.0,
            target: None,
            error: Some(error.to_string()),
        }
    }

    /// "Can't help" outcome: not an error, just nothing to suggest.
    fn advisory(reasoning: String, observations: Vec<String>) -> Self {
        Self {
            success: false,
            button_sequence: Vec::new(),
            distance: 0,
            reasoning,
            observations,
            estimated_time: 0.0,
            target: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkKind {
    Coordinate,
    Healing,
}

#[derive(Debug, Clone, Serialize)]
pub struct Landmark {
    #[serde(rename = "type")]
    pub kind: LandmarkKind,
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub distance: i64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LandmarkReport {
    pub success: bool,
    pub landmarks: Vec<Landmark>,
    pub total_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkHereResult {
    pub success: bool,
    pub position: Position,
    pub location_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NavigationStats {
    pub session_id: String,
    pub coordinates: CoordinateStats,
    pub healing: HealingStats,
    pub bookmarks: usize,
    pub map_connections: usize,
}

/// The three stores the planner composes.
#[derive(Debug)]
struct Stores {
    coordinates: CoordinateStore,
    healing: HealingRegistry,
    bookmarks: BookmarkStore,
}

#[derive(Debug)]
pub struct Planner {
    stores: Result<Stores, NavError>,
    settings: PlannerSettings,
}

impl Planner {
    pub fn new(
        coordinates: CoordinateStore,
        healing: HealingRegistry,
        bookmarks: BookmarkStore,
        settings: PlannerSettings,
    ) -> Self {
        Self {
            stores: Ok(Stores {
                coordinates,
                healing,
                bookmarks,
            }),
            settings,
        }
    }

    /// A planner whose every entry point reports `reason` as unavailable.
    pub fn disabled(reason: &str, settings: PlannerSettings) -> Self {
        Self {
            stores: Err(NavError::Unavailable(format!("spatial memory ({reason})"))),
            settings,
        }
    }

    /// Open all stores from config. Never fails: on error the planner is
    /// returned in the disabled state.
    pub fn open(config: &PokenavConfig) -> Self {
        let settings = PlannerSettings::from_config(config);
        match open_stores(config) {
            Ok(stores) => {
                tracing::info!(session = %settings.session_id, "spatial memory ready");
                Self {
                    stores: Ok(stores),
                    settings,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "spatial memory disabled");
                Self::disabled(&e.to_string(), settings)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.stores.is_ok()
    }

    fn stores(&self) -> Result<&Stores, NavError> {
        self.stores.as_ref().map_err(|e| e.clone())
    }

    pub fn coordinates(&self) -> Result<&CoordinateStore, NavError> {
        self.stores().map(|s| &s.coordinates)
    }

    pub fn healing(&self) -> Result<&HealingRegistry, NavError> {
        self.stores().map(|s| &s.healing)
    }

    pub fn bookmarks(&self) -> Result<&BookmarkStore, NavError> {
        self.stores().map(|s| &s.bookmarks)
    }

    pub fn bookmarks_mut(&mut self) -> Result<&mut BookmarkStore, NavError> {
        self.stores
            .as_mut()
            .map(|s| &mut s.bookmarks)
            .map_err(|e| e.clone())
    }

    /// Greedy Manhattan plan from `current` to `(target_x, target_y)` on the same map.
    pub fn plan_to(
        &self,
        current: &Position,
        target_x: i64,
        target_y: i64,
        reason: &str,
    ) -> PlanResult {
        if let Err(e) = self.stores() {
            return PlanResult::failure(&e);
        }

        let distance = current.manhattan(target_x, target_y);
        if distance > MAX_PLAN_STEPS {
            return PlanResult::failure(&NavError::TooFar {
                distance,
                limit: MAX_PLAN_STEPS,
            });
        }

        let button_sequence = greedy_path(current.x, current.y, target_x, target_y);
        let target = Position::new(current.map_id, target_x, target_y);

        let reasoning = if distance == 0 {
            format!("Already at ({target_x}, {target_y}) for {reason}")
        } else {
            format!(
                "Move from ({}, {}) to ({target_x}, {target_y}) for {reason}: {}",
                current.x,
                current.y,
                summarize_buttons(&button_sequence)
            )
        };

        let mut observations = vec![format!("Target is {distance} steps away")];
        if distance > 0 {
            observations
                .push("Path assumes open ground; sidestep and retry if blocked".to_string());
        }

        PlanResult {
            success: true,
            distance,
            estimated_time: distance as f64 * self.settings.step_time_secs,
            button_sequence,
            reasoning,
            observations,
            target: Some(target),
            error: None,
        }
    }

    /// Plan to the closest proven healing spot on this map.
    pub fn plan_to_healing(&self, current: &Position) -> PlanResult {
        let healing = match self.healing() {
            Ok(h) => h,
            Err(e) => return PlanResult::failure(&e),
        };

        match healing.nearest(current, self.settings.healing_search_distance) {
            Some(location) => {
                let reason = format!("healing at {}", location.display_name());
                let mut plan = self.plan_to(current, location.x, location.y, &reason);
                plan.observations.push(format!(
                    "{} has healed the party {} of {} times",
                    location.display_name(),
                    location.success_count,
                    location.total_attempts()
                ));
                plan
            }
            None => PlanResult::advisory(
                "No known healing location on this map; explore to find a Pokémon Center"
                    .to_string(),
                vec![
                    "Pokémon Centers have a red roof and sit in towns".to_string(),
                    "Walk to the counter and press A to heal".to_string(),
                ],
            ),
        }
    }

    /// Tag the current cell in the coordinate store with a location type and name.
    pub fn bookmark_here(
        &self,
        current: &Position,
        location_type: &str,
        name: &str,
    ) -> BookmarkHereResult {
        let mut result = BookmarkHereResult {
            success: false,
            position: *current,
            location_type: location_type.to_string(),
            name: name.to_string(),
            error: None,
        };

        let coordinates = match self.coordinates() {
            Ok(c) => c,
            Err(e) => {
                result.error = Some(e.to_string());
                return result;
            }
        };

        let scene = SceneInfo {
            map_name: name.to_string(),
            scene_type: location_type.to_string(),
            ..Default::default()
        };
        result.success = coordinates.record(current, "", &self.settings.session_id, &scene);
        if !result.success {
            result.error = Some(NavError::Storage("coordinate write failed".into()).to_string());
        }
        result
    }

    /// Closest known coordinates and healing spots around `current`.
    /// `radius` is clamped to `0..=MAX_LANDMARK_RADIUS`.
    pub fn nearby_landmarks(&self, current: &Position, radius: i64) -> LandmarkReport {
        let radius = radius.clamp(0, MAX_LANDMARK_RADIUS);
        let stores = match self.stores() {
            Ok(s) => s,
            Err(e) => {
                return LandmarkReport {
                    success: false,
                    landmarks: Vec::new(),
                    total_found: 0,
                    error: Some(e.to_string()),
                }
            }
        };

        let mut landmarks: Vec<Landmark> = stores
            .coordinates
            .query_near(current.map_id, current.x, current.y, radius)
            .into_iter()
            .filter(|n| n.distance > 0)
            .take(MAX_COORDINATE_LANDMARKS)
            .map(|n| Landmark {
                kind: LandmarkKind::Coordinate,
                name: if n.record.map_name.is_empty() {
                    format!("({}, {})", n.record.x, n.record.y)
                } else {
                    n.record.map_name.clone()
                },
                x: n.record.x,
                y: n.record.y,
                distance: n.distance,
                detail: n.record.scene_type,
            })
            .collect();

        landmarks.extend(
            stores
                .healing
                .all(Some(current.map_id))
                .into_iter()
                .map(|loc| (current.manhattan(loc.x, loc.y), loc))
                .filter(|(distance, _)| *distance <= radius)
                .map(|(distance, loc)| Landmark {
                    kind: LandmarkKind::Healing,
                    name: loc.display_name().to_string(),
                    x: loc.x,
                    y: loc.y,
                    distance,
                    detail: format!("{}/{} heals", loc.success_count, loc.total_attempts()),
                }),
        );

        // Stable sort keeps coordinates ahead of healing spots at equal distance.
        landmarks.sort_by_key(|l| l.distance);
        landmarks.truncate(MAX_LANDMARKS);

        LandmarkReport {
            success: true,
            total_found: landmarks.len(),
            landmarks,
            error: None,
        }
    }

    /// Greedy plan between two positions; refuses to cross maps.
    pub fn route_between(&self, current: &Position, target: &Position) -> PlanResult {
        if current.map_id != target.map_id {
            return PlanResult::failure(&NavError::CrossMap {
                from: current.map_id,
                to: target.map_id,
            });
        }
        self.plan_to(current, target.x, target.y, "route")
    }

    /// Short multi-line advisory for the decision prompt. Empty when there is
    /// nothing useful to say or the subsystem is unavailable.
    pub fn navigation_context_text(&self, current: &Position, goal: &str) -> String {
        let Ok(stores) = self.stores() else {
            return String::new();
        };

        let metadata = stores.coordinates.map_metadata(current.map_id);
        let report = self.nearby_landmarks(current, self.settings.landmark_radius);
        let known_healing = stores
            .healing
            .nearest(current, self.settings.healing_search_distance)
            .is_some();

        if metadata.is_none() && report.landmarks.is_empty() && !known_healing {
            return String::new();
        }

        let goal = goal.to_lowercase();
        let healing_plan = if goal.contains("heal") || goal.contains("pokemon center") {
            Some(self.plan_to_healing(current))
        } else {
            None
        };

        let map_label = match &metadata {
            Some(meta) if !meta.map_name.is_empty() => meta.map_name.clone(),
            _ => format!("Map {}", current.map_id),
        };

        let mut lines = vec![format!(
            "Current location: {map_label} at ({}, {})",
            current.x, current.y
        )];

        if !report.landmarks.is_empty() {
            lines.push("Nearby landmarks:".to_string());
            for landmark in report.landmarks.iter().take(CONTEXT_LANDMARKS) {
                let kind = match landmark.kind {
                    LandmarkKind::Coordinate => "visited",
                    LandmarkKind::Healing => "healing",
                };
                lines.push(format!(
                    "- {} [{kind}] at ({}, {}), {} steps",
                    landmark.name, landmark.x, landmark.y, landmark.distance
                ));
            }
        }

        if let Some(plan) = healing_plan {
            if plan.success && !plan.button_sequence.is_empty() {
                lines.push(format!(
                    "Healing route: {} ({} steps)",
                    summarize_buttons(&plan.button_sequence),
                    plan.distance
                ));
            } else {
                lines.push(format!("Healing: {}", plan.reasoning));
            }
        }

        if goal.contains("battle") || goal.contains("trainer") {
            lines.push(
                "Battle hint: face the trainer and press A; stay out of their line of sight to avoid one"
                    .to_string(),
            );
        }

        if goal.contains("exit") || goal.contains("door") {
            let exits: Vec<&str> = stores
                .coordinates
                .movement_connections_from(current)
                .iter()
                .filter(|c| c.success_count > 0)
                .map(|c| c.direction.as_str())
                .collect();
            let mut hint = "Exit hint: doors and warps sit on map edges".to_string();
            if let Some(meta) = &metadata {
                hint.push_str(&format!(
                    "; explored x {}..{}, y {}..{}",
                    meta.min_x, meta.max_x, meta.min_y, meta.max_y
                ));
            }
            if !exits.is_empty() {
                hint.push_str(&format!("; confirmed moves from here: {}", exits.join(", ")));
            }
            lines.push(hint);
        }

        lines.join("\n")
    }

    /// Feed the agent's current cell back into the coordinate store.
    pub fn record_position(
        &self,
        current: &Position,
        scene: &SceneInfo,
        screenshot_ref: &str,
    ) -> bool {
        match self.coordinates() {
            Ok(c) => c.record(current, screenshot_ref, &self.settings.session_id, scene),
            Err(_) => false,
        }
    }

    /// Feed an attempted step back into the movement graph.
    pub fn record_step(
        &self,
        from: &Position,
        to: &Position,
        direction: Direction,
        success: bool,
    ) -> bool {
        match self.coordinates() {
            Ok(c) => c.record_movement(from, to, direction, &self.settings.session_id, success),
            Err(_) => false,
        }
    }

    /// Feed a healing attempt back into the registry.
    pub fn record_healing_visit(
        &self,
        site: &HealingSite,
        before: &PartySnapshot,
        after: &PartySnapshot,
        duration: f64,
    ) -> bool {
        match self.healing() {
            Ok(h) => h.bookmark_location(site, before, after, &self.settings.session_id, duration),
            Err(_) => false,
        }
    }

    pub fn statistics(&self) -> Result<NavigationStats, NavError> {
        let stores = self.stores()?;
        Ok(NavigationStats {
            session_id: self.settings.session_id.clone(),
            coordinates: stores.coordinates.statistics(),
            healing: stores.healing.statistics(),
            bookmarks: stores.bookmarks.list().len(),
            map_connections: stores.bookmarks.connections().len(),
        })
    }
}

fn open_stores(config: &PokenavConfig) -> Result<Stores> {
    Ok(Stores {
        coordinates: CoordinateStore::open(config.resolved_coordinate_db_path())?,
        healing: HealingRegistry::open(config.resolved_healing_db_path())?,
        bookmarks: BookmarkStore::load(config.resolved_bookmark_path()),
    })
}

/// All horizontal presses, then all vertical presses. `y` grows downward.
///
/// Allocates one button per step; callers bound the distance first.
pub fn greedy_path(from_x: i64, from_y: i64, to_x: i64, to_y: i64) -> Vec<Button> {
    let horizontal = if to_x >= from_x { Button::Right } else { Button::Left };
    let vertical = if to_y >= from_y { Button::Down } else { Button::Up };
    let steps = |a: i64, b: i64| usize::try_from(a.abs_diff(b)).unwrap_or(usize::MAX);

    std::iter::repeat(horizontal)
        .take(steps(from_x, to_x))
        .chain(std::iter::repeat(vertical).take(steps(from_y, to_y)))
        .collect()
}

/// Run-length summary, e.g. `right x3, up x2`.
pub fn summarize_buttons(buttons: &[Button]) -> String {
    let mut runs: Vec<(Button, usize)> = Vec::new();
    for &button in buttons {
        match runs.last_mut() {
            Some((last, count)) if *last == button => *count += 1,
            _ => runs.push((button, 1)),
        }
    }
    runs.iter()
        .map(|(button, count)| format!("{button} x{count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greedy_path_is_horizontal_first() {
        let path = greedy_path(5, 5, 8, 3);
        assert_eq!(
            path,
            vec![Button::Right, Button::Right, Button::Right, Button::Up, Button::Up]
        );
    }

    #[test]
    fn greedy_path_net_displacement_matches() {
        for (fx, fy, tx, ty) in [(0, 0, -4, 7), (10, 2, 3, 2), (1, 9, 1, 0), (6, 6, 6, 6)] {
            let path = greedy_path(fx, fy, tx, ty);
            let (mut x, mut y) = (fx, fy);
            let mut seen_vertical = false;
            for b in &path {
                match b {
                    Button::Left | Button::Right => assert!(!seen_vertical),
                    _ => seen_vertical = true,
                }
                match b {
                    Button::Left => x -= 1,
                    Button::Right => x += 1,
                    Button::Up => y -= 1,
                    Button::Down => y += 1,
                    _ => unreachable!(),
                }
            }
            assert_eq!((x, y), (tx, ty));
            assert_eq!(path.len() as i64, (tx - fx).abs() + (ty - fy).abs());
        }
    }

    #[test]
    fn summarize_collapses_runs() {
        assert_eq!(
            summarize_buttons(&[Button::Right, Button::Right, Button::Up]),
            "right x2, up x1"
        );
        assert_eq!(summarize_buttons(&[]), "");
    }

    #[test]
    fn greedy_path_handles_opposite_extremes_without_overflow() {
        assert_eq!(greedy_path(i64::MAX, 0, i64::MAX - 2, 0), vec![Button::Left, Button::Left]);
        assert_eq!(greedy_path(0, i64::MIN, 0, i64::MIN + 1), vec![Button::Down]);
    }

    #[test]
    fn disabled_planner_reports_unavailable() {
        let planner = Planner::disabled("test", PlannerSettings::default());
        let plan = planner.plan_to(&Position::new(1, 0, 0), 3, 3, "testing");
        assert!(!plan.success);
        assert!(plan.error.unwrap().contains("unavailable"));

        let report = planner.nearby_landmarks(&Position::new(1, 0, 0), 5);
        assert!(!report.success);
        assert_eq!(planner.navigation_context_text(&Position::new(1, 0, 0), "heal"), "");
        assert!(!planner.record_position(&Position::new(1, 0, 0), &SceneInfo::default(), ""));
        assert!(planner.statistics().is_err());
    }
}
