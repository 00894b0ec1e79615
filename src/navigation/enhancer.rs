//! Loop and stuck detection over recent turns, with recovery suggestions.
//!
//! [`LoopEnhancer::ingest_turn`] is called once per game turn. It compares
//! the new screenshot with the previous one, appends a [`TurnRecord`], and
//! derives a [`NavigationState`] from two signals: the same button sequence
//! repeated turn after turn, and near-identical frames turn after turn.
//! Nothing here is persisted.

use image::GrayImage;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::history::{TurnHistory, TurnRecord};
use super::similarity::{self, FrameSimilarity};
use crate::config::PokenavConfig;
use crate::spatial::types::{Button, Direction};

/// Repeat count at which retreat-then-approach is added.
const RETREAT_AFTER: usize = 5;
/// Repeat count at which the four-direction sweep is added.
const SWEEP_AFTER: usize = 7;
/// Turns considered by [`LoopEnhancer::confidence`].
const CONFIDENCE_WINDOW: usize = 5;

#[derive(Debug, Clone)]
pub struct EnhancerSettings {
    pub history_size: usize,
    pub similarity_threshold: f64,
    pub loop_threshold: usize,
    pub stuck_threshold: usize,
}

impl EnhancerSettings {
    pub fn from_config(config: &PokenavConfig) -> Self {
        Self {
            history_size: config.navigation.history_size,
            similarity_threshold: config.navigation.similarity_threshold,
            loop_threshold: config.navigation.loop_threshold,
            stuck_threshold: config.navigation.stuck_threshold,
        }
    }
}

impl Default for EnhancerSettings {
    fn default() -> Self {
        Self {
            history_size: 20,
            similarity_threshold: 0.95,
            loop_threshold: 3,
            stuck_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    Progressing,
    ButtonLoop,
    VisuallyStuck,
    CombinedStuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Perpendicular,
    Interact,
    RetreatApproach,
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryStrategy {
    pub kind: StrategyKind,
    pub buttons: Vec<Button>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionPatternStats {
    pub consecutive_repeats: usize,
    pub consecutive_similar_frames: usize,
    pub unique_actions: usize,
    pub most_common_action: Option<String>,
    pub most_common_count: usize,
}

/// Everything the agent needs to know about the turn it just played.
#[derive(Debug, Clone, Serialize)]
pub struct TurnAnalysis {
    pub turn_number: u64,
    pub state: NavigationState,
    pub progress_made: bool,
    pub visual_similarity: f64,
    pub loop_detected: bool,
    pub visual_stuck: bool,
    pub needs_intervention: bool,
    pub suggested_recovery: Option<RecoveryStrategy>,
    pub action_pattern_stats: ActionPatternStats,
    pub navigation_confidence: f64,
}

/// Offline summary of recent behaviour.
#[derive(Debug, Clone, Serialize)]
pub struct CritiqueReport {
    pub turns_analyzed: usize,
    pub progress_ratio: f64,
    pub action_diversity: usize,
    pub most_repeated_action: Option<String>,
    pub most_repeated_count: usize,
    pub problems: Vec<String>,
    pub suggestions: Vec<String>,
}

pub struct LoopEnhancer {
    history: TurnHistory,
    similarity: Box<dyn FrameSimilarity>,
    settings: EnhancerSettings,
    last_frame: Option<GrayImage>,
}

impl LoopEnhancer {
    pub fn new(settings: EnhancerSettings, similarity: Box<dyn FrameSimilarity>) -> Self {
        Self {
            history: TurnHistory::new(settings.history_size),
            similarity,
            settings,
            last_frame: None,
        }
    }

    pub fn from_config(config: &PokenavConfig) -> Self {
        let similarity = similarity::create_similarity(
            &config.navigation.similarity_method,
            config.navigation.frame_size,
        );
        Self::new(EnhancerSettings::from_config(config), similarity)
    }

    pub fn history(&self) -> &TurnHistory {
        &self.history
    }

    /// Forget every turn, e.g. at the start of a new session.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_frame = None;
    }

    /// Ingest a turn whose screenshot is on disk.
    ///
    /// An unreadable screenshot is logged and treated as a changed frame.
    pub fn ingest_turn(
        &mut self,
        turn_number: u64,
        screenshot: &Path,
        buttons: &[Button],
        reasoning: &str,
    ) -> TurnAnalysis {
        let frame = match similarity::load_frame(screenshot) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(error = %e, turn_number, "screenshot unavailable for similarity");
                None
            }
        };
        let hash = similarity::hash_file(screenshot).unwrap_or_default();
        self.ingest(
            turn_number,
            screenshot.to_string_lossy().into_owned(),
            hash,
            frame,
            buttons,
            reasoning,
        )
    }

    /// Ingest a turn whose frame is already decoded.
    pub fn ingest_frame(
        &mut self,
        turn_number: u64,
        screenshot_ref: &str,
        frame: GrayImage,
        buttons: &[Button],
        reasoning: &str,
    ) -> TurnAnalysis {
        let hash = similarity::hash_frame(&frame);
        self.ingest(
            turn_number,
            screenshot_ref.to_string(),
            hash,
            Some(frame),
            buttons,
            reasoning,
        )
    }

    fn ingest(
        &mut self,
        turn_number: u64,
        screenshot_ref: String,
        screenshot_hash: String,
        frame: Option<GrayImage>,
        buttons: &[Button],
        reasoning: &str,
    ) -> TurnAnalysis {
        let previous_hash = self.history.last().map(|t| t.screenshot_hash.as_str());
        let visual_similarity = match (&self.last_frame, &frame) {
            _ if !screenshot_hash.is_empty() && previous_hash == Some(screenshot_hash.as_str()) => 1.0,
            (Some(prev), Some(current)) => self.similarity.similarity(prev, current),
            _ => 0.0,
        };
        let progress_made = visual_similarity < self.settings.similarity_threshold;

        self.history.push(TurnRecord {
            turn_number,
            timestamp: chrono::Utc::now().to_rfc3339(),
            screenshot_ref,
            screenshot_hash,
            buttons_pressed: buttons.to_vec(),
            visual_similarity,
            progress_made,
            ai_reasoning: reasoning.to_string(),
        });
        self.last_frame = frame;

        let analysis = self.analyze(turn_number, visual_similarity, progress_made);
        if analysis.needs_intervention {
            tracing::info!(
                turn_number,
                state = ?analysis.state,
                repeats = analysis.action_pattern_stats.consecutive_repeats,
                "navigation stuck"
            );
        } else {
            tracing::debug!(turn_number, visual_similarity, "turn ingested");
        }
        analysis
    }

    fn analyze(&self, turn_number: u64, visual_similarity: f64, progress_made: bool) -> TurnAnalysis {
        let state = self.state();
        let loop_detected = matches!(
            state,
            NavigationState::ButtonLoop | NavigationState::CombinedStuck
        );
        let visual_stuck = matches!(
            state,
            NavigationState::VisuallyStuck | NavigationState::CombinedStuck
        );
        let needs_intervention = loop_detected || visual_stuck;
        let suggested_recovery = if needs_intervention {
            self.suggest_recovery().into_iter().next()
        } else {
            None
        };

        TurnAnalysis {
            turn_number,
            state,
            progress_made,
            visual_similarity,
            loop_detected,
            visual_stuck,
            needs_intervention,
            suggested_recovery,
            action_pattern_stats: self.action_pattern_stats(),
            navigation_confidence: self.confidence(),
        }
    }

    fn button_loop_active(&self) -> bool {
        self.history.consecutive_identical_actions() >= self.settings.loop_threshold
    }

    fn visually_stuck(&self) -> bool {
        self.history
            .consecutive_similar_frames(self.settings.similarity_threshold)
            >= self.settings.stuck_threshold
    }

    /// The state implied by the current history.
    pub fn state(&self) -> NavigationState {
        match (self.button_loop_active(), self.visually_stuck()) {
            (true, true) => NavigationState::CombinedStuck,
            (true, false) => NavigationState::ButtonLoop,
            (false, true) => NavigationState::VisuallyStuck,
            (false, false) => NavigationState::Progressing,
        }
    }

    /// Recovery strategies for the current streak, recommended first.
    ///
    /// The streak is the longer of the identical-action run and the
    /// similar-frame run. More strategies apply the longer it lasts.
    pub fn suggest_recovery(&self) -> Vec<RecoveryStrategy> {
        let repeats = self.history.consecutive_identical_actions().max(
            self.history
                .consecutive_similar_frames(self.settings.similarity_threshold),
        );
        if repeats < self.settings.loop_threshold {
            return Vec::new();
        }

        let last_direction = self.history.last().and_then(|t| match t.buttons_pressed.as_slice() {
            [only] => only.direction(),
            _ => None,
        });

        let mut strategies = Vec::new();

        if let Some(dir) = last_direction {
            let [side, other] = dir.perpendicular();
            strategies.push(RecoveryStrategy {
                kind: StrategyKind::Perpendicular,
                buttons: vec![side.into()],
                description: format!(
                    "Pressing {dir} is not working; step {side} (or {other}) to get around the obstacle"
                ),
            });
        }

        strategies.push(RecoveryStrategy {
            kind: StrategyKind::Interact,
            buttons: vec![Button::A],
            description: "Press A in case a sign, person, or dialog is blocking the way".to_string(),
        });

        if repeats >= RETREAT_AFTER {
            let (buttons, description) = match last_direction {
                Some(dir) => {
                    let back: Button = dir.opposite().into();
                    let side: Button = dir.perpendicular()[0].into();
                    let forward: Button = dir.into();
                    (
                        vec![back, back, side, forward, forward],
                        format!("Back off two steps, shift {side}, then approach {dir} again"),
                    )
                }
                None => (
                    vec![Button::B, Button::Down, Button::Down, Button::Up, Button::Up],
                    "Close any menu, back off two steps, then approach again".to_string(),
                ),
            };
            strategies.push(RecoveryStrategy {
                kind: StrategyKind::RetreatApproach,
                buttons,
                description,
            });
        }

        if repeats >= SWEEP_AFTER {
            strategies.push(RecoveryStrategy {
                kind: StrategyKind::Sweep,
                buttons: Direction::ALL.iter().map(|&d| d.into()).collect(),
                description: "Try every direction once to find an open path".to_string(),
            });
        }

        strategies
    }

    /// Heuristic confidence in `[0, 1]` that navigation is on track.
    pub fn confidence(&self) -> f64 {
        let recent: Vec<&TurnRecord> = self.history.recent(CONFIDENCE_WINDOW).collect();
        if recent.is_empty() {
            return 0.5;
        }
        let n = recent.len() as f64;

        let progress = recent.iter().filter(|t| t.progress_made).count() as f64 / n;
        let distinct: BTreeSet<&Vec<Button>> = recent.iter().map(|t| &t.buttons_pressed).collect();
        let diversity = distinct.len() as f64 / n;
        let similar = self
            .history
            .consecutive_similar_frames(self.settings.similarity_threshold);

        let mut score = 0.5 + 0.3 * progress + 0.2 * diversity;
        score -= (similar as f64 * 0.1).min(0.3);
        if self.button_loop_active() {
            score -= 0.4;
        }
        score.clamp(0.0, 1.0)
    }

    fn action_pattern_stats(&self) -> ActionPatternStats {
        let counts = action_counts(self.history.iter());
        let most_common = counts.iter().max_by_key(|(_, count)| **count);
        ActionPatternStats {
            consecutive_repeats: self.history.consecutive_identical_actions(),
            consecutive_similar_frames: self
                .history
                .consecutive_similar_frames(self.settings.similarity_threshold),
            unique_actions: counts.len(),
            most_common_action: most_common.map(|(action, _)| action_label(action)),
            most_common_count: most_common.map(|(_, &count)| count).unwrap_or(0),
        }
    }

    /// Summarize the last `window` turns for offline prompt tuning.
    pub fn critique(&self, window: usize) -> CritiqueReport {
        let turns: Vec<&TurnRecord> = self.history.recent(window).collect();
        let total = turns.len();

        if total == 0 {
            return CritiqueReport {
                turns_analyzed: 0,
                progress_ratio: 0.0,
                action_diversity: 0,
                most_repeated_action: None,
                most_repeated_count: 0,
                problems: vec!["No turns recorded yet".to_string()],
                suggestions: Vec::new(),
            };
        }

        let progress_ratio = turns.iter().filter(|t| t.progress_made).count() as f64 / total as f64;
        let counts = action_counts(turns.iter().copied());
        let most_repeated = counts.iter().max_by_key(|(_, count)| **count);
        let most_repeated_action = most_repeated.map(|(action, _)| action_label(action));
        let most_repeated_count = most_repeated.map(|(_, &count)| count).unwrap_or(0);

        let mut problems = Vec::new();
        let mut suggestions = Vec::new();

        if progress_ratio < 0.3 {
            problems.push(format!(
                "Low progress: only {:.0}% of turns changed the screen",
                progress_ratio * 100.0
            ));
            suggestions.push(
                "Check whether the screen changed before repeating an action".to_string(),
            );
        }
        if total >= CONFIDENCE_WINDOW && counts.len() < 3 {
            problems.push(format!(
                "Low action diversity: only {} distinct actions in {total} turns",
                counts.len()
            ));
            suggestions.push(
                "When movement fails, try a different direction or interact with A".to_string(),
            );
        }
        if total >= 4 && most_repeated_count * 2 > total {
            if let Some(action) = &most_repeated_action {
                problems.push(format!(
                    "Excessive repetition: '{action}' used {most_repeated_count} of {total} turns"
                ));
                suggestions.push(format!(
                    "After {} identical actions with no visible change, switch to a perpendicular direction",
                    self.settings.loop_threshold
                ));
            }
        }

        CritiqueReport {
            turns_analyzed: total,
            progress_ratio,
            action_diversity: counts.len(),
            most_repeated_action,
            most_repeated_count,
            problems,
            suggestions,
        }
    }
}

fn action_counts<'a>(turns: impl Iterator<Item = &'a TurnRecord>) -> BTreeMap<&'a [Button], usize> {
    let mut counts = BTreeMap::new();
    for turn in turns {
        *counts.entry(turn.buttons_pressed.as_slice()).or_insert(0) += 1;
    }
    counts
}

fn action_label(buttons: &[Button]) -> String {
    if buttons.is_empty() {
        "(none)".to_string()
    } else {
        buttons
            .iter()
            .map(Button::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::similarity::PixelDiffSimilarity;
    use image::Luma;

    fn enhancer() -> LoopEnhancer {
        LoopEnhancer::new(
            EnhancerSettings::default(),
            Box::new(PixelDiffSimilarity { frame_size: 16 }),
        )
    }

    fn frame(value: u8) -> GrayImage {
        GrayImage::from_pixel(16, 16, Luma([value]))
    }

    #[test]
    fn loop_detected_on_third_identical_turn() {
        let mut e = enhancer();
        let a1 = e.ingest_frame(1, "1.png", frame(10), &[Button::Up], "");
        let a2 = e.ingest_frame(2, "2.png", frame(90), &[Button::Up], "");
        let a3 = e.ingest_frame(3, "3.png", frame(180), &[Button::Up], "");
        assert!(!a1.loop_detected);
        assert!(!a2.loop_detected);
        assert!(a3.loop_detected);
        assert_eq!(a3.state, NavigationState::ButtonLoop);
        assert!(a3.needs_intervention);
        assert_eq!(
            a3.suggested_recovery.unwrap().kind,
            StrategyKind::Perpendicular
        );
    }

    #[test]
    fn identical_frames_mark_visual_stuck() {
        let mut e = enhancer();
        let buttons = [[Button::Up], [Button::Left], [Button::Down], [Button::Right]];
        let mut last = None;
        for (i, b) in buttons.iter().enumerate() {
            last = Some(e.ingest_frame(i as u64, "same.png", frame(50), b, ""));
        }
        let last = last.unwrap();
        assert!(last.visual_stuck);
        assert!(!last.loop_detected);
        assert_eq!(last.state, NavigationState::VisuallyStuck);
        assert!((last.visual_similarity - 1.0).abs() < 1e-9);
        assert!(!last.progress_made);
    }

    #[test]
    fn first_turn_counts_as_progress() {
        let mut e = enhancer();
        let a = e.ingest_frame(1, "1.png", frame(0), &[Button::A], "");
        assert!(a.progress_made);
        assert_eq!(a.visual_similarity, 0.0);
        assert_eq!(a.state, NavigationState::Progressing);
    }

    #[test]
    fn recovery_escalates_with_repeats() {
        let mut e = enhancer();
        for n in 0..2 {
            e.ingest_frame(n, "x.png", frame(n as u8 * 40), &[Button::Right], "");
        }
        assert!(e.suggest_recovery().is_empty());

        e.ingest_frame(2, "x.png", frame(80), &[Button::Right], "");
        let kinds: Vec<StrategyKind> = e.suggest_recovery().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StrategyKind::Perpendicular, StrategyKind::Interact]);

        for n in 3..5 {
            e.ingest_frame(n, "x.png", frame(n as u8 * 40), &[Button::Right], "");
        }
        let strategies = e.suggest_recovery();
        assert_eq!(strategies.len(), 3);
        assert_eq!(strategies[2].kind, StrategyKind::RetreatApproach);
        assert_eq!(
            strategies[2].buttons,
            vec![Button::Left, Button::Left, Button::Up, Button::Right, Button::Right]
        );

        for n in 5..7 {
            e.ingest_frame(n, "x.png", frame(n as u8 * 30), &[Button::Right], "");
        }
        let strategies = e.suggest_recovery();
        assert_eq!(strategies.len(), 4);
        assert_eq!(strategies[3].kind, StrategyKind::Sweep);
        assert_eq!(strategies[0].buttons, vec![Button::Up]);
    }

    #[test]
    fn multi_button_loop_skips_perpendicular() {
        let mut e = enhancer();
        for n in 0..3 {
            e.ingest_frame(n, "x.png", frame(n as u8 * 60), &[Button::Up, Button::A], "");
        }
        let first = e.suggest_recovery().into_iter().next().unwrap();
        assert_eq!(first.kind, StrategyKind::Interact);
    }

    #[test]
    fn confidence_drops_when_looping() {
        let mut e = enhancer();
        assert_eq!(e.confidence(), 0.5);

        e.ingest_frame(0, "0.png", frame(0), &[Button::Up], "");
        e.ingest_frame(1, "1.png", frame(100), &[Button::Left], "");
        let healthy = e.confidence();
        assert!(healthy > 0.9, "got {healthy}");

        for n in 2..6 {
            e.ingest_frame(n, "s.png", frame(100), &[Button::Down], "");
        }
        let stuck = e.confidence();
        assert!(stuck < 0.3, "got {stuck}");
        assert!((0.0..=1.0).contains(&stuck));
    }

    #[test]
    fn history_is_bounded() {
        let mut e = enhancer();
        for n in 0..30 {
            e.ingest_frame(n, "f.png", frame((n * 8) as u8), &[Button::A], "");
        }
        assert_eq!(e.history().len(), 20);
        assert_eq!(e.history().iter().next().unwrap().turn_number, 10);
    }

    #[test]
    fn critique_flags_repetition_and_low_progress() {
        let mut e = enhancer();
        for n in 0..10 {
            e.ingest_frame(n, "s.png", frame(42), &[Button::Up], "walk north");
        }
        let report = e.critique(20);
        assert_eq!(report.turns_analyzed, 10);
        assert_eq!(report.most_repeated_action.as_deref(), Some("up"));
        assert_eq!(report.most_repeated_count, 10);
        assert_eq!(report.action_diversity, 1);
        assert_eq!(report.problems.len(), 3);
        assert_eq!(report.suggestions.len(), 3);
    }

    #[test]
    fn critique_of_healthy_play_has_no_problems() {
        let mut e = enhancer();
        let actions = [Button::Up, Button::Left, Button::A, Button::Down, Button::Right];
        for (n, b) in actions.iter().enumerate() {
            e.ingest_frame(n as u64, "f.png", frame((n * 50) as u8), &[*b], "");
        }
        let report = e.critique(20);
        assert!(report.problems.is_empty(), "{:?}", report.problems);
    }

    #[test]
    fn unreadable_screenshot_counts_as_change() {
        let mut e = enhancer();
        let missing = Path::new("/nonexistent/screenshot.png");
        let a = e.ingest_turn(1, missing, &[Button::Up], "");
        let b = e.ingest_turn(2, missing, &[Button::Up], "");
        assert!(a.progress_made);
        assert!(b.progress_made);
        assert_eq!(b.visual_similarity, 0.0);
    }

    #[test]
    fn reset_clears_history() {
        let mut e = enhancer();
        e.ingest_frame(0, "0.png", frame(0), &[Button::Up], "");
        e.reset();
        assert!(e.history().is_empty());
        assert_eq!(e.state(), NavigationState::Progressing);
    }
}
