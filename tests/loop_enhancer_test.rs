use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use pokenav::config::PokenavConfig;
use pokenav::navigation::enhancer::{LoopEnhancer, NavigationState, StrategyKind};
use pokenav::spatial::types::Button;
use tempfile::TempDir;

/// Write a 240x160 frame with a bright square at `offset`, like a sprite moving.
fn write_frame(dir: &Path, name: &str, offset: u32) -> PathBuf {
    let frame = GrayImage::from_fn(240, 160, |x, y| {
        if (offset..offset + 40).contains(&x) && (40..80).contains(&y) {
            Luma([230])
        } else {
            Luma([20])
        }
    });
    let path = dir.join(name);
    frame.save(&path).unwrap();
    path
}

fn enhancer() -> LoopEnhancer {
    LoopEnhancer::from_config(&PokenavConfig::default())
}

#[test]
fn three_identical_presses_trigger_loop() {
    let tmp = TempDir::new().unwrap();
    let mut e = enhancer();

    let results: Vec<bool> = (0..3)
        .map(|n| {
            let path = write_frame(tmp.path(), &format!("{n}.png"), n * 60);
            e.ingest_turn(n as u64, &path, &[Button::Up], "walk north").loop_detected
        })
        .collect();

    assert_eq!(results, vec![false, false, true]);
}

#[test]
fn unchanged_screen_is_visually_stuck() {
    let tmp = TempDir::new().unwrap();
    let frame = write_frame(tmp.path(), "wall.png", 100);
    let mut e = enhancer();

    let presses = [Button::Up, Button::Left, Button::Right, Button::Down];
    let analyses: Vec<_> = presses
        .iter()
        .enumerate()
        .map(|(n, b)| e.ingest_turn(n as u64, &frame, &[*b], ""))
        .collect();

    assert!(analyses[0].progress_made);
    assert!(!analyses[1].progress_made);
    assert!(!analyses[2].visual_stuck);
    assert!(analyses[3].visual_stuck);
    assert_eq!(analyses[3].state, NavigationState::VisuallyStuck);
    assert!(analyses[3].needs_intervention);
    assert!(analyses[3].suggested_recovery.is_some());
}

#[test]
fn loop_on_frozen_screen_is_combined_stuck() {
    let tmp = TempDir::new().unwrap();
    let frame = write_frame(tmp.path(), "wall.png", 0);
    let mut e = enhancer();

    let mut last = None;
    for n in 0..4 {
        last = Some(e.ingest_turn(n, &frame, &[Button::Left], ""));
    }
    let last = last.unwrap();
    assert_eq!(last.state, NavigationState::CombinedStuck);
    assert_eq!(
        last.suggested_recovery.map(|s| s.kind),
        Some(StrategyKind::Perpendicular)
    );
    assert!(last.navigation_confidence < 0.2);
    assert_eq!(last.action_pattern_stats.consecutive_repeats, 4);
    assert_eq!(last.action_pattern_stats.most_common_action.as_deref(), Some("left"));
}

#[test]
fn moving_sprite_keeps_progressing() {
    let tmp = TempDir::new().unwrap();
    let mut e = enhancer();
    let presses = [Button::Right, Button::Down, Button::Left, Button::Up, Button::A];

    for (n, b) in presses.iter().enumerate() {
        let path = write_frame(tmp.path(), &format!("{n}.png"), n as u32 * 40);
        let analysis = e.ingest_turn(n as u64, &path, &[*b], "");
        assert!(analysis.progress_made, "turn {n} similarity {}", analysis.visual_similarity);
        assert!(!analysis.needs_intervention);
    }
    assert_eq!(e.state(), NavigationState::Progressing);
    assert!(e.confidence() > 0.8);
    assert!(e.critique(20).problems.is_empty());
}

#[test]
fn analysis_serializes_for_the_prompt() {
    let tmp = TempDir::new().unwrap();
    let path = write_frame(tmp.path(), "0.png", 0);
    let mut e = enhancer();
    let analysis = e.ingest_turn(1, &path, &[Button::A], "talk");

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["state"], "progressing");
    assert_eq!(json["loop_detected"], false);
    assert!(json["navigation_confidence"].is_number());
    assert_eq!(e.history().last().unwrap().screenshot_hash.len(), 64);
}
