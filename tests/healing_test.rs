mod helpers;

use helpers::{hurt_then_healed, party, unchanged, TestEnv, SESSION};
use pokenav::spatial::healing::{detect_healing_success, HealingSite};
use pokenav::spatial::types::{HealthStatus, Position};

fn site(map_id: i64, x: i64, y: i64, name: &str) -> HealingSite {
    HealingSite {
        location_name: name.to_string(),
        ..HealingSite::at(Position::new(map_id, x, y))
    }
}

#[test]
fn fewer_fainted_always_counts_as_healed() {
    for fainted in 1..6u32 {
        for status in [HealthStatus::Unknown, HealthStatus::Fair, HealthStatus::Healthy] {
            let before = party(status, fainted, 3, false);
            let after = party(status, fainted - 1, 3, false);
            assert!(detect_healing_success(&before, &after));
        }
    }
}

#[test]
fn no_signal_is_not_a_heal() {
    let (before, after) = unchanged();
    assert!(!detect_healing_success(&before, &after));
    // Fair to healthy is not one of the recognised transitions.
    let before = party(HealthStatus::Fair, 0, 3, false);
    let after = party(HealthStatus::Healthy, 0, 3, false);
    assert!(!detect_healing_success(&before, &after));
}

#[test]
fn nearest_skips_unproven_locations() {
    let env = TestEnv::new();
    let registry = env.healing();
    let (hurt, healed) = hurt_then_healed();
    let (same, same_after) = unchanged();

    // Distance 2 from (10, 10), never healed.
    assert!(registry.bookmark_location(&site(1, 12, 10, "Fake"), &same, &same_after, SESSION, 5.0));
    // Distance 5, healed once.
    assert!(registry.bookmark_location(&site(1, 10, 15, "Center"), &hurt, &healed, SESSION, 4.0));

    let nearest = registry.nearest(&Position::new(1, 10, 10), 50).unwrap();
    assert_eq!(nearest.location_name, "Center");
    assert_eq!((nearest.x, nearest.y), (10, 15));

    assert!(registry.nearest(&Position::new(1, 10, 10), 4).is_none());
    assert!(registry.nearest(&Position::new(2, 10, 10), 50).is_none());
}

#[test]
fn repeated_visits_update_counters_and_log() {
    let env = TestEnv::new();
    let registry = env.healing();
    let center = site(4, 3, 3, "Viridian Pokemon Center");
    let (hurt, healed) = hurt_then_healed();
    let (same, same_after) = unchanged();

    registry.bookmark_location(&center, &hurt, &healed, SESSION, 30.0);
    registry.bookmark_location(&center, &same, &same_after, SESSION, 99.0);
    registry.bookmark_location(&center, &hurt, &healed, SESSION, 25.0);

    let all = registry.all(Some(4));
    assert_eq!(all.len(), 1);
    let loc = &all[0];
    assert_eq!((loc.success_count, loc.failure_count), (2, 1));
    // Seeded by the first success, then (30 + 25) / 2; the failure is ignored.
    assert!((loc.average_healing_time - 27.5).abs() < 1e-9);

    let sessions = registry.sessions_for(loc.id);
    assert_eq!(sessions.len(), 3);
    assert_eq!(
        sessions.iter().map(|s| s.success).collect::<Vec<_>>(),
        vec![true, false, true]
    );
    assert_eq!(sessions[0].before, hurt);
    assert_eq!(sessions[0].after, healed);
}

#[test]
fn missing_position_is_rejected() {
    let env = TestEnv::new();
    let registry = env.healing();
    let (hurt, healed) = hurt_then_healed();
    let nowhere = HealingSite {
        location_name: "Somewhere".into(),
        ..Default::default()
    };
    assert!(!registry.bookmark_location(&nowhere, &hurt, &healed, SESSION, 1.0));
    assert!(registry.all(None).is_empty());
}

#[test]
fn statistics_pick_most_reliable() {
    let env = TestEnv::new();
    let registry = env.healing();
    let (hurt, healed) = hurt_then_healed();
    let (same, same_after) = unchanged();

    let flaky = site(1, 0, 0, "Flaky");
    registry.bookmark_location(&flaky, &hurt, &healed, SESSION, 1.0);
    registry.bookmark_location(&flaky, &hurt, &healed, SESSION, 1.0);
    registry.bookmark_location(&flaky, &same, &same_after, SESSION, 1.0);

    let solid = site(2, 0, 0, "Solid");
    registry.bookmark_location(&solid, &hurt, &healed, SESSION, 1.0);

    let stats = registry.statistics();
    assert_eq!(stats.total_locations, 2);
    assert_eq!(stats.total_sessions, 4);
    assert_eq!((stats.total_successes, stats.total_failures), (3, 1));
    assert!((stats.overall_success_rate - 0.75).abs() < 1e-9);
    assert_eq!(stats.most_reliable_location.unwrap().location_name, "Solid");
}
