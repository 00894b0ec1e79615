mod helpers;

use helpers::{scene, TestEnv, SESSION};
use pokenav::spatial::types::{Direction, Position, SceneInfo};

#[test]
fn recording_same_cell_twice_keeps_one_record() {
    let env = TestEnv::new();
    let store = env.coordinates();
    let here = Position::new(1, 4, 4);

    assert!(store.record(&here, "a.png", SESSION, &scene("Pallet Town")));
    assert!(store.record(&here, "b.png", SESSION, &scene("Pallet Town")));

    let near = store.query_near(1, 4, 4, 0);
    assert_eq!(near.len(), 1);
    assert_eq!(near[0].record.screenshot_ref, "b.png");
    assert_eq!(store.statistics().total_coordinates, 1);
    assert_eq!(store.map_metadata(1).unwrap().total_coordinates, 1);
}

#[test]
fn query_near_is_square_and_sorted() {
    let env = TestEnv::new();
    let store = env.coordinates();
    for (x, y) in [(5, 5), (6, 5), (8, 8), (9, 1), (12, 5)] {
        store.record(&Position::new(1, x, y), "", SESSION, &SceneInfo::default());
    }
    store.record(&Position::new(2, 5, 5), "", SESSION, &SceneInfo::default());

    let near = store.query_near(1, 5, 5, 4);
    let cells: Vec<(i64, i64, i64)> = near
        .iter()
        .map(|n| (n.record.x, n.record.y, n.distance))
        .collect();
    // (8, 8) is outside a Manhattan radius of 4 but inside the square.
    assert_eq!(cells, vec![(5, 5, 0), (6, 5, 1), (8, 8, 6), (9, 1, 8)]);
}

#[test]
fn metadata_bounding_box_only_widens() {
    let env = TestEnv::new();
    let store = env.coordinates();
    store.record(&Position::new(3, 10, 10), "", SESSION, &scene("Viridian Forest"));
    store.record(&Position::new(3, 2, 15), "", SESSION, &scene(""));
    store.record(&Position::new(3, 6, 12), "", SESSION, &scene(""));

    let meta = store.map_metadata(3).unwrap();
    assert_eq!((meta.min_x, meta.max_x, meta.min_y, meta.max_y), (2, 10, 10, 15));
    assert_eq!(meta.map_name, "Viridian Forest");
    assert_eq!(meta.total_coordinates, 3);
}

#[test]
fn movement_feedback_accumulates() {
    let env = TestEnv::new();
    let store = env.coordinates();
    let from = Position::new(1, 5, 5);
    let right = Position::new(1, 6, 5);

    assert!(store.record_movement(&from, &right, Direction::Right, SESSION, true));
    assert!(store.record_movement(&from, &right, Direction::Right, SESSION, true));
    assert!(store.record_movement(&from, &from, Direction::Up, SESSION, false));

    let exits = store.movement_connections_from(&from);
    assert_eq!(exits.len(), 2);
    let right_edge = exits.iter().find(|c| c.direction == Direction::Right).unwrap();
    assert_eq!((right_edge.success_count, right_edge.failure_count), (2, 0));
    let up_edge = exits.iter().find(|c| c.direction == Direction::Up).unwrap();
    assert_eq!((up_edge.success_count, up_edge.failure_count), (0, 1));
    assert_eq!(store.statistics().total_connections, 2);
}

#[test]
fn statistics_rank_maps_by_coverage() {
    let env = TestEnv::new();
    let store = env.coordinates();
    for x in 0..4 {
        store.record(&Position::new(7, x, 0), "", SESSION, &scene("Route 2"));
    }
    store.record(&Position::new(8, 0, 0), "", SESSION, &scene("Pewter City"));
    store.record(&Position::new(8, 0, 0), "", "other-session", &scene("Pewter City"));

    let stats = store.statistics();
    assert_eq!(stats.total_coordinates, 6);
    assert_eq!(stats.unique_maps, 2);
    assert_eq!(stats.top_maps_by_coordinate_count[0], (7, "Route 2".to_string(), 4));
    assert_eq!(stats.top_maps_by_coordinate_count[1].2, 2);
}

#[test]
fn cleanup_removes_only_old_rows() {
    let env = TestEnv::new();
    let store = env.coordinates();
    store.record(&Position::new(1, 0, 0), "", SESSION, &SceneInfo::default());
    store.record(&Position::new(1, 1, 0), "", SESSION, &SceneInfo::default());

    let conn = rusqlite::Connection::open(env.coordinate_db()).unwrap();
    let old = (chrono::Utc::now() - chrono::Duration::days(45)).to_rfc3339();
    conn.execute(
        "UPDATE coordinates SET timestamp = ?1 WHERE x = 0",
        rusqlite::params![old],
    )
    .unwrap();
    drop(conn);

    let dry = store.cleanup_older_than(30, true);
    assert!(dry.dry_run);
    assert_eq!((dry.candidates, dry.deleted), (1, 0));
    assert_eq!(store.statistics().total_coordinates, 2);

    let real = store.cleanup_older_than(30, false);
    assert_eq!((real.candidates, real.deleted), (1, 1));
    assert_eq!(store.statistics().total_coordinates, 1);

    let meta = store.map_metadata(1).unwrap();
    assert_eq!(meta.total_coordinates, 1);
    assert_eq!((meta.min_x, meta.max_x), (0, 1));
}
