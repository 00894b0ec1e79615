mod helpers;

use helpers::TestEnv;
use pokenav::error::NavError;
use pokenav::spatial::bookmarks::{BookmarkAction, BookmarkStore, PositionData, INITIAL_CONFIDENCE};
use pokenav::spatial::types::MapKey;

#[test]
fn bookmarking_twice_updates_in_place() {
    let env = TestEnv::new();
    let mut store = env.bookmarks();

    let first = store
        .bookmark("center", &PositionData::new(3, 1, 7, 4), "first visit")
        .unwrap();
    assert_eq!(first.action, BookmarkAction::Created);

    let second = store
        .bookmark("center", &PositionData::new(3, 1, 7, 5), "came back")
        .unwrap();
    assert_eq!(second.action, BookmarkAction::Updated);

    let all = store.list();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].visit_count, 2);
    assert_eq!(all[0].notes, "came back");
    assert_eq!(all[0].y, 5);
}

#[test]
fn bookmarks_survive_reload() {
    let env = TestEnv::new();
    {
        let mut store = env.bookmarks();
        store.bookmark("mart", &PositionData::new(0, 2, 1, 1), "").unwrap();
        store.track_connection(MapKey::new(0, 2), MapKey::new(0, 3), "north", "walk");
    }
    let store = BookmarkStore::load(env.bookmark_path());
    assert!(store.get("mart").is_some());
    assert_eq!(store.connections().len(), 1);
    assert!(!env.bookmark_path().with_extension("tmp").exists());
}

#[test]
fn missing_fields_are_reported() {
    let env = TestEnv::new();
    let mut store = env.bookmarks();
    let partial = PositionData {
        map_id: Some(1),
        y: Some(4),
        ..Default::default()
    };
    let err = store.bookmark("somewhere", &partial, "").unwrap_err();
    assert_eq!(err, NavError::MissingData(vec!["map_bank".into(), "x".into()]));
    assert!(store.list().is_empty());
}

#[test]
fn unknown_bookmark_is_not_found() {
    let env = TestEnv::new();
    let store = env.bookmarks();
    let err = store.navigate_to("nowhere", None).unwrap_err();
    assert_eq!(err, NavError::NotFound("nowhere".into()));
    assert_eq!(err.to_json()["success"], false);
}

#[test]
fn same_map_directions_are_horizontal_first() {
    let env = TestEnv::new();
    let mut store = env.bookmarks();
    store.bookmark("gym", &PositionData::new(3, 1, 10, 2), "").unwrap();

    let out = store
        .navigate_to("gym", Some(&PositionData::new(3, 1, 7, 6)))
        .unwrap();
    assert!(out.success);
    assert_eq!(out.directions, vec!["right 3", "up 4"]);
    assert!(out.route.is_none());

    let here = store
        .navigate_to("gym", Some(&PositionData::new(3, 1, 10, 2)))
        .unwrap();
    assert!(here.directions.is_empty());
}

#[test]
fn cross_map_uses_connection_graph() {
    let env = TestEnv::new();
    let mut store = env.bookmarks();
    store.bookmark("cave", &PositionData::new(1, 9, 0, 0), "").unwrap();
    store.track_connection(MapKey::new(1, 1), MapKey::new(1, 2), "east", "walk");
    store.track_connection(MapKey::new(1, 2), MapKey::new(1, 9), "north", "door");

    let out = store
        .navigate_to("cave", Some(&PositionData::new(1, 1, 5, 5)))
        .unwrap();
    assert!(out.success);
    assert_eq!(out.route, Some(vec!["1-2".to_string(), "1-9".to_string()]));

    // Connections are directed: there is no way back.
    let back = store.find_route(MapKey::new(1, 9), MapKey::new(1, 1));
    assert!(back.is_none());
}

#[test]
fn unknown_route_is_still_a_success() {
    let env = TestEnv::new();
    let mut store = env.bookmarks();
    store.bookmark("island", &PositionData::new(5, 5, 0, 0), "").unwrap();

    let out = store
        .navigate_to("island", Some(&PositionData::new(0, 0, 0, 0)))
        .unwrap();
    assert!(out.success);
    assert!(out.route.is_none());
    assert!(out.message.contains("No known route"));
}

#[test]
fn route_prefers_fewest_hops() {
    let env = TestEnv::new();
    let mut store = env.bookmarks();
    let (a, b, c, d) = (MapKey::new(0, 1), MapKey::new(0, 2), MapKey::new(0, 3), MapKey::new(0, 4));
    store.track_connection(a, b, "east", "walk");
    store.track_connection(b, c, "east", "walk");
    store.track_connection(c, d, "east", "walk");
    store.track_connection(a, d, "south", "warp");

    assert_eq!(store.find_route(a, d), Some(vec!["0-4".to_string()]));
    assert_eq!(store.find_route(a, a), Some(Vec::new()));
}

#[test]
fn repeated_sightings_raise_confidence_without_cap() {
    let env = TestEnv::new();
    let mut store = env.bookmarks();
    let (a, b) = (MapKey::new(0, 1), MapKey::new(0, 2));

    let first = store.track_connection(a, b, "north", "walk");
    assert_eq!(first.action, BookmarkAction::Created);
    assert!((first.connection.confidence - INITIAL_CONFIDENCE).abs() < 1e-9);

    for _ in 0..9 {
        store.track_connection(a, b, "north", "walk");
    }
    assert_eq!(store.connections().len(), 1);
    assert!((store.connections()[0].confidence - 1.4).abs() < 1e-9);
}

#[test]
fn remove_deletes_and_persists() {
    let env = TestEnv::new();
    let mut store = env.bookmarks();
    store.bookmark("temp", &PositionData::new(0, 0, 1, 1), "").unwrap();
    let removed = store.remove("temp").unwrap();
    assert_eq!(removed.name, "temp");
    assert!(store.remove("temp").is_err());
    assert!(BookmarkStore::load(env.bookmark_path()).list().is_empty());
}
