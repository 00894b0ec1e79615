#![allow(dead_code)]

use std::path::PathBuf;

use pokenav::config::PokenavConfig;
use pokenav::spatial::bookmarks::BookmarkStore;
use pokenav::spatial::coordinates::CoordinateStore;
use pokenav::spatial::healing::HealingRegistry;
use pokenav::spatial::planner::{Planner, PlannerSettings};
use pokenav::spatial::types::{HealthStatus, PartySnapshot, SceneInfo};
use tempfile::TempDir;

pub const SESSION: &str = "test-session";

/// A scratch directory holding both databases and the bookmark file.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn coordinate_db(&self) -> PathBuf {
        self.dir.path().join("coordinates.db")
    }

    pub fn healing_db(&self) -> PathBuf {
        self.dir.path().join("healing.db")
    }

    pub fn bookmark_path(&self) -> PathBuf {
        self.dir.path().join("bookmarks.json")
    }

    pub fn coordinates(&self) -> CoordinateStore {
        CoordinateStore::open(self.coordinate_db()).unwrap()
    }

    pub fn healing(&self) -> HealingRegistry {
        HealingRegistry::open(self.healing_db()).unwrap()
    }

    pub fn bookmarks(&self) -> BookmarkStore {
        BookmarkStore::load(self.bookmark_path())
    }

    pub fn planner(&self) -> Planner {
        Planner::new(
            self.coordinates(),
            self.healing(),
            self.bookmarks(),
            PlannerSettings {
                session_id: SESSION.to_string(),
                ..Default::default()
            },
        )
    }

    /// Config pointing every store into this directory.
    pub fn config(&self) -> PokenavConfig {
        let mut config = PokenavConfig::default();
        config.storage.coordinate_db_path = self.coordinate_db().display().to_string();
        config.storage.healing_db_path = self.healing_db().display().to_string();
        config.storage.bookmark_path = self.bookmark_path().display().to_string();
        config.storage.session_id = SESSION.to_string();
        config
    }
}

pub fn scene(name: &str) -> SceneInfo {
    SceneInfo {
        map_name: name.to_string(),
        ..Default::default()
    }
}

pub fn party(status: HealthStatus, fainted: u32, healthy: u32, needs_healing: bool) -> PartySnapshot {
    PartySnapshot {
        party_health_status: status,
        fainted_pokemon: fainted,
        healthy_pokemon: healthy,
        needs_healing,
    }
}

/// A party that needs healing, and the same party after a successful heal.
pub fn hurt_then_healed() -> (PartySnapshot, PartySnapshot) {
    (
        party(HealthStatus::Critical, 2, 1, true),
        party(HealthStatus::Healthy, 0, 3, false),
    )
}

/// A snapshot pair with no healing signal at all.
pub fn unchanged() -> (PartySnapshot, PartySnapshot) {
    let p = party(HealthStatus::Poor, 1, 2, true);
    (p.clone(), p)
}
