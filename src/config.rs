use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PokenavConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub navigation: NavigationConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub coordinate_db_path: String,
    pub healing_db_path: String,
    pub bookmark_path: String,
    /// Empty means "generate a fresh session id for this process".
    pub session_id: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NavigationConfig {
    pub history_size: usize,
    pub similarity_threshold: f64,
    pub loop_threshold: usize,
    pub stuck_threshold: usize,
    pub similarity_method: String,
    pub frame_size: u32,
    pub step_time_secs: f64,
    pub healing_search_distance: i64,
    pub landmark_radius: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub retention_days: u64,
}

impl Default for PokenavConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            navigation: NavigationConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 8765,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_pokenav_dir();
        Self {
            coordinate_db_path: dir.join("coordinates.db").to_string_lossy().into_owned(),
            healing_db_path: dir.join("healing.db").to_string_lossy().into_owned(),
            bookmark_path: dir.join("bookmarks.json").to_string_lossy().into_owned(),
            session_id: String::new(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            history_size: 20,
            similarity_threshold: 0.95,
            loop_threshold: 3,
            stuck_threshold: 3,
            similarity_method: "structural".into(),
            frame_size: 64,
            step_time_secs: 0.5,
            healing_search_distance: 50,
            landmark_radius: 10,
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self { retention_days: 30 }
    }
}

/// Returns `~/.pokenav/`
pub fn default_pokenav_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".pokenav")
}

/// Returns the default config file path: `~/.pokenav/config.toml`
pub fn default_config_path() -> PathBuf {
    default_pokenav_dir().join("config.toml")
}

impl PokenavConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            PokenavConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("POKENAV_COORDINATE_DB") {
            self.storage.coordinate_db_path = val;
        }
        if let Ok(val) = std::env::var("POKENAV_HEALING_DB") {
            self.storage.healing_db_path = val;
        }
        if let Ok(val) = std::env::var("POKENAV_BOOKMARKS") {
            self.storage.bookmark_path = val;
        }
        if let Ok(val) = std::env::var("POKENAV_SESSION") {
            self.storage.session_id = val;
        }
        if let Ok(val) = std::env::var("POKENAV_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    pub fn resolved_coordinate_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.coordinate_db_path)
    }

    pub fn resolved_healing_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.healing_db_path)
    }

    pub fn resolved_bookmark_path(&self) -> PathBuf {
        expand_tilde(&self.storage.bookmark_path)
    }

    /// The configured session id, or a fresh time-sortable UUID when unset.
    pub fn resolved_session_id(&self) -> String {
        if self.storage.session_id.is_empty() {
            uuid::Uuid::now_v7().to_string()
        } else {
            self.storage.session_id.clone()
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
