use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::warn;
use worldhost_server::ManagerSettings;

pub const DEFAULT_CONFIG_PATH: &str = "worldhost.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory holding one folder per world.
    pub saves_root: PathBuf,
    /// Foreign-layout save root swept into `saves_root` on startup.
    pub foreign_root: Option<PathBuf>,
    /// Control-loop iterations per second.
    pub tick_rate: u32,
    /// JSONL file receiving every lifecycle event of a `run`.
    pub event_log: Option<PathBuf>,
    #[serde(flatten)]
    pub manager: ManagerSettings,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            saves_root: PathBuf::from("saves"),
            foreign_root: None,
            tick_rate: 20,
            event_log: None,
            manager: ManagerSettings::default(),
        }
    }
}

impl HostConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<HostConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    HostConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!("Config not found at {}. Using defaults", path.display());
                }
                HostConfig::default()
            }
        }
    }

    /// Time between two control-loop iterations.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use worldhost_world::Difficulty;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let cfg = HostConfig::load_from_path(&dir.path().join("absent.toml"));
        assert_eq!(cfg.tick_rate, 20);
        assert_eq!(cfg.event_log, None);
        assert_eq!(cfg.manager.level_name, "world");
        assert!(cfg.manager.multi_world);
        assert_eq!(cfg.tick_interval(), Duration::from_millis(50));
    }

    #[test]
    fn malformed_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("worldhost.toml");
        fs::write(&path, "tick_rate = \"fast\"").unwrap();
        assert_eq!(HostConfig::load_from_path(&path).tick_rate, 20);
    }

    #[test]
    fn manager_settings_and_overrides_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("worldhost.toml");
        fs::write(
            &path,
            r#"
saves_root = "/srv/saves"
event_log = "logs/events.jsonl"
level_name = "lobby"
multi_world = false
autosave_interval_ticks = 200

[startup_defaults]
seed = 7
random_seed = false
difficulty = "hard"

[worlds.arena]
enabled = false
keep_spawn_loaded = true
"#,
        )
        .unwrap();
        let cfg = HostConfig::load_from_path(&path);
        assert_eq!(cfg.saves_root, PathBuf::from("/srv/saves"));
        assert_eq!(cfg.event_log, Some(PathBuf::from("logs/events.jsonl")));
        assert_eq!(cfg.manager.level_name, "lobby");
        assert!(!cfg.manager.multi_world);
        assert_eq!(cfg.manager.autosave_interval_ticks, 200);
        assert_eq!(cfg.manager.startup_defaults.seed, 7);
        assert!(!cfg.manager.startup_defaults.random_seed);
        assert_eq!(cfg.manager.startup_defaults.difficulty, Difficulty::Hard);
        let arena = cfg.manager.overrides("arena");
        assert_eq!(arena.enabled, Some(false));
        assert_eq!(arena.keep_spawn_loaded, Some(true));
        assert_eq!(arena.load_on_startup, None);
    }
}
