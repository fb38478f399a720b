//! Host-level settings handed to the manager by the application.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use worldhost_world::{WorldArchetype, WorldProperties};

/// Per-world flags that win over the stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldOverrides {
    /// Overrides `enabled`.
    pub enabled: Option<bool>,
    /// Overrides `load_on_startup`.
    pub load_on_startup: Option<bool>,
    /// Overrides `keep_spawn_loaded`.
    pub keep_spawn_loaded: Option<bool>,
}

impl WorldOverrides {
    /// Write every set flag into `properties`.
    pub fn apply(&self, properties: &mut WorldProperties) {
        if let Some(enabled) = self.enabled {
            properties.enabled = enabled;
        }
        if let Some(load) = self.load_on_startup {
            properties.load_on_startup = load;
        }
        if let Some(keep) = self.keep_spawn_loaded {
            properties.keep_spawn_loaded = keep;
        }
    }
}

/// Manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    /// Folder of the primary world (dimension 0).
    pub level_name: String,
    /// Load dimensions other than the primary world.
    pub multi_world: bool,
    /// Ticks between autosaves. Zero disables autosave.
    pub autosave_interval_ticks: u64,
    /// Template for worlds synthesized during discovery or created without one.
    pub startup_defaults: WorldArchetype,
    /// Overrides keyed by folder name.
    pub worlds: BTreeMap<String, WorldOverrides>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            level_name: "world".to_string(),
            multi_world: true,
            autosave_interval_ticks: 900,
            startup_defaults: WorldArchetype::default(),
            worlds: BTreeMap::new(),
        }
    }
}

impl ManagerSettings {
    /// Overrides for `folder`, empty when none are configured.
    pub fn overrides(&self, folder: &str) -> WorldOverrides {
        self.worlds.get(folder).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_set_flags_are_applied() {
        let mut props = WorldArchetype::default().build("arena");
        let overrides = WorldOverrides {
            enabled: Some(false),
            ..WorldOverrides::default()
        };
        overrides.apply(&mut props);
        assert!(!props.enabled);
        assert!(props.load_on_startup);
    }

    #[test]
    fn unknown_world_has_no_overrides() {
        let settings = ManagerSettings::default();
        assert_eq!(settings.overrides("missing"), WorldOverrides::default());
        assert_eq!(settings.level_name, "world");
    }
}
