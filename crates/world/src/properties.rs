//! Persistent per-world metadata and the archetypes used to create it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use worldhost_core::{DimensionId, DimensionType, DimensionTypeKey};

/// How a world's data is written back to storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationBehavior {
    /// Saved on autosave, explicit save and unload.
    #[default]
    Automatic,
    /// Saved on explicit save and unload, skipped by autosave.
    Manual,
    /// Never saved.
    None,
}

/// Default game mode for players entering the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    /// Survival.
    Survival,
    /// Creative.
    Creative,
    /// Adventure.
    Adventure,
    /// Spectator.
    Spectator,
}

/// World difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Peaceful.
    Peaceful,
    /// Easy.
    Easy,
    #[default]
    /// Normal.
    Normal,
    /// Hard.
    Hard,
}

/// Metadata record for one world, keyed by folder name and UUID.
///
/// A nil `uuid` and a `None` dimension id both mean "not assigned yet".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldProperties {
    /// Folder holding the world, relative to the save root.
    pub folder_name: String,
    /// Name recorded inside the metadata. Discovery forces it to match the folder.
    pub level_name: String,
    /// Stable identity across renames.
    pub uuid: Uuid,
    /// Bound dimension slot.
    pub dimension_id: Option<DimensionId>,
    /// Type of the dimension this world is generated as.
    pub dimension_type: DimensionTypeKey,
    /// Generation seed.
    pub seed: i64,
    /// Terrain generator name.
    pub generator: String,
    /// Default game mode.
    pub game_mode: GameMode,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Whether the world may be loaded at all.
    pub enabled: bool,
    /// Whether startup discovery loads it.
    pub load_on_startup: bool,
    /// Whether unload requests are refused while it is loaded.
    pub keep_spawn_loaded: bool,
    /// Save policy.
    pub serialization: SerializationBehavior,
}

impl WorldProperties {
    /// Whether a real UUID has been assigned.
    pub fn has_uuid(&self) -> bool {
        !self.uuid.is_nil()
    }

    /// Whether saves should be skipped entirely.
    pub fn skips_saving(&self) -> bool {
        self.serialization == SerializationBehavior::None
    }

    /// Copy of this record under a new folder with identity cleared, as a
    /// copied world starts out.
    pub fn detached_copy(&self, folder_name: &str) -> Self {
        Self {
            folder_name: folder_name.to_string(),
            level_name: folder_name.to_string(),
            uuid: Uuid::nil(),
            dimension_id: None,
            ..self.clone()
        }
    }
}

/// Template for fresh world properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldArchetype {
    /// Dimension type the world is generated as.
    pub dimension_type: DimensionTypeKey,
    /// Seed used when `random_seed` is false.
    pub seed: i64,
    /// Draw a fresh seed for each new world.
    pub random_seed: bool,
    /// Terrain generator name.
    pub generator: String,
    /// Default game mode.
    pub game_mode: GameMode,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Enabled flag for created worlds.
    pub enabled: bool,
    /// Load-on-startup flag for created worlds.
    pub load_on_startup: bool,
    /// Keep-spawn-loaded flag for created worlds.
    pub keep_spawn_loaded: bool,
    /// Save policy.
    pub serialization: SerializationBehavior,
}

impl Default for WorldArchetype {
    fn default() -> Self {
        Self::for_type(&DimensionType::overworld())
    }
}

impl WorldArchetype {
    /// Archetype for the given dimension type with default settings.
    pub fn for_type(dimension_type: &DimensionType) -> Self {
        Self {
            dimension_type: dimension_type.key().clone(),
            seed: 0,
            random_seed: true,
            generator: "default".to_string(),
            game_mode: GameMode::default(),
            difficulty: Difficulty::default(),
            enabled: true,
            load_on_startup: true,
            keep_spawn_loaded: false,
            serialization: SerializationBehavior::default(),
        }
    }

    /// Build fresh, unregistered properties for `folder_name`.
    pub fn build(&self, folder_name: &str) -> WorldProperties {
        let seed = if self.random_seed {
            rand::thread_rng().gen()
        } else {
            self.seed
        };
        WorldProperties {
            folder_name: folder_name.to_string(),
            level_name: folder_name.to_string(),
            uuid: Uuid::nil(),
            dimension_id: None,
            dimension_type: self.dimension_type.clone(),
            seed,
            generator: self.generator.clone(),
            game_mode: self.game_mode,
            difficulty: self.difficulty,
            enabled: self.enabled,
            load_on_startup: self.load_on_startup,
            keep_spawn_loaded: self.keep_spawn_loaded,
            serialization: self.serialization,
        }
    }
}
