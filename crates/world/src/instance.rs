//! Live world instances and the factory that constructs them.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use worldhost_core::{DimensionId, DimensionType, SimTick};

use crate::{WorldProperties, WorldStorage};

/// Session file written by [`BasicWorld::save`].
pub const SESSION_FILE_NAME: &str = "session.json";

/// A loaded, simulating world.
pub trait WorldInstance: Send {
    /// Dimension slot this world occupies.
    fn dimension_id(&self) -> DimensionId;

    /// Current properties.
    fn properties(&self) -> &WorldProperties;

    /// Mutable properties.
    fn properties_mut(&mut self) -> &mut WorldProperties;

    /// Number of players (or other occupants) inside the world.
    fn occupant_count(&self) -> usize;

    /// Admit an occupant. Returns false if already present.
    fn add_occupant(&mut self, occupant: u64) -> bool;

    /// Remove an occupant. Returns false if absent.
    fn remove_occupant(&mut self, occupant: u64) -> bool;

    /// Advance one simulation tick.
    fn tick(&mut self);

    /// Persist world data (not the properties record) through `storage`.
    fn save(&mut self, storage: &dyn WorldStorage) -> Result<()>;
}

/// Builds live worlds for the lifecycle manager.
pub trait WorldFactory: Send {
    /// Construct and prepare a world for `id`.
    fn construct(
        &mut self,
        id: DimensionId,
        dimension_type: &DimensionType,
        properties: WorldProperties,
    ) -> Result<Box<dyn WorldInstance>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionState {
    time: SimTick,
}

/// Minimal world: tracks occupants and world time, saves a session file.
#[derive(Debug)]
pub struct BasicWorld {
    id: DimensionId,
    dimension_type: DimensionType,
    properties: WorldProperties,
    occupants: BTreeSet<u64>,
    session: SessionState,
}

impl BasicWorld {
    /// Create a world starting at `time`.
    pub fn new(
        id: DimensionId,
        dimension_type: DimensionType,
        properties: WorldProperties,
        time: SimTick,
    ) -> Self {
        Self {
            id,
            dimension_type,
            properties,
            occupants: BTreeSet::new(),
            session: SessionState { time },
        }
    }

    /// Dimension type this world was built with.
    pub fn dimension_type(&self) -> &DimensionType {
        &self.dimension_type
    }

    /// World time.
    pub fn time(&self) -> SimTick {
        self.session.time
    }
}

impl WorldInstance for BasicWorld {
    fn dimension_id(&self) -> DimensionId {
        self.id
    }

    fn properties(&self) -> &WorldProperties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut WorldProperties {
        &mut self.properties
    }

    fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    fn add_occupant(&mut self, occupant: u64) -> bool {
        self.occupants.insert(occupant)
    }

    fn remove_occupant(&mut self, occupant: u64) -> bool {
        self.occupants.remove(&occupant)
    }

    fn tick(&mut self) {
        self.session.time = self.session.time.advance(1);
    }

    fn save(&mut self, storage: &dyn WorldStorage) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.session).context("Failed to encode session")?;
        storage
            .write_file(&self.properties.folder_name, SESSION_FILE_NAME, &json)
            .with_context(|| format!("Failed to save world {}", self.properties.folder_name))?;
        Ok(())
    }
}

/// Factory for [`BasicWorld`]s that resumes world time from the session file.
pub struct BasicWorldFactory {
    storage: std::sync::Arc<dyn WorldStorage>,
}

impl BasicWorldFactory {
    /// Create a factory reading sessions from `storage`.
    pub fn new(storage: std::sync::Arc<dyn WorldStorage>) -> Self {
        Self { storage }
    }
}

impl WorldFactory for BasicWorldFactory {
    fn construct(
        &mut self,
        id: DimensionId,
        dimension_type: &DimensionType,
        properties: WorldProperties,
    ) -> Result<Box<dyn WorldInstance>> {
        let session = match self
            .storage
            .read_file(&properties.folder_name, SESSION_FILE_NAME)?
        {
            Some(bytes) => serde_json::from_slice::<SessionState>(&bytes)
                .with_context(|| format!("Corrupt session for {}", properties.folder_name))?,
            None => SessionState::default(),
        };
        // Spawn preparation: make sure the folder exists before the first save.
        self.storage.create_folder(&properties.folder_name)?;
        debug!(dimension = %id, folder = %properties.folder_name, "Constructed world");
        Ok(Box::new(BasicWorld::new(
            id,
            dimension_type.clone(),
            properties,
            session.time,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FsWorldStorage, WorldArchetype};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn occupants_are_tracked() {
        let props = WorldArchetype::default().build("world");
        let mut world = BasicWorld::new(
            DimensionId::PRIMARY,
            DimensionType::overworld(),
            props,
            SimTick::ZERO,
        );
        assert!(world.add_occupant(7));
        assert!(!world.add_occupant(7));
        assert_eq!(world.occupant_count(), 1);
        assert!(world.remove_occupant(7));
        assert_eq!(world.occupant_count(), 0);
    }

    #[test]
    fn world_time_resumes_after_save() {
        let dir = tempdir().unwrap();
        let storage: Arc<dyn WorldStorage> = Arc::new(FsWorldStorage::new(dir.path()).unwrap());
        let mut factory = BasicWorldFactory::new(Arc::clone(&storage));
        let props = WorldArchetype::default().build("world");

        let mut world = factory
            .construct(DimensionId::PRIMARY, &DimensionType::overworld(), props.clone())
            .unwrap();
        for _ in 0..5 {
            world.tick();
        }
        world.save(storage.as_ref()).unwrap();

        let reloaded = factory
            .construct(DimensionId::PRIMARY, &DimensionType::overworld(), props)
            .unwrap();
        let saved = storage.read_file("world", SESSION_FILE_NAME).unwrap().unwrap();
        assert!(String::from_utf8(saved).unwrap().contains('5'));
        assert_eq!(reloaded.dimension_id(), DimensionId::PRIMARY);
    }
}
