//! The world lifecycle manager.
//!
//! [`WorldManager`] owns the dimension registry, the properties index and the
//! set of live worlds. Every method runs on the control thread; background
//! copy and delete work only reports back through a completion channel that
//! [`WorldManager::tick`] drains.

mod discovery;
mod operations;

use std::collections::{BTreeMap, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use worldhost_core::{DimensionId, DimensionType, DimensionTypeId, DimensionTypeKey, SimTick};
use worldhost_world::{
    assign_uuid_if_missing, sort_canonical, DimensionRegistry, EventBus, LegacyMigration,
    RegistryError, SerializationBehavior, WorldArchetype, WorldEvent, WorldFactory,
    WorldInstance, WorldListener, WorldProperties, WorldPropertiesIndex, WorldStorage,
};

use crate::scheduler::Completion;
use crate::{LifecycleError, ManagerSettings, Precondition, TaskScheduler};

pub use discovery::StartupReport;
pub use operations::DeleteOutcome;

/// How a caller names a world to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldRef {
    /// A UUID already known to the index.
    Uuid(Uuid),
    /// A folder under the save root.
    Folder(String),
    /// Explicit properties, used as-is if the world is not known yet.
    Properties(WorldProperties),
}

impl From<Uuid> for WorldRef {
    fn from(uuid: Uuid) -> Self {
        Self::Uuid(uuid)
    }
}

impl From<&str> for WorldRef {
    fn from(folder: &str) -> Self {
        Self::Folder(folder.to_string())
    }
}

impl From<String> for WorldRef {
    fn from(folder: String) -> Self {
        Self::Folder(folder)
    }
}

impl From<WorldProperties> for WorldRef {
    fn from(properties: WorldProperties) -> Self {
        Self::Properties(properties)
    }
}

/// Owner of every dimension, world record and live world.
pub struct WorldManager {
    settings: ManagerSettings,
    storage: Arc<dyn WorldStorage>,
    factory: Box<dyn WorldFactory>,
    events: EventBus,
    scheduler: Option<TaskScheduler>,
    dimensions: DimensionRegistry,
    index: WorldPropertiesIndex,
    worlds: BTreeMap<DimensionId, Box<dyn WorldInstance>>,
    world_order: Vec<DimensionId>,
    unload_queue: VecDeque<DimensionId>,
    completions_tx: Sender<Completion<WorldProperties>>,
    completions_rx: Receiver<Completion<WorldProperties>>,
    autosave_suspensions: usize,
    migration: Option<LegacyMigration>,
    migration_done: bool,
    /// Dynamic ids found on disk during discovery, with their folders.
    discovered: BTreeMap<DimensionId, String>,
    tick: SimTick,
}

impl WorldManager {
    /// Create a manager with the three default dimension types and the
    /// primordial dimensions 0, -1 and 1 registered.
    pub fn new(
        settings: ManagerSettings,
        storage: Arc<dyn WorldStorage>,
        factory: Box<dyn WorldFactory>,
    ) -> Result<Self, LifecycleError> {
        let mut dimensions = DimensionRegistry::new();
        let defaults = [
            (DimensionId::PRIMARY, DimensionType::overworld()),
            (DimensionId::NETHER, DimensionType::nether()),
            (DimensionId::END, DimensionType::the_end()),
        ];
        for (id, dimension_type) in defaults {
            dimensions.types_mut().register(dimension_type.clone())?;
            dimensions.register_dimension(id, dimension_type)?;
        }
        let (completions_tx, completions_rx) = mpsc::channel();
        Ok(Self {
            settings,
            storage,
            factory,
            events: EventBus::new(),
            scheduler: TaskScheduler::current(),
            dimensions,
            index: WorldPropertiesIndex::new(),
            worlds: BTreeMap::new(),
            world_order: Vec::new(),
            unload_queue: VecDeque::new(),
            completions_tx,
            completions_rx,
            autosave_suspensions: 0,
            migration: None,
            migration_done: false,
            discovered: BTreeMap::new(),
            tick: SimTick::ZERO,
        })
    }

    /// Run background copy and delete work on `scheduler`.
    pub fn with_scheduler(mut self, scheduler: TaskScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sweep foreign world folders in before the first discovery.
    pub fn with_migration(mut self, migration: LegacyMigration) -> Self {
        self.migration = Some(migration);
        self
    }

    /// Add a lifecycle listener.
    pub fn subscribe(&mut self, listener: Box<dyn WorldListener>) {
        self.events.subscribe(listener);
    }

    /// Settings the manager was built with.
    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Storage backend.
    pub fn storage(&self) -> &Arc<dyn WorldStorage> {
        &self.storage
    }

    // Registry surface.

    /// Register a dimension type. Registering an equal type again returns
    /// the id it already has.
    pub fn register_dimension_type(
        &mut self,
        dimension_type: DimensionType,
    ) -> Result<DimensionTypeId, LifecycleError> {
        if let Some((id, _)) = self
            .dimensions
            .types()
            .iter()
            .find(|(_, existing)| **existing == dimension_type)
        {
            debug!(dimension_type = %dimension_type.key(), "Dimension type already registered");
            return Ok(id);
        }
        let id = self.dimensions.types_mut().register(dimension_type)?;
        Ok(id)
    }

    /// Register a dimension type under an explicit id.
    pub fn register_dimension_type_with_id(
        &mut self,
        id: DimensionTypeId,
        dimension_type: DimensionType,
    ) -> Result<(), LifecycleError> {
        self.dimensions
            .types_mut()
            .register_with_id(id, dimension_type)?;
        Ok(())
    }

    /// Bind a dimension id to a registered type.
    pub fn register_dimension(
        &mut self,
        id: DimensionId,
        dimension_type: DimensionType,
    ) -> Result<(), LifecycleError> {
        self.dimensions.register_dimension(id, dimension_type)?;
        Ok(())
    }

    /// Drop a dimension registration.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never registered.
    pub fn unregister_dimension(&mut self, id: DimensionId) {
        self.dimensions.unregister_dimension(id);
        self.discovered.remove(&id);
    }

    /// Next free non-negative dimension id. The id is not reserved.
    pub fn next_free_dimension_id(&mut self) -> DimensionId {
        let worlds = &self.worlds;
        self.dimensions
            .next_free_dimension_id(|id| worlds.contains_key(&id))
    }

    /// The dimension registry.
    pub fn dimensions(&self) -> &DimensionRegistry {
        &self.dimensions
    }

    /// The properties index.
    pub fn index(&self) -> &WorldPropertiesIndex {
        &self.index
    }

    // Properties.

    /// Create or recover the properties for `folder` without loading it.
    ///
    /// A live or already-known world returns its current properties. Otherwise
    /// an on-disk record is reused, or fresh properties are built from
    /// `archetype`. The record gets a UUID and a dimension id, is indexed and
    /// written back.
    #[instrument(skip(self, archetype), fields(folder = %folder))]
    pub fn create_properties(
        &mut self,
        folder: &str,
        archetype: &WorldArchetype,
        explicit_id: Option<DimensionId>,
    ) -> Result<WorldProperties, LifecycleError> {
        if let Some(world) = self.world_by_folder(folder) {
            return Ok(world.properties().clone());
        }
        if let Some(known) = self.index.by_folder(folder) {
            return Ok(known.clone());
        }

        let mut properties = match self.storage.read_properties(folder)? {
            Some(mut stored) => {
                stored.folder_name = folder.to_string();
                stored
            }
            None => archetype.build(folder),
        };
        assign_uuid_if_missing(&mut properties, self.storage.as_ref());
        self.check_uuid(&properties)?;
        let id = match explicit_id {
            Some(id) => id,
            None => self.resolve_dimension_id(&properties),
        };
        properties.dimension_id = Some(id);

        let dimension_type = self.type_for(id, &properties.dimension_type)?;
        let newly_registered = self.ensure_dimension(id, dimension_type)?;
        if let Err(err) = self.index.register(properties.clone()) {
            if newly_registered {
                self.dimensions.unregister_dimension(id);
            }
            return Err(err.into());
        }
        self.events.notify(&WorldEvent::PropertiesConstructed {
            folder: folder.to_string(),
            uuid: properties.uuid,
            dimension: properties.dimension_id,
        });
        if let Err(err) = self.storage.write_properties(&properties) {
            self.index
                .unregister(&properties, newly_registered, &mut self.dimensions);
            return Err(err.into());
        }
        info!(dimension = %id, uuid = %properties.uuid, "Created world properties");
        Ok(properties)
    }

    /// Make `properties` known without loading it.
    pub fn register_properties(
        &mut self,
        mut properties: WorldProperties,
    ) -> Result<WorldProperties, LifecycleError> {
        assign_uuid_if_missing(&mut properties, self.storage.as_ref());
        self.check_uuid(&properties)?;
        let mut newly_registered = false;
        if let Some(id) = properties.dimension_id {
            let dimension_type = self.type_for(id, &properties.dimension_type)?;
            newly_registered = self.ensure_dimension(id, dimension_type)?;
        }
        if let Err(err) = self.index.register(properties.clone()) {
            if let (true, Some(id)) = (newly_registered, properties.dimension_id) {
                self.dimensions.unregister_dimension(id);
            }
            return Err(err.into());
        }
        Ok(properties)
    }

    // Loading.

    /// Load a world, or return the id it is already loaded under.
    #[instrument(skip(self, world))]
    pub fn load_world(
        &mut self,
        world: impl Into<WorldRef>,
    ) -> Result<DimensionId, LifecycleError> {
        let (folder, given) = match world.into() {
            WorldRef::Uuid(uuid) => {
                let known = self
                    .index
                    .by_uuid(uuid)
                    .ok_or_else(|| LifecycleError::PropertiesNotFound(uuid.to_string()))?;
                (known.folder_name.clone(), None)
            }
            WorldRef::Folder(folder) => (folder, None),
            WorldRef::Properties(properties) => (properties.folder_name.clone(), Some(properties)),
        };
        if let Some(id) = self.loaded_id_for(&folder) {
            return Ok(id);
        }
        if !self.storage.folder_exists(&folder) {
            return Err(LifecycleError::FolderNotFound(folder));
        }

        let known = self.index.by_folder(&folder).cloned();
        let mut properties = match known.or(given) {
            Some(properties) => properties,
            None => self
                .storage
                .read_properties(&folder)?
                .ok_or_else(|| LifecycleError::PropertiesNotFound(folder.clone()))?,
        };
        properties.folder_name = folder;
        self.construct_world(properties)
    }

    /// Shared construction path of [`WorldManager::load_world`] and discovery.
    fn construct_world(
        &mut self,
        mut properties: WorldProperties,
    ) -> Result<DimensionId, LifecycleError> {
        let folder = properties.folder_name.clone();
        if !properties.enabled {
            return Err(LifecycleError::WorldDisabled(folder));
        }
        assign_uuid_if_missing(&mut properties, self.storage.as_ref());
        self.check_uuid(&properties)?;
        let id = self.resolve_dimension_id(&properties);
        properties.dimension_id = Some(id);

        let dimension_type = self.type_for(id, &properties.dimension_type)?;
        let newly_registered = self.ensure_dimension(id, dimension_type.clone())?;
        if let Err(err) = self.index.register(properties.clone()) {
            if newly_registered {
                self.dimensions.unregister_dimension(id);
            }
            return Err(err.into());
        }

        let loading = WorldEvent::Loading {
            folder: folder.clone(),
            dimension: id,
        };
        if self.events.post_cancelable(&loading) {
            info!(folder = %folder, dimension = %id, "World load canceled by a listener");
            return Err(LifecycleError::Canceled {
                folder,
                event: loading.kind(),
            });
        }

        let instance = self
            .factory
            .construct(id, &dimension_type, properties.clone())
            .map_err(|err| LifecycleError::ConstructionFailed {
                folder: folder.clone(),
                reason: format!("{err:#}"),
            })?;
        self.worlds.insert(id, instance);
        self.reorder_live_worlds();
        self.events.notify(&WorldEvent::Loaded {
            folder: folder.clone(),
            dimension: id,
        });
        if let Err(err) = self.storage.write_properties(&properties) {
            warn!(folder = %folder, %err, "Failed to write properties of loaded world");
        }
        info!(folder = %folder, dimension = %id, "Loaded world");
        Ok(id)
    }

    /// Adopt a live world built outside the manager.
    pub fn force_register_world(
        &mut self,
        instance: Box<dyn WorldInstance>,
    ) -> Result<DimensionId, LifecycleError> {
        let id = instance.dimension_id();
        if self.worlds.contains_key(&id) {
            return Err(RegistryError::DimensionAlreadyRegistered(id).into());
        }
        let mut properties = instance.properties().clone();
        properties.dimension_id = Some(id);
        let dimension_type = self.type_for(id, &properties.dimension_type)?;
        self.ensure_dimension(id, dimension_type)?;
        self.check_uuid(&properties)?;
        self.index.register(properties.clone())?;
        self.worlds.insert(id, instance);
        self.reorder_live_worlds();
        self.events.notify(&WorldEvent::Loaded {
            folder: properties.folder_name.clone(),
            dimension: id,
        });
        info!(folder = %properties.folder_name, dimension = %id, "Adopted external world");
        Ok(id)
    }

    // Unloading.

    /// Queue `id` for unloading on the next [`WorldManager::tick`].
    pub fn request_unload(&mut self, id: DimensionId) {
        debug!(dimension = %id, "Queued world unload");
        self.unload_queue.push_back(id);
    }

    /// Ids waiting in the unload queue, oldest first.
    pub fn pending_unloads(&self) -> impl Iterator<Item = DimensionId> + '_ {
        self.unload_queue.iter().copied()
    }

    /// Unload every queued world that can be unloaded. Refusals are dropped.
    pub fn drain_unload_queue(&mut self) {
        while let Some(id) = self.unload_queue.pop_front() {
            self.unload_now(id, true, false);
        }
    }

    /// Unload `id` immediately. Returns false, changing nothing, when the
    /// unload is refused.
    pub fn unload_now(&mut self, id: DimensionId, check_config: bool, shutting_down: bool) -> bool {
        match self.try_unload(id, check_config, shutting_down) {
            Ok(()) => true,
            Err(err) => {
                debug!(dimension = %id, %err, "World unload refused");
                false
            }
        }
    }

    /// Like [`WorldManager::unload_now`] but says why an unload was refused.
    ///
    /// Save failures never refuse an unload: they are logged and the world is
    /// dropped from memory anyway.
    #[instrument(skip(self))]
    pub fn try_unload(
        &mut self,
        id: DimensionId,
        check_config: bool,
        shutting_down: bool,
    ) -> Result<(), LifecycleError> {
        let world = self
            .worlds
            .get(&id)
            .ok_or_else(|| {
                LifecycleError::precondition(&id.to_string(), Precondition::WorldNotLoaded)
            })?;
        let folder = world.properties().folder_name.clone();
        if !shutting_down && world.occupant_count() > 0 {
            return Err(LifecycleError::precondition(&folder, Precondition::HasOccupants));
        }
        if !shutting_down && check_config && world.properties().keep_spawn_loaded {
            return Err(LifecycleError::precondition(&folder, Precondition::KeepSpawnLoaded));
        }

        let unloading = WorldEvent::Unloading {
            folder: folder.clone(),
            dimension: id,
            shutting_down,
        };
        if self.events.post_cancelable(&unloading) && !shutting_down {
            return Err(LifecycleError::Canceled {
                folder,
                event: unloading.kind(),
            });
        }
        if !shutting_down {
            if let Err(err) = self.persist_world(id) {
                error!(
                    folder = %folder,
                    %err,
                    "Failed to save world during unload, unsaved changes are lost"
                );
            }
        }

        if let Some(world) = self.worlds.remove(&id) {
            if let Err(err) = self.index.register(world.properties().clone()) {
                warn!(folder = %folder, %err, "Unloaded world could not be re-indexed");
            }
        }
        self.reorder_live_worlds();
        self.events.notify(&WorldEvent::Unloaded {
            folder: folder.clone(),
            dimension: id,
        });
        info!(folder = %folder, dimension = %id, shutting_down, "Unloaded world");
        Ok(())
    }

    /// Recompute the canonical world order from the live set.
    pub fn reorder_live_worlds(&mut self) {
        self.world_order.clear();
        self.world_order.extend(self.worlds.keys().copied());
        sort_canonical(&mut self.world_order);
    }

    // Saving and ticking.

    /// Save one live world. Returns whether anything was written.
    ///
    /// Worlds set to never save are skipped, and autosaves skip worlds set to
    /// manual saving.
    pub fn save_world(&mut self, id: DimensionId, autosave: bool) -> Result<bool, LifecycleError> {
        let world = self
            .worlds
            .get(&id)
            .ok_or_else(|| {
                LifecycleError::precondition(&id.to_string(), Precondition::WorldNotLoaded)
            })?;
        match world.properties().serialization {
            SerializationBehavior::None => return Ok(false),
            SerializationBehavior::Manual if autosave => return Ok(false),
            _ => {}
        }
        self.persist_world(id)?;
        Ok(true)
    }

    /// Save every live world in canonical order. Failures are logged.
    /// Returns the number of worlds written.
    pub fn save_all_worlds(&mut self, autosave: bool) -> usize {
        let mut saved = 0;
        for id in self.world_order.clone() {
            match self.save_world(id, autosave) {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(err) => error!(dimension = %id, %err, "Failed to save world"),
            }
        }
        debug!(saved, autosave, "Saved worlds");
        saved
    }

    fn persist_world(&mut self, id: DimensionId) -> Result<(), LifecycleError> {
        let storage = Arc::clone(&self.storage);
        let Some(world) = self.worlds.get_mut(&id) else {
            return Ok(());
        };
        if world.properties().skips_saving() {
            return Ok(());
        }
        let folder = world.properties().folder_name.clone();
        world
            .save(storage.as_ref())
            .map_err(|err| LifecycleError::SaveFailed {
                folder: folder.clone(),
                reason: format!("{err:#}"),
            })?;
        storage
            .write_properties(world.properties())
            .map_err(|err| LifecycleError::SaveFailed {
                folder,
                reason: err.to_string(),
            })
    }

    /// One control-loop iteration: drain the unload queue, apply background
    /// completions, tick live worlds and autosave on the configured interval.
    pub fn tick(&mut self) {
        self.drain_unload_queue();
        self.apply_completions();
        for id in &self.world_order {
            if let Some(world) = self.worlds.get_mut(id) {
                world.tick();
            }
        }
        self.tick = self.tick.advance(1);
        if self.autosave_enabled()
            && self.tick.is_multiple_of(self.settings.autosave_interval_ticks)
        {
            self.save_all_worlds(true);
        }
    }

    /// Ticks run so far.
    pub fn current_tick(&self) -> SimTick {
        self.tick
    }

    /// Whether autosave runs: an interval is set and no copy is in flight.
    pub fn autosave_enabled(&self) -> bool {
        self.settings.autosave_interval_ticks > 0 && self.autosave_suspensions == 0
    }

    /// Save everything, then unload every world in reverse canonical order.
    #[instrument(skip(self))]
    pub fn shutdown(&mut self) {
        self.apply_completions();
        self.save_all_worlds(false);
        let order: Vec<DimensionId> = self.world_order.iter().rev().copied().collect();
        for id in order {
            self.unload_now(id, false, true);
        }
        self.unload_queue.clear();
        info!("World manager shut down");
    }

    // Queries.

    /// Live world under `id`.
    pub fn world(&self, id: DimensionId) -> Option<&dyn WorldInstance> {
        self.worlds.get(&id).map(|world| &**world)
    }

    /// Mutable live world under `id`.
    pub fn world_mut(&mut self, id: DimensionId) -> Option<&mut (dyn WorldInstance + 'static)> {
        self.worlds.get_mut(&id).map(|world| &mut **world)
    }

    /// Live world stored in `folder`.
    pub fn world_by_folder(&self, folder: &str) -> Option<&dyn WorldInstance> {
        self.loaded_id_for(folder).and_then(|id| self.world(id))
    }

    /// Live world with `uuid`.
    pub fn world_by_uuid(&self, uuid: Uuid) -> Option<&dyn WorldInstance> {
        self.worlds
            .values()
            .find(|world| world.properties().uuid == uuid)
            .map(|world| &**world)
    }

    /// Live worlds in canonical order.
    pub fn loaded_worlds(&self) -> impl Iterator<Item = &dyn WorldInstance> + '_ {
        self.world_order.iter().filter_map(|id| self.world(*id))
    }

    /// Live dimension ids in canonical order.
    pub fn world_order(&self) -> &[DimensionId] {
        &self.world_order
    }

    /// Whether a world is live under `id`.
    pub fn is_loaded(&self, id: DimensionId) -> bool {
        self.worlds.contains_key(&id)
    }

    /// Every known record, loaded or not, ordered by folder.
    pub fn known_properties(&self) -> impl Iterator<Item = &WorldProperties> + '_ {
        self.index.all_known()
    }

    /// Known records with no live world.
    pub fn unloaded_properties(&self) -> impl Iterator<Item = &WorldProperties> + '_ {
        self.index
            .all_known()
            .filter(|properties| self.loaded_id_for(&properties.folder_name).is_none())
    }

    // Helpers.

    fn loaded_id_for(&self, folder: &str) -> Option<DimensionId> {
        self.worlds
            .iter()
            .find(|(_, world)| world.properties().folder_name == folder)
            .map(|(id, _)| *id)
    }

    /// Folder holding dimension `id`, if one can be named.
    fn resolve_folder(&self, id: DimensionId) -> Option<String> {
        if id == DimensionId::PRIMARY {
            return Some(self.settings.level_name.clone());
        }
        if let Some(name) = id.legacy_folder_name() {
            return Some(name.to_string());
        }
        self.index
            .folder_for_dimension(id)
            .or_else(|| self.discovered.get(&id).map(String::as_str))
            .map(str::to_string)
    }

    /// Reuse the record's id unless it is unassigned, live or owned by
    /// another folder; otherwise allocate a fresh one.
    fn resolve_dimension_id(&mut self, properties: &WorldProperties) -> DimensionId {
        if let Some(id) = properties.dimension_id {
            let owned_elsewhere = self
                .resolve_folder(id)
                .is_some_and(|owner| owner != properties.folder_name);
            if !self.worlds.contains_key(&id) && !owned_elsewhere {
                return id;
            }
            debug!(
                folder = %properties.folder_name,
                dimension = %id,
                "Stored dimension id is taken"
            );
        }
        self.next_free_dimension_id()
    }

    fn type_for(
        &self,
        id: DimensionId,
        key: &DimensionTypeKey,
    ) -> Result<DimensionType, LifecycleError> {
        if let Some(bound) = self.dimensions.type_of(id) {
            return Ok(bound.clone());
        }
        self.dimensions
            .types()
            .by_key(key)
            .map(|(_, dimension_type)| dimension_type.clone())
            .ok_or_else(|| RegistryError::TypeNotRegistered(key.clone()).into())
    }

    /// Register `id` unless it already is. Returns whether it was new.
    fn ensure_dimension(
        &mut self,
        id: DimensionId,
        dimension_type: DimensionType,
    ) -> Result<bool, LifecycleError> {
        if self.dimensions.is_registered(id) {
            return Ok(false);
        }
        self.dimensions.register_dimension(id, dimension_type)?;
        Ok(true)
    }

    fn check_uuid(&self, properties: &WorldProperties) -> Result<(), LifecycleError> {
        match self.index.by_uuid(properties.uuid) {
            Some(owner) if owner.folder_name != properties.folder_name => {
                Err(LifecycleError::UuidCollision {
                    folder: properties.folder_name.clone(),
                    uuid: properties.uuid,
                    owner: owner.folder_name.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for WorldManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldManager")
            .field("world_order", &self.world_order)
            .field("known", &self.index.len())
            .field("pending_unloads", &self.unload_queue.len())
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}
