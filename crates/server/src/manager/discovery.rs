//! Startup: legacy migration followed by discovery of every registered dimension.

use tracing::{debug, error, info, instrument, warn};
use worldhost_core::{DimensionId, DimensionType};
use worldhost_world::{assign_uuid_if_missing, MigrationReport, WorldProperties};

use super::WorldManager;
use crate::LifecycleError;

/// What [`WorldManager::load_all`] did.
#[derive(Debug, Default)]
pub struct StartupReport {
    /// Result of the legacy sweep, on the run that performed it.
    pub migration: Option<MigrationReport>,
    /// Dimensions loaded by this run, in canonical order.
    pub loaded: Vec<DimensionId>,
    /// Dimensions deliberately left unloaded.
    pub skipped: Vec<DimensionId>,
    /// Dimensions whose load failed.
    pub failed: Vec<(DimensionId, LifecycleError)>,
}

enum Discovery {
    AlreadyLoaded,
    Loaded,
    Skipped,
    Failed(LifecycleError),
}

impl WorldManager {
    /// Migrate foreign worlds once, then load every registered dimension in
    /// canonical order. Per-world problems are logged and skipped.
    #[instrument(skip(self))]
    pub fn load_all(&mut self) -> StartupReport {
        let mut report = StartupReport::default();
        if !self.migration_done {
            self.migration_done = true;
            if let Some(migration) = self.migration.clone() {
                let swept = migration.run();
                self.adopt_migrated(&swept.migrated);
                report.migration = Some(swept);
            }
        }
        self.scan_save_root();

        for (id, dimension_type) in self.dimensions.sorted_by_convention() {
            match self.discover(id, &dimension_type) {
                Discovery::AlreadyLoaded => {}
                Discovery::Loaded => report.loaded.push(id),
                Discovery::Skipped => report.skipped.push(id),
                Discovery::Failed(err) => {
                    error!(dimension = %id, %err, "Failed to load world during startup");
                    report.failed.push((id, err));
                }
            }
        }
        self.reorder_live_worlds();
        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "World discovery finished"
        );
        report
    }

    /// Give freshly migrated non-primordial worlds properties and an id.
    fn adopt_migrated(&mut self, migrated: &[String]) {
        let defaults = self.settings.startup_defaults.clone();
        for folder in migrated {
            let primordial = *folder == self.settings.level_name
                || DimensionId::PRIMORDIAL
                    .iter()
                    .any(|id| id.legacy_folder_name() == Some(folder.as_str()));
            if primordial || self.index.by_folder(folder).is_some() {
                continue;
            }
            if self.storage.read_properties(folder).ok().flatten().is_some() {
                debug!(folder = %folder, "Migrated world already has a record");
                continue;
            }
            let id = self.next_free_dimension_id();
            match self.create_properties(folder, &defaults, Some(id)) {
                Ok(_) => info!(folder = %folder, dimension = %id, "Registered migrated world"),
                Err(err) => warn!(folder = %folder, %err, "Failed to register migrated world"),
            }
        }
    }

    /// Register every dynamic dimension id recorded on disk so discovery
    /// iterates it and fresh ids do not collide with it. Worlds are not loaded.
    pub fn scan_save_root(&mut self) {
        let folders = match self.storage.list_folders() {
            Ok(folders) => folders,
            Err(err) => {
                warn!(%err, "Cannot scan save root for worlds");
                return;
            }
        };
        for folder in folders {
            let properties = match self.storage.read_properties(&folder) {
                Ok(Some(properties)) => properties,
                Ok(None) => continue,
                Err(err) => {
                    warn!(folder = %folder, %err, "Skipping unreadable world record");
                    continue;
                }
            };
            let Some(id) = properties.dimension_id else {
                continue;
            };
            if id.is_primordial() {
                continue;
            }
            if let Some(owner) = self.resolve_folder(id) {
                if owner != folder {
                    warn!(
                        folder = %folder,
                        dimension = %id,
                        owner = %owner,
                        "Dimension id already claimed, skipping"
                    );
                }
                continue;
            }
            if !self.dimensions.is_registered(id) {
                let known = self.dimensions.types().by_key(&properties.dimension_type);
                let Some((_, dimension_type)) = known else {
                    warn!(
                        folder = %folder,
                        dimension_type = %properties.dimension_type,
                        "Unknown dimension type, skipping"
                    );
                    continue;
                };
                let dimension_type = dimension_type.clone();
                if let Err(err) = self.dimensions.register_dimension(id, dimension_type) {
                    warn!(folder = %folder, %err, "Cannot register discovered dimension");
                    continue;
                }
            }
            debug!(folder = %folder, dimension = %id, "Discovered world on disk");
            self.discovered.insert(id, folder);
        }
    }

    fn discover(&mut self, id: DimensionId, dimension_type: &DimensionType) -> Discovery {
        if self.worlds.contains_key(&id) {
            return Discovery::AlreadyLoaded;
        }
        if id != DimensionId::PRIMARY && !self.settings.multi_world {
            debug!(dimension = %id, "Multi-world disabled, skipping");
            return Discovery::Skipped;
        }
        let Some(folder) = self.resolve_folder(id) else {
            error!(dimension = %id, "Cannot resolve a folder for dimension, skipping");
            return Discovery::Skipped;
        };
        let overrides = self.settings.overrides(&folder);
        if overrides.enabled == Some(false) {
            info!(folder = %folder, "World disabled by configuration, skipping");
            return Discovery::Skipped;
        }

        let mut properties = match self.stored_or_synthesized(id, dimension_type, &folder) {
            Ok(Some(properties)) => properties,
            Ok(None) => return Discovery::Skipped,
            Err(err) => return Discovery::Failed(err),
        };
        properties.folder_name = folder.clone();
        properties.level_name = folder.clone();
        overrides.apply(&mut properties);

        assign_uuid_if_missing(&mut properties, self.storage.as_ref());
        if let Some(owner) = self.index.by_uuid(properties.uuid) {
            if owner.folder_name != folder {
                warn!(
                    folder = %folder,
                    uuid = %properties.uuid,
                    owner = %owner.folder_name,
                    "World uuid already belongs to another folder, skipping"
                );
                return Discovery::Skipped;
            }
        }
        properties.dimension_id = Some(id);

        if id != DimensionId::PRIMARY && !properties.load_on_startup {
            warn!(folder = %folder, dimension = %id, "World is not loaded on startup");
            if let Err(err) = self.index.register(properties) {
                warn!(folder = %folder, %err, "Cannot index world");
            }
            return Discovery::Skipped;
        }

        match self.construct_world(properties) {
            Ok(_) => Discovery::Loaded,
            Err(LifecycleError::WorldDisabled(folder)) => {
                info!(folder = %folder, "World is disabled, skipping");
                Discovery::Skipped
            }
            Err(err) => Discovery::Failed(err),
        }
    }

    /// Known or on-disk properties of `folder`, or fresh ones from the startup
    /// defaults. `None` when a dynamic world has no folder.
    fn stored_or_synthesized(
        &mut self,
        id: DimensionId,
        dimension_type: &DimensionType,
        folder: &str,
    ) -> Result<Option<WorldProperties>, LifecycleError> {
        if let Some(known) = self.index.by_folder(folder) {
            return Ok(Some(known.clone()));
        }
        if let Some(stored) = self.storage.read_properties(folder)? {
            return Ok(Some(stored));
        }
        if !self.storage.folder_exists(folder) {
            if !id.is_primordial() {
                error!(folder = %folder, dimension = %id, "World folder is missing, skipping");
                return Ok(None);
            }
            self.storage.create_folder(folder)?;
        }
        let mut archetype = self.settings.startup_defaults.clone();
        archetype.dimension_type = dimension_type.key().clone();
        debug!(folder = %folder, "Synthesizing world properties from startup defaults");
        Ok(Some(archetype.build(folder)))
    }
}
