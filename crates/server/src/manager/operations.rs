//! Rename, copy and delete of unloaded or saved worlds.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use worldhost_world::{WorldProperties, LEGACY_UUID_FILE};

use super::WorldManager;
use crate::scheduler::{Completion, CompletionGuard};
use crate::{LifecycleError, PendingOperation, Precondition};

/// How a delete resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The folder was removed.
    Deleted,
    /// The folder was already gone.
    AlreadyAbsent,
}

impl WorldManager {
    /// Move an unloaded world to `new_name`, keeping its UUID and dimension id.
    #[instrument(skip(self, properties), fields(from = %properties.folder_name))]
    pub fn rename_world(
        &mut self,
        properties: &WorldProperties,
        new_name: &str,
    ) -> Result<WorldProperties, LifecycleError> {
        let old_name = properties.folder_name.as_str();
        if self.loaded_id_for(old_name).is_some() {
            return Err(LifecycleError::precondition(old_name, Precondition::WorldLoaded));
        }
        if self.storage.folder_exists(new_name) || self.index.by_folder(new_name).is_some() {
            return Err(LifecycleError::AlreadyExists(new_name.to_string()));
        }
        self.storage
            .move_tree(old_name, new_name)
            .map_err(|source| LifecycleError::MoveFailed {
                from: old_name.to_string(),
                to: new_name.to_string(),
                source,
            })?;

        let previous = self
            .index
            .unregister(properties, false, &mut self.dimensions)
            .unwrap_or_else(|| properties.clone());
        let renamed = WorldProperties {
            folder_name: new_name.to_string(),
            level_name: new_name.to_string(),
            uuid: previous.uuid,
            dimension_id: previous.dimension_id,
            ..previous
        };
        if let Some(id) = renamed.dimension_id {
            if let Some(folder) = self.discovered.get_mut(&id) {
                *folder = new_name.to_string();
            }
        }
        self.index.register(renamed.clone())?;
        if let Err(err) = self.storage.write_properties(&renamed) {
            warn!(folder = %new_name, %err, "Failed to write renamed world record");
        }
        info!(to = %new_name, uuid = %renamed.uuid, "Renamed world");
        Ok(renamed)
    }

    /// Copy a known world to `new_name` in the background.
    ///
    /// A loaded source is saved first and autosave stays off until the copy
    /// finishes. The copy gets a cleared UUID and no dimension id, and is not
    /// indexed: it becomes known once loaded or registered.
    #[instrument(skip(self, properties), fields(from = %properties.folder_name))]
    pub fn copy_world(
        &mut self,
        properties: &WorldProperties,
        new_name: &str,
    ) -> Result<PendingOperation<WorldProperties>, LifecycleError> {
        let from = properties.folder_name.clone();
        let scheduler = self
            .scheduler
            .clone()
            .ok_or(LifecycleError::SchedulerUnavailable)?;
        let loaded = self.loaded_id_for(&from);
        let template = match loaded {
            Some(id) => self.worlds.get(&id).map(|world| world.properties().clone()),
            None => self.index.by_folder(&from).cloned(),
        }
        .ok_or_else(|| LifecycleError::precondition(&from, Precondition::UnknownWorld))?;
        if self.index.by_folder(new_name).is_some() || self.storage.folder_exists(new_name) {
            return Err(LifecycleError::AlreadyExists(new_name.to_string()));
        }

        let guard = match loaded {
            Some(id) => {
                self.persist_world(id)?;
                self.autosave_suspensions += 1;
                debug!(suspensions = self.autosave_suspensions, "Autosave suspended for copy");
                Some(CompletionGuard::new(
                    self.completions_tx.clone(),
                    Completion::AutosaveResumed,
                ))
            }
            None => None,
        };
        let storage = Arc::clone(&self.storage);
        let to = new_name.to_string();
        Ok(scheduler.submit(move || {
            let _autosave = guard;
            storage
                .copy_tree(&from, &to)
                .map_err(|source| LifecycleError::CopyFailed {
                    from: from.clone(),
                    to: to.clone(),
                    source,
                })?;
            let copy = template.detached_copy(&to);
            storage
                .remove_file(&to, LEGACY_UUID_FILE)
                .and_then(|()| storage.write_properties(&copy))
                .map_err(|source| LifecycleError::CopyFailed {
                    from: from.clone(),
                    to: to.clone(),
                    source,
                })?;
            info!(from = %from, to = %to, "Copied world");
            Ok(copy)
        }))
    }

    /// Delete a known, unloaded world in the background.
    ///
    /// The index entry and dimension id are released on the next
    /// [`WorldManager::tick`] after the folder is gone.
    #[instrument(skip(self, properties), fields(folder = %properties.folder_name))]
    pub fn delete_world(
        &mut self,
        properties: &WorldProperties,
    ) -> Result<PendingOperation<DeleteOutcome>, LifecycleError> {
        let folder = properties.folder_name.clone();
        if self.loaded_id_for(&folder).is_some() {
            return Err(LifecycleError::precondition(&folder, Precondition::WorldLoaded));
        }
        let known = self
            .index
            .by_folder(&folder)
            .cloned()
            .ok_or_else(|| LifecycleError::precondition(&folder, Precondition::UnknownWorld))?;
        let scheduler = self
            .scheduler
            .clone()
            .ok_or(LifecycleError::SchedulerUnavailable)?;
        let storage = Arc::clone(&self.storage);
        let tx = self.completions_tx.clone();
        Ok(scheduler.submit(move || {
            let outcome = if storage.folder_exists(&folder) {
                storage
                    .delete_tree(&folder)
                    .map_err(|source| LifecycleError::DeleteFailed {
                        folder: folder.clone(),
                        source,
                    })?;
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::AlreadyAbsent
            };
            if tx.send(Completion::Deleted(known)).is_err() {
                debug!(folder = %folder, "Manager is gone, deletion not committed");
            }
            info!(folder = %folder, ?outcome, "Deleted world");
            Ok(outcome)
        }))
    }

    /// Apply everything background work has reported so far.
    pub fn apply_completions(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            match completion {
                Completion::AutosaveResumed => {
                    self.autosave_suspensions = self.autosave_suspensions.saturating_sub(1);
                    debug!(suspensions = self.autosave_suspensions, "Copy finished");
                }
                Completion::Deleted(properties) => self.commit_delete(properties),
            }
        }
    }

    fn commit_delete(&mut self, deleted: WorldProperties) {
        let folder = deleted.folder_name.clone();
        if self.loaded_id_for(&folder).is_some() {
            warn!(folder = %folder, "World was loaded again before its deletion was committed");
            return;
        }
        let current = self.index.by_folder(&folder).cloned().unwrap_or(deleted);
        let free_id = current.dimension_id.is_some_and(|id| {
            self.dimensions.is_registered(id)
                && self.index.folder_for_dimension(id) == Some(folder.as_str())
        });
        self.index.unregister(&current, free_id, &mut self.dimensions);
        if let Some(id) = current.dimension_id {
            if self.discovered.get(&id) == Some(&folder) {
                self.discovered.remove(&id);
            }
        }
        info!(folder = %folder, free_id, "Released deleted world");
    }
}
