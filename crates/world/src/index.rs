//! Bidirectional index over known world properties.
//!
//! Properties are stored once, keyed by folder name. UUIDs and dimension ids
//! map back to the owning folder. Every lookup direction stays symmetric: for
//! each registered record `p`, `by_folder(p.folder)`, `by_uuid(p.uuid)` and
//! `folder_for_dimension(p.dimension_id)` all agree on `p`.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};
use uuid::Uuid;
use worldhost_core::DimensionId;

use crate::{DimensionRegistry, IndexError, WorldProperties, WorldStorage};

/// Index of every known world, loaded or not.
#[derive(Debug, Default, Clone)]
pub struct WorldPropertiesIndex {
    by_folder: BTreeMap<String, WorldProperties>,
    folder_by_uuid: HashMap<Uuid, String>,
    folder_by_dimension: BTreeMap<DimensionId, String>,
}

impl WorldPropertiesIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh `properties`.
    ///
    /// Re-registering a folder replaces its previous entry. A UUID or dimension
    /// id already owned by a different folder is rejected and nothing changes.
    /// Nil UUIDs and unassigned ids are simply not indexed.
    pub fn register(&mut self, properties: WorldProperties) -> Result<(), IndexError> {
        let folder = &properties.folder_name;
        if properties.has_uuid() {
            if let Some(owner) = self.folder_by_uuid.get(&properties.uuid) {
                if owner != folder {
                    return Err(IndexError::UuidClaimed {
                        uuid: properties.uuid,
                        owner: owner.clone(),
                    });
                }
            }
        }
        if let Some(id) = properties.dimension_id {
            if let Some(owner) = self.folder_by_dimension.get(&id) {
                if owner != folder {
                    return Err(IndexError::DimensionClaimed {
                        id,
                        owner: owner.clone(),
                    });
                }
            }
        }

        if let Some(previous) = self.by_folder.remove(folder) {
            self.drop_secondary(&previous);
        }
        if properties.has_uuid() {
            self.folder_by_uuid.insert(properties.uuid, folder.clone());
        }
        if let Some(id) = properties.dimension_id {
            self.folder_by_dimension.insert(id, folder.clone());
        }
        debug!(folder = %folder, uuid = %properties.uuid, "Registered world properties");
        self.by_folder.insert(folder.clone(), properties);
        Ok(())
    }

    /// Remove the entry for `properties.folder_name`.
    ///
    /// With `free_id`, the dimension id of the removed record is released
    /// from `dimensions` too. Primordial ids are never released.
    pub fn unregister(
        &mut self,
        properties: &WorldProperties,
        free_id: bool,
        dimensions: &mut DimensionRegistry,
    ) -> Option<WorldProperties> {
        let removed = self.by_folder.remove(&properties.folder_name)?;
        self.drop_secondary(&removed);
        if free_id {
            match removed.dimension_id {
                Some(id) if id.is_primordial() => {
                    warn!(dimension = %id, "Refusing to release a primordial dimension id");
                }
                Some(id) => dimensions.unregister_dimension(id),
                None => {}
            }
        }
        debug!(folder = %removed.folder_name, free_id, "Unregistered world properties");
        Some(removed)
    }

    fn drop_secondary(&mut self, properties: &WorldProperties) {
        if self.folder_by_uuid.get(&properties.uuid) == Some(&properties.folder_name) {
            self.folder_by_uuid.remove(&properties.uuid);
        }
        if let Some(id) = properties.dimension_id {
            if self.folder_by_dimension.get(&id) == Some(&properties.folder_name) {
                self.folder_by_dimension.remove(&id);
            }
        }
    }

    /// Properties registered for `folder`.
    pub fn by_folder(&self, folder: &str) -> Option<&WorldProperties> {
        self.by_folder.get(folder)
    }

    /// Properties registered under `uuid`.
    pub fn by_uuid(&self, uuid: Uuid) -> Option<&WorldProperties> {
        self.folder_by_uuid
            .get(&uuid)
            .and_then(|folder| self.by_folder.get(folder))
    }

    /// Folder bound to `id`.
    pub fn folder_for_dimension(&self, id: DimensionId) -> Option<&str> {
        self.folder_by_dimension.get(&id).map(String::as_str)
    }

    /// Every known record, ordered by folder name.
    pub fn all_known(&self) -> impl Iterator<Item = &WorldProperties> + '_ {
        self.by_folder.values()
    }

    /// Number of known worlds.
    pub fn len(&self) -> usize {
        self.by_folder.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_folder.is_empty()
    }

    /// Whether every lookup direction agrees with the folder map.
    pub fn is_consistent(&self) -> bool {
        let forward = self.by_folder.iter().all(|(folder, props)| {
            folder == &props.folder_name
                && (!props.has_uuid()
                    || self.folder_by_uuid.get(&props.uuid) == Some(folder))
                && props
                    .dimension_id
                    .map_or(true, |id| self.folder_by_dimension.get(&id) == Some(folder))
        });
        let uuids = self.folder_by_uuid.iter().all(|(uuid, folder)| {
            self.by_folder.get(folder).map(|p| p.uuid) == Some(*uuid)
        });
        let dimensions = self.folder_by_dimension.iter().all(|(id, folder)| {
            self.by_folder.get(folder).and_then(|p| p.dimension_id) == Some(*id)
        });
        forward && uuids && dimensions
    }
}

/// Give `properties` a UUID if it has none.
///
/// A UUID recovered from the folder's legacy side-channel file wins over a
/// freshly generated one. An existing UUID is never replaced. Returns whether
/// a UUID was assigned.
pub fn assign_uuid_if_missing(
    properties: &mut WorldProperties,
    storage: &dyn WorldStorage,
) -> bool {
    if properties.has_uuid() {
        return false;
    }
    properties.uuid = match storage.read_legacy_uuid(&properties.folder_name) {
        Some(uuid) => {
            debug!(folder = %properties.folder_name, %uuid, "Recovered legacy world uuid");
            uuid
        }
        None => Uuid::new_v4(),
    };
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FsWorldStorage, WorldArchetype, LEGACY_UUID_FILE};
    use tempfile::tempdir;
    use worldhost_core::DimensionType;

    fn props(folder: &str, id: Option<i32>) -> WorldProperties {
        let mut props = WorldArchetype::default().build(folder);
        props.uuid = Uuid::new_v4();
        props.dimension_id = id.map(DimensionId);
        props
    }

    fn dimensions() -> DimensionRegistry {
        let mut registry = DimensionRegistry::new();
        registry.types_mut().register(DimensionType::overworld()).unwrap();
        registry
    }

    #[test]
    fn register_populates_every_direction() {
        let mut index = WorldPropertiesIndex::new();
        let p = props("alpha", Some(4));
        index.register(p.clone()).unwrap();
        assert_eq!(index.by_folder("alpha"), Some(&p));
        assert_eq!(index.by_uuid(p.uuid), Some(&p));
        assert_eq!(index.folder_for_dimension(DimensionId(4)), Some("alpha"));
        assert!(index.is_consistent());
    }

    #[test]
    fn reregistering_refreshes_stale_entries() {
        let mut index = WorldPropertiesIndex::new();
        let p = props("alpha", Some(4));
        index.register(p.clone()).unwrap();
        let mut refreshed = p.clone();
        refreshed.dimension_id = Some(DimensionId(5));
        refreshed.uuid = Uuid::new_v4();
        index.register(refreshed.clone()).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.folder_for_dimension(DimensionId(4)), None);
        assert_eq!(index.by_uuid(p.uuid), None);
        assert_eq!(index.by_uuid(refreshed.uuid), Some(&refreshed));
        assert!(index.is_consistent());
    }

    #[test]
    fn conflicting_uuid_is_rejected() {
        let mut index = WorldPropertiesIndex::new();
        let first = props("alpha", Some(4));
        index.register(first.clone()).unwrap();
        let mut clash = props("beta", Some(5));
        clash.uuid = first.uuid;
        assert_eq!(
            index.register(clash),
            Err(IndexError::UuidClaimed {
                uuid: first.uuid,
                owner: "alpha".into()
            })
        );
        assert!(index.by_folder("beta").is_none());
        assert!(index.is_consistent());
    }

    #[test]
    fn conflicting_dimension_is_rejected() {
        let mut index = WorldPropertiesIndex::new();
        index.register(props("alpha", Some(4))).unwrap();
        let err = index.register(props("beta", Some(4))).unwrap_err();
        assert!(matches!(err, IndexError::DimensionClaimed { .. }));
    }

    #[test]
    fn unregister_with_free_id_releases_dimension() {
        let mut index = WorldPropertiesIndex::new();
        let mut dims = dimensions();
        dims.register_dimension(DimensionId(4), DimensionType::overworld()).unwrap();
        let p = props("alpha", Some(4));
        index.register(p.clone()).unwrap();

        let removed = index.unregister(&p, true, &mut dims);
        assert_eq!(removed, Some(p.clone()));
        assert!(!dims.is_registered(DimensionId(4)));
        assert!(index.by_uuid(p.uuid).is_none());
        assert!(index.folder_for_dimension(DimensionId(4)).is_none());
    }

    #[test]
    fn unregister_without_free_id_keeps_dimension() {
        let mut index = WorldPropertiesIndex::new();
        let mut dims = dimensions();
        dims.register_dimension(DimensionId(4), DimensionType::overworld()).unwrap();
        let p = props("alpha", Some(4));
        index.register(p.clone()).unwrap();
        index.unregister(&p, false, &mut dims);
        assert!(dims.is_registered(DimensionId(4)));
        assert!(index.is_empty());
    }

    #[test]
    fn primordial_ids_survive_free_id() {
        let mut index = WorldPropertiesIndex::new();
        let mut dims = dimensions();
        dims.register_dimension(DimensionId::PRIMARY, DimensionType::overworld()).unwrap();
        let p = props("world", Some(0));
        index.register(p.clone()).unwrap();
        index.unregister(&p, true, &mut dims);
        assert!(dims.is_registered(DimensionId::PRIMARY));
    }

    #[test]
    fn uuid_assignment_prefers_legacy_file_and_never_overwrites() {
        let dir = tempdir().unwrap();
        let storage = FsWorldStorage::new(dir.path()).unwrap();
        let legacy = Uuid::new_v4();
        let (high, low) = legacy.as_u64_pair();
        let mut bytes = high.to_be_bytes().to_vec();
        bytes.extend_from_slice(&low.to_be_bytes());
        storage.write_file("old", LEGACY_UUID_FILE, &bytes).unwrap();

        let mut recovered = WorldArchetype::default().build("old");
        assert!(assign_uuid_if_missing(&mut recovered, &storage));
        assert_eq!(recovered.uuid, legacy);
        assert!(!assign_uuid_if_missing(&mut recovered, &storage));
        assert_eq!(recovered.uuid, legacy);

        let mut fresh = WorldArchetype::default().build("new");
        assert!(assign_uuid_if_missing(&mut fresh, &storage));
        assert!(fresh.has_uuid());
        assert_ne!(fresh.uuid, legacy);
    }
}
