//! Property tests for the world properties index.
//!
//! Random register/unregister sequences must never leave the folder, UUID and
//! dimension lookups disagreeing with each other.

use proptest::prelude::*;
use uuid::Uuid;
use worldhost_core::{DimensionId, DimensionType};
use worldhost_world::{DimensionRegistry, WorldArchetype, WorldPropertiesIndex};

const FOLDERS: [&str; 5] = ["world", "creative", "skyblock", "arena", "lobby"];

#[derive(Debug, Clone)]
enum Op {
    Register {
        folder: usize,
        uuid: u8,
        dimension: Option<i32>,
    },
    Unregister {
        folder: usize,
        free_id: bool,
    },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..FOLDERS.len(), 0u8..8, prop::option::of(-2i32..8)).prop_map(
            |(folder, uuid, dimension)| Op::Register {
                folder,
                uuid,
                dimension
            }
        ),
        (0..FOLDERS.len(), any::<bool>()).prop_map(|(folder, free_id)| Op::Unregister {
            folder,
            free_id
        }),
    ]
}

fn uuid_from_slot(slot: u8) -> Uuid {
    Uuid::from_u64_pair(0xC0FFEE, u64::from(slot) + 1)
}

proptest! {
    /// Property: every registered record is reachable from every direction.
    #[test]
    fn index_stays_symmetric(ops in prop::collection::vec(op(), 0..64)) {
        let mut index = WorldPropertiesIndex::new();
        let mut dimensions = DimensionRegistry::new();
        dimensions.types_mut().register(DimensionType::overworld()).unwrap();

        for op in ops {
            match op {
                Op::Register { folder, uuid, dimension } => {
                    let mut props = WorldArchetype::default().build(FOLDERS[folder]);
                    props.uuid = uuid_from_slot(uuid);
                    props.dimension_id = dimension.map(DimensionId);
                    if let Some(id) = props.dimension_id {
                        let _ = dimensions.register_dimension(id, DimensionType::overworld());
                    }
                    let _ = index.register(props);
                }
                Op::Unregister { folder, free_id } => {
                    let Some(props) = index.by_folder(FOLDERS[folder]).cloned() else {
                        continue;
                    };
                    index.unregister(&props, free_id, &mut dimensions);
                    prop_assert!(index.by_folder(&props.folder_name).is_none());
                    prop_assert!(index.by_uuid(props.uuid).is_none());
                    if let Some(id) = props.dimension_id {
                        prop_assert!(index.folder_for_dimension(id).is_none());
                        if free_id && !id.is_primordial() {
                            prop_assert!(!dimensions.is_registered(id));
                        }
                    }
                }
            }

            prop_assert!(index.is_consistent());
            for props in index.all_known() {
                prop_assert_eq!(index.by_folder(&props.folder_name), Some(props));
                prop_assert_eq!(index.by_uuid(props.uuid), Some(props));
                if let Some(id) = props.dimension_id {
                    prop_assert_eq!(
                        index.folder_for_dimension(id),
                        Some(props.folder_name.as_str())
                    );
                }
            }
        }
    }
}
