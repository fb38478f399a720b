use std::fs;
use std::sync::Arc;

use worldhost_core::DimensionId;
use worldhost_server::{DeleteOutcome, FailureKind, ManagerSettings, WorldManager};
use worldhost_testkit::{FailingStorage, SaveFixture};
use worldhost_world::{BasicWorldFactory, WorldArchetype, WorldStorage};

fn manager_over(storage: Arc<dyn WorldStorage>) -> WorldManager {
    let factory = Box::new(BasicWorldFactory::new(Arc::clone(&storage)));
    WorldManager::new(ManagerSettings::default(), storage, factory).expect("manager")
}

fn manager(fixture: &SaveFixture) -> WorldManager {
    manager_over(fixture.storage().unwrap())
}

#[tokio::test]
async fn copying_a_loaded_world_suspends_autosave_until_applied() {
    let fixture = SaveFixture::new().unwrap();
    let mut manager = manager(&fixture);
    manager.load_all();
    let source = manager
        .world(DimensionId::PRIMARY)
        .unwrap()
        .properties()
        .clone();

    let order_before = manager.world_order().to_vec();
    let pending = manager.copy_world(&source, "world_copy").unwrap();
    assert!(!manager.autosave_enabled());
    manager.reorder_live_worlds();
    assert_eq!(manager.world_order(), order_before.as_slice());

    let copy = pending.await.unwrap();
    assert_eq!(copy.folder_name, "world_copy");
    assert!(!copy.has_uuid());
    assert_eq!(copy.dimension_id, None);
    assert_eq!(manager.world_order(), order_before.as_slice());
    assert!(manager.index().by_folder("world_copy").is_none());
    assert!(fixture.world_path("world_copy").is_dir());

    manager.tick();
    assert!(manager.autosave_enabled());

    let id = manager.load_world("world_copy").unwrap();
    assert_eq!(id, DimensionId(2));
    let loaded = manager.world(id).unwrap().properties();
    assert!(loaded.has_uuid());
    assert_ne!(loaded.uuid, source.uuid);
}

#[tokio::test]
async fn copy_preconditions() {
    let fixture = SaveFixture::new().unwrap();
    let mut manager = manager(&fixture);
    let alpha = manager
        .create_properties("alpha", &WorldArchetype::default(), None)
        .unwrap();
    manager
        .create_properties("beta", &WorldArchetype::default(), None)
        .unwrap();

    let err = manager.copy_world(&alpha, "beta").unwrap_err();
    assert_eq!(err.kind(), FailureKind::AlreadyExists);

    let stranger = WorldArchetype::default().build("stranger");
    let err = manager.copy_world(&stranger, "gamma").unwrap_err();
    assert_eq!(err.kind(), FailureKind::PreconditionFailed);

    let copy = manager.copy_world(&alpha, "gamma").unwrap().await.unwrap();
    assert_eq!(copy.seed, alpha.seed);
    assert!(manager.autosave_enabled(), "unloaded sources leave autosave alone");
}

#[tokio::test]
async fn failed_copy_still_resumes_autosave() {
    let fixture = SaveFixture::new().unwrap();
    let storage = Arc::new(FailingStorage::new(fixture.saves()).unwrap());
    let mut manager = manager_over(storage.clone());
    manager.load_all();
    let source = manager
        .world(DimensionId::NETHER)
        .unwrap()
        .properties()
        .clone();

    storage.fail_copies(true);
    let err = manager
        .copy_world(&source, "nether_copy")
        .unwrap()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::CopyFailed);

    manager.apply_completions();
    assert!(manager.autosave_enabled());
}

#[tokio::test]
async fn delete_releases_index_and_id_on_next_tick() {
    let fixture = SaveFixture::new().unwrap();
    let mut manager = manager(&fixture);
    let doomed = manager
        .create_properties("doomed", &WorldArchetype::default(), None)
        .unwrap();
    let id = doomed.dimension_id.unwrap();

    let outcome = manager.delete_world(&doomed).unwrap().await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(!fixture.world_path("doomed").exists());
    assert!(manager.index().by_folder("doomed").is_some());
    assert!(manager.dimensions().is_registered(id));

    manager.tick();
    assert!(manager.index().by_folder("doomed").is_none());
    assert!(manager.index().by_uuid(doomed.uuid).is_none());
    assert!(!manager.dimensions().is_registered(id));

    let err = manager.delete_world(&doomed).unwrap_err();
    assert_eq!(err.kind(), FailureKind::PreconditionFailed);
}

#[tokio::test]
async fn deleting_a_vanished_folder_counts_as_deleted() {
    let fixture = SaveFixture::new().unwrap();
    let mut manager = manager(&fixture);
    let ghost = manager
        .create_properties("ghost", &WorldArchetype::default(), None)
        .unwrap();
    fs::remove_dir_all(fixture.world_path("ghost")).unwrap();

    let outcome = manager.delete_world(&ghost).unwrap().await.unwrap();
    assert_eq!(outcome, DeleteOutcome::AlreadyAbsent);
    manager.apply_completions();
    assert_eq!(manager.known_properties().count(), 0);
}

#[tokio::test]
async fn delete_refuses_loaded_worlds_and_reports_backend_failures() {
    let fixture = SaveFixture::new().unwrap();
    let storage = Arc::new(FailingStorage::new(fixture.saves()).unwrap());
    let mut manager = manager_over(storage.clone());
    manager.load_all();
    let nether = manager
        .world(DimensionId::NETHER)
        .unwrap()
        .properties()
        .clone();

    let err = manager.delete_world(&nether).unwrap_err();
    assert_eq!(err.kind(), FailureKind::PreconditionFailed);

    assert!(manager.unload_now(DimensionId::NETHER, true, false));
    storage.fail_deletes(true);
    let err = manager.delete_world(&nether).unwrap().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::DeleteFailed);
    manager.tick();
    assert!(manager.index().by_folder("DIM-1").is_some());
    assert!(fixture.world_path("DIM-1").is_dir());
}

#[test]
fn background_work_needs_a_runtime() {
    let fixture = SaveFixture::new().unwrap();
    let mut manager = manager(&fixture);
    let alpha = manager
        .create_properties("alpha", &WorldArchetype::default(), None)
        .unwrap();
    let err = manager.copy_world(&alpha, "beta").unwrap_err();
    assert_eq!(err.kind(), FailureKind::Internal);
}
