use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Subcommand;
use tracing::info;
use worldhost_core::{DimensionId, DimensionTypeKey};
use worldhost_server::{LifecycleError, WorldManager};
use worldhost_testkit::JsonlEventSink;
use worldhost_world::{
    BasicWorldFactory, FsWorldStorage, LegacyMigration, WorldArchetype, WorldProperties,
    WorldStorage,
};

use crate::config::HostConfig;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Migrate and discover every world, then run the tick loop until interrupted
    Run {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// List every world folder with a properties record
    List,
    /// Create properties for a new world without loading it
    Create {
        /// Folder name of the new world
        name: String,
        /// Fixed seed; random when omitted
        #[arg(long)]
        seed: Option<i64>,
        /// Dimension type key
        #[arg(long, default_value = "minecraft:overworld")]
        dimension_type: String,
        /// Explicit dimension id; allocated when omitted
        #[arg(long, allow_negative_numbers = true)]
        id: Option<i32>,
    },
    /// Rename an unloaded world, keeping its identity
    Rename { from: String, to: String },
    /// Copy a world under a new name with a fresh identity
    Copy { from: String, to: String },
    /// Delete an unloaded world and release its dimension id
    Delete { name: String },
    /// Sweep foreign-layout worlds into the save root
    Migrate,
}

pub async fn execute(command: Command, config: &HostConfig) -> Result<()> {
    match command {
        Command::Run { ticks } => run(config, ticks).await,
        Command::List => list(config),
        Command::Create {
            name,
            seed,
            dimension_type,
            id,
        } => {
            let mut manager = admin_manager(config)?;
            let mut archetype = config.manager.startup_defaults.clone();
            archetype.dimension_type = DimensionTypeKey::parse(&dimension_type)?;
            if let Some(seed) = seed {
                archetype = WorldArchetype {
                    seed,
                    random_seed: false,
                    ..archetype
                };
            }
            let created =
                report(manager.create_properties(&name, &archetype, id.map(DimensionId)))?;
            println!(
                "created {} (dimension {}, uuid {})",
                created.folder_name,
                display_id(&created),
                created.uuid
            );
            Ok(())
        }
        Command::Rename { from, to } => {
            let mut manager = admin_manager(config)?;
            let known = known_world(&mut manager, &from)?;
            let renamed = report(manager.rename_world(&known, &to))?;
            println!("renamed {from} to {}", renamed.folder_name);
            Ok(())
        }
        Command::Copy { from, to } => {
            let mut manager = admin_manager(config)?;
            let known = known_world(&mut manager, &from)?;
            let copied = report(report(manager.copy_world(&known, &to))?.await)?;
            println!("copied {from} to {}", copied.folder_name);
            Ok(())
        }
        Command::Delete { name } => {
            let mut manager = admin_manager(config)?;
            let known = known_world(&mut manager, &name)?;
            let outcome = report(report(manager.delete_world(&known))?.await)?;
            manager.apply_completions();
            println!("deleted {name} ({outcome:?})");
            Ok(())
        }
        Command::Migrate => {
            let Some(foreign_root) = &config.foreign_root else {
                bail!("foreign_root is not configured");
            };
            let swept = LegacyMigration::new(
                foreign_root,
                &config.saves_root,
                &config.manager.level_name,
            )
            .run();
            println!(
                "migrated {} skipped {} failed {}",
                swept.migrated.len(),
                swept.skipped.len(),
                swept.failed.len()
            );
            for folder in &swept.migrated {
                println!("  {folder}");
            }
            Ok(())
        }
    }
}

fn build_manager(config: &HostConfig) -> Result<WorldManager> {
    let storage: Arc<dyn WorldStorage> = Arc::new(
        FsWorldStorage::new(&config.saves_root)
            .with_context(|| format!("Failed to open save root {}", config.saves_root.display()))?,
    );
    let factory = Box::new(BasicWorldFactory::new(Arc::clone(&storage)));
    let mut manager = WorldManager::new(config.manager.clone(), storage, factory)?;
    if let Some(foreign_root) = &config.foreign_root {
        manager = manager.with_migration(LegacyMigration::new(
            foreign_root,
            &config.saves_root,
            &config.manager.level_name,
        ));
    }
    Ok(manager)
}

/// Manager that knows every on-disk dimension id but has nothing loaded.
fn admin_manager(config: &HostConfig) -> Result<WorldManager> {
    let mut manager = build_manager(config)?;
    manager.scan_save_root();
    Ok(manager)
}

fn known_world(manager: &mut WorldManager, folder: &str) -> Result<WorldProperties> {
    let stored = manager
        .storage()
        .read_properties(folder)?
        .ok_or_else(|| anyhow!("no world record in {folder} (properties_not_found)"))?;
    report(manager.register_properties(stored))
}

async fn run(config: &HostConfig, ticks: Option<u64>) -> Result<()> {
    let mut manager = build_manager(config)?;
    if let Some(path) = &config.event_log {
        let sink = JsonlEventSink::create(path)
            .with_context(|| format!("Failed to open event log {}", path.display()))?;
        manager.subscribe(Box::new(sink));
        info!(path = %path.display(), "Recording lifecycle events");
    }
    let startup = manager.load_all();
    if let Some(swept) = &startup.migration {
        info!(
            migrated = swept.migrated.len(),
            failed = swept.failed.len(),
            "Legacy migration finished"
        );
    }
    for (id, err) in &startup.failed {
        println!("dimension {id}: {} ({})", err, err.kind());
    }

    let mut interval = tokio::time::interval(config.tick_interval());
    let mut ran = 0u64;
    loop {
        if ticks.is_some_and(|limit| ran >= limit) {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
        manager.tick();
        ran += 1;
    }
    manager.shutdown();
    info!(ticks = ran, "Stopped");
    Ok(())
}

fn list(config: &HostConfig) -> Result<()> {
    let storage = FsWorldStorage::new(&config.saves_root)?;
    for folder in storage.list_folders()? {
        match storage.read_properties(&folder) {
            Ok(Some(properties)) => println!(
                "{folder}\tdimension {}\t{}\t{}",
                display_id(&properties),
                properties.dimension_type,
                if properties.enabled { "enabled" } else { "disabled" }
            ),
            Ok(None) => {}
            Err(err) => println!("{folder}\tunreadable: {err}"),
        }
    }
    Ok(())
}

fn display_id(properties: &WorldProperties) -> String {
    properties
        .dimension_id
        .map_or_else(|| "-".to_string(), |id| id.to_string())
}

/// Attach the machine-readable failure kind to a lifecycle error.
fn report<T>(result: Result<T, LifecycleError>) -> Result<T> {
    result.map_err(|err| anyhow!("{err} ({})", err.kind()))
}
