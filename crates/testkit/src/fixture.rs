use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tempfile::TempDir;
use uuid::Uuid;
use worldhost_core::DimensionId;
use worldhost_world::{
    FsWorldStorage, WorldArchetype, WorldProperties, WorldStorage, FOREIGN_MARKER_FILE,
    LEGACY_UUID_FILE,
};

/// Temporary directory laid out as a save root plus a foreign save root.
pub struct SaveFixture {
    dir: TempDir,
}

impl SaveFixture {
    /// Create an empty fixture with both roots present.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("Failed to create fixture directory")?;
        fs::create_dir_all(dir.path().join("saves"))?;
        fs::create_dir_all(dir.path().join("foreign"))?;
        Ok(Self { dir })
    }

    /// Canonical save root.
    pub fn saves(&self) -> PathBuf {
        self.dir.path().join("saves")
    }

    /// Foreign-layout save root scanned by the migration sweep.
    pub fn foreign(&self) -> PathBuf {
        self.dir.path().join("foreign")
    }

    /// Path of `folder` under the save root.
    pub fn world_path(&self, folder: &str) -> PathBuf {
        self.saves().join(folder)
    }

    /// Filesystem backend over the save root.
    pub fn storage(&self) -> Result<Arc<FsWorldStorage>> {
        Ok(Arc::new(FsWorldStorage::new(self.saves())?))
    }

    /// Write a record for `folder` with a fixed seed, the given id and a fresh UUID.
    pub fn write_world(&self, folder: &str, id: Option<DimensionId>) -> Result<WorldProperties> {
        let mut properties = WorldArchetype {
            random_seed: false,
            seed: 42,
            ..WorldArchetype::default()
        }
        .build(folder);
        properties.uuid = Uuid::new_v4();
        properties.dimension_id = id;
        self.write_record(&properties)?;
        Ok(properties)
    }

    /// Write `properties` as its folder's record.
    pub fn write_record(&self, properties: &WorldProperties) -> Result<()> {
        self.storage()?
            .write_properties(properties)
            .with_context(|| format!("Failed to write record for {}", properties.folder_name))
    }

    /// Write a legacy UUID file into `folder`.
    pub fn write_legacy_uuid(&self, folder: &str, uuid: Uuid) -> Result<()> {
        let (high, low) = uuid.as_u64_pair();
        let mut bytes = high.to_be_bytes().to_vec();
        bytes.extend_from_slice(&low.to_be_bytes());
        self.storage()?.write_file(folder, LEGACY_UUID_FILE, &bytes)?;
        Ok(())
    }

    /// Create a foreign world folder holding its marker file.
    pub fn foreign_world(&self, name: &str) -> Result<PathBuf> {
        let dir = self.foreign().join(name);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(FOREIGN_MARKER_FILE), b"foreign")?;
        Ok(dir)
    }

    /// Root of the whole fixture.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_worlds_read_back() {
        let fixture = SaveFixture::new().unwrap();
        let written = fixture.write_world("arena", Some(DimensionId(4))).unwrap();
        let storage = fixture.storage().unwrap();
        assert_eq!(storage.read_properties("arena").unwrap(), Some(written.clone()));

        fixture.write_legacy_uuid("arena", written.uuid).unwrap();
        assert_eq!(storage.read_legacy_uuid("arena"), Some(written.uuid));
        assert!(fixture.foreign_world("old").unwrap().join(FOREIGN_MARKER_FILE).is_file());
    }
}
