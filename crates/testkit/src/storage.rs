use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use worldhost_world::{FsWorldStorage, StorageError, WorldProperties, WorldStorage};

/// Filesystem backend whose writes, copies and deletes can be made to fail.
#[derive(Debug)]
pub struct FailingStorage {
    inner: FsWorldStorage,
    fail_writes: AtomicBool,
    fail_copies: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FailingStorage {
    /// Wrap a filesystem backend rooted at `root`. Nothing fails until asked.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        Ok(Self {
            inner: FsWorldStorage::new(root)?,
            fail_writes: AtomicBool::new(false),
            fail_copies: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        })
    }

    /// Make record and file writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make tree copies fail.
    pub fn fail_copies(&self, fail: bool) {
        self.fail_copies.store(fail, Ordering::SeqCst);
    }

    /// Make tree deletes fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), StorageError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("injected {what} failure")));
        }
        Ok(())
    }
}

impl WorldStorage for FailingStorage {
    fn read_properties(&self, folder: &str) -> Result<Option<WorldProperties>, StorageError> {
        self.inner.read_properties(folder)
    }

    fn write_properties(&self, properties: &WorldProperties) -> Result<(), StorageError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.write_properties(properties)
    }

    fn folder_exists(&self, folder: &str) -> bool {
        self.inner.folder_exists(folder)
    }

    fn create_folder(&self, folder: &str) -> Result<(), StorageError> {
        self.inner.create_folder(folder)
    }

    fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        self.inner.list_folders()
    }

    fn move_tree(&self, src: &str, dst: &str) -> Result<(), StorageError> {
        self.inner.move_tree(src, dst)
    }

    fn copy_tree(&self, src: &str, dst: &str) -> Result<(), StorageError> {
        Self::check(&self.fail_copies, "copy")?;
        self.inner.copy_tree(src, dst)
    }

    fn delete_tree(&self, folder: &str) -> Result<(), StorageError> {
        Self::check(&self.fail_deletes, "delete")?;
        self.inner.delete_tree(folder)
    }

    fn write_file(&self, folder: &str, name: &str, contents: &[u8]) -> Result<(), StorageError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.write_file(folder, name, contents)
    }

    fn read_file(&self, folder: &str, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.read_file(folder, name)
    }

    fn remove_file(&self, folder: &str, name: &str) -> Result<(), StorageError> {
        self.inner.remove_file(folder, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use worldhost_world::WorldArchetype;

    #[test]
    fn failures_toggle() {
        let dir = tempdir().unwrap();
        let storage = FailingStorage::new(dir.path()).unwrap();
        let props = WorldArchetype::default().build("world");
        storage.fail_writes(true);
        assert!(matches!(
            storage.write_properties(&props),
            Err(StorageError::Backend(_))
        ));
        storage.fail_writes(false);
        storage.write_properties(&props).unwrap();
        assert!(storage.folder_exists("world"));
    }
}
