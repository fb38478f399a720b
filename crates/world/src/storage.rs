//! Persistence backend for world folders.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::record::{decode_record, encode_record, RECORD_FILE_NAME};
use crate::{StorageError, WorldProperties};

/// Legacy side-channel file holding a world UUID as two big-endian `u64`s.
pub const LEGACY_UUID_FILE: &str = "uid.dat";

/// Storage of world folders and their properties records.
///
/// Implementations are shared with background copy/delete work, hence
/// `Send + Sync`.
pub trait WorldStorage: Send + Sync {
    /// Read the properties record of `folder`, `None` if it has none.
    fn read_properties(&self, folder: &str) -> Result<Option<WorldProperties>, StorageError>;

    /// Write the properties record into `properties.folder_name`, creating the folder.
    fn write_properties(&self, properties: &WorldProperties) -> Result<(), StorageError>;

    /// Whether a folder exists.
    fn folder_exists(&self, folder: &str) -> bool;

    /// Create a folder (and parents).
    fn create_folder(&self, folder: &str) -> Result<(), StorageError>;

    /// Names of every folder directly under the save root, sorted.
    fn list_folders(&self) -> Result<Vec<String>, StorageError>;

    /// Move a folder tree. Fails if `dst` exists.
    fn move_tree(&self, src: &str, dst: &str) -> Result<(), StorageError>;

    /// Copy a folder tree. Fails if `dst` exists.
    fn copy_tree(&self, src: &str, dst: &str) -> Result<(), StorageError>;

    /// Recursively delete a folder tree.
    fn delete_tree(&self, folder: &str) -> Result<(), StorageError>;

    /// Write an auxiliary file inside a world folder.
    fn write_file(&self, folder: &str, name: &str, contents: &[u8]) -> Result<(), StorageError>;

    /// Read an auxiliary file inside a world folder, `None` if absent.
    fn read_file(&self, folder: &str, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove an auxiliary file. Removing an absent file succeeds.
    fn remove_file(&self, folder: &str, name: &str) -> Result<(), StorageError>;

    /// UUID recovered from the legacy side-channel file, if present and readable.
    fn read_legacy_uuid(&self, folder: &str) -> Option<Uuid> {
        let bytes = self.read_file(folder, LEGACY_UUID_FILE).ok()??;
        parse_legacy_uuid(&bytes)
    }
}

/// Parse the legacy 16-byte UUID file (most significant half first).
pub fn parse_legacy_uuid(bytes: &[u8]) -> Option<Uuid> {
    let bytes: [u8; 16] = bytes.try_into().ok()?;
    let (high, low) = bytes.split_at(8);
    let high = u64::from_be_bytes(high.try_into().ok()?);
    let low = u64::from_be_bytes(low.try_into().ok()?);
    let uuid = Uuid::from_u64_pair(high, low);
    (!uuid.is_nil()).then_some(uuid)
}

/// Filesystem backend keeping every world at `<root>/<folder>`.
#[derive(Debug, Clone)]
pub struct FsWorldStorage {
    root: PathBuf,
}

impl FsWorldStorage {
    /// Create a backend rooted at `root`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|err| StorageError::io(&root, err))?;
        Ok(Self { root })
    }

    /// Save root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a world folder.
    pub fn folder_path(&self, folder: &str) -> Result<PathBuf, StorageError> {
        validate_folder_name(folder)?;
        Ok(self.root.join(folder))
    }
}

fn validate_folder_name(folder: &str) -> Result<(), StorageError> {
    let mut components = Path::new(folder).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StorageError::InvalidFolderName(folder.to_string())),
    }
}

impl WorldStorage for FsWorldStorage {
    fn read_properties(&self, folder: &str) -> Result<Option<WorldProperties>, StorageError> {
        let path = self.folder_path(folder)?.join(RECORD_FILE_NAME);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::io(path, err)),
        };
        decode_record(&bytes)
            .map(Some)
            .map_err(|reason| StorageError::CorruptRecord { path, reason })
    }

    fn write_properties(&self, properties: &WorldProperties) -> Result<(), StorageError> {
        let bytes = encode_record(properties).map_err(StorageError::Encode)?;
        self.write_file(&properties.folder_name, RECORD_FILE_NAME, &bytes)
    }

    fn folder_exists(&self, folder: &str) -> bool {
        self.folder_path(folder).map(|path| path.is_dir()).unwrap_or(false)
    }

    fn create_folder(&self, folder: &str) -> Result<(), StorageError> {
        let path = self.folder_path(folder)?;
        fs::create_dir_all(&path).map_err(|err| StorageError::io(path, err))
    }

    fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        let entries = fs::read_dir(&self.root).map_err(|err| StorageError::io(&self.root, err))?;
        let mut folders = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StorageError::io(&self.root, err))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    folders.push(name.to_string());
                }
            }
        }
        folders.sort();
        Ok(folders)
    }

    fn move_tree(&self, src: &str, dst: &str) -> Result<(), StorageError> {
        let from = self.folder_path(src)?;
        let to = self.folder_path(dst)?;
        if !from.is_dir() {
            return Err(StorageError::SourceMissing(src.to_string()));
        }
        if to.exists() {
            return Err(StorageError::DestinationExists(dst.to_string()));
        }
        move_dir(&from, &to)
    }

    fn copy_tree(&self, src: &str, dst: &str) -> Result<(), StorageError> {
        let from = self.folder_path(src)?;
        let to = self.folder_path(dst)?;
        if !from.is_dir() {
            return Err(StorageError::SourceMissing(src.to_string()));
        }
        if to.exists() {
            return Err(StorageError::DestinationExists(dst.to_string()));
        }
        copy_dir(&from, &to)
    }

    fn delete_tree(&self, folder: &str) -> Result<(), StorageError> {
        let path = self.folder_path(folder)?;
        fs::remove_dir_all(&path).map_err(|err| StorageError::io(path, err))
    }

    fn write_file(&self, folder: &str, name: &str, contents: &[u8]) -> Result<(), StorageError> {
        let dir = self.folder_path(folder)?;
        fs::create_dir_all(&dir).map_err(|err| StorageError::io(&dir, err))?;
        let target = dir.join(name);
        let staging = dir.join(format!("{name}.tmp"));
        fs::write(&staging, contents).map_err(|err| StorageError::io(&staging, err))?;
        fs::rename(&staging, &target).map_err(|err| StorageError::io(&target, err))
    }

    fn read_file(&self, folder: &str, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.folder_path(folder)?.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::io(path, err)),
        }
    }

    fn remove_file(&self, folder: &str, name: &str) -> Result<(), StorageError> {
        let path = self.folder_path(folder)?.join(name);
        match fs::remove_file(&path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(StorageError::io(path, err)),
            _ => Ok(()),
        }
    }
}

/// Recursively copy `from` into a new directory `to`.
pub fn copy_dir(from: &Path, to: &Path) -> Result<(), StorageError> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(from).to_path_buf();
            StorageError::io(path, io::Error::from(err))
        })?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|err| StorageError::Backend(err.to_string()))?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|err| StorageError::io(&target, err))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| StorageError::io(&target, err))?;
        }
    }
    Ok(())
}

/// Move a directory, falling back to copy + delete across filesystems.
pub fn move_dir(from: &Path, to: &Path) -> Result<(), StorageError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|err| StorageError::io(parent, err))?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) => {
            debug!(
                from = %from.display(),
                to = %to.display(),
                %err,
                "Rename failed, copying instead"
            );
            copy_dir(from, to)?;
            fs::remove_dir_all(from).map_err(|err| StorageError::io(from, err))
        }
    }
}
