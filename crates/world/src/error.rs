use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;
use worldhost_core::{DimensionId, DimensionTypeId, DimensionTypeKey};

/// Failures from the dimension type and dimension registries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Every dimension type id is taken.
    #[error("dimension type id space exhausted (capacity {capacity})")]
    CapacityExceeded {
        /// Size of the id space.
        capacity: usize,
    },
    /// The explicit type id already maps to a type; the existing mapping is kept.
    #[error("dimension type id {0} is already registered")]
    TypeAlreadyRegistered(DimensionTypeId),
    /// A dimension referenced a type that was never registered.
    #[error("dimension type {0} is not registered")]
    TypeNotRegistered(DimensionTypeKey),
    /// The dimension id already has a registration.
    #[error("dimension {0} is already registered")]
    DimensionAlreadyRegistered(DimensionId),
}

/// Conflicts detected while registering properties in the index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Another folder already owns this UUID.
    #[error("world uuid {uuid} already belongs to folder {owner}")]
    UuidClaimed {
        /// The contested UUID.
        uuid: Uuid,
        /// Folder currently holding it.
        owner: String,
    },
    /// Another folder already owns this dimension id.
    #[error("dimension {id} already belongs to folder {owner}")]
    DimensionClaimed {
        /// The contested dimension id.
        id: DimensionId,
        /// Folder currently holding it.
        owner: String,
    },
}

/// Failures from the persistence backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure at a specific path.
    #[error("i/o error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The properties record could not be decoded.
    #[error("corrupt world record at {path}: {reason}")]
    CorruptRecord {
        /// Path of the record.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
    /// The properties record could not be encoded.
    #[error("failed to encode world record: {0}")]
    Encode(String),
    /// A tree operation found its destination already present.
    #[error("destination {0} already exists")]
    DestinationExists(String),
    /// A tree operation found its source missing.
    #[error("source {0} does not exist")]
    SourceMissing(String),
    /// Folder names must be a single, plain path component.
    #[error("invalid world folder name {0:?}")]
    InvalidFolderName(String),
    /// Injected or backend-specific failure.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
