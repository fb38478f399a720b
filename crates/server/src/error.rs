use std::fmt;

use thiserror::Error;
use uuid::Uuid;
use worldhost_world::{IndexError, RegistryError, StorageError};

/// Caller-side condition that blocked an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The world must be unloaded first.
    WorldLoaded,
    /// The world must be loaded first.
    WorldNotLoaded,
    /// Occupants are still inside.
    HasOccupants,
    /// The world is configured to keep its spawn loaded.
    KeepSpawnLoaded,
    /// The world is not known to the index.
    UnknownWorld,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::WorldLoaded => "world is loaded",
            Self::WorldNotLoaded => "world is not loaded",
            Self::HasOccupants => "world has occupants",
            Self::KeepSpawnLoaded => "world keeps its spawn loaded",
            Self::UnknownWorld => "world is not known",
        };
        f.write_str(text)
    }
}

/// Failure of a lifecycle operation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No directory exists for the folder.
    #[error("world folder {0} not found")]
    FolderNotFound(String),
    /// No metadata could be resolved.
    #[error("no properties found for world {0}")]
    PropertiesNotFound(String),
    /// The world is marked disabled.
    #[error("world {0} is disabled")]
    WorldDisabled(String),
    /// A recoverable caller-side condition.
    #[error("cannot act on world {folder}: {precondition}")]
    PreconditionFailed {
        /// World concerned.
        folder: String,
        /// What blocked the operation.
        precondition: Precondition,
    },
    /// Two folders claim the same UUID.
    #[error("world {folder} claims uuid {uuid} already owned by {owner}")]
    UuidCollision {
        /// Folder being processed.
        folder: String,
        /// Contested UUID.
        uuid: Uuid,
        /// Folder that already owns it.
        owner: String,
    },
    /// The destination folder is already taken.
    #[error("world folder {0} already exists")]
    AlreadyExists(String),
    /// Moving a world tree failed.
    #[error("failed to move world {from} to {to}: {source}")]
    MoveFailed {
        /// Source folder.
        from: String,
        /// Destination folder.
        to: String,
        /// Backend failure.
        #[source]
        source: StorageError,
    },
    /// Copying a world tree failed.
    #[error("failed to copy world {from} to {to}: {source}")]
    CopyFailed {
        /// Source folder.
        from: String,
        /// Destination folder.
        to: String,
        /// Backend failure.
        #[source]
        source: StorageError,
    },
    /// Deleting a world tree failed.
    #[error("failed to delete world {folder}: {source}")]
    DeleteFailed {
        /// Folder being deleted.
        folder: String,
        /// Backend failure.
        #[source]
        source: StorageError,
    },
    /// Saving a world failed.
    #[error("failed to save world {folder}: {reason}")]
    SaveFailed {
        /// World concerned.
        folder: String,
        /// Rendered failure chain.
        reason: String,
    },
    /// The world factory failed to build the instance.
    #[error("failed to construct world {folder}: {reason}")]
    ConstructionFailed {
        /// World concerned.
        folder: String,
        /// Rendered failure chain.
        reason: String,
    },
    /// A listener canceled a cancelable lifecycle event.
    #[error("{event} of world {folder} was canceled by a listener")]
    Canceled {
        /// World concerned.
        folder: String,
        /// Event kind that was canceled.
        event: &'static str,
    },
    /// Registry rejected the operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Properties index rejected the operation.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Backend failure outside the tree operations.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Background work needs a tokio runtime and none is available.
    #[error("no task scheduler available for background work")]
    SchedulerUnavailable,
    /// Background work panicked or was aborted.
    #[error("background task aborted: {0}")]
    TaskAborted(String),
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    #[allow(missing_docs)]
    CapacityExceeded,
    #[allow(missing_docs)]
    AlreadyRegistered,
    #[allow(missing_docs)]
    TypeNotRegistered,
    #[allow(missing_docs)]
    FolderNotFound,
    #[allow(missing_docs)]
    PropertiesNotFound,
    #[allow(missing_docs)]
    WorldDisabled,
    #[allow(missing_docs)]
    PreconditionFailed,
    #[allow(missing_docs)]
    UuidCollision,
    #[allow(missing_docs)]
    AlreadyExists,
    #[allow(missing_docs)]
    MoveFailed,
    #[allow(missing_docs)]
    CopyFailed,
    #[allow(missing_docs)]
    DeleteFailed,
    #[allow(missing_docs)]
    SaveFailed,
    #[allow(missing_docs)]
    ConstructionFailed,
    #[allow(missing_docs)]
    Canceled,
    #[allow(missing_docs)]
    Storage,
    #[allow(missing_docs)]
    Internal,
}

impl FailureKind {
    /// Stable key for scripts and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CapacityExceeded => "capacity_exceeded",
            Self::AlreadyRegistered => "already_registered",
            Self::TypeNotRegistered => "type_not_registered",
            Self::FolderNotFound => "folder_not_found",
            Self::PropertiesNotFound => "properties_not_found",
            Self::WorldDisabled => "world_disabled",
            Self::PreconditionFailed => "precondition_failed",
            Self::UuidCollision => "uuid_collision",
            Self::AlreadyExists => "already_exists",
            Self::MoveFailed => "move_failed",
            Self::CopyFailed => "copy_failed",
            Self::DeleteFailed => "delete_failed",
            Self::SaveFailed => "save_failed",
            Self::ConstructionFailed => "construction_failed",
            Self::Canceled => "canceled",
            Self::Storage => "storage",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleError {
    /// Category of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::FolderNotFound(_) => FailureKind::FolderNotFound,
            Self::PropertiesNotFound(_) => FailureKind::PropertiesNotFound,
            Self::WorldDisabled(_) => FailureKind::WorldDisabled,
            Self::PreconditionFailed { .. } => FailureKind::PreconditionFailed,
            Self::UuidCollision { .. } => FailureKind::UuidCollision,
            Self::Index(IndexError::UuidClaimed { .. }) => FailureKind::UuidCollision,
            Self::Index(IndexError::DimensionClaimed { .. }) => FailureKind::AlreadyRegistered,
            Self::AlreadyExists(_) => FailureKind::AlreadyExists,
            Self::MoveFailed { .. } => FailureKind::MoveFailed,
            Self::CopyFailed { .. } => FailureKind::CopyFailed,
            Self::DeleteFailed { .. } => FailureKind::DeleteFailed,
            Self::SaveFailed { .. } => FailureKind::SaveFailed,
            Self::ConstructionFailed { .. } => FailureKind::ConstructionFailed,
            Self::Canceled { .. } => FailureKind::Canceled,
            Self::Registry(RegistryError::CapacityExceeded { .. }) => FailureKind::CapacityExceeded,
            Self::Registry(RegistryError::TypeNotRegistered(_)) => FailureKind::TypeNotRegistered,
            Self::Registry(_) => FailureKind::AlreadyRegistered,
            Self::Storage(_) => FailureKind::Storage,
            Self::SchedulerUnavailable | Self::TaskAborted(_) => FailureKind::Internal,
        }
    }

    pub(crate) fn precondition(folder: &str, precondition: Precondition) -> Self {
        Self::PreconditionFailed {
            folder: folder.to_string(),
            precondition,
        }
    }
}
