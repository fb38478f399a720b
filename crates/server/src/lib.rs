#![warn(missing_docs)]
//! World lifecycle host: creates, loads, unloads, renames, copies and deletes
//! worlds while keeping the dimension registry and properties index in step.

mod error;
pub mod manager;
mod scheduler;
mod settings;

pub use error::{FailureKind, LifecycleError, Precondition};
pub use manager::{DeleteOutcome, StartupReport, WorldManager, WorldRef};
pub use scheduler::{PendingOperation, TaskScheduler};
pub use settings::{ManagerSettings, WorldOverrides};
