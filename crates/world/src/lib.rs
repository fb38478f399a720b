#![warn(missing_docs)]
//! World bookkeeping: dimension registries, world properties and their index,
//! on-disk storage, live world instances, lifecycle events and the legacy
//! folder migration.

mod error;
mod events;
mod index;
mod instance;
mod migration;
mod properties;
mod record;
mod registry;
mod storage;

pub use error::*;
pub use events::*;
pub use index::*;
pub use instance::*;
pub use migration::*;
pub use properties::*;
pub use record::{decode_record, encode_record, RECORD_FILE_NAME};
pub use registry::*;
pub use storage::*;
