pub mod registry;
pub mod sync;

pub use registry::{CachedModel, ModelRegistry};
pub use sync::{CycleReport, EntryStatus, ResolvedEntry, Synchronizer};
