pub mod cli;
pub mod config;
pub mod daemon;
pub mod download;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod model;
pub mod server;

pub use config::Config;
pub use daemon::{Daemon, SharedStatus, SyncStatus};
pub use download::{Downloader, FetchOutcome};
pub use error::{Error, Result};
pub use layout::ComfyLayout;
pub use manifest::{Manifest, ModelEntry};
pub use model::{CycleReport, EntryStatus, ModelRegistry, Synchronizer};
