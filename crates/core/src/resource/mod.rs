//! Upstream change detection, raw downloads and local loading.

/// Loading of downloaded tables and text maps.
pub mod loader;
/// Change detection and raw file downloads.
pub mod sync;

pub use loader::{load_languages, load_tables, Languages, RawTables, TextMap};
pub use sync::{Decision, ResourceSync, UpstreamCommit};
