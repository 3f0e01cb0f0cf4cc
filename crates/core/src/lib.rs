#![warn(clippy::all, missing_docs)]

//! Core pipeline for the game-data text-map exporter.
//!
//! This crate watches an upstream data repository for new commits,
//! downloads the raw excel tables and text maps, projects them into
//! per-entity records, links characters to their skill depots and
//! writes data and localization exports to disk.

pub mod config;
pub mod export;
pub mod fetch;
pub mod lang;
pub mod link;
pub mod manifest;
pub mod models;
pub mod pipeline;
pub mod projector;
pub mod publish;
pub mod resource;

pub use config::{AppConfig, TableSource};
pub use fetch::{AttemptFailure, FetchError, Fetcher, RetryPolicy};
pub use lang::{join_languages, LangKey, LanguageExport};
pub use manifest::CommitMarker;
pub use models::{EntityId, Projection, Record, RecordExt};
pub use pipeline::{Pipeline, Projections, RunOptions, RunOutcome};
pub use resource::{Decision, Languages, RawTables, ResourceSync, UpstreamCommit};
