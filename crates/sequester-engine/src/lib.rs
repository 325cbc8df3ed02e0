//! Old-big-blob classification and the sequestration run.
//!
//! A blob is sequestered when it is larger than the size cutoff, not used by
//! the current snapshot of any kept reference (unless replacement mode is
//! on), and not touched by any commit inside the recency window. Such blobs
//! are moved into a protected archival pack, optionally behind placeholder
//! redirects, before the repository is compacted.
//!
//! # Modules
//!
//! - [`scanner`] -- catalog scan producing the initial [`CandidateSet`]
//! - [`usage`] -- full-history and recent-history usage streams
//! - [`reconcile`] -- streaming set difference over the usage streams
//! - [`prune`] -- stray reference removal
//! - [`compact`] -- final host compaction
//! - [`pipeline`] -- [`Sequester`], the ordered run, and its [`RunReport`]
//! - [`config`] -- [`SequesterConfig`] loaded from TOML
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use sequester_engine::{RunOptions, Sequester};
//! use sequester_odb::GitCli;
//!
//! let git = GitCli::open(Path::new("."))?;
//! let options = RunOptions::new("6 months ago").with_dry_run(true);
//! let report = Sequester::new(&git, options)?.run()?;
//! println!("{} old big blobs", report.sequestered.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compact;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prune;
pub mod reconcile;
pub mod scanner;
pub mod usage;

pub use config::{SequesterConfig, CONFIG_FILE};
pub use error::{EngineError, EngineResult, InStage, Stage};
pub use pipeline::{RunOptions, RunReport, Sequester, ALL_REFS};
pub use reconcile::{reconcile, CandidateSet, Subtraction};
pub use scanner::{scan_catalog, CatalogScan};
pub use usage::{full_history_usage, recent_history_usage, FullHistoryUsage};
