//! Reference handling for blob sequestration.
//!
//! References are the roots that keep history alive. Before the final
//! compaction every reference outside the kept list is deleted, and in
//! replacement mode redirect records are created under `refs/replace/`.
//! Both mutations go through a [`RefTransaction`] so the host tool applies
//! them atomically.
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`names`] -- [`RefName`] validation and classification
//! - [`transaction`] -- [`RefTransaction`] batches and script rendering
//! - [`prune`] -- [`stray_refs`] set difference

pub mod error;
pub mod names;
pub mod prune;
pub mod transaction;

pub use error::{RefError, Result};
pub use names::{validate_ref_name, RefName, REPLACE_PREFIX};
pub use prune::stray_refs;
pub use transaction::{RefTransaction, RefUpdate};
