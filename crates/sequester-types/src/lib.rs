//! Foundation types for sequestering old, large blobs.
//!
//! Every other sequester crate depends on `sequester-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- content-addressed identifier (SHA-1 or SHA-256 digest)
//! - [`ObjectKind`] -- blob, tree, commit or tag
//! - [`ObjectDescriptor`] -- one catalog record: identifier, kind, size
//! - [`SizeCutoff`] -- the "large blob" threshold, parsed from `1M`-style input

pub mod error;
pub mod object;
pub mod size;

pub use error::TypeError;
pub use object::{ObjectDescriptor, ObjectId, ObjectKind};
pub use size::SizeCutoff;
