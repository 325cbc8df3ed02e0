//! Relocation of sequestered blobs.
//!
//! Once the final candidate set is known, this crate moves it out of the
//! main history:
//!
//! - [`redirect`] -- in replacement mode, one placeholder blob plus a
//!   `refs/replace/<id>` record per sequestered blob, in a single batch
//! - [`archive`] -- a pack holding exactly the sequestered blobs, staged in a
//!   private directory, protected by a read-only `.keep` marker and installed
//!   into the database's pack storage
//! - [`relocate`] -- the [`Relocator`] that sequences the two
//!
//! # Design Rules
//!
//! 1. Redirects are registered before the pack is built, never after.
//! 2. A pack missing its `.pack` or `.idx` is never installed.
//! 3. The `.idx` is installed last.
//! 4. An empty set relocates nothing.

pub mod archive;
pub mod error;
pub mod redirect;
pub mod relocate;

pub use archive::{ArchivalPack, Installation, DEFAULT_PACK_PREFIX};
pub use error::{PackError, PackResult};
pub use redirect::{register_redirects, RedirectReport, DEFAULT_PLACEHOLDER};
pub use relocate::{RelocationMode, Relocator};
