//! Host object-database access for blob sequestration.
//!
//! Sequestration never touches storage directly. Every catalog scan, history
//! walk, reference update and pack write is a request against the host object
//! database, expressed by the [`ObjectDatabase`] trait.
//!
//! # Backends
//!
//! - [`GitCli`] -- drives the `git` command-line tool through plumbing
//!   commands, streaming their output line by line
//! - [`InMemoryObjectDatabase`] -- scripted state for tests, with a call
//!   journal and per-operation failure injection
//!
//! # Design Rules
//!
//! 1. Large enumerations are streamed lazily, never buffered whole.
//! 2. A failing command surfaces as an `Err`, including failures only visible
//!    at end of output (exit status).
//! 3. Commands run with an explicit working directory; the process's own
//!    working directory is never changed.
//! 4. Nothing is retried.

pub mod command;
pub mod error;
pub mod git;
pub mod memory;
pub mod parse;
pub mod repository;
pub mod stream;
pub mod traits;

pub use command::GitCommand;
pub use error::{OdbError, OdbResult};
pub use git::GitCli;
pub use memory::{InMemoryObjectDatabase, Operation, WrittenPack};
pub use repository::Repository;
pub use stream::LineStream;
pub use traits::{DescriptorStream, IdStream, ObjectDatabase};
