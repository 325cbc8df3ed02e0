use std::path::{Path, PathBuf};

use sequester_refs::{RefName, RefTransaction};
use sequester_types::{ObjectDescriptor, ObjectId};

use crate::error::OdbResult;

/// Lazy stream of object identifiers.
pub type IdStream<'a> = Box<dyn Iterator<Item = OdbResult<ObjectId>> + 'a>;

/// Lazy stream of catalog records.
pub type DescriptorStream<'a> = Box<dyn Iterator<Item = OdbResult<ObjectDescriptor>> + 'a>;

/// The host object database, as seen by the sequestration engine.
///
/// This system never implements storage itself; every method is a request
/// against the host. Implementations must uphold:
/// - Streams are lazy and yield an `Err` item (then end) if the underlying
///   enumeration fails, including failures detected only at end of output.
/// - Batch reference updates are all-or-nothing.
/// - No method retries on failure.
pub trait ObjectDatabase: Send + Sync {
    /// Every object in the database with its kind and size.
    fn catalog(&self) -> OdbResult<DescriptorStream<'_>>;

    /// Expand reference specifications (e.g. `--all`, `main`) into
    /// fully-qualified reference names.
    fn resolve_refs(&self, specs: &[String]) -> OdbResult<Vec<RefName>>;

    /// Every object reachable in `reference`'s current snapshot. A reference
    /// that points at a blob yields just that blob.
    fn tree_objects(&self, reference: &RefName) -> OdbResult<IdStream<'_>>;

    /// Identifiers touched by commits reachable from `specs` and dated at or
    /// after `since`: both sides of each diff, merges against every parent,
    /// the root commit against the empty tree.
    fn recent_changes(&self, since: &str, specs: &[String]) -> OdbResult<IdStream<'_>>;

    /// Every reference name currently defined.
    fn list_refs(&self) -> OdbResult<Vec<RefName>>;

    /// Apply a batch of reference updates atomically.
    fn update_refs(&self, transaction: &RefTransaction) -> OdbResult<()>;

    /// Store `data` as a blob and return its identifier.
    fn write_blob(&self, data: &[u8]) -> OdbResult<ObjectId>;

    /// Write a pack containing exactly `ids` to `<base>-<name>.pack` and
    /// `<base>-<name>.idx`, returning the content-derived `<name>`.
    fn pack_objects(&self, base: &Path, ids: &mut dyn Iterator<Item = ObjectId>) -> OdbResult<String>;

    /// Directory where the database keeps its packs.
    fn pack_dir(&self) -> PathBuf;

    /// Directory suitable for staging new packs (same filesystem as
    /// [`pack_dir`](Self::pack_dir)).
    fn staging_root(&self) -> PathBuf;

    /// Aggressive compaction with immediate pruning of unreachable objects.
    fn compact(&self) -> OdbResult<()>;
}
