//! In-memory object database for tests and dry experiments.
//!
//! [`InMemoryObjectDatabase`] holds a scripted view of a repository: the
//! object catalog, references, per-reference snapshot listings and the set
//! of identifiers touched by recent commits. Mutating requests (ref
//! transactions, blob writes, pack creation, compaction) are applied to that
//! state and recorded in a call journal so tests can assert on ordering.
//! Any operation can be made to fail with [`InMemoryObjectDatabase::fail`].

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use sequester_refs::{RefName, RefTransaction, RefUpdate};
use sequester_types::{ObjectDescriptor, ObjectId, ObjectKind};

use crate::error::{OdbError, OdbResult};
use crate::traits::{DescriptorStream, IdStream, ObjectDatabase};

/// Operations recorded in the call journal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Catalog,
    ResolveRefs,
    TreeObjects,
    RecentChanges,
    ListRefs,
    UpdateRefs,
    WriteBlob,
    PackObjects,
    Compact,
}

/// A pack written by [`InMemoryObjectDatabase::pack_objects`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenPack {
    pub name: String,
    pub objects: Vec<ObjectId>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectId, ObjectDescriptor>,
    blob_data: HashMap<ObjectId, Vec<u8>>,
    refs: BTreeMap<RefName, ObjectId>,
    trees: HashMap<RefName, Vec<ObjectId>>,
    recent: Vec<ObjectId>,
    packs: Vec<WrittenPack>,
    scripts: Vec<String>,
    journal: Vec<Operation>,
    failures: HashSet<Operation>,
    next_id: u64,
}

/// In-memory implementation of [`ObjectDatabase`].
pub struct InMemoryObjectDatabase {
    git_dir: PathBuf,
    state: RwLock<State>,
}

impl InMemoryObjectDatabase {
    /// Create an empty database whose packs live under `git_dir/objects/pack`.
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
            state: RwLock::new(State::default()),
        }
    }

    // A panic while holding the lock leaves `State` consistent: every
    // mutation is a single insert or push.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an object with a fresh identifier.
    pub fn add_object(&self, kind: ObjectKind, size: u64) -> ObjectId {
        let mut state = self.write();
        state.next_id += 1;
        let id = derive_id(&("object", state.next_id));
        state.objects.insert(id, ObjectDescriptor::new(id, kind, size));
        id
    }

    /// Add a blob of `size` bytes.
    pub fn add_blob(&self, size: u64) -> ObjectId {
        self.add_object(ObjectKind::Blob, size)
    }

    /// Point `name` at `target`.
    pub fn set_ref(&self, name: &str, target: ObjectId) -> OdbResult<RefName> {
        let name = RefName::new(name)?;
        self.write().refs.insert(name.clone(), target);
        Ok(name)
    }

    /// Set the objects listed by `tree_objects(name)`.
    pub fn set_tree(&self, name: &RefName, objects: Vec<ObjectId>) {
        self.write().trees.insert(name.clone(), objects);
    }

    /// Set the identifiers reported by `recent_changes`, in stream order.
    pub fn set_recent(&self, objects: Vec<ObjectId>) {
        self.write().recent = objects;
    }

    /// Make `operation` fail. Streams yield their items, then an error.
    pub fn fail(&self, operation: Operation) {
        self.write().failures.insert(operation);
    }

    pub fn journal(&self) -> Vec<Operation> {
        self.read().journal.clone()
    }

    pub fn refs(&self) -> Vec<RefName> {
        self.read().refs.keys().cloned().collect()
    }

    pub fn ref_target(&self, name: &str) -> Option<ObjectId> {
        let name = RefName::new(name).ok()?;
        self.read().refs.get(&name).copied()
    }

    pub fn packs(&self) -> Vec<WrittenPack> {
        self.read().packs.clone()
    }

    /// Every `update-ref` script applied, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.read().scripts.clone()
    }

    pub fn blob_data(&self, id: &ObjectId) -> Option<Vec<u8>> {
        self.read().blob_data.get(id).cloned()
    }

    fn enter(&self, operation: Operation) -> bool {
        let mut state = self.write();
        state.journal.push(operation);
        state.failures.contains(&operation)
    }

    fn rejected(operation: Operation) -> OdbError {
        OdbError::Rejected(format!("{operation:?} failed"))
    }

    fn stream<'a, T: 'a>(items: Vec<T>, fail: bool, operation: Operation) -> Box<dyn Iterator<Item = OdbResult<T>> + 'a> {
        let tail = fail.then(|| Err(Self::rejected(operation)));
        Box::new(items.into_iter().map(Ok).chain(tail))
    }
}

fn derive_id<T: Hash>(seed: &T) -> ObjectId {
    let mut raw = [0u8; 20];
    for (i, chunk) in raw.chunks_mut(8).enumerate() {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        i.hash(&mut hasher);
        let bytes = hasher.finish().to_be_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
    // A zero digest would read as the null id.
    raw[0] |= 1;
    ObjectId::from_raw(&raw).unwrap_or_else(|_| ObjectId::null_sha1())
}

impl ObjectDatabase for InMemoryObjectDatabase {
    fn catalog(&self) -> OdbResult<DescriptorStream<'_>> {
        let fail = self.enter(Operation::Catalog);
        let items: Vec<ObjectDescriptor> = self.read().objects.values().copied().collect();
        Ok(Self::stream(items, fail, Operation::Catalog))
    }

    fn resolve_refs(&self, specs: &[String]) -> OdbResult<Vec<RefName>> {
        if self.enter(Operation::ResolveRefs) {
            return Err(Self::rejected(Operation::ResolveRefs));
        }
        let state = self.read();
        let mut resolved = Vec::new();
        for spec in specs {
            if spec == "--all" {
                resolved.extend(
                    state
                        .refs
                        .keys()
                        .filter(|name| name.as_str().starts_with("refs/"))
                        .cloned(),
                );
                continue;
            }
            let candidates = [
                spec.clone(),
                format!("refs/{spec}"),
                format!("refs/tags/{spec}"),
                format!("refs/heads/{spec}"),
                format!("refs/remotes/{spec}"),
            ];
            if let Some(name) = candidates
                .iter()
                .filter_map(|c| RefName::new(c.as_str()).ok())
                .find(|name| state.refs.contains_key(name))
            {
                resolved.push(name);
            }
        }
        Ok(resolved)
    }

    fn tree_objects(&self, reference: &RefName) -> OdbResult<IdStream<'_>> {
        let fail = self.enter(Operation::TreeObjects);
        let state = self.read();
        let Some(target) = state.refs.get(reference) else {
            return Err(OdbError::Rejected(format!("unknown ref {reference}")));
        };
        let items = match state.trees.get(reference) {
            Some(listing) => listing.clone(),
            None if state.objects.get(target).is_some_and(|d| d.kind == ObjectKind::Blob) => {
                vec![*target]
            }
            None => Vec::new(),
        };
        Ok(Self::stream(items, fail, Operation::TreeObjects))
    }

    fn recent_changes(&self, _since: &str, _specs: &[String]) -> OdbResult<IdStream<'_>> {
        let fail = self.enter(Operation::RecentChanges);
        let items = self.read().recent.clone();
        Ok(Self::stream(items, fail, Operation::RecentChanges))
    }

    fn list_refs(&self) -> OdbResult<Vec<RefName>> {
        if self.enter(Operation::ListRefs) {
            return Err(Self::rejected(Operation::ListRefs));
        }
        Ok(self.refs())
    }

    fn update_refs(&self, transaction: &RefTransaction) -> OdbResult<()> {
        if self.enter(Operation::UpdateRefs) {
            return Err(Self::rejected(Operation::UpdateRefs));
        }
        if transaction.is_empty() {
            return Ok(());
        }
        let mut state = self.write();

        // Validate the whole batch before touching anything.
        for update in transaction.updates() {
            if let RefUpdate::Create { name, .. } = update {
                if state.refs.contains_key(name) {
                    return Err(OdbError::Rejected(format!("ref already exists: {name}")));
                }
            }
        }
        for update in transaction.updates() {
            match update {
                RefUpdate::Create { name, target } => {
                    state.refs.insert(name.clone(), *target);
                }
                RefUpdate::Delete { name } => {
                    state.refs.remove(name);
                }
            }
        }
        state.scripts.push(transaction.to_script());
        Ok(())
    }

    fn write_blob(&self, data: &[u8]) -> OdbResult<ObjectId> {
        if self.enter(Operation::WriteBlob) {
            return Err(Self::rejected(Operation::WriteBlob));
        }
        let id = derive_id(&("blob", data));
        let mut state = self.write();
        state
            .objects
            .insert(id, ObjectDescriptor::new(id, ObjectKind::Blob, data.len() as u64));
        state.blob_data.insert(id, data.to_vec());
        Ok(id)
    }

    fn pack_objects(&self, base: &Path, ids: &mut dyn Iterator<Item = ObjectId>) -> OdbResult<String> {
        let fail = self.enter(Operation::PackObjects);
        let mut objects: Vec<ObjectId> = ids.collect();
        if fail {
            return Err(Self::rejected(Operation::PackObjects));
        }
        {
            let state = self.read();
            if let Some(missing) = objects.iter().find(|id| !state.objects.contains_key(id)) {
                return Err(OdbError::Rejected(format!("object not found: {missing}")));
            }
        }
        objects.sort();
        objects.dedup();

        let name = derive_id(&("pack", &objects)).to_hex();
        let stem = base.as_os_str().to_string_lossy();
        let listing: String = objects.iter().map(|id| format!("{id}\n")).collect();
        std::fs::write(format!("{stem}-{name}.pack"), listing)?;
        std::fs::write(format!("{stem}-{name}.idx"), b"")?;

        self.write().packs.push(WrittenPack {
            name: name.clone(),
            objects,
        });
        Ok(name)
    }

    fn pack_dir(&self) -> PathBuf {
        self.git_dir.join("objects").join("pack")
    }

    fn staging_root(&self) -> PathBuf {
        self.git_dir.clone()
    }

    fn compact(&self) -> OdbResult<()> {
        if self.enter(Operation::Compact) {
            return Err(Self::rejected(Operation::Compact));
        }
        Ok(())
    }
}
