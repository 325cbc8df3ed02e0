//! Archival pack staging and installation.
//!
//! A pack is written into a private staging directory inside the git
//! directory, checked for its artifacts, given a read-only `.keep` marker and
//! then renamed into pack storage. The index is moved last: the host tool
//! only considers a pack once its `.idx` is present, so a crash mid-install
//! never exposes a pack without its marker.

use std::fs;
use std::path::{Path, PathBuf};

use sequester_odb::ObjectDatabase;
use sequester_types::ObjectId;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{IoContext, PackError, PackResult};

pub const DEFAULT_PACK_PREFIX: &str = "big-old-objects";

/// Where an archival pack ended up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Installation {
    /// Content-derived pack name assigned by the host tool.
    pub name: String,
    /// Path of the installed `.pack` file.
    pub location: PathBuf,
    /// An identical pack was already installed; nothing was moved.
    pub already_present: bool,
}

/// File set of one pack, keyed by extension.
#[derive(Debug)]
struct Artifacts {
    pack: PathBuf,
    idx: PathBuf,
    rev: PathBuf,
    keep: PathBuf,
}

impl Artifacts {
    fn under(dir: &Path, prefix: &str, name: &str) -> Self {
        let path = |ext: &str| dir.join(format!("{prefix}-{name}.{ext}"));
        Self {
            pack: path("pack"),
            idx: path("idx"),
            rev: path("rev"),
            keep: path("keep"),
        }
    }

    fn installed(&self) -> bool {
        self.pack.is_file() && self.idx.is_file() && self.keep.is_file()
    }
}

/// Builds a protected archival pack from a set of identifiers.
#[derive(Clone, Debug)]
pub struct ArchivalPack {
    prefix: String,
}

impl Default for ArchivalPack {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PACK_PREFIX.to_string(),
        }
    }
}

impl ArchivalPack {
    pub fn new(prefix: impl Into<String>) -> PackResult<Self> {
        let prefix = prefix.into();
        let plain = !prefix.is_empty()
            && !prefix.starts_with('.')
            && !prefix.contains(['/', '\\'])
            && !prefix.chars().any(char::is_control);
        if !plain {
            return Err(PackError::InvalidPrefix(prefix));
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Pack exactly `ids` and install the result into the database's pack
    /// storage, protected by a read-only `.keep` marker.
    pub fn create<'a, I>(&self, db: &dyn ObjectDatabase, ids: I) -> PackResult<Installation>
    where
        I: IntoIterator<Item = &'a ObjectId>,
    {
        let root = db.staging_root();
        let staging = tempfile::Builder::new()
            .prefix(".sequester-")
            .tempdir_in(&root)
            .at(&root)?;

        let base = staging.path().join(&self.prefix);
        let mut ids = ids.into_iter().copied();
        let name = db.pack_objects(&base, &mut ids)?;
        debug!(pack = %name, staging = %staging.path().display(), "pack written");

        let staged = Artifacts::under(staging.path(), &self.prefix, &name);
        for required in [&staged.pack, &staged.idx] {
            if !required.is_file() {
                return Err(PackError::MissingArtifact {
                    path: required.clone(),
                });
            }
        }
        write_keep(&staged.keep)?;

        let pack_dir = db.pack_dir();
        let target = Artifacts::under(&pack_dir, &self.prefix, &name);
        if target.installed() {
            info!(pack = %name, "archival pack already present");
            return Ok(Installation {
                name,
                location: target.pack,
                already_present: true,
            });
        }

        fs::create_dir_all(&pack_dir).at(&pack_dir)?;
        rename(&staged.pack, &target.pack)?;
        if staged.rev.is_file() {
            rename(&staged.rev, &target.rev)?;
        }
        rename(&staged.keep, &target.keep)?;
        rename(&staged.idx, &target.idx)?;

        info!(pack = %name, location = %target.pack.display(), "archival pack installed");
        Ok(Installation {
            name,
            location: target.pack,
            already_present: false,
        })
    }
}

fn write_keep(path: &Path) -> PackResult<()> {
    fs::File::create(path).at(path)?;
    let mut perms = fs::metadata(path).at(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms).at(path)
}

fn rename(from: &Path, to: &Path) -> PackResult<()> {
    fs::rename(from, to).at(to)
}
