use std::collections::BTreeSet;

use sequester_odb::ObjectDatabase;
use sequester_types::ObjectId;
use tracing::info;

use crate::archive::{ArchivalPack, Installation};
use crate::error::PackResult;
use crate::redirect::{register_redirects, RedirectReport};

/// How sequestered blobs leave the main history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelocationMode {
    /// Pack the blobs; nothing is substituted.
    Direct,
    /// Redirect every blob to a placeholder with this content, then pack.
    Replace { placeholder: Vec<u8> },
}

/// Moves the final candidate set out of the main history.
///
/// Callers must run [`redirect`](Self::redirect) to completion before
/// [`archive`](Self::archive): a blob packed away without its redirect in
/// place would be dereferenced with no substitute.
#[derive(Clone, Debug)]
pub struct Relocator {
    mode: RelocationMode,
    archive: ArchivalPack,
}

impl Relocator {
    pub fn new(mode: RelocationMode, archive: ArchivalPack) -> Self {
        Self { mode, archive }
    }

    pub fn mode(&self) -> &RelocationMode {
        &self.mode
    }

    /// Register placeholder redirects. Returns `None` in direct mode or when
    /// there is nothing to redirect.
    pub fn redirect(
        &self,
        db: &dyn ObjectDatabase,
        ids: &BTreeSet<ObjectId>,
    ) -> PackResult<Option<RedirectReport>> {
        match &self.mode {
            RelocationMode::Replace { placeholder } if !ids.is_empty() => {
                register_redirects(db, ids, placeholder).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Pack `ids` into a protected archival pack. Returns `None` when `ids`
    /// is empty.
    pub fn archive(
        &self,
        db: &dyn ObjectDatabase,
        ids: &BTreeSet<ObjectId>,
    ) -> PackResult<Option<Installation>> {
        if ids.is_empty() {
            info!("no old big blobs; nothing to archive");
            return Ok(None);
        }
        info!(blobs = ids.len(), prefix = self.archive.prefix(), "archiving old big blobs");
        self.archive.create(db, ids).map(Some)
    }
}
