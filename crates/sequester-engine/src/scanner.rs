//! Object catalog scanning.

use std::collections::BTreeSet;

use sequester_odb::ObjectDatabase;
use sequester_types::SizeCutoff;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{EngineResult, InStage, Stage};
use crate::reconcile::CandidateSet;

/// Result of one pass over the object catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogScan {
    /// Catalog records read, of every kind.
    pub objects: u64,
    /// Blobs strictly larger than the cutoff.
    pub candidates: CandidateSet,
}

/// Stream the whole catalog once, keeping the identifiers of blobs larger
/// than `cutoff`. A single malformed record fails the scan.
pub fn scan_catalog(db: &dyn ObjectDatabase, cutoff: SizeCutoff) -> EngineResult<CatalogScan> {
    let mut objects = 0u64;
    let mut large = BTreeSet::new();
    for record in db.catalog().in_stage(Stage::Catalog)? {
        let descriptor = record.in_stage(Stage::Catalog)?;
        objects += 1;
        if descriptor.is_large_blob(cutoff.bytes()) {
            debug!(id = %descriptor.id, size = descriptor.size, "large blob");
            large.insert(descriptor.id);
        }
    }
    info!(objects, large_blobs = large.len(), %cutoff, "catalog scanned");
    Ok(CatalogScan {
        objects,
        candidates: CandidateSet::from(large),
    })
}
