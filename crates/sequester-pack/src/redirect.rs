//! Placeholder substitution through redirect records.
//!
//! One placeholder blob is written per run and every sequestered blob gets a
//! `refs/replace/<id>` record pointing at it, all in a single transaction.
//! If the transaction fails nothing is redirected and the caller must not go
//! on to relocate the blobs.

use std::collections::BTreeSet;

use sequester_odb::ObjectDatabase;
use sequester_refs::{RefName, RefTransaction};
use sequester_types::ObjectId;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::PackResult;

pub const DEFAULT_PLACEHOLDER: &str = "These aren't the droids you're looking for.\n";

/// Outcome of [`register_redirects`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RedirectReport {
    pub placeholder: ObjectId,
    /// Redirect records created by this call.
    pub created: usize,
    /// Blobs that already had a redirect record.
    pub skipped: usize,
}

/// Redirect every blob in `ids` to a placeholder holding `content`.
pub fn register_redirects<'a, I>(
    db: &dyn ObjectDatabase,
    ids: I,
    content: &[u8],
) -> PackResult<RedirectReport>
where
    I: IntoIterator<Item = &'a ObjectId>,
{
    let placeholder = db.write_blob(content)?;
    debug!(%placeholder, bytes = content.len(), "placeholder written");

    let redirected: BTreeSet<ObjectId> = db
        .list_refs()?
        .iter()
        .filter_map(RefName::replaced_object)
        .collect();

    let mut tx = RefTransaction::new();
    let mut skipped = 0;
    for id in ids {
        // A blob never redirects to itself.
        if redirected.contains(id) || *id == placeholder {
            skipped += 1;
            continue;
        }
        tx.create(RefName::replace_for(id), placeholder)?;
    }

    db.update_refs(&tx)?;
    info!(%placeholder, created = tx.len(), skipped, "redirects registered");
    Ok(RedirectReport {
        placeholder,
        created: tx.len(),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequester_odb::{InMemoryObjectDatabase, Operation};

    fn db() -> InMemoryObjectDatabase {
        InMemoryObjectDatabase::new("/nonexistent/.git")
    }

    #[test]
    fn every_blob_points_at_one_placeholder() {
        let db = db();
        let a = db.add_blob(2_000_000);
        let b = db.add_blob(5_000_000);
        let ids: BTreeSet<ObjectId> = [a, b].into();

        let report = register_redirects(&db, &ids, DEFAULT_PLACEHOLDER.as_bytes()).unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(
            db.blob_data(&report.placeholder).unwrap(),
            DEFAULT_PLACEHOLDER.as_bytes()
        );
        for id in [a, b] {
            let name = format!("refs/replace/{id}");
            assert_eq!(db.ref_target(&name), Some(report.placeholder));
        }
        assert_eq!(db.scripts().len(), 1, "one batch transaction");
    }

    #[test]
    fn rerun_skips_existing_redirects() {
        let db = db();
        let a = db.add_blob(2_000_000);
        let ids: BTreeSet<ObjectId> = [a].into();
        register_redirects(&db, &ids, b"x").unwrap();

        let b = db.add_blob(3_000_000);
        let ids: BTreeSet<ObjectId> = [a, b].into();
        let report = register_redirects(&db, &ids, b"x").unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn failed_batch_creates_nothing() {
        let db = db();
        let ids: BTreeSet<ObjectId> = [db.add_blob(2_000_000)].into();
        db.fail(Operation::UpdateRefs);
        assert!(register_redirects(&db, &ids, b"x").is_err());
        assert!(db.refs().is_empty());
    }

    #[test]
    fn placeholder_write_failure_stops_before_refs() {
        let db = db();
        let ids: BTreeSet<ObjectId> = [db.add_blob(2_000_000)].into();
        db.fail(Operation::WriteBlob);
        assert!(register_redirects(&db, &ids, b"x").is_err());
        assert!(!db.journal().contains(&Operation::UpdateRefs));
    }
}
