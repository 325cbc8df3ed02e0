//! Stray reference pruning.

use sequester_odb::ObjectDatabase;
use sequester_refs::{stray_refs, RefName, RefTransaction};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult, InStage, Stage};

/// Delete every reference not in `kept`, except current-position refs, in
/// one atomic batch. Returns the deleted names in sorted order.
///
/// Refuses to run with an empty `kept` list.
pub fn prune_stray_refs(
    db: &dyn ObjectDatabase,
    specs: &[String],
    kept: &[RefName],
) -> EngineResult<Vec<RefName>> {
    if kept.is_empty() {
        return Err(EngineError::NothingKept {
            specs: specs.to_vec(),
        });
    }

    let present = db.list_refs().in_stage(Stage::PruneRefs)?;
    let stray = stray_refs(&present, kept);
    if stray.is_empty() {
        info!(present = present.len(), "no stray refs");
        return Ok(Vec::new());
    }

    let mut tx = RefTransaction::new();
    for name in &stray {
        debug!(%name, "pruning");
        tx.delete(name.clone()).in_stage(Stage::PruneRefs)?;
    }
    db.update_refs(&tx).in_stage(Stage::PruneRefs)?;

    info!(pruned = stray.len(), present = present.len(), "stray refs pruned");
    Ok(stray.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequester_odb::{InMemoryObjectDatabase, Operation};
    use sequester_types::ObjectKind;

    fn setup() -> (InMemoryObjectDatabase, Vec<RefName>) {
        let db = InMemoryObjectDatabase::new("/nonexistent/.git");
        let c = db.add_object(ObjectKind::Commit, 1);
        let main = db.set_ref("refs/heads/main", c).unwrap();
        db.set_ref("refs/heads/stale", c).unwrap();
        db.set_ref("refs/remotes/origin/HEAD", c).unwrap();
        db.set_ref("refs/remotes/origin/gone", c).unwrap();
        db.set_ref("HEAD", c).unwrap();
        (db, vec![main])
    }

    #[test]
    fn deletes_strays_but_not_current_position() {
        let (db, kept) = setup();
        let pruned = prune_stray_refs(&db, &["main".into()], &kept).unwrap();
        let pruned: Vec<&str> = pruned.iter().map(RefName::as_str).collect();
        assert_eq!(pruned, vec!["refs/heads/stale", "refs/remotes/origin/gone"]);

        let left: Vec<String> = db.refs().iter().map(|r| r.to_string()).collect();
        assert!(left.contains(&"HEAD".to_string()));
        assert!(left.contains(&"refs/heads/main".to_string()));
        assert!(left.contains(&"refs/remotes/origin/HEAD".to_string()));
        assert_eq!(db.scripts().len(), 1, "one batch");
    }

    #[test]
    fn nothing_stray_means_no_transaction() {
        let db = InMemoryObjectDatabase::new("/nonexistent/.git");
        let c = db.add_object(ObjectKind::Commit, 1);
        let main = db.set_ref("refs/heads/main", c).unwrap();
        assert!(prune_stray_refs(&db, &["--all".into()], &[main]).unwrap().is_empty());
        assert!(!db.journal().contains(&Operation::UpdateRefs));
    }

    #[test]
    fn empty_kept_list_is_refused_before_any_request() {
        let (db, _) = setup();
        let err = prune_stray_refs(&db, &["nope".into()], &[]).unwrap_err();
        assert!(matches!(err, EngineError::NothingKept { .. }));
        assert!(db.journal().is_empty());
    }

    #[test]
    fn failed_batch_deletes_nothing() {
        let (db, kept) = setup();
        db.fail(Operation::UpdateRefs);
        let err = prune_stray_refs(&db, &[], &kept).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::PruneRefs));
        assert_eq!(db.refs().len(), 5);
    }
}
