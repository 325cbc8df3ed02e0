//! Reachability stream producers.
//!
//! Both producers hand back lazy identifier streams. Nothing is collected
//! here; the reconciler removes each identifier from the candidate set as it
//! arrives, so memory stays bounded by the candidate set itself.

use sequester_odb::{IdStream, ObjectDatabase, OdbResult};
use sequester_refs::RefName;
use sequester_types::ObjectId;
use tracing::debug;

/// Every object in the current snapshot of each reference, reference by
/// reference in list order. The next reference's listing is only started
/// once the previous one is exhausted.
pub struct FullHistoryUsage<'a> {
    db: &'a dyn ObjectDatabase,
    refs: std::slice::Iter<'a, RefName>,
    current: Option<IdStream<'a>>,
    done: bool,
}

impl<'a> FullHistoryUsage<'a> {
    pub fn new(db: &'a dyn ObjectDatabase, refs: &'a [RefName]) -> Self {
        Self {
            db,
            refs: refs.iter(),
            current: None,
            done: false,
        }
    }
}

impl Iterator for FullHistoryUsage<'_> {
    type Item = OdbResult<ObjectId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(stream) = self.current.as_mut() {
                match stream.next() {
                    Some(Ok(id)) => return Some(Ok(id)),
                    Some(Err(e)) => {
                        self.done = true;
                        self.current = None;
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }
            let Some(reference) = self.refs.next() else {
                self.done = true;
                return None;
            };
            debug!(%reference, "listing snapshot");
            match self.db.tree_objects(reference) {
                Ok(stream) => self.current = Some(stream),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Objects used by the current snapshots of `refs`.
pub fn full_history_usage<'a>(db: &'a dyn ObjectDatabase, refs: &'a [RefName]) -> FullHistoryUsage<'a> {
    FullHistoryUsage::new(db, refs)
}

/// Objects on either side of any diff in commits reachable from `specs` and
/// dated at or after `since`.
pub fn recent_history_usage<'a>(
    db: &'a dyn ObjectDatabase,
    since: &str,
    specs: &[String],
) -> OdbResult<IdStream<'a>> {
    debug!(since, ?specs, "walking recent history");
    db.recent_changes(since, specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequester_odb::{InMemoryObjectDatabase, Operation};
    use sequester_types::ObjectKind;

    fn setup() -> (InMemoryObjectDatabase, Vec<RefName>, [ObjectId; 3]) {
        let db = InMemoryObjectDatabase::new("/nonexistent/.git");
        let commit = db.add_object(ObjectKind::Commit, 1);
        let a = db.add_blob(1);
        let b = db.add_blob(2);
        let c = db.add_blob(3);
        let main = db.set_ref("refs/heads/main", commit).unwrap();
        let topic = db.set_ref("refs/heads/topic", commit).unwrap();
        db.set_tree(&main, vec![a, b]);
        db.set_tree(&topic, vec![b, c]);
        (db, vec![main, topic], [a, b, c])
    }

    #[test]
    fn walks_refs_in_order_without_dedup() {
        let (db, refs, [a, b, c]) = setup();
        let ids: Vec<ObjectId> = full_history_usage(&db, &refs).map(Result::unwrap).collect();
        assert_eq!(ids, vec![a, b, b, c]);
    }

    #[test]
    fn opens_listings_lazily() {
        let (db, refs, _) = setup();
        let mut usage = full_history_usage(&db, &refs);
        usage.next().unwrap().unwrap();
        let listings = db.journal().iter().filter(|op| **op == Operation::TreeObjects).count();
        assert_eq!(listings, 1);
    }

    #[test]
    fn listing_failure_ends_the_stream() {
        let (db, refs, _) = setup();
        db.fail(Operation::TreeObjects);
        let items: Vec<OdbResult<ObjectId>> = full_history_usage(&db, &refs).collect();
        // First listing yields its two ids, then the error; the second ref
        // is never listed.
        assert_eq!(items.len(), 3);
        assert!(items[2].is_err());
    }

    #[test]
    fn no_refs_no_usage() {
        let db = InMemoryObjectDatabase::new("/nonexistent/.git");
        assert_eq!(full_history_usage(&db, &[]).count(), 0);
    }

    #[test]
    fn recent_usage_delegates_to_database() {
        let (db, _, [a, _, c]) = setup();
        db.set_recent(vec![c, a]);
        let ids: Vec<ObjectId> = recent_history_usage(&db, "1 month ago", &["--all".into()])
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(ids, vec![c, a]);
    }
}
