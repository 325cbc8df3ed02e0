//! Candidate set reconciliation.
//!
//! The final set of old big blobs is the scanner's candidate set minus every
//! identifier seen on the usage streams. Removal is the only mutation a
//! [`CandidateSet`] supports after it is built, so the set can only shrink,
//! and an identifier that is live anywhere in kept history can never make it
//! into the final set.

use std::collections::BTreeSet;

use sequester_types::ObjectId;
use serde::Serialize;

/// Large blobs still eligible for sequestration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateSet(BTreeSet<ObjectId>);

/// Counts from one [`CandidateSet::subtract`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Subtraction {
    /// Identifiers read from the usage stream, duplicates included.
    pub seen: u64,
    /// Candidates removed by this pass.
    pub removed: usize,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectId> {
        self.0.iter()
    }

    pub fn as_set(&self) -> &BTreeSet<ObjectId> {
        &self.0
    }

    pub fn into_set(self) -> BTreeSet<ObjectId> {
        self.0
    }

    /// Remove every identifier on `usage` as it arrives.
    ///
    /// The stream is never collected. The first `Err` stops the pass and is
    /// returned; removals already made stay made, which is safe because
    /// removal only ever protects objects.
    pub fn subtract<I, E>(&mut self, usage: I) -> Result<Subtraction, E>
    where
        I: IntoIterator<Item = Result<ObjectId, E>>,
    {
        let mut pass = Subtraction::default();
        for id in usage {
            let id = id?;
            pass.seen += 1;
            if self.0.remove(&id) {
                pass.removed += 1;
            }
        }
        Ok(pass)
    }
}

impl From<BTreeSet<ObjectId>> for CandidateSet {
    fn from(ids: BTreeSet<ObjectId>) -> Self {
        Self(ids)
    }
}

impl FromIterator<ObjectId> for CandidateSet {
    fn from_iter<T: IntoIterator<Item = ObjectId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// `candidates - full - recent`, or `candidates - recent` when `full` is
/// `None` (replacement mode).
pub fn reconcile<F, R, E>(
    mut candidates: CandidateSet,
    full: Option<F>,
    recent: R,
) -> Result<CandidateSet, E>
where
    F: IntoIterator<Item = Result<ObjectId, E>>,
    R: IntoIterator<Item = Result<ObjectId, E>>,
{
    if let Some(full) = full {
        candidates.subtract(full)?;
    }
    candidates.subtract(recent)?;
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::convert::Infallible;

    fn id(n: u8) -> ObjectId {
        let mut raw = [0u8; 20];
        raw[0] = 1;
        raw[19] = n;
        ObjectId::from_raw(&raw).unwrap()
    }

    fn ok(ids: &[u8]) -> Vec<Result<ObjectId, Infallible>> {
        ids.iter().map(|n| Ok(id(*n))).collect()
    }

    fn set(ids: &[u8]) -> CandidateSet {
        ids.iter().map(|n| id(*n)).collect()
    }

    #[test]
    fn normal_mode_subtracts_both_streams() {
        // A is live at a tip, B is stale.
        let out = reconcile(set(&[1, 2]), Some(ok(&[1])), ok(&[])).unwrap();
        assert_eq!(out, set(&[2]));
    }

    #[test]
    fn replace_mode_ignores_full_usage() {
        let out = reconcile(set(&[1, 2]), None::<Vec<Result<ObjectId, Infallible>>>, ok(&[])).unwrap();
        assert_eq!(out, set(&[1, 2]));
    }

    #[test]
    fn recent_usage_always_applies() {
        let out = reconcile(set(&[1, 2, 3]), None::<Vec<Result<ObjectId, Infallible>>>, ok(&[3, 9])).unwrap();
        assert_eq!(out, set(&[1, 2]));
    }

    #[test]
    fn subtract_counts_and_tolerates_absent_ids() {
        let mut c = set(&[1, 2]);
        let pass = c.subtract(ok(&[2, 2, 7])).unwrap();
        assert_eq!(pass, Subtraction { seen: 3, removed: 1 });
        assert_eq!(c, set(&[1]));
    }

    #[test]
    fn error_stops_the_pass() {
        let mut c = set(&[1, 2, 3]);
        let usage = vec![Ok(id(1)), Err("broken pipe"), Ok(id(2))];
        assert_eq!(c.subtract(usage), Err("broken pipe"));
        assert_eq!(c, set(&[2, 3]));
    }

    #[test]
    fn usage_is_consumed_lazily() {
        let mut c = set(&[1]);
        let mut pulled = 0;
        let usage = std::iter::repeat_with(|| {
            pulled += 1;
            Ok::<_, Infallible>(id(1))
        })
        .take(5);
        c.subtract(usage).unwrap();
        assert_eq!(pulled, 5);
        assert!(c.is_empty());
    }

    #[test]
    fn serializes_as_hex_list() {
        let json = serde_json::to_value(set(&[1])).unwrap();
        assert_eq!(json, serde_json::json!([id(1).to_hex()]));
    }

    fn ids() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(0u8..32, 0..40)
    }

    proptest! {
        #[test]
        fn matches_set_algebra(c in ids(), f in ids(), r in ids(), replace in any::<bool>()) {
            let full = (!replace).then(|| ok(&f));
            let out = reconcile(set(&c), full, ok(&r)).unwrap();

            let mut expected: BTreeSet<u8> = c.iter().copied().collect();
            if !replace {
                for n in &f { expected.remove(n); }
            }
            for n in &r { expected.remove(n); }
            prop_assert_eq!(out, set(&expected.into_iter().collect::<Vec<_>>()));
        }

        #[test]
        fn idempotent(c in ids(), f in ids(), r in ids()) {
            let once = reconcile(set(&c), Some(ok(&f)), ok(&r)).unwrap();
            let twice = reconcile(once.clone(), Some(ok(&f)), ok(&r)).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn monotone(c in ids(), f in ids(), r in ids()) {
            let initial = set(&c);
            let out = reconcile(initial.clone(), Some(ok(&f)), ok(&r)).unwrap();
            prop_assert!(out.as_set().is_subset(initial.as_set()));
        }

        #[test]
        fn order_and_duplicates_do_not_matter(c in ids(), f in ids(), r in ids()) {
            let mut f = f;
            let forward = reconcile(set(&c), Some(ok(&f)), ok(&r)).unwrap();
            f.reverse();
            let doubled: Vec<u8> = f.iter().chain(f.iter()).copied().collect();
            let shuffled = reconcile(set(&c), Some(ok(&doubled)), ok(&r)).unwrap();
            prop_assert_eq!(forward, shuffled);
        }
    }
}
