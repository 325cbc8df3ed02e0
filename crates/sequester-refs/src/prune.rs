//! Stray reference computation.

use std::collections::{BTreeSet, HashSet};

use crate::names::RefName;

/// References present in the database but absent from `kept`.
///
/// Names denoting the current position (`HEAD`, `*/HEAD`) are never
/// stray. The result is sorted so deletion scripts are deterministic.
pub fn stray_refs<'a, P>(present: P, kept: &[RefName]) -> BTreeSet<RefName>
where
    P: IntoIterator<Item = &'a RefName>,
{
    let kept: HashSet<&RefName> = kept.iter().collect();
    present
        .into_iter()
        .filter(|name| !kept.contains(name) && !name.is_current_position())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(list: &[&str]) -> Vec<RefName> {
        list.iter().map(|s| RefName::new(*s).unwrap()).collect()
    }

    #[test]
    fn present_minus_kept() {
        let present = names(&["refs/heads/main", "refs/heads/old", "refs/tags/v1"]);
        let kept = names(&["refs/heads/main", "refs/tags/v1"]);
        let stray = stray_refs(&present, &kept);
        assert_eq!(stray.into_iter().collect::<Vec<_>>(), names(&["refs/heads/old"]));
    }

    #[test]
    fn head_refs_are_never_stray() {
        let present = names(&["HEAD", "refs/remotes/origin/HEAD", "refs/remotes/origin/main"]);
        let kept = names(&["refs/heads/main"]);
        let stray = stray_refs(&present, &kept);
        assert_eq!(
            stray.into_iter().collect::<Vec<_>>(),
            names(&["refs/remotes/origin/main"])
        );
    }

    #[test]
    fn kept_names_absent_from_database_are_ignored() {
        let present = names(&["refs/heads/main"]);
        let kept = names(&["refs/heads/main", "refs/heads/gone"]);
        assert!(stray_refs(&present, &kept).is_empty());
    }

    #[test]
    fn output_is_sorted() {
        let present = names(&["refs/heads/z", "refs/heads/a", "refs/heads/m"]);
        let stray: Vec<_> = stray_refs(&present, &[]).into_iter().collect();
        assert_eq!(stray, names(&["refs/heads/a", "refs/heads/m", "refs/heads/z"]));
    }

    proptest! {
        #[test]
        fn never_touches_kept_or_head(
            present in proptest::collection::vec("[a-c]{1,2}", 0..12),
            kept in proptest::collection::vec("[a-c]{1,2}", 0..12),
        ) {
            let mut present: Vec<RefName> = present
                .iter()
                .map(|s| RefName::new(format!("refs/heads/{s}")).unwrap())
                .collect();
            present.push(RefName::new("refs/remotes/origin/HEAD").unwrap());
            let kept: Vec<RefName> = kept
                .iter()
                .map(|s| RefName::new(format!("refs/heads/{s}")).unwrap())
                .collect();

            let stray = stray_refs(&present, &kept);
            for name in &stray {
                prop_assert!(!kept.contains(name));
                prop_assert!(!name.is_current_position());
                prop_assert!(present.contains(name));
            }
            for name in &present {
                if !kept.contains(name) && !name.is_current_position() {
                    prop_assert!(stray.contains(name));
                }
            }
        }
    }
}
