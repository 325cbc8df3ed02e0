//! Batch reference updates.
//!
//! A [`RefTransaction`] is rendered to the line-oriented script understood by
//! `update-ref --stdin`, which applies every line or none of them.

use std::collections::HashSet;
use std::fmt::Write as _;

use sequester_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::RefName;

/// One queued reference update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefUpdate {
    /// Create `name` pointing at `target`; fails if `name` already exists.
    Create { name: RefName, target: ObjectId },
    /// Delete `name`.
    Delete { name: RefName },
}

impl RefUpdate {
    pub fn name(&self) -> &RefName {
        match self {
            RefUpdate::Create { name, .. } | RefUpdate::Delete { name } => name,
        }
    }
}

/// An ordered, all-or-nothing batch of reference updates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefTransaction {
    updates: Vec<RefUpdate>,
    names: HashSet<RefName>,
}

impl RefTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue creation of `name` → `target`.
    pub fn create(&mut self, name: RefName, target: ObjectId) -> Result<&mut Self> {
        self.push(RefUpdate::Create { name, target })
    }

    /// Queue deletion of `name`.
    pub fn delete(&mut self, name: RefName) -> Result<&mut Self> {
        self.push(RefUpdate::Delete { name })
    }

    fn push(&mut self, update: RefUpdate) -> Result<&mut Self> {
        if !self.names.insert(update.name().clone()) {
            return Err(RefError::DuplicateUpdate {
                name: update.name().to_string(),
            });
        }
        self.updates.push(update);
        Ok(self)
    }

    pub fn updates(&self) -> &[RefUpdate] {
        &self.updates
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Render as an `update-ref --stdin` script, one command per line.
    pub fn to_script(&self) -> String {
        let mut script = String::new();
        for update in &self.updates {
            // Writing to a String cannot fail.
            let _ = match update {
                RefUpdate::Create { name, target } => writeln!(script, "create {name} {target}"),
                RefUpdate::Delete { name } => writeln!(script, "delete {name}"),
            };
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> RefName {
        RefName::new(s).unwrap()
    }

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_raw(&[byte; 20]).unwrap()
    }

    #[test]
    fn renders_script_in_order() {
        let mut tx = RefTransaction::new();
        tx.delete(name("refs/heads/old")).unwrap();
        tx.create(RefName::replace_for(&oid(0xaa)), oid(0xbb)).unwrap();

        let script = tx.to_script();
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "delete refs/heads/old");
        assert_eq!(
            lines[1],
            format!("create refs/replace/{} {}", oid(0xaa), oid(0xbb))
        );
        assert!(script.ends_with('\n'));
    }

    #[test]
    fn empty_transaction_renders_nothing() {
        let tx = RefTransaction::new();
        assert!(tx.is_empty());
        assert_eq!(tx.to_script(), "");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut tx = RefTransaction::new();
        tx.delete(name("refs/heads/x")).unwrap();
        let err = tx.delete(name("refs/heads/x")).unwrap_err();
        assert!(matches!(err, RefError::DuplicateUpdate { .. }));
        assert_eq!(tx.len(), 1);
    }
}
