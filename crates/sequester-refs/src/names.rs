//! Fully-qualified reference names.
//!
//! Names come back from the host tool (`rev-parse --symbolic-full-name`,
//! `for-each-ref`) and go back into it inside `update-ref --stdin` scripts,
//! so a name must never carry whitespace or control characters. Accepted
//! names are either a pseudo-ref (`HEAD`, `FETCH_HEAD`, ...) or live under
//! `refs/` and follow git-style component rules:
//!
//! - no whitespace, control characters, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - no `..` and no `@{`
//! - no leading/trailing `/`, no `//`
//! - no trailing `.` or `.lock`
//! - no component starting with `.`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sequester_types::ObjectId;

use crate::error::{RefError, Result};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

/// Namespace holding redirect records.
pub const REPLACE_PREFIX: &str = "refs/replace/";

/// A validated, fully-qualified reference name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefName(String);

impl RefName {
    /// Validate and wrap a fully-qualified name.
    ///
    /// ```
    /// use sequester_refs::RefName;
    ///
    /// assert!(RefName::new("refs/heads/main").is_ok());
    /// assert!(RefName::new("HEAD").is_ok());
    /// assert!(RefName::new("main").is_err());
    /// assert!(RefName::new("refs/heads/bad..name").is_err());
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_ref_name(&name)?;
        Ok(Self(name))
    }

    /// The redirect record name for `id` (`refs/replace/<hex>`).
    pub fn replace_for(id: &ObjectId) -> Self {
        Self(format!("{REPLACE_PREFIX}{}", id.to_hex()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for names that denote the repository's current
    /// position: `HEAD` itself or any `.../HEAD` (e.g. `refs/remotes/origin/HEAD`).
    pub fn is_current_position(&self) -> bool {
        self.0 == "HEAD" || self.0.ends_with("/HEAD")
    }

    /// If this is a redirect record, the identifier it redirects.
    pub fn replaced_object(&self) -> Option<ObjectId> {
        self.0
            .strip_prefix(REPLACE_PREFIX)
            .and_then(|hex| ObjectId::from_hex(hex).ok())
    }
}

impl fmt::Debug for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefName({})", self.0)
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RefName {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for RefName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RefName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

fn is_pseudo_ref(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_uppercase() || b == b'_')
}

/// Validate a fully-qualified ref name, returning `Ok(())` if valid.
pub fn validate_ref_name(name: &str) -> Result<()> {
    let invalid = |reason: String| RefError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("ref name must not be empty".into()));
    }

    if is_pseudo_ref(name) {
        return Ok(());
    }

    if !name.starts_with("refs/") {
        return Err(invalid("must be a pseudo-ref or start with 'refs/'".into()));
    }

    if let Some(ch) = name.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid(format!("contains whitespace or control character: {ch:?}")));
    }

    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| name.contains(**ch)) {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }

    if name.contains("..") {
        return Err(invalid("must not contain '..'".into()));
    }

    if name.contains("@{") {
        return Err(invalid("must not contain '@{'".into()));
    }

    if name.ends_with('/') {
        return Err(invalid("must not end with '/'".into()));
    }

    if name.ends_with('.') || name.ends_with(".lock") {
        return Err(invalid("must not end with '.' or '.lock'".into()));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid("path components must not be empty".into()));
        }
        if component.starts_with('.') {
            return Err(invalid(format!("component must not start with '.': {component:?}")));
        }
    }

    Ok(())
}
