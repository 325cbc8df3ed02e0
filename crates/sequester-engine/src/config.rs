use std::path::{Path, PathBuf};

use sequester_pack::{ArchivalPack, DEFAULT_PACK_PREFIX, DEFAULT_PLACEHOLDER};
use sequester_types::SizeCutoff;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Name of the per-repository config file, looked up in the git directory.
pub const CONFIG_FILE: &str = "sequester.toml";

/// Persistent run settings.
///
/// Every field is optional in the file; command-line flags override what
/// the file says.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequesterConfig {
    /// Blobs strictly larger than this are candidates. Accepts `1M`-style
    /// strings or a plain byte count.
    pub size_cutoff: SizeCutoff,
    /// Redirect sequestered blobs to a placeholder, widening the candidate
    /// set to blobs still present at reference tips.
    pub replace_objects: bool,
    /// Content of the placeholder blob.
    pub placeholder: String,
    /// File-name prefix of the archival pack.
    pub pack_prefix: String,
    /// Host tool binary.
    pub git: String,
    /// Run the final compaction.
    pub compact: bool,
}

impl Default for SequesterConfig {
    fn default() -> Self {
        Self {
            size_cutoff: SizeCutoff::default(),
            replace_objects: false,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            pack_prefix: DEFAULT_PACK_PREFIX.to_string(),
            git: "git".to_string(),
            compact: true,
        }
    }
}

impl SequesterConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> EngineResult<Self> {
        let config: Self = toml::from_str(text).map_err(|source| EngineError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Load `explicit` if given, else `<git_dir>/sequester.toml` if present,
    /// else the defaults. Returns the file that was read, if any.
    pub fn discover(
        explicit: Option<&Path>,
        git_dir: &Path,
    ) -> EngineResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let candidate = git_dir.join(CONFIG_FILE);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "using repository config");
            return Ok((Self::load(&candidate)?, Some(candidate)));
        }
        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.git.trim().is_empty() {
            return Err(EngineError::InvalidConfig("`git` must name a program".into()));
        }
        if self.placeholder.is_empty() {
            return Err(EngineError::InvalidConfig("`placeholder` must not be empty".into()));
        }
        ArchivalPack::new(self.pack_prefix.as_str())
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> EngineResult<SequesterConfig> {
        SequesterConfig::from_toml_str(text, Path::new("sequester.toml"))
    }

    #[test]
    fn defaults() {
        let c = SequesterConfig::default();
        assert_eq!(c.size_cutoff.bytes(), 1_000_000);
        assert!(!c.replace_objects);
        assert_eq!(c.placeholder, "These aren't the droids you're looking for.\n");
        assert_eq!(c.pack_prefix, "big-old-objects");
        assert_eq!(c.git, "git");
        assert!(c.compact);
        assert_eq!(parse("").unwrap(), c);
    }

    #[test]
    fn reads_every_field() {
        let c = parse(
            r#"
            size_cutoff = "500k"
            replace_objects = true
            placeholder = "gone\n"
            pack_prefix = "attic"
            git = "/opt/git/bin/git"
            compact = false
            "#,
        )
        .unwrap();
        assert_eq!(c.size_cutoff.bytes(), 500_000);
        assert!(c.replace_objects);
        assert_eq!(c.placeholder, "gone\n");
        assert_eq!(c.pack_prefix, "attic");
        assert_eq!(c.git, "/opt/git/bin/git");
        assert!(!c.compact);
    }

    #[test]
    fn numeric_cutoff() {
        assert_eq!(parse("size_cutoff = 2048").unwrap().size_cutoff.bytes(), 2048);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(matches!(parse("sise_cutoff = \"1M\""), Err(EngineError::ConfigParse { .. })));
        assert!(matches!(parse("size_cutoff = \"1T\""), Err(EngineError::ConfigParse { .. })));
        assert!(matches!(parse("pack_prefix = \"a/b\""), Err(EngineError::InvalidConfig(_))));
        assert!(matches!(parse("placeholder = \"\""), Err(EngineError::InvalidConfig(_))));
        assert!(matches!(parse("git = \" \""), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn discover_prefers_explicit_then_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let (c, origin) = SequesterConfig::discover(None, dir.path()).unwrap();
        assert_eq!(c, SequesterConfig::default());
        assert!(origin.is_none());

        std::fs::write(dir.path().join(CONFIG_FILE), "compact = false\n").unwrap();
        let (c, origin) = SequesterConfig::discover(None, dir.path()).unwrap();
        assert!(!c.compact);
        assert_eq!(origin.unwrap(), dir.path().join(CONFIG_FILE));

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "replace_objects = true\n").unwrap();
        let (c, _) = SequesterConfig::discover(Some(&explicit), dir.path()).unwrap();
        assert!(c.replace_objects);
        assert!(c.compact);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SequesterConfig::discover(Some(&dir.path().join("absent.toml")), dir.path())
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigRead { .. }));
    }
}
