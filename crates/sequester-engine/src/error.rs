use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Run stages, in the order they execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    ResolveRefs,
    Catalog,
    FullUsage,
    RecentUsage,
    PruneRefs,
    Redirects,
    Pack,
    Compact,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ResolveRefs => "resolve-refs",
            Stage::Catalog => "catalog",
            Stage::FullUsage => "full-usage",
            Stage::RecentUsage => "recent-usage",
            Stage::PruneRefs => "prune-refs",
            Stage::Redirects => "redirects",
            Stage::Pack => "pack",
            Stage::Compact => "compact",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A run stage failed. Side effects of earlier stages remain.
    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: BoxError,
    },

    /// Pruning with an empty kept list would delete every reference.
    #[error("refusing to prune references: no references resolved from {specs:?}")]
    NothingKept { specs: Vec<String> },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl EngineError {
    /// The stage that failed, if the error came from one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            EngineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Tag a lower-level failure with the stage it happened in.
pub trait InStage<T> {
    fn in_stage(self, stage: Stage) -> EngineResult<T>;
}

impl<T, E> InStage<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn in_stage(self, stage: Stage) -> EngineResult<T> {
        self.map_err(|e| EngineError::Stage {
            stage,
            source: Box::new(e),
        })
    }
}
