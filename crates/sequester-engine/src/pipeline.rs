//! The ordered sequestration run.
//!
//! ```text
//! resolve refs -> scan catalog -> subtract full usage -> subtract recent usage
//!              -> prune stray refs -> redirects -> archival pack -> compact
//! ```
//!
//! Everything up to reconciliation is read-only. The mutating steps run in a
//! fixed order and each must finish before the next starts; any failure
//! stops the run where it is, with earlier side effects left in place.

use sequester_odb::ObjectDatabase;
use sequester_pack::{ArchivalPack, Installation, RedirectReport, RelocationMode, Relocator};
use sequester_refs::RefName;
use sequester_types::SizeCutoff;
use serde::Serialize;
use tracing::info;

use crate::compact::compact;
use crate::config::SequesterConfig;
use crate::error::{EngineError, EngineResult, InStage, Stage};
use crate::prune::prune_stray_refs;
use crate::reconcile::{CandidateSet, Subtraction};
use crate::scanner::scan_catalog;
use crate::usage::{full_history_usage, recent_history_usage};

/// Reference specification meaning "every reference".
pub const ALL_REFS: &str = "--all";

/// Options for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Recency bound in any form the host tool's date parser accepts.
    pub since: String,
    /// Reference specifications to keep; passed to the host tool verbatim.
    pub refs: Vec<String>,
    pub size_cutoff: SizeCutoff,
    pub replace_objects: bool,
    pub placeholder: Vec<u8>,
    pub pack_prefix: String,
    /// Classify only; skip every mutating step.
    pub dry_run: bool,
    pub compact: bool,
}

impl RunOptions {
    pub fn new(since: impl Into<String>) -> Self {
        Self::from_config(since, &SequesterConfig::default())
    }

    pub fn from_config(since: impl Into<String>, config: &SequesterConfig) -> Self {
        Self {
            since: since.into(),
            refs: vec![ALL_REFS.to_string()],
            size_cutoff: config.size_cutoff,
            replace_objects: config.replace_objects,
            placeholder: config.placeholder.clone().into_bytes(),
            pack_prefix: config.pack_prefix.clone(),
            dry_run: false,
            compact: config.compact,
        }
    }

    /// Keep `refs`; an empty list means [`ALL_REFS`].
    pub fn with_refs(mut self, refs: Vec<String>) -> Self {
        self.refs = if refs.is_empty() {
            vec![ALL_REFS.to_string()]
        } else {
            refs
        };
        self
    }

    pub fn with_size_cutoff(mut self, cutoff: SizeCutoff) -> Self {
        self.size_cutoff = cutoff;
        self
    }

    pub fn with_replace_objects(mut self, replace: bool) -> Self {
        self.replace_objects = replace;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }
}

/// What a run found and did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub since: String,
    pub size_cutoff: SizeCutoff,
    pub replace_objects: bool,
    pub dry_run: bool,
    /// Fully-qualified references kept.
    pub refs_kept: Vec<RefName>,
    /// Catalog records read.
    pub objects_scanned: u64,
    /// Blobs over the cutoff before any subtraction.
    pub large_blobs: usize,
    /// `None` in replacement mode, where full usage is not subtracted.
    pub full_usage: Option<Subtraction>,
    pub recent_usage: Subtraction,
    /// The final set of old big blobs.
    pub sequestered: CandidateSet,
    pub refs_pruned: Vec<RefName>,
    pub redirects: Option<RedirectReport>,
    pub pack: Option<Installation>,
    pub compacted: bool,
}

/// One configured sequestration run against a database.
pub struct Sequester<'a> {
    db: &'a dyn ObjectDatabase,
    options: RunOptions,
    relocator: Relocator,
}

impl<'a> Sequester<'a> {
    pub fn new(db: &'a dyn ObjectDatabase, options: RunOptions) -> EngineResult<Self> {
        if options.since.trim().is_empty() {
            return Err(EngineError::InvalidConfig("recency bound must not be empty".into()));
        }
        let archive = ArchivalPack::new(options.pack_prefix.as_str())
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        let mode = if options.replace_objects {
            if options.placeholder.is_empty() {
                return Err(EngineError::InvalidConfig("placeholder must not be empty".into()));
            }
            RelocationMode::Replace {
                placeholder: options.placeholder.clone(),
            }
        } else {
            RelocationMode::Direct
        };
        Ok(Self {
            db,
            options,
            relocator: Relocator::new(mode, archive),
        })
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn run(&self) -> EngineResult<RunReport> {
        let db = self.db;
        let opts = &self.options;
        let specs = opts.refs.as_slice();

        let kept = db.resolve_refs(specs).in_stage(Stage::ResolveRefs)?;
        info!(kept = kept.len(), ?specs, "references resolved");
        if kept.is_empty() && !opts.dry_run {
            return Err(EngineError::NothingKept {
                specs: specs.to_vec(),
            });
        }

        let scan = scan_catalog(db, opts.size_cutoff)?;
        let large_blobs = scan.candidates.len();
        let mut candidates = scan.candidates;

        let full_usage = if opts.replace_objects {
            info!("replacement mode: blobs at reference tips stay candidates");
            None
        } else {
            let pass = candidates
                .subtract(full_history_usage(db, &kept))
                .in_stage(Stage::FullUsage)?;
            info!(seen = pass.seen, removed = pass.removed, left = candidates.len(), "full-history usage subtracted");
            Some(pass)
        };

        let recent = recent_history_usage(db, &opts.since, specs).in_stage(Stage::RecentUsage)?;
        let recent_usage = candidates.subtract(recent).in_stage(Stage::RecentUsage)?;
        info!(
            seen = recent_usage.seen,
            removed = recent_usage.removed,
            since = %opts.since,
            "recent-history usage subtracted"
        );
        info!(old_big_blobs = candidates.len(), large_blobs, "classification complete");

        let mut report = RunReport {
            since: opts.since.clone(),
            size_cutoff: opts.size_cutoff,
            replace_objects: opts.replace_objects,
            dry_run: opts.dry_run,
            refs_kept: kept,
            objects_scanned: scan.objects,
            large_blobs,
            full_usage,
            recent_usage,
            sequestered: candidates,
            refs_pruned: Vec::new(),
            redirects: None,
            pack: None,
            compacted: false,
        };
        if opts.dry_run {
            info!("dry run; repository left unchanged");
            return Ok(report);
        }

        report.refs_pruned = prune_stray_refs(db, specs, &report.refs_kept)?;

        let ids = report.sequestered.as_set();
        report.redirects = self.relocator.redirect(db, ids).in_stage(Stage::Redirects)?;
        report.pack = self.relocator.archive(db, ids).in_stage(Stage::Pack)?;

        if opts.compact {
            compact(db)?;
            report.compacted = true;
        } else {
            info!("compaction disabled; run `git gc --aggressive --prune=now` to reclaim space");
        }
        Ok(report)
    }
}
