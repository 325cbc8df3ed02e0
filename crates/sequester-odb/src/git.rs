//! [`ObjectDatabase`] backed by the `git` command-line tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use sequester_refs::{RefName, RefTransaction};
use sequester_types::{ObjectDescriptor, ObjectId, ObjectKind};
use tracing::debug;

use crate::command::GitCommand;
use crate::error::{OdbError, OdbResult};
use crate::parse::{
    parse_catalog_line, parse_pack_name, parse_raw_diff_line, parse_tree_line, ParseResult,
};
use crate::repository::Repository;
use crate::stream::LineStream;
use crate::traits::{DescriptorStream, IdStream, ObjectDatabase};

/// Git CLI backend.
#[derive(Clone, Debug)]
pub struct GitCli {
    program: OsString,
    repo: Repository,
}

impl GitCli {
    /// Open the repository containing `start` using `git` from `PATH`.
    pub fn open(start: &Path) -> OdbResult<Self> {
        Self::with_program("git", start)
    }

    /// Open the repository containing `start` using a specific git binary.
    pub fn with_program(program: impl Into<OsString>, start: &Path) -> OdbResult<Self> {
        let program = program.into();
        let repo = Repository::discover(&program, start)?;
        Ok(Self { program, repo })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    fn git(&self) -> GitCommand {
        GitCommand::new(self.program.clone(), self.repo.command_dir())
    }

    fn lines(stdout: &[u8]) -> impl Iterator<Item = &str> {
        // Ref names and object ids are ASCII; lossy decoding is only
        // reached by names the validator rejects anyway.
        stdout
            .split(|b| *b == b'\n')
            .filter(|l| !l.is_empty())
            .map(|l| std::str::from_utf8(l).unwrap_or("\u{fffd}"))
    }

    /// Describe the object `reference` ultimately points at, following tags.
    fn peel(&self, reference: &RefName) -> OdbResult<ObjectDescriptor> {
        let cmd = self.git().args(["cat-file", "--batch-check"]);
        let out = cmd.output_with_input(|stdin| writeln!(stdin, "{reference}^{{}}"))?;
        let line = out.trim_ascii();
        parse_catalog_line(line).map_err(|reason| OdbError::Malformed {
            command: cmd.display(),
            line: String::from_utf8_lossy(line).into_owned(),
            reason,
        })
    }

    fn ref_names(command: &GitCommand, stdout: &[u8]) -> OdbResult<Vec<RefName>> {
        Self::lines(stdout)
            .filter(|line| !line.starts_with('^'))
            .map(|line| {
                RefName::new(line).map_err(|e| OdbError::Malformed {
                    command: command.display(),
                    line: line.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

/// Map each stdout line of `stream` through `parse`, tagging failures with
/// the command and line.
fn parsed<T, F>(stream: LineStream, parse: F) -> impl Iterator<Item = OdbResult<T>>
where
    F: Fn(&[u8]) -> ParseResult<T>,
{
    let command = stream.command().to_string();
    stream.map(move |line| {
        let line = line?;
        parse(line.as_slice()).map_err(|reason| OdbError::Malformed {
            command: command.clone(),
            line: String::from_utf8_lossy(&line).into_owned(),
            reason,
        })
    })
}

impl ObjectDatabase for GitCli {
    fn catalog(&self) -> OdbResult<DescriptorStream<'_>> {
        let stream = self
            .git()
            .args(["cat-file", "--batch-check", "--batch-all-objects"])
            .stream()?;
        Ok(Box::new(parsed::<ObjectDescriptor, _>(stream, parse_catalog_line)))
    }

    fn resolve_refs(&self, specs: &[String]) -> OdbResult<Vec<RefName>> {
        let cmd = self
            .git()
            .args(["rev-parse", "--symbolic-full-name"])
            .args(specs);
        let out = cmd.output()?;
        Self::ref_names(&cmd, &out)
    }

    fn tree_objects(&self, reference: &RefName) -> OdbResult<IdStream<'_>> {
        // Tags and replace refs may point straight at a blob, which
        // `ls-tree` rejects; the blob is then the whole snapshot.
        let tip = self.peel(reference)?;
        if tip.kind == ObjectKind::Blob {
            return Ok(Box::new(std::iter::once(Ok(tip.id))));
        }
        let stream = self
            .git()
            .args(["ls-tree", "-r", reference.as_str()])
            .stream()?;
        Ok(Box::new(parsed(stream, parse_tree_line)))
    }

    fn recent_changes(&self, since: &str, specs: &[String]) -> OdbResult<IdStream<'_>> {
        let rev_list = self
            .git()
            .arg("rev-list")
            .arg(format!("--since={since}"))
            .args(specs);
        let diff_tree = self.git().args([
            "diff-tree",
            "--stdin",
            "--always",
            "--root",
            "--format=",
            "-c",
            "-r",
            "--raw",
        ]);
        let stream = LineStream::pipeline(&rev_list, &diff_tree)?;
        let ids = parsed(stream, parse_raw_diff_line).flat_map(|record| match record {
            Ok(ids) => ids.into_iter().map(Ok).collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        });
        Ok(Box::new(ids))
    }

    fn list_refs(&self) -> OdbResult<Vec<RefName>> {
        let cmd = self.git().args(["for-each-ref", "--format=%(refname)"]);
        let out = cmd.output()?;
        Self::ref_names(&cmd, &out)
    }

    fn update_refs(&self, transaction: &RefTransaction) -> OdbResult<()> {
        if transaction.is_empty() {
            return Ok(());
        }
        let script = transaction.to_script();
        debug!(updates = transaction.len(), "applying ref transaction");
        self.git()
            .args(["update-ref", "--stdin"])
            .output_with_input(|stdin| stdin.write_all(script.as_bytes()))?;
        Ok(())
    }

    fn write_blob(&self, data: &[u8]) -> OdbResult<ObjectId> {
        let cmd = self.git().args(["hash-object", "-w", "--stdin"]);
        let out = cmd.output_with_input(|stdin| stdin.write_all(data))?;
        ObjectId::from_hex_bytes(out.trim_ascii()).map_err(|e| OdbError::Malformed {
            command: cmd.display(),
            line: String::from_utf8_lossy(&out).into_owned(),
            reason: e.to_string(),
        })
    }

    fn pack_objects(&self, base: &Path, ids: &mut dyn Iterator<Item = ObjectId>) -> OdbResult<String> {
        let cmd = self.git().arg("pack-objects").arg(base);
        let out = cmd.output_with_input(|stdin| {
            for id in ids {
                writeln!(stdin, "{id}")?;
            }
            Ok(())
        })?;
        parse_pack_name(&out).map_err(|reason| OdbError::Malformed {
            command: cmd.display(),
            line: String::from_utf8_lossy(&out).into_owned(),
            reason,
        })
    }

    fn pack_dir(&self) -> PathBuf {
        self.repo.pack_dir()
    }

    fn staging_root(&self) -> PathBuf {
        self.repo.git_dir.clone()
    }

    fn compact(&self) -> OdbResult<()> {
        self.git()
            .args(["gc", "--aggressive", "--prune=now"])
            .run_inherited()
    }
}
