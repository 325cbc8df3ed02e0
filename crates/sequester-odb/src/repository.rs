use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::GitCommand;
use crate::error::{OdbError, OdbResult};

/// Resolved repository location.
///
/// Resolved once at startup and passed to every command as an explicit
/// working directory; the process's own working directory is never changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repository {
    /// Top of the work tree, absent for bare repositories.
    pub work_tree: Option<PathBuf>,
    /// Absolute path of the git directory.
    pub git_dir: PathBuf,
}

impl Repository {
    /// Locate the repository containing `start`.
    pub fn discover(program: &OsString, start: &Path) -> OdbResult<Self> {
        let git = |args: &[&str]| -> OdbResult<String> {
            let out = GitCommand::new(program.clone(), start)
                .args(args)
                .output()
                .map_err(|e| match e {
                    OdbError::Exit { .. } => OdbError::NotARepository(start.to_path_buf()),
                    other => other,
                })?;
            Ok(String::from_utf8_lossy(&out).trim().to_string())
        };

        let git_dir = PathBuf::from(git(&["rev-parse", "--absolute-git-dir"])?);
        let work_tree = match git(&["rev-parse", "--is-bare-repository"])?.as_str() {
            "true" => None,
            _ => Some(git(&["rev-parse", "--show-toplevel"])?)
                .filter(|top| !top.is_empty())
                .map(PathBuf::from),
        };

        let repo = Self { work_tree, git_dir };
        debug!(git_dir = %repo.git_dir.display(), bare = repo.work_tree.is_none(), "repository resolved");
        Ok(repo)
    }

    /// Directory commands run in.
    pub fn command_dir(&self) -> &Path {
        self.work_tree.as_deref().unwrap_or(&self.git_dir)
    }

    pub fn pack_dir(&self) -> PathBuf {
        self.git_dir.join("objects").join("pack")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_dir_prefers_work_tree() {
        let repo = Repository {
            work_tree: Some(PathBuf::from("/src/project")),
            git_dir: PathBuf::from("/src/project/.git"),
        };
        assert_eq!(repo.command_dir(), Path::new("/src/project"));
        assert_eq!(repo.pack_dir(), PathBuf::from("/src/project/.git/objects/pack"));
    }

    #[test]
    fn bare_repository_runs_in_git_dir() {
        let repo = Repository {
            work_tree: None,
            git_dir: PathBuf::from("/srv/project.git"),
        };
        assert_eq!(repo.command_dir(), Path::new("/srv/project.git"));
    }
}
