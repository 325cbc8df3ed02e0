//! Uniform execution of host tool commands.
//!
//! Every interaction with the host database goes through [`GitCommand`], so
//! failure semantics are the same everywhere: a command that cannot start,
//! exits non-zero, or breaks its pipes is a hard error carrying the command
//! line and whatever it wrote to stderr. Nothing is retried.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::{OdbError, OdbResult};
use crate::stream::LineStream;

/// A host tool invocation rooted at a fixed directory.
#[derive(Clone, Debug)]
pub struct GitCommand {
    program: OsString,
    dir: PathBuf,
    args: Vec<OsString>,
}

impl GitCommand {
    pub fn new(program: impl Into<OsString>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            dir: dir.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Human-readable command line used in diagnostics.
    pub fn display(&self) -> String {
        let mut line = Path::new(&self.program)
            .file_name()
            .unwrap_or(&self.program)
            .to_string_lossy()
            .into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.dir);
        cmd
    }

    pub(crate) fn spawn(&self, stdin: Stdio, stdout: Stdio) -> OdbResult<Child> {
        debug!(command = %self.display(), dir = %self.dir.display(), "spawning");
        self.command()
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| OdbError::Spawn {
                command: self.display(),
                source,
            })
    }

    /// Run to completion and return stdout.
    pub fn output(&self) -> OdbResult<Vec<u8>> {
        self.output_with_input(|_| Ok(()))
    }

    /// Run to completion, feeding stdin from `feed`, and return stdout.
    ///
    /// stdout and stderr are drained on helper threads while `feed` writes,
    /// so a chatty child can never deadlock against a full stdin pipe.
    pub fn output_with_input<F>(&self, feed: F) -> OdbResult<Vec<u8>>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let mut child = self.spawn(Stdio::piped(), Stdio::piped())?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let fed = match child.stdin.take() {
            Some(mut stdin) => feed(&mut stdin).and_then(|()| stdin.flush()),
            None => Ok(()),
        };

        let status = child.wait().map_err(|source| self.pipe_error(source))?;
        let stdout = join(stdout);
        let stderr = join(stderr);
        self.check(status, &stderr)?;

        // A child that exits zero after closing stdin early still lost input.
        fed.map_err(|source| self.pipe_error(source))?;
        Ok(stdout)
    }

    /// Run to completion with stdout inherited, for long maintenance
    /// commands whose progress the operator should see.
    pub fn run_inherited(&self) -> OdbResult<()> {
        let mut child = self.spawn(Stdio::null(), Stdio::inherit())?;
        let stderr = child.stderr.take().map(relay_stderr);
        let status = child.wait().map_err(|source| self.pipe_error(source))?;
        let stderr = join(stderr);
        self.check(status, &stderr)
    }

    /// Start the command and return a lazy stream over its stdout lines.
    pub fn stream(&self) -> OdbResult<LineStream> {
        let child = self.spawn(Stdio::null(), Stdio::piped())?;
        LineStream::new(self.display(), child)
    }

    pub(crate) fn check(&self, status: ExitStatus, stderr: &[u8]) -> OdbResult<()> {
        check_status(&self.display(), status, stderr)
    }

    fn pipe_error(&self, source: io::Error) -> OdbError {
        OdbError::Pipe {
            command: self.display(),
            source,
        }
    }
}

pub(crate) fn check_status(command: &str, status: ExitStatus, stderr: &[u8]) -> OdbResult<()> {
    if status.success() {
        return Ok(());
    }
    Err(OdbError::Exit {
        command: command.to_string(),
        status: status.to_string(),
        stderr: String::from_utf8_lossy(stderr).into_owned(),
    })
}

/// Read a pipe to the end on a helper thread.
pub(crate) fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

/// Copy stderr through to our own stderr while keeping a copy for errors.
fn relay_stderr(mut pipe: ChildStderr) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut kept = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let _ = io::stderr().write_all(&chunk[..n]);
                    kept.extend_from_slice(&chunk[..n]);
                }
            }
        }
        kept
    })
}

pub(crate) fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> GitCommand {
        GitCommand::new("sh", std::env::temp_dir()).args(["-c", script])
    }

    #[test]
    fn display_uses_program_basename() {
        let cmd = GitCommand::new("/usr/bin/git", "/tmp").args(["cat-file", "--batch-check"]);
        assert_eq!(cmd.display(), "git cat-file --batch-check");
    }

    #[test]
    fn output_returns_stdout() {
        let out = sh("printf 'hello\\n'").output().unwrap();
        assert_eq!(out, b"hello\n");
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let err = sh("echo boom >&2; exit 3").output().unwrap_err();
        match err {
            OdbError::Exit { stderr, .. } => assert_eq!(stderr.trim(), "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn input_is_fed_to_stdin() {
        let out = sh("tr a-z A-Z")
            .output_with_input(|w| w.write_all(b"abc\n"))
            .unwrap();
        assert_eq!(out, b"ABC\n");
    }

    #[test]
    fn large_input_does_not_deadlock() {
        let payload = vec![b'x'; 1 << 20];
        let out = sh("cat")
            .output_with_input(|w| w.write_all(&payload))
            .unwrap();
        assert_eq!(out.len(), payload.len());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = GitCommand::new("definitely-not-a-real-binary-xyz", std::env::temp_dir())
            .output()
            .unwrap_err();
        assert!(matches!(err, OdbError::Spawn { .. }));
    }
}
