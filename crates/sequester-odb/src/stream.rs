//! Lazy, line-oriented streams over a child process's stdout.
//!
//! A [`LineStream`] reads one line per `next()` call straight from the pipe,
//! so memory stays bounded by the pipe buffer and the producer blocks while
//! the consumer is busy. When stdout reaches EOF the stream waits for every
//! process in the pipeline and yields a final error if any of them failed.
//! Dropping an unfinished stream kills and reaps its processes.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Stdio};
use std::thread::JoinHandle;

use tracing::debug;

use crate::command::{check_status, drain, join, GitCommand};
use crate::error::{OdbError, OdbResult};

struct Stage {
    command: String,
    child: Child,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl Stage {
    fn new(command: String, mut child: Child) -> Self {
        let stderr = child.stderr.take().map(drain);
        Self {
            command,
            child,
            stderr,
        }
    }

    fn finish(&mut self) -> OdbResult<()> {
        let status = self.child.wait().map_err(|source| OdbError::Pipe {
            command: self.command.clone(),
            source,
        })?;
        let stderr = join(self.stderr.take());
        check_status(&self.command, status, &stderr)
    }

    fn abort(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Streaming reader over the stdout of one process, or of the last process
/// in a two-stage pipeline.
pub struct LineStream {
    command: String,
    reader: BufReader<ChildStdout>,
    /// Pipeline stages, upstream first.
    stages: Vec<Stage>,
    lines: u64,
    done: bool,
}

impl LineStream {
    pub(crate) fn new(command: String, mut child: Child) -> OdbResult<Self> {
        let stdout = take_stdout(&command, &mut child)?;
        Ok(Self {
            reader: BufReader::new(stdout),
            stages: vec![Stage::new(command.clone(), child)],
            command,
            lines: 0,
            done: false,
        })
    }

    /// Connect `upstream`'s stdout directly to `downstream`'s stdin and
    /// stream `downstream`'s output. No shell is involved.
    pub fn pipeline(upstream: &GitCommand, downstream: &GitCommand) -> OdbResult<Self> {
        let mut first = upstream.spawn(Stdio::null(), Stdio::piped())?;
        let first_out = match take_stdout(&upstream.display(), &mut first) {
            Ok(out) => out,
            Err(e) => {
                Stage::new(upstream.display(), first).abort();
                return Err(e);
            }
        };
        let mut first = Stage::new(upstream.display(), first);

        let mut second = match downstream.spawn(Stdio::from(first_out), Stdio::piped()) {
            Ok(child) => child,
            Err(e) => {
                first.abort();
                return Err(e);
            }
        };
        let command = format!("{} | {}", upstream.display(), downstream.display());
        let stdout = match take_stdout(&command, &mut second) {
            Ok(out) => out,
            Err(e) => {
                first.abort();
                Stage::new(downstream.display(), second).abort();
                return Err(e);
            }
        };

        Ok(Self {
            reader: BufReader::new(stdout),
            stages: vec![first, Stage::new(downstream.display(), second)],
            command,
            lines: 0,
            done: false,
        })
    }

    /// The command line this stream reads from.
    pub fn command(&self) -> &str {
        &self.command
    }

    fn finish(&mut self) -> OdbResult<()> {
        self.done = true;
        // Downstream first: it holds the read end upstream is writing to.
        let mut result = Ok(());
        for stage in self.stages.iter_mut().rev() {
            let outcome = stage.finish();
            if result.is_ok() {
                result = outcome;
            }
        }
        debug!(command = %self.command, lines = self.lines, "stream finished");
        result
    }
}

fn take_stdout(command: &str, child: &mut Child) -> OdbResult<ChildStdout> {
    child.stdout.take().ok_or_else(|| OdbError::Pipe {
        command: command.to_string(),
        source: std::io::Error::other("stdout was not captured"),
    })
}

impl Iterator for LineStream {
    type Item = OdbResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => self.finish().err().map(Err),
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                self.lines += 1;
                Some(Ok(line))
            }
            Err(source) => {
                self.done = true;
                for stage in &mut self.stages {
                    stage.abort();
                }
                Some(Err(OdbError::Pipe {
                    command: self.command.clone(),
                    source,
                }))
            }
        }
    }
}

impl Drop for LineStream {
    fn drop(&mut self) {
        if !self.done {
            for stage in &mut self.stages {
                stage.abort();
            }
        }
    }
}
