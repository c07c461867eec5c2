//! Git subprocess execution with a timeout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ForgeError, Result};

/// Default timeout for git operations.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs git commands inside a repository.
#[derive(Debug, Clone)]
pub struct GitRunner {
    repo: PathBuf,
    timeout: Duration,
    program: String,
}

impl GitRunner {
    /// Create a runner for `repo`.
    pub fn new(repo: &Path, timeout: Duration) -> Self {
        Self {
            repo: repo.to_path_buf(),
            timeout,
            program: "git".to_string(),
        }
    }

    /// Use a different executable. Tests use this to simulate a hung git.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Get the repository path.
    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Run a command and return its stdout.
    ///
    /// # Errors
    ///
    /// Returns `GitOperation` with the exit code and stderr when the command
    /// fails, or with no exit code when it is killed after the timeout.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let command = args.join(" ");
        tracing::debug!("Running git {} in {}", command, self.repo.display());

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(&self.repo)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_EDITOR", "true")
            .env("GIT_MERGE_AUTOEDIT", "no")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ForgeError::GitOperation {
                command: command.clone(),
                code: None,
                stderr: format!("failed to start {}: {}", self.program, e),
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || read_pipe(stdout));
        let stderr_reader = thread::spawn(move || read_pipe(stderr));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!("git {} timed out after {}s", command, self.timeout.as_secs());
                return Err(ForgeError::GitOperation {
                    command,
                    code: None,
                    stderr: format!("timed out after {}s", self.timeout.as_secs()),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(ForgeError::GitOperation {
                command,
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }

    /// Whether the directory is inside a git work tree.
    pub fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }

    /// Current `HEAD` commit.
    pub fn head(&self) -> Result<String> {
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// Files under `prefix` that differ between two commits.
    pub fn changed_files(&self, before: &str, after: &str, prefix: &str) -> Result<Vec<String>> {
        let out = self.run(&["diff", "--name-only", before, after, "--", prefix])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Stage `paths` and commit them.
    ///
    /// Returns the new commit, or `None` when nothing was staged.
    pub fn commit_paths(&self, paths: &[String], message: &str) -> Result<Option<String>> {
        if paths.is_empty() {
            return Ok(None);
        }

        let mut add: Vec<&str> = vec!["add", "--"];
        add.extend(paths.iter().map(String::as_str));
        self.run(&add)?;

        let staged = self.run(&["diff", "--cached", "--name-only"])?;
        if staged.trim().is_empty() {
            return Ok(None);
        }

        self.run(&["commit", "-m", message])?;
        self.head().map(Some)
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut out = String::new();
    if let Some(mut pipe) = pipe {
        let mut buf = Vec::new();
        if pipe.read_to_end(&mut buf).is_ok() {
            out = String::from_utf8_lossy(&buf).into_owned();
        }
    }
    out
}
