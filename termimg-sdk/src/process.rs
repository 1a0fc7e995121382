// ABOUTME: Long-lived companion subprocess owned by a single backend
// ABOUTME: Spawned lazily, respawned when found dead, with PATH lookup for helper tools

use crate::error::{ImageError, Result};
use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// First executable named `name` on `PATH`.
pub fn find_program(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Subprocess handle plus the `initialized` flag. Stdin is always piped;
/// stdout only when the protocol has replies.
pub struct CompanionProcess {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    read_replies: bool,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    initialized: bool,
}

impl CompanionProcess {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            read_replies: false,
            child: None,
            stdin: None,
            stdout: None,
            initialized: false,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cwd = dir;
        self
    }

    /// Pipe the child's stdout so replies can be read line by line.
    pub fn with_replies(mut self) -> Self {
        self.read_replies = true;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Liveness check: started, not exited, input stream still open.
    pub fn is_running(&mut self) -> bool {
        if !self.initialized || self.stdin.is_none() {
            return false;
        }
        matches!(self.child.as_mut().map(Child::try_wait), Some(Ok(None)))
    }

    /// Spawn the process unless a live one already exists.
    pub fn ensure_running(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        if self.initialized {
            log::debug!("{} exited, restarting", self.program.display());
            self.reap();
        }
        self.spawn()
    }

    fn spawn(&mut self) -> Result<()> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stderr(Stdio::null())
            .stdout(if self.read_replies {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = self.cwd.as_ref().filter(|dir| dir.is_dir()) {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ImageError::unsupported(format!(
                    "{} is not installed",
                    self.program.display()
                ))
            } else {
                ImageError::display(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            }
        })?;

        log::debug!("Started {} (pid {})", self.program.display(), child.id());
        self.stdin = child.stdin.take();
        self.stdout = child.stdout.take().map(BufReader::new);
        self.child = Some(child);
        self.initialized = true;
        Ok(())
    }

    /// Write `line` and flush.
    pub fn send(&mut self, line: &[u8]) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "process not running"))?;
        stdin.write_all(line)?;
        stdin.flush()
    }

    /// Block until one reply line arrives; the trailing newline is removed.
    pub fn read_line(&mut self) -> io::Result<String> {
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "no reply stream"))?;
        let mut line = String::new();
        if stdout.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "companion closed its output",
            ));
        }
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Take the child out for a custom shutdown sequence; the handle is left
    /// uninitialized.
    pub fn take_child(&mut self) -> Option<Child> {
        self.stdin = None;
        self.stdout = None;
        self.initialized = false;
        self.child.take()
    }

    /// Kill the process if it is still running and reap it.
    pub fn kill(&mut self) {
        if let Some(mut child) = self.take_child() {
            if let Ok(None) = child.try_wait() {
                if let Err(e) = child.kill() {
                    log::warn!("Failed to kill {}: {}", self.program.display(), e);
                }
            }
            let _ = child.wait();
        }
    }

    fn reap(&mut self) {
        if let Some(mut child) = self.take_child() {
            let _ = child.try_wait();
        }
    }
}

impl Drop for CompanionProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

impl std::fmt::Debug for CompanionProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompanionProcess")
            .field("program", &self.program)
            .field("initialized", &self.initialized)
            .finish()
    }
}
