// ABOUTME: Deadline-bounded graceful shutdown for companion processes
// ABOUTME: Sends SIGTERM, waits for exit, and force-kills once the deadline passes

use std::io;
use std::process::{Child, ExitStatus};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a [`terminate_with_deadline`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Exited on its own after the polite request.
    Graceful(ExitStatus),
    /// Still alive at the deadline and had to be killed.
    Killed,
}

/// Ask `child` to terminate and wait up to `timeout` for it to exit. The
/// deadline is abandoned the moment the child exits.
pub fn terminate_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<Shutdown> {
    if let Some(status) = child.try_wait()? {
        return Ok(Shutdown::Graceful(status));
    }

    request_termination(child)?;

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Shutdown::Graceful(status));
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }

    log::warn!(
        "Process {} ignored termination for {:?}, killing it",
        child.id(),
        timeout
    );
    child.kill()?;
    child.wait()?;
    Ok(Shutdown::Killed)
}

#[cfg(unix)]
fn request_termination(child: &mut Child) -> io::Result<()> {
    let pid = libc::pid_t::try_from(child.id())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: kill(2) on a pid we spawned and have not yet reaped
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> io::Result<()> {
    child.kill()
}
