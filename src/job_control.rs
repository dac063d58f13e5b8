#[cfg(unix)]
use std::io;

/// Set `pid`'s process group to `pgid`, creating a new group if they're
/// equal. Called redundantly from both the parent and the child right
/// after `fork` so the group is established before either side can race
/// ahead into `exec` or `waitpid`.
#[cfg(unix)]
pub(crate) fn set_process_group(pid: libc::pid_t, pgid: libc::pid_t) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::setpgid(pid, pgid) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == libc::EINTR => continue,
            // Already exec'd or gone; caller can proceed with best-effort behavior.
            Some(code) if code == libc::EACCES || code == libc::ESRCH => return Ok(()),
            _ => return Err(err),
        }
    }
}

#[cfg(unix)]
pub(crate) fn process_group_id(pid: libc::pid_t) -> io::Result<libc::pid_t> {
    loop {
        let rc = unsafe { libc::getpgid(pid) };
        if rc >= 0 {
            return Ok(rc);
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

/// Hands the controlling terminal to `target_pgid` for the guard's
/// lifetime, restoring the shell's own process group on drop. `SIGTTOU`
/// is ignored around each `tcsetpgrp` call so the shell itself, sitting
/// in background relative to the group it's handing off to, doesn't stop.
#[cfg(unix)]
pub(crate) struct ForegroundTerminalGuard {
    tty_fd: Option<libc::c_int>,
    shell_pgid: libc::pid_t,
}

#[cfg(unix)]
impl ForegroundTerminalGuard {
    pub(crate) fn new(target_pgid: libc::pid_t) -> io::Result<Self> {
        let tty_fd = if unsafe { libc::isatty(libc::STDIN_FILENO) } == 1 {
            Some(libc::STDIN_FILENO)
        } else {
            None
        };

        let shell_pgid = unsafe { libc::getpgrp() };
        let guard = Self { tty_fd, shell_pgid };

        if let Some(fd) = guard.tty_fd {
            set_terminal_foreground(fd, target_pgid)?;
        }

        Ok(guard)
    }
}

#[cfg(unix)]
impl Drop for ForegroundTerminalGuard {
    fn drop(&mut self) {
        if let Some(fd) = self.tty_fd {
            let _ = set_terminal_foreground(fd, self.shell_pgid);
        }
    }
}

/// Blocks `SIGCHLD` for its lifetime, unblocking it again on drop.
///
/// Held around a synchronous foreground wait so the async reaper can't
/// steal the exit status out from under `waitpid` in the main thread —
/// the two would otherwise race to reap the same child.
#[cfg(unix)]
pub(crate) struct SigchldBlockGuard {
    previous: libc::sigset_t,
}

#[cfg(unix)]
impl SigchldBlockGuard {
    pub(crate) fn block() -> io::Result<Self> {
        unsafe {
            let mut to_block: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut to_block);
            libc::sigaddset(&mut to_block, libc::SIGCHLD);

            let mut previous: libc::sigset_t = std::mem::zeroed();
            if libc::pthread_sigmask(libc::SIG_BLOCK, &to_block, &mut previous) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Self { previous })
        }
    }
}

#[cfg(unix)]
impl Drop for SigchldBlockGuard {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &self.previous, std::ptr::null_mut());
        }
    }
}

/// Block on every process in `pgid` until none remain, returning the exit
/// code of whichever pid equals `status_pid` (the caller's choice of
/// which pipeline stage's status represents the pipeline as a whole —
/// conventionally the last command).
///
/// Waiting on the whole process group rather than a single pid is what
/// lets the job model track only the leader's pid: a pipeline's middle
/// and left-hand stages are reaped here too, just without their exit
/// codes being individually surfaced.
#[cfg(unix)]
pub(crate) fn wait_for_group(pgid: libc::pid_t, status_pid: libc::pid_t) -> io::Result<i32> {
    let mut status: Option<i32> = None;

    loop {
        let mut raw_status: libc::c_int = 0;
        let rc = unsafe { libc::waitpid(-pgid, &mut raw_status, 0) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(code) if code == libc::EINTR => continue,
                Some(code) if code == libc::ECHILD => break,
                _ => return Err(err),
            }
        }

        if rc == status_pid {
            status = crate::status::exit_code_from_wait_status(raw_status);
        }
    }

    Ok(status.unwrap_or(0))
}

#[cfg(unix)]
fn set_terminal_foreground(fd: libc::c_int, pgid: libc::pid_t) -> io::Result<()> {
    if pgid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid process group id",
        ));
    }

    let _sigttou = SignalIgnoreGuard::ignore(libc::SIGTTOU)?;
    loop {
        let rc = unsafe { libc::tcsetpgrp(fd, pgid) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

#[cfg(unix)]
struct SignalIgnoreGuard {
    signal: libc::c_int,
    previous: libc::sighandler_t,
}

#[cfg(unix)]
impl SignalIgnoreGuard {
    fn ignore(signal: libc::c_int) -> io::Result<Self> {
        let previous = unsafe { libc::signal(signal, libc::SIG_IGN) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { signal, previous })
    }
}

#[cfg(unix)]
impl Drop for SignalIgnoreGuard {
    fn drop(&mut self) {
        unsafe {
            libc::signal(self.signal, self.previous);
        }
    }
}
