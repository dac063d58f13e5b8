//! SIGCHLD-driven background reaping.
//!
//! The signal handler itself must be async-signal-safe: no allocation, no
//! locking, nothing that could deadlock if it interrupts the very code it
//! would need to call. So the handler does the absolute minimum — it
//! drains `waitpid(-1, WNOHANG)` and pushes each `(pid, status)` pair into
//! a fixed-capacity ring buffer of atomics — and all of the real work
//! (updating the `JobTable`, printing `[N]  Done  cmd`) happens later, on
//! the main thread, when `drain` is called between prompts.

use std::sync::atomic::{AtomicUsize, AtomicI32, Ordering};

use crate::jobs::JobTable;

const RING_CAPACITY: usize = 64;

struct RingSlot {
    pid: AtomicI32,
    status: AtomicI32,
}

// `AtomicI32` has no const-friendly way to build an array of N distinct
// statics, so the ring is laid out as two flat arrays indexed in lockstep.
static RING_PID: [AtomicI32; RING_CAPACITY] = {
    const ZERO: AtomicI32 = AtomicI32::new(0);
    [ZERO; RING_CAPACITY]
};
static RING_STATUS: [AtomicI32; RING_CAPACITY] = {
    const ZERO: AtomicI32 = AtomicI32::new(0);
    [ZERO; RING_CAPACITY]
};

// Monotonically increasing write cursor. The handler claims slot
// `write.fetch_add(1) % RING_CAPACITY`; the drainer reads up through the
// last cursor value it observed. Entries are overwritten if the drainer
// falls more than `RING_CAPACITY` exits behind, which is an accepted loss
// under the reaper's best-effort contract — see `drain`.
static WRITE_CURSOR: AtomicUsize = AtomicUsize::new(0);
static READ_CURSOR: AtomicUsize = AtomicUsize::new(0);

#[cfg(unix)]
extern "C" fn handle_sigchld(_signum: libc::c_int) {
    loop {
        let mut raw_status: libc::c_int = 0;
        let pid = unsafe { libc::waitpid(-1, &mut raw_status, libc::WNOHANG) };
        if pid <= 0 {
            break;
        }
        let slot = WRITE_CURSOR.fetch_add(1, Ordering::Relaxed) % RING_CAPACITY;
        RING_STATUS[slot].store(raw_status, Ordering::Relaxed);
        RING_PID[slot].store(pid, Ordering::Release);
    }
}

/// Install the `SIGCHLD` handler. Must be called once at shell startup,
/// before any child is ever spawned.
#[cfg(unix)]
pub fn install() -> std::io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handle_sigchld as usize;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(libc::SIGCHLD, &action, std::ptr::null_mut()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Apply every exit recorded since the last drain to `table`, marking the
/// matching `Job` `Done` without removing it. Call this between prompts
/// and before `jobs`/`fg` act, never from within the signal handler.
///
/// Jobs stay in the table after being marked `Done` so the next `jobs`
/// call can actually report them that way; removal is the `jobs` builtin's
/// job, once it has displayed them (see `builtins::builtin_jobs`), not
/// this drain pass's.
pub fn drain(table: &mut JobTable) {
    loop {
        let read = READ_CURSOR.load(Ordering::Relaxed);
        let write = WRITE_CURSOR.load(Ordering::Acquire);
        if read == write {
            break;
        }
        let slot = read % RING_CAPACITY;
        let pid = RING_PID[slot].load(Ordering::Acquire);
        let raw_status = RING_STATUS[slot].load(Ordering::Relaxed);
        READ_CURSOR.store(read + 1, Ordering::Relaxed);

        if pid <= 0 {
            continue;
        }
        if let Some(code) = crate::status::exit_code_from_wait_status(raw_status) {
            table.mark_done(pid as u32, code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_on_empty_ring_is_noop() {
        let mut table = JobTable::new();
        drain(&mut table);
        assert!(table.jobs_sorted().is_empty());
    }
}
