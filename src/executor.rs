//! The central algorithm: turns a parsed [`Pipeline`] into N coordinated
//! child processes sharing pipes, a process group, and (for foreground
//! pipelines) the controlling terminal.

use crate::jobs::JobTable;
use crate::parser::Pipeline;

pub enum ExecutionAction {
    Continue(i32),
    Exit(i32),
}

#[cfg(unix)]
mod unix_impl {
    use std::ffi::CString;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::unix::io::{IntoRawFd, RawFd};

    use os_pipe::pipe;

    use crate::builtins::{self, BuiltinAction};
    use crate::job_control;
    use crate::jobs::JobTable;
    use crate::parser::Pipeline;

    use super::ExecutionAction;

    const RESET_SIGNALS: [libc::c_int; 6] = [
        libc::SIGINT,
        libc::SIGQUIT,
        libc::SIGTSTP,
        libc::SIGTTIN,
        libc::SIGTTOU,
        libc::SIGCHLD,
    ];

    pub fn execute_pipeline(
        pipeline: &Pipeline,
        job_table: &mut JobTable,
        command_text: &str,
    ) -> ExecutionAction {
        let n = pipeline.commands.len();
        debug_assert!(n > 0);

        let mut pipes_raw: Vec<(RawFd, RawFd)> = Vec::with_capacity(n.saturating_sub(1));
        for _ in 0..n.saturating_sub(1) {
            match pipe() {
                Ok((reader, writer)) => {
                    pipes_raw.push((reader.into_raw_fd(), writer.into_raw_fd()));
                }
                Err(e) => {
                    eprintln!("dockshell: failed to create pipe: {e}");
                    close_all(&pipes_raw);
                    return ExecutionAction::Continue(1);
                }
            }
        }
        let reader_fds: Vec<RawFd> = pipes_raw.iter().map(|(r, _)| *r).collect();
        let writer_fds: Vec<RawFd> = pipes_raw.iter().map(|(_, w)| *w).collect();

        let mut child_pids: Vec<libc::pid_t> = Vec::with_capacity(n);
        let mut leader_pid: Option<libc::pid_t> = None;

        for (i, segment) in pipeline.commands.iter().enumerate() {
            let is_last = i + 1 == n;

            match unsafe { libc::fork() } {
                -1 => {
                    let e = std::io::Error::last_os_error();
                    eprintln!("dockshell: fork failed: {e}");
                    close_all(&pipes_raw);
                    reap_all(&child_pids);
                    return ExecutionAction::Continue(1);
                }
                0 => run_child(
                    segment,
                    i,
                    is_last,
                    leader_pid,
                    &reader_fds,
                    &writer_fds,
                    job_table,
                ),
                pid => {
                    match leader_pid {
                        None => {
                            let _ = job_control::set_process_group(pid, pid);
                            leader_pid = Some(pid);
                        }
                        Some(leader) => {
                            let _ = job_control::set_process_group(pid, leader);
                        }
                    }
                    child_pids.push(pid);
                }
            }
        }

        close_all(&pipes_raw);

        let leader_pid = leader_pid.expect("at least one command was forked");
        let last_pid = *child_pids.last().expect("at least one command was forked");

        if pipeline.background {
            let id = job_table.add(leader_pid as u32, leader_pid as u32, command_text.to_string());
            println!("[{id}] {leader_pid}");
            return ExecutionAction::Continue(0);
        }

        let terminal_guard = match job_control::ForegroundTerminalGuard::new(leader_pid) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("dockshell: failed to move terminal to job group {leader_pid}: {e}");
                None
            }
        };
        let sigchld_guard = job_control::SigchldBlockGuard::block().ok();

        let code = match job_control::wait_for_group(leader_pid, last_pid) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("dockshell: failed waiting for pipeline: {e}");
                1
            }
        };

        drop(sigchld_guard);
        drop(terminal_guard);

        ExecutionAction::Continue(code)
    }

    /// Runs in the forked child: never returns — ends in `std::process::exit`
    /// or `execvp`. Kept out of the parent's control-flow graph entirely.
    fn run_child(
        segment: &crate::parser::Command,
        index: usize,
        is_last: bool,
        leader_pid: Option<libc::pid_t>,
        reader_fds: &[RawFd],
        writer_fds: &[RawFd],
        job_table: &JobTable,
    ) -> ! {
        for &sig in &RESET_SIGNALS {
            unsafe { libc::signal(sig, libc::SIG_DFL) };
        }

        let target_pgid = leader_pid.unwrap_or(0);
        unsafe { libc::setpgid(0, target_pgid) };

        if index > 0 {
            unsafe { libc::dup2(reader_fds[index - 1], libc::STDIN_FILENO) };
        }
        if !is_last {
            unsafe { libc::dup2(writer_fds[index], libc::STDOUT_FILENO) };
        }

        if let Some(path) = &segment.input {
            match OpenOptions::new().read(true).open(path) {
                Ok(file) => {
                    let fd = file.into_raw_fd();
                    unsafe {
                        libc::dup2(fd, libc::STDIN_FILENO);
                        libc::close(fd);
                    }
                }
                Err(e) => {
                    eprintln!("dockshell: {path}: {e}");
                    std::process::exit(1);
                }
            }
        }

        if let Some((path, append)) = &segment.output {
            let mut opts = OpenOptions::new();
            opts.write(true).create(true);
            if *append {
                opts.append(true);
            } else {
                opts.truncate(true);
            }
            match opts.open(path) {
                Ok(file) => {
                    let fd = file.into_raw_fd();
                    unsafe {
                        libc::dup2(fd, libc::STDOUT_FILENO);
                        libc::close(fd);
                    }
                }
                Err(e) => {
                    eprintln!("dockshell: {path}: {e}");
                    std::process::exit(1);
                }
            }
        }

        for &fd in reader_fds.iter().chain(writer_fds.iter()) {
            unsafe { libc::close(fd) };
        }

        if builtins::is_builtin(&segment.args[0]) {
            // A snapshot of the real table as of just before `fork`: enough
            // for `jobs` to print accurately from inside a pipeline or
            // background stage. Mutations the child makes to it (e.g. via
            // `fg`) are local to the child's address space and vanish with
            // it — they are never observed by the shell that forked it.
            let mut job_table = job_table.clone();
            let mut stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let mut stderr = std::io::stderr();
            let code = match builtins::execute(
                &segment.args[0],
                &segment.args[1..],
                &mut stdin,
                &mut stdout,
                &mut stderr,
                &mut job_table,
            ) {
                BuiltinAction::Continue(code) | BuiltinAction::Exit(code) => code,
            };
            let _ = std::io::stdout().flush();
            let _ = std::io::stderr().flush();
            std::process::exit(code);
        }

        exec_external(&segment.args);
    }

    /// `execvp`s the given argv, never returning on success. On failure,
    /// reports the error the way a POSIX shell does and exits 127/126.
    fn exec_external(args: &[String]) -> ! {
        let Ok(c_args): Result<Vec<CString>, _> =
            args.iter().map(|a| CString::new(a.as_str())).collect()
        else {
            eprintln!("dockshell: {}: argument contains a nul byte", args[0]);
            std::process::exit(127);
        };

        let mut argv: Vec<*const libc::c_char> =
            c_args.iter().map(|s| s.as_ptr()).collect();
        argv.push(std::ptr::null());

        unsafe {
            libc::execvp(c_args[0].as_ptr(), argv.as_ptr());
        }

        let e = std::io::Error::last_os_error();
        if e.kind() == std::io::ErrorKind::NotFound {
            eprintln!("dockshell: command not found: {}", args[0]);
            std::process::exit(127);
        }
        eprintln!("dockshell: {}: {e}", args[0]);
        std::process::exit(126);
    }

    fn close_all(pipes: &[(RawFd, RawFd)]) {
        for &(r, w) in pipes {
            unsafe {
                libc::close(r);
                libc::close(w);
            }
        }
    }

    fn reap_all(pids: &[libc::pid_t]) {
        for &pid in pids {
            let mut status: libc::c_int = 0;
            unsafe { libc::waitpid(pid, &mut status, 0) };
        }
    }
}

#[cfg(not(unix))]
mod fallback_impl {
    use std::process::Command;

    use crate::jobs::JobTable;
    use crate::parser::Pipeline;

    use super::ExecutionAction;

    /// Minimal non-Unix fallback: runs commands sequentially with no real
    /// piping, process groups, or job control. Background/foreground and
    /// true multi-stage pipelines are POSIX-specific and out of scope here.
    pub fn execute_pipeline(
        pipeline: &Pipeline,
        _job_table: &mut JobTable,
        _command_text: &str,
    ) -> ExecutionAction {
        let mut last_code = 0;
        for segment in &pipeline.commands {
            let mut process = Command::new(&segment.args[0]);
            process.args(&segment.args[1..]);
            match process.status() {
                Ok(status) => last_code = crate::status::exit_code(status),
                Err(e) => {
                    eprintln!("dockshell: {}: {e}", segment.args[0]);
                    last_code = 1;
                }
            }
        }
        ExecutionAction::Continue(last_code)
    }
}

#[cfg(unix)]
pub use unix_impl::execute_pipeline;

#[cfg(not(unix))]
pub use fallback_impl::execute_pipeline;

/// Dispatch a resolved pipeline: run an in-process builtin directly when it
/// is the pipeline's sole, non-backgrounded, non-redirected command;
/// otherwise hand the whole pipeline to [`execute_pipeline`].
pub fn execute(pipeline: &Pipeline, job_table: &mut JobTable, command_text: &str) -> ExecutionAction {
    if !pipeline.background && pipeline.commands.len() == 1 {
        let only = &pipeline.commands[0];
        if only.input.is_none()
            && only.output.is_none()
            && crate::builtins::is_builtin(&only.args[0])
        {
            let mut stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let mut stderr = std::io::stderr();
            return match crate::builtins::execute(
                &only.args[0],
                &only.args[1..],
                &mut stdin,
                &mut stdout,
                &mut stderr,
                job_table,
            ) {
                crate::builtins::BuiltinAction::Continue(code) => ExecutionAction::Continue(code),
                crate::builtins::BuiltinAction::Exit(code) => ExecutionAction::Exit(code),
            };
        }
    }

    execute_pipeline(pipeline, job_table, command_text)
}
