use std::io::{Read, Write};

use crate::jobs::{JobStatus, JobTable};

/// The fixed table of spec-mandated builtins, plus convenience ones that
/// don't conflict with any non-goal.
const BUILTINS: &[&str] = &[
    "cd", "exit", "jobs", "fg", "help", "pwd", "echo", "export", "unset",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

pub enum BuiltinAction {
    Continue(i32),
    Exit(i32),
}

/// Run a builtin in-process, routing its I/O through the given streams.
///
/// `job_table` is only meaningfully consulted by `jobs` and `fg`; `stdin`
/// is unused by every current builtin but kept on the signature so a
/// future builtin that reads from it needs no signature change.
pub fn execute(
    program: &str,
    args: &[String],
    _stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    job_table: &mut JobTable,
) -> BuiltinAction {
    match program {
        "cd" => BuiltinAction::Continue(builtin_cd(args, stderr)),
        "exit" => builtin_exit(args, stderr),
        "jobs" => BuiltinAction::Continue(builtin_jobs(job_table, stdout)),
        "fg" => BuiltinAction::Continue(builtin_fg(args, job_table, stderr)),
        "help" => BuiltinAction::Continue(builtin_help(stdout)),
        "pwd" => BuiltinAction::Continue(builtin_pwd(stdout, stderr)),
        "echo" => BuiltinAction::Continue(builtin_echo(args, stdout)),
        "export" => BuiltinAction::Continue(builtin_export(args, stderr)),
        "unset" => BuiltinAction::Continue(builtin_unset(args)),
        _ => {
            let _ = writeln!(stderr, "dockshell: unknown builtin: {program}");
            BuiltinAction::Continue(1)
        }
    }
}

fn builtin_cd(args: &[String], stderr: &mut dyn Write) -> i32 {
    let target = match args.first() {
        Some(dir) if dir == "-" => match std::env::var("OLDPWD") {
            Ok(prev) => prev,
            Err(_) => {
                let _ = writeln!(stderr, "cd: OLDPWD not set");
                return 1;
            }
        },
        Some(dir) => dir.clone(),
        None => std::env::var("HOME").unwrap_or_else(|_| ".".to_string()),
    };

    if let Ok(cwd) = std::env::current_dir() {
        unsafe { std::env::set_var("OLDPWD", cwd) };
    }

    if let Err(e) = std::env::set_current_dir(&target) {
        let _ = writeln!(stderr, "cd: {target}: {e}");
        return 1;
    }

    0
}

fn builtin_exit(args: &[String], stderr: &mut dyn Write) -> BuiltinAction {
    match args.first() {
        None => BuiltinAction::Exit(0),
        Some(s) => match s.parse::<i32>() {
            Ok(code) => BuiltinAction::Exit(code),
            Err(_) => {
                let _ = writeln!(stderr, "exit: {s}: numeric argument required");
                BuiltinAction::Exit(2)
            }
        },
    }
}

fn builtin_jobs(job_table: &mut JobTable, stdout: &mut dyn Write) -> i32 {
    crate::reaper::drain(job_table);

    for job in job_table.jobs_sorted() {
        let state = match job.status {
            JobStatus::Running => "Running",
            JobStatus::Done(_) => "Done",
        };
        let placement = if job.foreground { "fg" } else { "bg" };
        let _ = writeln!(
            stdout,
            "[{}]  {}  {}  {}  {}",
            job.id, state, job.pid, placement, job.command
        );
    }

    // Done jobs are only ever shown once, the call after they finish,
    // then swept so they don't linger.
    job_table.sweep_done();
    0
}

fn builtin_fg(args: &[String], job_table: &mut JobTable, stderr: &mut dyn Write) -> i32 {
    crate::reaper::drain(job_table);

    let id = match args.first() {
        Some(s) => match s.parse::<usize>() {
            Ok(id) => id,
            Err(_) => {
                let _ = writeln!(stderr, "fg: {s}: invalid job id");
                return 1;
            }
        },
        None => match job_table.most_recent_id() {
            Some(id) => id,
            None => {
                let _ = writeln!(stderr, "fg: no current job");
                return 1;
            }
        },
    };

    let Some(job) = job_table.get_mut(id) else {
        let _ = writeln!(stderr, "fg: {id}: no such job");
        return 1;
    };

    if !matches!(job.status, JobStatus::Running) {
        let _ = writeln!(stderr, "fg: {id}: job has already finished");
        return 1;
    }

    job.foreground = true;
    let pgid = job.pgid;
    let pid = job.pid;

    #[cfg(unix)]
    let exit_code = {
        let _sigchld_block = match crate::job_control::SigchldBlockGuard::block() {
            Ok(guard) => Some(guard),
            Err(e) => {
                let _ = writeln!(stderr, "fg: failed to block SIGCHLD: {e}");
                None
            }
        };
        let terminal_guard =
            match crate::job_control::ForegroundTerminalGuard::new(pgid as libc::pid_t) {
                Ok(guard) => Some(guard),
                Err(e) => {
                    let _ = writeln!(stderr, "fg: failed to move terminal to job {id}: {e}");
                    None
                }
            };

        let code = match crate::job_control::wait_for_group(pgid as libc::pid_t, pid as libc::pid_t) {
            Ok(code) => code,
            Err(e) => {
                let _ = writeln!(stderr, "fg: waitpid failed: {e}");
                1
            }
        };

        drop(terminal_guard);
        drop(_sigchld_block);
        code
    };

    #[cfg(not(unix))]
    let exit_code = 0;

    job_table.mark_done(pid, exit_code);
    job_table.sweep_done();
    0
}

fn builtin_help(stdout: &mut dyn Write) -> i32 {
    let _ = writeln!(
        stdout,
        "dockshell — a small job-control shell\n\
         \n\
         Syntax:\n\
         \u{20}\u{20}cmd arg...             run a command\n\
         \u{20}\u{20}cmd < file             redirect stdin from file\n\
         \u{20}\u{20}cmd > file             redirect stdout to file (truncate)\n\
         \u{20}\u{20}cmd >> file            redirect stdout to file (append)\n\
         \u{20}\u{20}cmd1 | cmd2            pipe cmd1's stdout to cmd2's stdin\n\
         \u{20}\u{20}cmd &                  run cmd in the background\n\
         \n\
         Builtins:\n\
         \u{20}\u{20}cd [dir]       change directory\n\
         \u{20}\u{20}exit [code]    exit the shell\n\
         \u{20}\u{20}jobs           list background jobs\n\
         \u{20}\u{20}fg [id]        bring a job to the foreground\n\
         \u{20}\u{20}pwd            print working directory\n\
         \u{20}\u{20}echo args...   print arguments\n\
         \u{20}\u{20}export A=B     set an environment variable\n\
         \u{20}\u{20}unset A        remove an environment variable\n\
         \u{20}\u{20}help           show this message"
    );
    0
}

fn builtin_pwd(stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    match std::env::current_dir() {
        Ok(path) => {
            let _ = writeln!(stdout, "{}", path.display());
            0
        }
        Err(e) => {
            let _ = writeln!(stderr, "pwd: {e}");
            1
        }
    }
}

fn builtin_echo(args: &[String], stdout: &mut dyn Write) -> i32 {
    let _ = writeln!(stdout, "{}", args.join(" "));
    0
}

fn builtin_export(args: &[String], stderr: &mut dyn Write) -> i32 {
    for arg in args {
        if let Some((key, value)) = arg.split_once('=') {
            unsafe { std::env::set_var(key, value) };
        } else {
            let _ = writeln!(stderr, "export: usage: export NAME=value");
        }
    }
    0
}

fn builtin_unset(args: &[String]) -> i32 {
    for arg in args {
        unsafe { std::env::remove_var(arg) };
    }
    0
}
