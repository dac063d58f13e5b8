#[cfg(unix)]
use std::io::Write;
#[cfg(unix)]
use std::process::{Command, Stdio};

#[cfg(unix)]
fn run_shell(lines: &[&str]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_dockshell"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn dockshell");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
        writeln!(stdin, "exit").expect("write exit");
    }

    child.wait_with_output().expect("wait output")
}

/// `yes` writes indefinitely; `head -1` exits after one line, closing the
/// read end of the pipe it feeds from. `yes` then receives `SIGPIPE` with
/// its default disposition (restored in every forked child per §4.5) and
/// terminates. The shell process itself never touches that pipe, so it
/// keeps running the next command.
#[cfg(unix)]
#[test]
fn pipeline_sigpipe_does_not_abort_shell() {
    let output = run_shell(&["yes | head -1", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

/// A foreground child that kills itself with `SIGINT` terminates on its own
/// default disposition; the shell (not a member of that child's process
/// group) is unaffected and keeps reading the next line.
#[cfg(unix)]
#[test]
fn foreground_child_self_signal_does_not_kill_shell() {
    let output = run_shell(&["sh -c 'kill -INT $$'", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

/// A pipeline with several stages, each signaling itself, still lets the
/// shell continue — process-group membership doesn't let one stage's
/// signal reach the shell or the other stages' unrelated state.
#[cfg(unix)]
#[test]
fn shell_remains_responsive_after_killed_pipeline_stage() {
    let output = run_shell(&["sh -c 'kill -TERM $$' | cat", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}
