use std::io::Write;
use std::process::{Command, Stdio};

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

/// `sleep 30 &` prints `[1] <pid>`, and an immediate `jobs` call lists that
/// job as Running.
#[test]
fn background_job_is_announced_and_listed_running() {
    let output = run_shell(&["sleep 30 &", "jobs"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.lines().any(|l| l.trim_start().starts_with("[1]")),
        "missing background job announcement; stdout was: {stdout}"
    );
    assert!(
        stdout.contains("[1]") && stdout.contains("Running"),
        "jobs did not list a running entry; stdout was: {stdout}"
    );
}

/// After the reaper drains a completed background job, the next `jobs`
/// call reports it Done instead of Running — and actually lists the entry
/// rather than having already swept it away. Matching on a bare "Done"
/// substring anywhere in the output would also pass if that text came from
/// somewhere other than the `jobs` builtin's own table line, so parse out
/// the specific `[1] ...` line and check its state field.
#[test]
fn completed_background_job_transitions_to_done() {
    // A short-lived background job reliably finishes before the shell
    // gets around to the next prompt, so the reaper has already recorded
    // its exit by the time the second `jobs` call drains the queue.
    let output = run_shell(&["sh -c 'sleep 0.2' &", "sleep 1", "jobs"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    // The `jobs` builtin's table line has 5 whitespace-separated fields
    // (id, state, pid, placement, command); the background-launch
    // announcement ("[1] <pid>") only has 2, so this distinguishes them.
    let jobs_line = stdout
        .lines()
        .find(|l| l.trim_start().starts_with("[1]") && l.split_whitespace().count() >= 5)
        .unwrap_or_else(|| panic!("no jobs-table line for job 1 found; stdout was: {stdout}"));

    let fields: Vec<&str> = jobs_line.split_whitespace().collect();
    assert_eq!(
        fields[1], "Done",
        "expected job 1 listed as Done in `jobs` output: {jobs_line}"
    );
}

/// `fg` blocks until the job exits, after which it no longer appears in
/// the job table.
#[test]
fn fg_waits_for_backgrounded_job_then_clears_it() {
    let output = run_shell(&["sleep 0.2 &", "fg 1", "jobs"]);
    assert!(output.status.success(), "shell did not exit cleanly");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let jobs_sections: Vec<&str> = stdout.split('\n').collect();
    let last_section = jobs_sections.join("\n");
    assert!(
        !last_section.contains("[1]"),
        "job 1 should no longer be listed after fg waited on it; stdout was: {stdout}"
    );
}

#[test]
fn fg_with_unknown_id_reports_error() {
    let output = run_shell(&["fg 99999"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no such job"), "stderr was: {stderr}");
}

/// Job ids are assigned monotonically across the session.
#[test]
fn job_ids_increase_monotonically() {
    let output = run_shell(&["sleep 0.1 &", "sleep 0.1 &", "jobs"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[1]"), "stdout was: {stdout}");
    assert!(stdout.contains("[2]"), "stdout was: {stdout}");
}
