use std::collections::HashMap;

/// The lifecycle state of a tracked job. Stopped jobs are out of scope —
/// a job is either still in its process group or it has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Done(i32),
}

/// A single tracked background job.
///
/// `pid` is the pid of the pipeline's process-group leader — the only
/// pid the table keeps, since every other member of the pipeline shares
/// `pgid` and is waited on as a group, never individually.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: usize,
    pub pid: u32,
    pub pgid: u32,
    pub command: String,
    pub status: JobStatus,
    /// Starts `false` (background) when `JobTable::add` registers the job;
    /// set `true` by `fg` once it takes the job over. A job moved to the
    /// foreground blocks until done and is removed rather than surviving
    /// to be listed again, so in practice this never flips back to `false`.
    pub foreground: bool,
}

/// The shell's job table — tracks all background jobs by id, in the
/// order they were created.
///
/// `Clone` exists only so a forked child that ends up running a builtin
/// (e.g. `jobs | cat`) can be handed a snapshot of the table as it stood
/// just before `fork` — see `executor::run_child`. A child's copy is
/// inert: any mutation it makes (via `fg`) dies with the child's address
/// space and is never observed by the real shell process.
#[derive(Debug, Default, Clone)]
pub struct JobTable {
    jobs: HashMap<usize, Job>,
    next_id: usize,
}

impl JobTable {
    pub fn new() -> Self {
        JobTable {
            jobs: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a running background job. Returns its assigned job id.
    pub fn add(&mut self, pid: u32, pgid: u32, command: String) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.insert(
            id,
            Job {
                id,
                pid,
                pgid,
                command,
                status: JobStatus::Running,
                foreground: false,
            },
        );
        id
    }

    pub fn get(&self, id: usize) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn remove(&mut self, id: usize) -> Option<Job> {
        self.jobs.remove(&id)
    }

    /// Mark the job whose process-group leader is `pid` as done, recording
    /// its exit code. Called by the reaper as it drains recorded exits.
    /// Jobs with no match (e.g. a foreground child, already-removed job)
    /// are silently ignored.
    pub fn mark_done(&mut self, pid: u32, code: i32) {
        if let Some(job) = self.jobs.values_mut().find(|j| j.pid == pid) {
            job.status = JobStatus::Done(code);
        }
    }

    /// All jobs sorted by job id (ascending), for `jobs` output.
    pub fn jobs_sorted(&self) -> Vec<&Job> {
        let mut list: Vec<&Job> = self.jobs.values().collect();
        list.sort_by_key(|j| j.id);
        list
    }

    /// Job id of the most recently added job, for `fg` with no argument.
    pub fn most_recent_id(&self) -> Option<usize> {
        self.jobs.keys().copied().max()
    }

    /// Remove every job whose status is `Done`, returning them for
    /// `[N]  Done  cmd`-style reporting before they disappear from `jobs`.
    pub fn sweep_done(&mut self) -> Vec<Job> {
        let done_ids: Vec<usize> = self
            .jobs
            .iter()
            .filter(|(_, j)| matches!(j.status, JobStatus::Done(_)))
            .map(|(id, _)| *id)
            .collect();
        done_ids
            .into_iter()
            .filter_map(|id| self.jobs.remove(&id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assigns_increasing_ids() {
        let mut table = JobTable::new();
        let a = table.add(100, 100, "sleep 1".into());
        let b = table.add(200, 200, "sleep 2".into());
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(table.most_recent_id(), Some(2));
    }

    #[test]
    fn mark_done_matches_by_pgid_leader_pid() {
        let mut table = JobTable::new();
        let id = table.add(100, 100, "sleep 1".into());
        table.mark_done(100, 0);
        assert_eq!(table.get(id).unwrap().status, JobStatus::Done(0));
    }

    #[test]
    fn mark_done_for_unknown_pid_is_noop() {
        let mut table = JobTable::new();
        table.add(100, 100, "sleep 1".into());
        table.mark_done(999, 1);
        assert_eq!(table.get(1).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn jobs_sorted_is_ascending_by_id() {
        let mut table = JobTable::new();
        table.add(1, 1, "a".into());
        table.add(2, 2, "b".into());
        table.add(3, 3, "c".into());
        let ids: Vec<usize> = table.jobs_sorted().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn sweep_done_removes_only_completed_jobs() {
        let mut table = JobTable::new();
        table.add(100, 100, "running".into());
        table.add(200, 200, "finished".into());
        table.mark_done(200, 0);
        let swept = table.sweep_done();
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].command, "finished");
        assert_eq!(table.jobs_sorted().len(), 1);
        assert_eq!(table.jobs_sorted()[0].command, "running");
    }

    #[test]
    fn remove_drops_job_from_table() {
        let mut table = JobTable::new();
        let id = table.add(100, 100, "sleep 1".into());
        assert!(table.remove(id).is_some());
        assert!(table.get(id).is_none());
    }
}
