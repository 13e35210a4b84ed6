//! Orchestrator scenarios driven by a scripted git executor.
//!
//! The harness plays the daemon's part: it keeps a control event queue,
//! turns `ScheduleTurn` into a queued turn and runs `Execute` directives
//! through the fake executor, delivering the result as a later event.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use reposync_core::{RepoName, RepositoryConfig, Settings};
use reposync_git::{CommandExecutor, CommandResult, GitOp};
use reposync_sync::{
    error::REBASE_GUIDANCE, Directive, FailureKind, JobId, JobReport, JobState, Orchestrator,
    Outcome, RepoStatus,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Replies keyed by subcommand name; falls back to a clean, in-sync repository.
struct FakeGit {
    scripted: Mutex<HashMap<&'static str, VecDeque<CommandResult>>>,
    calls: Mutex<Vec<(PathBuf, GitOp)>>,
}

impl FakeGit {
    fn new() -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn reply(&self, name: &'static str, exit_code: i32, stdout: &str, stderr: &str) {
        self.scripted
            .lock()
            .expect("lock")
            .entry(name)
            .or_default()
            .push_back(CommandResult::exited(
                format!("git {name}"),
                exit_code,
                stdout,
                stderr,
            ));
    }

    fn ops(&self) -> Vec<GitOp> {
        self.calls
            .lock()
            .expect("lock")
            .iter()
            .map(|(_, op)| op.clone())
            .collect()
    }

    fn count(&self, name: &str) -> usize {
        self.ops().iter().filter(|op| op.name() == name).count()
    }
}

impl CommandExecutor for FakeGit {
    fn execute(&self, workdir: &Path, op: &GitOp) -> CommandResult {
        self.calls
            .lock()
            .expect("lock")
            .push((workdir.to_path_buf(), op.clone()));
        if let Some(result) = self
            .scripted
            .lock()
            .expect("lock")
            .get_mut(op.name())
            .and_then(VecDeque::pop_front)
        {
            return result;
        }
        let stdout = match op {
            GitOp::CurrentBranch => "main\n",
            GitOp::RemoteUrl { .. } => "git@example.com:notes.git\n",
            GitOp::CompareWithHead { .. } => "0\t0\n",
            _ => "",
        };
        CommandResult::exited(format!("git {op}"), 0, stdout, "")
    }
}

enum Event {
    Turn,
    Finished(JobId, CommandResult),
}

struct Harness {
    orch: Orchestrator,
    git: FakeGit,
    events: VecDeque<Event>,
    reports: Vec<JobReport>,
    seen: Vec<Directive>,
    _dirs: Vec<TempDir>,
}

impl Harness {
    /// One fake working tree per name, all with `interval` minutes.
    fn new(names: &[&str], interval: u32) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut dirs = Vec::new();
        let mut repos = Vec::new();
        for name in names {
            let dir = TempDir::new().expect("tempdir");
            fs::create_dir_all(dir.path().join(".git")).expect("mkdir .git");
            repos.push(RepositoryConfig::new(*name, dir.path()).with_interval(interval));
            dirs.push(dir);
        }
        let settings = Settings {
            client_name: "laptop/alice".to_string(),
            git_command: None,
            repos,
        };
        Self {
            orch: Orchestrator::new(&settings),
            git: FakeGit::new(),
            events: VecDeque::new(),
            reports: Vec::new(),
            seen: Vec::new(),
            _dirs: dirs,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.orch
            .runtime(&RepoName::from(name))
            .expect("runtime")
            .config
            .path
            .clone()
    }

    fn settings(&self) -> Settings {
        Settings {
            client_name: self.orch.client_name().to_string(),
            git_command: None,
            repos: self
                .orch
                .repo_names()
                .iter()
                .map(|name| self.orch.runtime(name).expect("runtime").config.clone())
                .collect(),
        }
    }

    fn enqueue(&mut self, name: &str) -> bool {
        self.orch.enqueue(&RepoName::from(name))
    }

    /// Carry out directives until the control queue is empty.
    fn run(&mut self) {
        loop {
            self.collect();
            let Some(event) = self.events.pop_front() else {
                break;
            };
            match event {
                Event::Turn => self.orch.turn(),
                Event::Finished(job, result) => self.orch.command_finished(job, result),
            }
        }
    }

    /// Process at most `n` events.
    fn step(&mut self, n: usize) {
        for _ in 0..n {
            self.collect();
            match self.events.pop_front() {
                Some(Event::Turn) => self.orch.turn(),
                Some(Event::Finished(job, result)) => self.orch.command_finished(job, result),
                None => break,
            }
        }
        self.collect();
    }

    fn collect(&mut self) {
        for directive in self.orch.take_directives() {
            match &directive {
                Directive::ScheduleTurn => self.events.push_back(Event::Turn),
                Directive::Execute {
                    job, workdir, op, ..
                } => {
                    assert!(
                        !self
                            .events
                            .iter()
                            .any(|e| matches!(e, Event::Finished(..))),
                        "a second command was issued while one was in flight"
                    );
                    let result = self.git.execute(workdir, op);
                    self.events.push_back(Event::Finished(*job, result));
                }
                Directive::JobFinished(report) => self.reports.push(report.clone()),
                _ => {}
            }
            self.seen.push(directive);
        }
    }

    fn report(&self, name: &str) -> &JobReport {
        self.reports
            .iter()
            .rev()
            .find(|r| r.repo.as_str() == name)
            .expect("job report")
    }

    fn log(&self, name: &str) -> String {
        self.orch
            .runtime(&RepoName::from(name))
            .expect("runtime")
            .log
            .join("\n")
    }

    fn armed(&self) -> Vec<(String, u64)> {
        self.seen
            .iter()
            .filter_map(|d| match d {
                Directive::ArmTimer {
                    repo, generation, ..
                } => Some((repo.to_string(), *generation)),
                _ => None,
            })
            .collect()
    }
}

fn mutating(ops: &[GitOp]) -> Vec<&GitOp> {
    ops.iter().filter(|op| op.is_mutating()).collect()
}

// ---------------------------------------------------------------------------
// 1. Single-repository scenarios
// ---------------------------------------------------------------------------

#[test]
fn equal_repository_finishes_after_six_steps_without_writes() {
    let mut h = Harness::new(&["notes"], 5);
    assert!(h.enqueue("notes"));
    h.run();

    let report = h.report("notes");
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.steps, 6);
    assert_eq!(report.final_state, JobState::Compare);
    assert!(mutating(&h.git.ops()).is_empty());
    assert_eq!(
        h.git.ops(),
        vec![
            GitOp::CurrentBranch,
            GitOp::RemoteUrl {
                remote: "origin".to_string()
            },
            GitOp::Status,
            GitOp::Fetch {
                remote: "origin".to_string(),
                branch: "main".to_string()
            },
            GitOp::CompareWithHead {
                reference: "origin/main".to_string()
            },
        ]
    );
    assert!(h.log("notes").contains("In sync! Done."));
}

#[test]
fn modified_repository_commits_and_pushes_once() {
    let mut h = Harness::new(&["notes"], 5);
    h.git.reply("status", 0, " M todo.md\n", "");
    h.git.reply("status", 0, "", "");
    h.git.reply("rev-list", 0, "0\t1\n", "");
    h.enqueue("notes");
    h.run();

    let ops = h.git.ops();
    assert!(ops.contains(&GitOp::AddAll));
    assert!(ops.contains(&GitOp::Commit {
        message: "Changes from laptop/alice".to_string()
    }));
    assert_eq!(h.git.count("push"), 1);
    assert_eq!(h.git.count("merge"), 0);

    let rt = h.orch.runtime(&RepoName::from("notes")).expect("runtime");
    assert!(rt.ok);
    assert_eq!(rt.branch.as_deref(), Some("main"));
    assert_eq!(rt.remote_url.as_deref(), Some("git@example.com:notes.git"));

    let log = h.log("notes");
    assert!(log.contains("Repo has been modified locally."));
    assert!(log.contains("Repo clean after commit."));
    assert!(log.contains("Pushed successfully. In sync! Done."));
}

#[test]
fn behind_repository_fast_forwards() {
    let mut h = Harness::new(&["notes"], 5);
    h.git.reply("rev-list", 0, "3\t0\n", "");
    h.enqueue("notes");
    h.run();

    assert_eq!(h.report("notes").outcome, Outcome::Success);
    assert_eq!(
        mutating(&h.git.ops()),
        vec![&GitOp::FastForwardMerge {
            remote: "origin".to_string(),
            branch: "main".to_string()
        }]
    );
    assert!(h.log("notes").contains("Merged successfully. In sync! Done."));
}

#[test]
fn diverged_repository_rebases_then_pushes() {
    let mut h = Harness::new(&["notes"], 5);
    h.git.reply("rev-list", 0, "2\t1\n", "");
    h.git.reply("rev-list", 0, "0\t1\n", "");
    h.enqueue("notes");
    h.run();

    let report = h.report("notes");
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.final_state, JobState::PushAfterRebase);
    assert_eq!(report.steps, 8);
    assert_eq!(h.git.count("rebase"), 1);
    assert_eq!(h.git.count("push"), 1);
    assert!(h.log("notes").contains("We are ahead. Rebase went fine. Pushing..."));
}

#[test]
fn failed_rebase_logs_guidance_and_leaves_timer_stopped() {
    let mut h = Harness::new(&["notes"], 5);
    h.git.reply("rev-list", 0, "2\t1\n", "");
    h.git
        .reply("rebase", 1, "", "CONFLICT (content): Merge conflict in todo.md");
    h.enqueue("notes");
    h.run();

    let report = h.report("notes");
    assert_eq!(report.outcome, Outcome::Failure);
    assert_eq!(report.failure_kind, Some(FailureKind::Command));
    assert_eq!(report.summary, "Git error while rebasing.");
    assert_eq!(h.git.count("push"), 0);

    let log = h.log("notes");
    assert!(log.contains("CONFLICT (content)"));
    assert!(log.contains(REBASE_GUIDANCE));

    assert!(h.armed().is_empty());
    let snapshot = h.orch.snapshot(&RepoName::from("notes")).expect("snapshot");
    assert_eq!(snapshot.status, RepoStatus::Error);
    assert!(h
        .seen
        .iter()
        .any(|d| matches!(d, Directive::Notify { summary, .. } if summary == "Git error while rebasing.")));
}

#[test]
fn merge_in_progress_aborts_before_any_command() {
    let mut h = Harness::new(&["notes"], 5);
    fs::write(h.path("notes").join(".git/MERGE_HEAD"), "abc\n").expect("write MERGE_HEAD");
    h.enqueue("notes");
    h.run();

    let report = h.report("notes");
    assert_eq!(report.outcome, Outcome::Failure);
    assert_eq!(report.final_state, JobState::CheckOngoing);
    assert_eq!(report.failure_kind, Some(FailureKind::SafetyAbort));
    assert_eq!(report.commands, 0);
    assert!(h.git.ops().is_empty());
    assert_eq!(report.summary, "Unsafe to sync, operation ongoing: merge.");
}

#[test]
fn path_that_is_not_a_repository_fails_in_init() {
    let mut h = Harness::new(&["notes"], 5);
    fs::remove_dir_all(h.path("notes").join(".git")).expect("rm .git");
    h.enqueue("notes");
    h.run();

    let report = h.report("notes");
    assert_eq!(report.final_state, JobState::Init);
    assert_eq!(report.failure_kind, Some(FailureKind::Configuration));
    assert_eq!(report.summary, "Path is not a Git repo.");
}

#[test]
fn detached_head_fails_detection() {
    let mut h = Harness::new(&["notes"], 5);
    h.git.reply("symbolic-ref", 1, "", "");
    h.enqueue("notes");
    h.run();

    let report = h.report("notes");
    assert_eq!(report.failure_kind, Some(FailureKind::Detection));
    assert_eq!(
        report.summary,
        "Could not detect current branch. Possibly detached head."
    );
}

#[test]
fn no_upstream_aborts() {
    let mut h = Harness::new(&["notes"], 5);
    h.git.reply("rev-list", 0, "", "");
    h.enqueue("notes");
    h.run();

    assert_eq!(
        h.report("notes").summary,
        "No relation between remote and HEAD. Aborting."
    );
    assert!(mutating(&h.git.ops()).is_empty());
}

#[test]
fn fetch_failure_includes_command_report() {
    let mut h = Harness::new(&["notes"], 5);
    h.git
        .reply("fetch", 128, "", "fatal: could not read from remote repository");
    h.enqueue("notes");
    h.run();

    let log = h.log("notes");
    assert!(log.contains("Git error occurred while fetching."));
    assert!(log.contains("Exitcode: 128 - Error"));
    assert!(log.contains("could not read from remote repository"));
}

// ---------------------------------------------------------------------------
// 2. Queue discipline
// ---------------------------------------------------------------------------

#[test]
fn duplicate_enqueue_yields_one_job() {
    let mut h = Harness::new(&["notes"], 5);
    assert!(h.enqueue("notes"));
    assert!(!h.enqueue("notes"));
    h.step(3);
    assert!(!h.enqueue("notes"));
    assert_eq!(h.orch.queued().len(), 1);

    h.run();
    assert_eq!(h.reports.len(), 1);
}

#[test]
fn unknown_repository_is_not_enqueued() {
    let mut h = Harness::new(&["notes"], 5);
    assert!(!h.enqueue("ghost"));
    assert!(h.orch.is_idle());
}

#[test]
fn jobs_finish_in_arrival_order() {
    let mut h = Harness::new(&["alpha", "beta", "gamma"], 5);
    h.git.reply("status", 0, " M a\n", "");
    h.git.reply("status", 0, "", "");
    h.git.reply("rev-list", 0, "4\t0\n", "");

    h.enqueue("gamma");
    h.step(4);
    h.enqueue("alpha");
    h.step(2);
    h.enqueue("beta");
    h.enqueue("gamma");
    h.run();

    let order: Vec<&str> = h.reports.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(order, ["gamma", "alpha", "beta"]);
}

#[test]
fn commands_never_interleave_across_repositories() {
    let mut h = Harness::new(&["alpha", "beta"], 5);
    h.enqueue("alpha");
    h.enqueue("beta");
    h.run();

    let calls = h.git.calls.lock().expect("lock").clone();
    let alpha = h.path("alpha");
    let first_beta = calls
        .iter()
        .position(|(dir, _)| dir != &alpha)
        .expect("beta ran");
    assert!(calls[first_beta..].iter().all(|(dir, _)| dir != &alpha));
}

#[test]
fn start_enqueues_every_repository_in_configuration_order() {
    let mut h = Harness::new(&["zeta", "alpha"], 5);
    let started = h.orch.start();
    assert_eq!(started, vec![RepoName::from("zeta"), RepoName::from("alpha")]);
    h.run();
    let order: Vec<&str> = h.reports.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(order, ["zeta", "alpha"]);
    assert_eq!(h.orch.overall_status(), reposync_sync::OverallStatus::Ok);
}

// ---------------------------------------------------------------------------
// 3. Timers and pause
// ---------------------------------------------------------------------------

#[test]
fn success_arms_timer_and_stale_expiry_is_ignored() {
    let mut h = Harness::new(&["notes"], 5);
    h.enqueue("notes");
    h.run();

    assert_eq!(h.armed(), vec![("notes".to_string(), 1)]);
    let arm = h
        .seen
        .iter()
        .find_map(|d| match d {
            Directive::ArmTimer { after, .. } => Some(*after),
            _ => None,
        })
        .expect("arm directive");
    assert_eq!(arm, Duration::from_secs(300));

    let notes = RepoName::from("notes");
    h.orch.timer_fired(&notes, 0);
    assert!(h.orch.is_idle());

    h.orch.timer_fired(&notes, 1);
    assert_eq!(h.orch.queued(), vec![notes.clone()]);
    h.run();
    assert_eq!(h.reports.len(), 2);
    assert_eq!(h.armed().last(), Some(&("notes".to_string(), 2)));
}

#[test]
fn zero_interval_never_arms() {
    let mut h = Harness::new(&["notes"], 0);
    h.enqueue("notes");
    h.run();
    assert!(h.armed().is_empty());
    let snapshot = h.orch.snapshot(&RepoName::from("notes")).expect("snapshot");
    assert_eq!(snapshot.status, RepoStatus::Paused);
    assert_eq!(snapshot.schedule, "Auto-refresh disabled");
}

#[test]
fn pause_cancels_timer_but_not_queued_job() {
    let mut h = Harness::new(&["notes", "dots"], 5);
    h.enqueue("notes");
    h.run();

    let notes = RepoName::from("notes");
    assert!(h.orch.pause(&notes));
    h.collect();
    assert!(h
        .seen
        .iter()
        .any(|d| matches!(d, Directive::CancelTimer { repo } if repo == &notes)));
    assert_eq!(
        h.orch.snapshot(&notes).expect("snapshot").status,
        RepoStatus::Paused
    );

    h.enqueue("dots");
    assert!(h.orch.pause(&RepoName::from("dots")));
    h.run();
    assert_eq!(h.report("dots").outcome, Outcome::Success);
    assert!(!h.orch.pause(&RepoName::from("ghost")));
}

// ---------------------------------------------------------------------------
// 4. Configuration changes
// ---------------------------------------------------------------------------

#[test]
fn interval_change_rearms_running_timer() {
    let mut h = Harness::new(&["notes"], 5);
    h.enqueue("notes");
    h.run();

    let mut settings = h.settings();
    settings.repos[0].refresh_interval_minutes = 10;
    h.orch.apply_settings(&settings);
    h.collect();
    assert_eq!(h.armed(), vec![("notes".to_string(), 1), ("notes".to_string(), 2)]);

    settings.repos[0].refresh_interval_minutes = 0;
    h.orch.apply_settings(&settings);
    h.collect();
    let runtime = h.orch.runtime(&RepoName::from("notes")).expect("runtime");
    assert!(!runtime.timer.is_armed());
}

#[test]
fn interval_change_from_zero_arms_idle_repository() {
    let mut h = Harness::new(&["notes"], 0);
    h.enqueue("notes");
    h.run();
    assert!(h.armed().is_empty());

    let mut settings = h.settings();
    settings.repos[0].refresh_interval_minutes = 15;
    h.orch.apply_settings(&settings);
    h.collect();
    assert_eq!(h.armed().len(), 1);
}

#[test]
fn interval_change_leaves_paused_timer_stopped() {
    let mut h = Harness::new(&["notes"], 5);
    h.enqueue("notes");
    h.run();
    h.orch.pause(&RepoName::from("notes"));

    let mut settings = h.settings();
    settings.repos[0].refresh_interval_minutes = 30;
    h.orch.apply_settings(&settings);
    h.collect();
    assert_eq!(h.armed().len(), 1);
}

#[test]
fn added_repository_is_enqueued() {
    let mut h = Harness::new(&["notes"], 5);
    let extra = TempDir::new().expect("tempdir");
    fs::create_dir_all(extra.path().join(".git")).expect("mkdir .git");

    let mut settings = h.settings();
    settings
        .repos
        .push(RepositoryConfig::new("dots", extra.path()));
    h.orch.apply_settings(&settings);
    assert_eq!(h.orch.queued(), vec![RepoName::from("dots")]);
    h.run();
    assert_eq!(h.report("dots").outcome, Outcome::Success);
}

#[test]
fn removed_repository_drops_queued_job() {
    let mut h = Harness::new(&["alpha", "beta", "gamma"], 5);
    h.enqueue("alpha");
    h.enqueue("beta");
    h.enqueue("gamma");

    let mut settings = h.settings();
    settings.repos.retain(|r| r.name.as_str() != "beta");
    h.orch.apply_settings(&settings);
    h.run();

    let order: Vec<&str> = h.reports.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(order, ["alpha", "gamma"]);
    assert!(h.orch.runtime(&RepoName::from("beta")).is_none());
    assert!(h
        .seen
        .iter()
        .any(|d| matches!(d, Directive::Removed(name) if name.as_str() == "beta")));
}

#[test]
fn removing_running_repository_discards_its_job_on_next_result() {
    let mut h = Harness::new(&["alpha", "beta"], 5);
    h.enqueue("alpha");
    h.enqueue("beta");
    // Init, CheckOngoing, then BranchRemote issues its first command.
    h.step(3);
    assert!(!h.git.ops().is_empty());

    let mut settings = h.settings();
    settings.repos.retain(|r| r.name.as_str() != "alpha");
    h.orch.apply_settings(&settings);
    h.run();

    let order: Vec<&str> = h.reports.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(order, ["beta"]);
    assert!(h.orch.is_idle());
}

#[test]
fn rename_keeps_runtime_state() {
    let mut h = Harness::new(&["notes"], 5);
    h.enqueue("notes");
    h.run();

    let mut settings = h.settings();
    settings.repos[0].name = RepoName::from("journal");
    h.orch.apply_settings(&settings);

    let renamed = h.orch.runtime(&RepoName::from("journal")).expect("renamed");
    assert_eq!(renamed.branch.as_deref(), Some("main"));
    assert!(renamed.timer.is_armed());
    assert!(h.orch.is_idle());
}

#[test]
fn rename_while_command_in_flight_keeps_queue_moving() {
    let mut h = Harness::new(&["notes", "other"], 5);
    h.enqueue("notes");
    h.enqueue("other");
    // Init, CheckOngoing, then BranchRemote issues `symbolic-ref`.
    h.step(3);
    assert_eq!(h.git.ops(), vec![GitOp::CurrentBranch]);

    let mut settings = h.settings();
    settings.repos[0].name = RepoName::from("journal");
    h.orch.apply_settings(&settings);
    assert_eq!(
        h.orch.queued(),
        vec![RepoName::from("journal"), RepoName::from("other")]
    );

    h.run();

    let order: Vec<&str> = h.reports.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(order, ["journal", "other"]);
    assert!(h.reports.iter().all(|r| r.outcome == Outcome::Success));
    let journal = h.orch.runtime(&RepoName::from("journal")).expect("renamed");
    assert_eq!(journal.branch.as_deref(), Some("main"));
    assert!(h.orch.is_idle());
}

#[test]
fn readded_repository_gets_fresh_job_while_old_command_in_flight() {
    let mut h = Harness::new(&["alpha", "beta"], 5);
    h.enqueue("alpha");
    h.enqueue("beta");
    h.step(3);
    assert_eq!(h.git.ops(), vec![GitOp::CurrentBranch]);

    let original = h.settings();
    let mut without = original.clone();
    without.repos.retain(|r| r.name.as_str() != "alpha");
    h.orch.apply_settings(&without);

    let moved = TempDir::new().expect("tempdir");
    fs::create_dir_all(moved.path().join(".git")).expect("mkdir .git");
    let mut readded = without.clone();
    readded
        .repos
        .push(RepositoryConfig::new("alpha", moved.path()).with_interval(5));
    h.orch.apply_settings(&readded);
    assert_eq!(
        h.orch.queued(),
        vec![RepoName::from("beta"), RepoName::from("alpha")]
    );

    h.run();

    let order: Vec<&str> = h.reports.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(order, ["beta", "alpha"]);
    assert_eq!(h.report("alpha").outcome, Outcome::Success);
    assert_eq!(h.report("alpha").steps, h.report("beta").steps, "ran from init");

    // Only the first `symbolic-ref` ran in the old location.
    let calls = h.git.calls.lock().expect("lock");
    let old_path = &original.repos[0].path;
    assert_eq!(calls.iter().filter(|(dir, _)| dir == old_path).count(), 1);
    assert!(calls.iter().any(|(dir, _)| dir == moved.path()));
    assert!(h.orch.is_idle());
}

#[test]
fn result_for_another_job_is_ignored() {
    let mut h = Harness::new(&["notes"], 5);
    h.enqueue("notes");
    h.step(3);
    let waiting = h.orch.queued();

    h.orch.command_finished(
        JobId(999),
        CommandResult::exited("git symbolic-ref", 0, "main\n", ""),
    );
    assert!(h.orch.take_directives().is_empty());
    assert_eq!(h.orch.queued(), waiting);

    h.run();
    assert_eq!(h.report("notes").outcome, Outcome::Success);
}

#[test]
fn client_name_change_applies_to_next_commit() {
    let mut h = Harness::new(&["notes"], 5);
    let mut settings = h.settings();
    settings.client_name = "desk/bob".to_string();
    h.orch.apply_settings(&settings);

    h.git.reply("status", 0, "?? new.md\n", "");
    h.git.reply("status", 0, "", "");
    h.git.reply("rev-list", 0, "0\t1\n", "");
    h.enqueue("notes");
    h.run();

    assert!(h.git.ops().contains(&GitOp::Commit {
        message: "Changes from desk/bob".to_string()
    }));
}
