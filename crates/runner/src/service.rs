//! One scheduling pass: decide the due set, gate it on requirements, fan
//! out to bounded workers, and reconcile results under single-writer
//! discipline.

use std::{collections::HashSet, sync::Arc};

use {
    tokio::{sync::Semaphore, task::JoinSet},
    tracing::{debug, info, warn},
};

use crate::{
    clock::{to_iso, Clock, SystemClock},
    due::is_due,
    error::Result,
    exec::{CommandRunner, ShellRunner},
    requirements::RequirementSet,
    state::StateStore,
    types::{RunReport, StateFile, TaskOutcome, TaskSpec},
};

/// Ceiling on worker parallelism when no explicit override is given.
const MAX_DEFAULT_WORKERS: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Compute and report decisions but execute nothing and never touch
    /// the state file.
    pub dry_run: bool,
    /// Explicit worker-pool size; `None` sizes the pool to the due set.
    pub max_workers: Option<usize>,
}

/// The scheduler. Owns the state store for the duration of a run; all
/// state mutation happens on the controller, after the workers have
/// joined.
pub struct Runner {
    store: StateStore,
    requirements: RequirementSet,
    executor: Arc<dyn CommandRunner>,
    clock: Arc<dyn Clock>,
    options: RunOptions,
}

impl Runner {
    pub fn new(store: StateStore, options: RunOptions) -> Self {
        Self {
            store,
            requirements: RequirementSet::builtin(),
            executor: Arc::new(ShellRunner { passthrough: false }),
            clock: Arc::new(SystemClock),
            options,
        }
    }

    #[must_use]
    pub fn with_requirements(mut self, requirements: RequirementSet) -> Self {
        self.requirements = requirements;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn CommandRunner>) -> Self {
        self.executor = executor;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Execute one finite pass over the configured tasks.
    ///
    /// Every configured task gets a state record (created or refreshed)
    /// whether or not it runs. The returned report's `exit_code` is the
    /// first non-zero task status in arrival order, or 0.
    pub async fn run_once(&self, tasks: &[TaskSpec]) -> Result<RunReport> {
        let mut state = self.store.load().await;
        let mut report = RunReport {
            dry_run: self.options.dry_run,
            ..RunReport::default()
        };

        let due = self.collect_due(tasks, &mut state, &mut report).await;
        info!(due = due.len(), dry_run = self.options.dry_run, "pass decided");

        let outcomes = self.execute(&due).await;
        report.executed = outcomes.len();

        if self.options.dry_run {
            debug!("dry run: outcomes discarded, state untouched");
            return Ok(report);
        }

        for outcome in &outcomes {
            apply(&mut state, outcome, &mut report);
        }
        self.store.save(&state).await?;
        Ok(report)
    }

    /// Walk the config cadence-major, refresh records, and build the due
    /// set. Requirement checks run here on the controller, before any
    /// worker is dispatched.
    async fn collect_due(
        &self,
        tasks: &[TaskSpec],
        state: &mut StateFile,
        report: &mut RunReport,
    ) -> Vec<TaskSpec> {
        let now = self.clock.now();
        let mut due = Vec::new();
        let mut seen = HashSet::new();

        for spec in tasks {
            let task_id = spec.task_id();
            let record = state.tasks.entry(task_id.clone()).or_default();
            // Keep stored identity in sync with the current config; the
            // command text keys the record, the rest may have changed.
            record.frequency = spec.cadence.to_string();
            record.cmd = spec.command.clone();

            if !is_due(record, spec.cadence, spec.rerun_onfail(), now) {
                debug!(task = %task_id, "skip: not due");
                report.skipped_not_due += 1;
                continue;
            }

            let unmet = self.requirements.unmet(&spec.requires).await;
            if !unmet.is_empty() {
                info!(task = %task_id, ?unmet, "skip: unmet requirements");
                record.last_note = Some(format!("skipped: unmet requirements {unmet:?}"));
                report.skipped_requirements += 1;
                continue;
            }

            // A task id listed twice executes once.
            if seen.insert(task_id) {
                due.push(spec.clone());
            }
        }
        due
    }

    /// Fan the due set out to a bounded pool. Workers only compute
    /// outcome tuples; they never see the state file.
    async fn execute(&self, due: &[TaskSpec]) -> Vec<TaskOutcome> {
        if due.is_empty() {
            return Vec::new();
        }
        let workers = self
            .options
            .max_workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| due.len().min(MAX_DEFAULT_WORKERS));
        debug!(workers, due = due.len(), "dispatching");

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut pool = JoinSet::new();
        for spec in due {
            let task_id = spec.task_id();
            let command = spec.command.clone();
            let semaphore = Arc::clone(&semaphore);
            let executor = Arc::clone(&self.executor);
            let clock = Arc::clone(&self.clock);
            let dry_run = self.options.dry_run;
            pool.spawn(async move {
                // Held for the whole command; bounds parallelism. The
                // semaphore is never closed, so acquisition cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();
                let started = to_iso(clock.now());
                let status = if dry_run {
                    info!(task = %task_id, "would run (dry-run)");
                    0
                } else {
                    info!(task = %task_id, "running");
                    executor.run(&command).await
                };
                let finished = to_iso(clock.now());
                TaskOutcome {
                    task_id,
                    status,
                    started,
                    finished,
                }
            });
        }

        let mut outcomes = Vec::with_capacity(due.len());
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => warn!(%error, "worker panicked"),
            }
        }
        outcomes
    }
}

/// Fold one worker outcome into the snapshot. Idempotent per task id and
/// insensitive to completion order, except that the first non-zero status
/// in arrival order wins the exit code.
fn apply(state: &mut StateFile, outcome: &TaskOutcome, report: &mut RunReport) {
    let record = state.tasks.entry(outcome.task_id.clone()).or_default();
    record.last_attempt = Some(outcome.started.clone());
    record.last_status = Some(outcome.status);
    record.last_note = Some(format!("finished_at={}", outcome.finished));
    if outcome.status == 0 {
        record.last_success = Some(outcome.finished.clone());
        info!(task = %outcome.task_id, "done: ok");
    } else {
        warn!(task = %outcome.task_id, status = outcome.status, "done: failed");
        if report.exit_code == 0 {
            report.exit_code = outcome.status;
        }
    }
}
