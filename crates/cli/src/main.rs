//! napcron: run YAML-configured commands on hourly/daily/weekly/monthly
//! cadences, gated on environmental requirements. Meant to be invoked
//! from cron; each invocation is one finite pass.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use {
    clap::Parser,
    tracing::{error, info},
    tracing_subscriber::EnvFilter,
};

use napcron_runner::{
    exec::ShellRunner,
    lock::LockFile,
    state::StateStore,
    RunOptions, Runner,
};

/// Exit code for setup failures (missing config, unreadable or
/// unwritable paths), distinct from any task-derived code.
const EXIT_FATAL: u8 = 2;

#[derive(Parser)]
#[command(
    name = "napcron",
    version,
    about = "Tiny, parallel, poor-man's anacron with requirements"
)]
struct Cli {
    /// Path to the YAML task list (default: ~/.napcron.yaml, created if
    /// missing).
    config: Option<PathBuf>,

    /// Path to the JSON state file.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Report what would run; execute nothing, never touch state.
    #[arg(long)]
    dry_run: bool,

    /// Verbose output (also passes task output through to the terminal).
    #[arg(short, long)]
    verbose: bool,

    /// Max parallel jobs (default: number of due tasks, capped at 32).
    #[arg(long)]
    max_workers: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_telemetry(&cli);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_telemetry(cli: &Cli) {
    let default = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = match cli.config {
        Some(path) => {
            if !path.exists() {
                error!(path = %path.display(), "config not found");
                return Ok(ExitCode::from(EXIT_FATAL));
            }
            path
        }
        None => {
            let path = napcron_config::default_config_path()?;
            napcron_config::ensure_default_config(&path)?;
            path
        }
    };

    let state_path = match cli.state {
        Some(path) => path,
        None => napcron_config::default_state_path(&config_path)?,
    };

    // One runner per state file. Losing the lock is a clean no-op so a
    // still-running previous pass is never disturbed.
    let Some(lock) = LockFile::acquire(&state_path)? else {
        info!("another instance appears to be running, exiting");
        return Ok(ExitCode::SUCCESS);
    };

    let tasks = napcron_config::load_tasks(&config_path)?;
    info!(
        config = %config_path.display(),
        state = %state_path.display(),
        tasks = tasks.len(),
        "starting pass"
    );

    let runner = Runner::new(
        StateStore::new(&state_path),
        RunOptions {
            dry_run: cli.dry_run,
            max_workers: cli.max_workers,
        },
    )
    .with_executor(Arc::new(ShellRunner {
        passthrough: cli.verbose,
    }));

    // The lock's Drop guard covers the error path; release explicitly on
    // the happy path.
    let report = runner.run_once(&tasks).await;
    lock.release();
    let report = report?;

    info!(
        executed = report.executed,
        skipped_not_due = report.skipped_not_due,
        skipped_requirements = report.skipped_requirements,
        exit = report.exit_code,
        "pass complete"
    );
    Ok(task_exit_code(report.exit_code))
}

/// Map a task's exit status onto our own. Statuses outside the 1..=255
/// range (signals, platform oddities) collapse to 1.
fn task_exit_code(status: i32) -> ExitCode {
    match u8::try_from(status) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::from(1),
    }
}
