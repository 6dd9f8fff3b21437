//! Command execution behind an injectable capability boundary.

use std::process::Stdio;

use {
    async_trait::async_trait,
    tokio::process::Command,
    tracing::warn,
};

/// Runs one shell command to completion and reports its exit code. The
/// scheduler treats execution as opaque so tests can swap in a recorder.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> i32;
}

/// Spawns commands through the system shell.
pub struct ShellRunner {
    /// Let the child write to our stdout/stderr instead of discarding it.
    pub passthrough: bool,
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> i32 {
        let mut cmd = shell_command(command);
        if self.passthrough {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        match cmd.status().await {
            // No code means the child died on a signal.
            Ok(status) => status.code().unwrap_or(1),
            Err(error) => {
                warn!(command, %error, "failed to spawn command");
                127
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(target_os = "windows")]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, not(target_os = "windows")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command_is_zero() {
        let runner = ShellRunner { passthrough: false };
        assert_eq!(runner.run("true").await, 0);
    }

    #[tokio::test]
    async fn test_exit_code_is_propagated() {
        let runner = ShellRunner { passthrough: false };
        assert_eq!(runner.run("exit 7").await, 7);
    }

    #[tokio::test]
    async fn test_missing_command_reports_shell_code() {
        let runner = ShellRunner { passthrough: false };
        // The shell itself reports 127 for an unknown command.
        assert_eq!(runner.run("definitely_not_a_command_9481").await, 127);
    }

    #[tokio::test]
    async fn test_output_is_discarded_without_passthrough() {
        let runner = ShellRunner { passthrough: false };
        // Writing to a closed stdout would fail; null sinks must not.
        assert_eq!(runner.run("echo hello").await, 0);
    }
}
