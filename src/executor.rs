//! Runs deploy scripts.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info};

use crate::error::{DeployError, Result};

/// Captured result of a finished deploy script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub exit_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait DeployExecutor: Send + Sync {
    /// Runs `script_path` to completion. A non-zero exit is an error.
    async fn execute(&self, script_path: &str) -> Result<ExecutionReport>;
}

/// Executes scripts through `sh -c`, buffering both output streams.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    timeout: Option<Duration>,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill scripts that are still running after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl DeployExecutor for ShellExecutor {
    async fn execute(&self, script_path: &str) -> Result<ExecutionReport> {
        info!("Running: sh -c {}", script_path);
        let child = Command::new("sh")
            .arg("-c")
            .arg(script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(self.timeout.is_some())
            .spawn()
            .map_err(|e| {
                error!("Script '{}' failed to start: {}", script_path, e);
                DeployError::execution(format!("failed to start: {}", e))
            })?;

        // The wait runs on its own task so a dropped request does not stop the
        // script. On timeout the child is dropped inside the task and killed.
        let limit = self.timeout;
        let joined = tokio::spawn(async move {
            match limit {
                Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                    .await
                    .ok(),
                None => Some(child.wait_with_output().await),
            }
        })
        .await;

        let waited = joined.map_err(|e| {
            error!("Script '{}' wait task failed: {}", script_path, e);
            DeployError::execution(format!("wait task failed: {}", e))
        })?;
        let Some(waited) = waited else {
            let limit = self.timeout.unwrap_or_default();
            error!("Script '{}' timed out after {:?}", script_path, limit);
            return Err(DeployError::execution(format!(
                "timed out after {} seconds",
                limit.as_secs()
            )));
        };
        let output = waited.map_err(|e| {
            error!("Script '{}' could not be awaited: {}", script_path, e);
            DeployError::execution(format!("failed to collect output: {}", e))
        })?;

        let report = ExecutionReport {
            exit_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if report.exit_ok {
            info!("Script '{}' output:\n{}", script_path, report.stdout);
            Ok(report)
        } else {
            error!(
                "Script '{}' failed ({}):\n{}",
                script_path, output.status, report.stderr
            );
            Err(DeployError::Execution {
                reason: output.status.to_string(),
                stdout: report.stdout,
                stderr: report.stderr,
            })
        }
    }
}
