//! Shell Tool
//!
//! Runs a command through the platform shell in the working directory.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::process::Command;

use agent_core::{AgentError, ParamType, ParameterSchema, Result, Tool, ToolSpec};

use crate::required_str;

/// Tool for running shell commands
pub struct RunShellTool {
    working_dir: PathBuf,
    timeout: Duration,
}

impl RunShellTool {
    pub fn new(working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            working_dir: working_dir.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Tool for RunShellTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "run_shell".into(),
            description: Some(
                "Run a non-destructive shell command (ls, wc, cat, grep, find)".into(),
            ),
            parameters: vec![ParameterSchema::required("cmd", ParamType::String)],
        }
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let cmd = required_str(arguments, "cmd")?;

        tracing::info!(cmd, "Executing shell command");

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(shell)
                .arg(shell_arg)
                .arg(cmd)
                .current_dir(&self.working_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            AgentError::ToolExecution(format!(
                "command timed out after {} seconds",
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| AgentError::ToolExecution(format!("failed to start command: {e}")))?;

        Ok(json!({
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
            "exit_code": output.status.code(),
        }))
    }
}
