//! # agent-tools
//!
//! The local capabilities the model can call. Every tool resolves relative
//! paths against the session working directory.
//!
//! | Tool         | Effect                                  |
//! |--------------|-----------------------------------------|
//! | `run_shell`  | runs `sh -c <cmd>`, returns stdout/stderr/exit code |
//! | `read_file`  | returns numbered lines                  |
//! | `write_file` | creates or overwrites a file            |
//! | `glob_files` | lists paths matching a glob             |
//! | `grep_files` | regex search, first 50 hits             |

pub mod fs;
pub mod search;
pub mod shell;

use serde_json::{Map, Value};

use agent_core::{AgentError, Result, SessionConfig, ToolRegistry};

pub use fs::{ReadFileTool, WriteFileTool};
pub use search::{GlobFilesTool, GrepFilesTool};
pub use shell::RunShellTool;

/// Registry with every capability, in the order the model sees them
pub fn default_registry(config: &SessionConfig) -> Result<ToolRegistry> {
    let dir = &config.working_dir;
    let mut tools = ToolRegistry::new();

    tools.register(RunShellTool::new(dir, config.command_timeout))?;
    tools.register(ReadFileTool::new(dir))?;
    tools.register(WriteFileTool::new(dir))?;
    tools.register(GlobFilesTool::new(dir))?;
    tools.register(GrepFilesTool::new(dir))?;

    Ok(tools)
}

pub(crate) fn required_str<'a>(arguments: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::ToolExecution(format!("missing string argument '{name}'")))
}

/// Non-negative integer argument
pub(crate) fn optional_count(
    tool: &str,
    arguments: &Map<String, Value>,
    name: &str,
) -> Result<Option<usize>> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| AgentError::InvalidArguments {
                tool: tool.to_string(),
                reason: format!("'{name}' must be a non-negative integer"),
            }),
    }
}
