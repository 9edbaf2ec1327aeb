//! File Tools
//!
//! Line-numbered reads and whole-file writes, relative to the working
//! directory.

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use agent_core::{AgentError, ParamType, ParameterSchema, Result, Tool, ToolSpec};

use crate::{optional_count, required_str};

/// Tool for reading a range of lines from a file
pub struct ReadFileTool {
    working_dir: PathBuf,
}

impl ReadFileTool {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "read_file".into(),
            description: Some("Read a file with line numbers, optionally a window of lines".into()),
            parameters: vec![
                ParameterSchema::required("path", ParamType::String),
                ParameterSchema::optional("offset", ParamType::Integer)
                    .describe("Zero-based index of the first line"),
                ParameterSchema::optional("limit", ParamType::Integer)
                    .describe("Number of lines to return"),
            ],
        }
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let path = self.working_dir.join(required_str(arguments, "path")?);
        let offset = optional_count("read_file", arguments, "offset")?.unwrap_or(0);
        let limit = optional_count("read_file", arguments, "limit")?;

        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            AgentError::ToolExecution(format!("cannot read {}: {e}", path.display()))
        })?;

        Ok(json!(number_lines(&text, offset, limit)))
    }
}

/// Render lines `offset..offset+limit` prefixed with their 1-based number
fn number_lines(text: &str, offset: usize, limit: Option<usize>) -> String {
    let mut out = String::new();
    let lines = text.split_inclusive('\n').enumerate().skip(offset);

    for (i, line) in lines.take(limit.unwrap_or(usize::MAX)) {
        let _ = write!(out, "{:4}| {line}", i + 1);
    }

    out
}

/// Tool for writing a whole file
pub struct WriteFileTool {
    working_dir: PathBuf,
}

impl WriteFileTool {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "write_file".into(),
            description: Some("Create or overwrite a file with the given content".into()),
            parameters: vec![
                ParameterSchema::required("path", ParamType::String),
                ParameterSchema::required("content", ParamType::String),
            ],
        }
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let path = self.working_dir.join(required_str(arguments, "path")?);
        let content = required_str(arguments, "content")?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        tracing::info!(path = %path.display(), bytes = content.len(), "Wrote file");
        Ok(json!("ok"))
    }
}
