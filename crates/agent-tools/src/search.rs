//! Search Tools
//!
//! Glob matching and regex search over the working directory. Both walk the
//! filesystem synchronously on the blocking pool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::MatchOptions;
use regex::Regex;
use serde_json::{Map, Value, json};
use walkdir::WalkDir;

use agent_core::{AgentError, ParamType, ParameterSchema, Result, Tool, ToolSpec};

use crate::required_str;

/// Maximum grep hits returned
pub const MAX_GREP_HITS: usize = 50;

const NO_MATCHES: &str = "none";

fn search_params() -> Vec<ParameterSchema> {
    vec![
        ParameterSchema::required("pat", ParamType::String),
        ParameterSchema::optional("path", ParamType::String)
            .describe("Directory to search, relative to the working directory"),
    ]
}

fn search_base(root: &Path, arguments: &Map<String, Value>) -> PathBuf {
    match arguments.get("path").and_then(Value::as_str) {
        Some(path) if !path.is_empty() && path != "." => root.join(path),
        _ => root.to_path_buf(),
    }
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AgentError::ToolExecution(format!("search task failed: {e}")))?
}

/// Tool for listing files that match a glob pattern
pub struct GlobFilesTool {
    working_dir: PathBuf,
}

impl GlobFilesTool {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for GlobFilesTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "glob_files".into(),
            description: Some("List files matching a glob pattern (supports **)".into()),
            parameters: search_params(),
        }
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let pat = required_str(arguments, "pat")?.to_string();
        let base = search_base(&self.working_dir, arguments);
        let root = self.working_dir.clone();

        let files = blocking(move || glob_paths(&root, &base, &pat)).await?;
        tracing::debug!(matches = files.len(), "Glob finished");

        if files.is_empty() {
            Ok(json!(NO_MATCHES))
        } else {
            Ok(json!(files.join("\n")))
        }
    }
}

fn glob_paths(root: &Path, base: &Path, pat: &str) -> Result<Vec<String>> {
    let pattern = base.join(pat);
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let entries = glob::glob_with(&pattern.to_string_lossy(), options)
        .map_err(|e| AgentError::ToolExecution(format!("invalid glob pattern '{pat}': {e}")))?;

    let mut files: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .map(|p| relative(root, &p))
        .collect();
    files.sort();
    Ok(files)
}

/// Tool for searching file contents with a regex
pub struct GrepFilesTool {
    working_dir: PathBuf,
}

impl GrepFilesTool {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for GrepFilesTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "grep_files".into(),
            description: Some(format!(
                "Search file contents with a regex; returns up to {MAX_GREP_HITS} file:line:text hits"
            )),
            parameters: search_params(),
        }
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let pat = required_str(arguments, "pat")?;
        let regex = Regex::new(pat)
            .map_err(|e| AgentError::ToolExecution(format!("invalid regex '{pat}': {e}")))?;
        let base = search_base(&self.working_dir, arguments);
        let root = self.working_dir.clone();

        let hits = blocking(move || Ok(grep_paths(&root, &base, &regex))).await?;
        tracing::debug!(hits = hits.len(), "Grep finished");

        if hits.is_empty() {
            Ok(json!(NO_MATCHES))
        } else {
            Ok(json!(hits.join("\n")))
        }
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn grep_paths(root: &Path, base: &Path, regex: &Regex) -> Vec<String> {
    let mut hits = Vec::new();

    let files = WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file());

    for entry in files {
        // Binary and unreadable files are skipped
        let Ok(text) = std::fs::read_to_string(entry.path()) else {
            continue;
        };

        let display = relative(root, entry.path());
        for (i, line) in text.lines().enumerate() {
            if regex.is_match(line) {
                hits.push(format!("{display}:{}:{}", i + 1, line.trim_end()));
                if hits.len() >= MAX_GREP_HITS {
                    return hits;
                }
            }
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("main.py"), "import os\nprint('hi')\n").unwrap();
        std::fs::write(dir.path().join("util.py"), "def helper():\n    return 1\n").unwrap();
        std::fs::write(dir.path().join("src/nested/deep.py"), "print('deep')\n").unwrap();
        std::fs::write(dir.path().join(".git/config"), "print('hidden')\n").unwrap();
        std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x70]).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_glob_top_level() {
        let dir = fixture();
        let out = GlobFilesTool::new(dir.path())
            .invoke(&args(json!({"pat": "*.py"})))
            .await
            .unwrap();
        assert_eq!(out, json!("main.py\nutil.py"));
    }

    #[tokio::test]
    async fn test_glob_recursive_and_subdir() {
        let dir = fixture();
        let tool = GlobFilesTool::new(dir.path());

        let all = tool.invoke(&args(json!({"pat": "**/*.py"}))).await.unwrap();
        assert_eq!(all, json!("main.py\nsrc/nested/deep.py\nutil.py"));

        let sub = tool
            .invoke(&args(json!({"pat": "*.py", "path": "src/nested"})))
            .await
            .unwrap();
        assert_eq!(sub, json!("src/nested/deep.py"));
    }

    #[tokio::test]
    async fn test_glob_none() {
        let dir = fixture();
        let out = GlobFilesTool::new(dir.path())
            .invoke(&args(json!({"pat": "*.rs"})))
            .await
            .unwrap();
        assert_eq!(out, json!("none"));
    }

    #[tokio::test]
    async fn test_grep() {
        let dir = fixture();
        let out = GrepFilesTool::new(dir.path())
            .invoke(&args(json!({"pat": "print\\("})))
            .await
            .unwrap();
        assert_eq!(
            out,
            json!("main.py:2:print('hi')\nsrc/nested/deep.py:1:print('deep')")
        );
    }

    #[tokio::test]
    async fn test_grep_caps_hits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("many.txt"), "hit\n".repeat(80)).unwrap();

        let out = GrepFilesTool::new(dir.path())
            .invoke(&args(json!({"pat": "hit"})))
            .await
            .unwrap();
        assert_eq!(out.as_str().unwrap().lines().count(), MAX_GREP_HITS);
    }

    #[tokio::test]
    async fn test_grep_bad_regex() {
        let dir = fixture();
        let err = GrepFilesTool::new(dir.path())
            .invoke(&args(json!({"pat": "("})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "execution_failed");
    }
}
