//! Session Configuration
//!
//! Everything read from the environment at startup, built once and passed by
//! reference to the model client and the agent.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AgentError, Result};

pub const DEFAULT_MODEL: &str = "gpt-5.2";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Session configuration
#[derive(Clone)]
pub struct SessionConfig {
    /// Model identifier sent with every request
    pub model: String,

    /// Bearer credential for the endpoint
    pub api_key: String,

    /// Endpoint base URL, without the `/responses` suffix
    pub base_url: String,

    /// Directory tools resolve relative paths against
    pub working_dir: PathBuf,

    /// Upper bound on generated tokens per call
    pub max_output_tokens: u32,

    /// Model calls allowed within one user turn
    pub max_iterations: usize,

    /// Timeout for one model call
    pub request_timeout: Duration,

    /// Timeout for one shell command
    pub command_timeout: Duration,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("working_dir", &self.working_dir)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_iterations", &self.max_iterations)
            .field("request_timeout", &self.request_timeout)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl SessionConfig {
    /// Config with defaults for everything but the credential
    pub fn new(api_key: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            working_dir: working_dir.into(),
            max_output_tokens: 4096,
            max_iterations: 50,
            request_timeout: Duration::from_secs(120),
            command_timeout: Duration::from_secs(60),
        }
    }

    /// Read from the process environment, rooted at the current directory
    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::from_lookup(cwd, |key| std::env::var(key).ok())
    }

    /// Read from an arbitrary key lookup
    pub fn from_lookup<F>(working_dir: PathBuf, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::Config("OPENAI_API_KEY missing".into()))?;

        let mut config = Self::new(api_key, working_dir);

        if let Some(model) = lookup("MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(n) = parse_var(&lookup, "CODELOOP_MAX_OUTPUT_TOKENS")? {
            config.max_output_tokens = n;
        }
        if let Some(n) = parse_var(&lookup, "CODELOOP_MAX_ITERATIONS")? {
            config.max_iterations = n;
        }
        if let Some(secs) = parse_var(&lookup, "CODELOOP_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "CODELOOP_COMMAND_TIMEOUT_SECS")? {
            config.command_timeout = Duration::from_secs(secs);
        }

        if config.max_iterations == 0 {
            return Err(AgentError::Config(
                "CODELOOP_MAX_ITERATIONS must be at least 1".into(),
            ));
        }

        Ok(config)
    }

    /// Full URL of the responses endpoint
    pub fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url)
    }

    /// Fixed system instructions for the session
    pub fn instructions(&self) -> String {
        format!(
            "You are a careful & concise coding assistant with tool access.\n\
             Current directory: {}\n\
             Rules:\n\
             - Use tools when you need concrete data\n\
             - Never assume file contents\n\
             - Do not run destructive shell commands\n\
             - Use tools silently to gather evidence\n\
             - Do NOT explain while using tools\n\
             - After all tools are done, produce ONE concise output_text\n",
            self.working_dir.display()
        )
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| AgentError::Config(format!("{key} is not a valid number: {raw}")))
        })
        .transpose()
}
