//! Terminal Rendering
//!
//! ANSI presentation of the session: banner, prompt, assistant text and a
//! one-line summary per tool call.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use agent_core::tool::is_failure;
use agent_core::{AgentError, ToolCall, ToolRegistry, TurnObserver};
use serde_json::Value;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";

/// Stdout view of one session
pub struct Terminal {
    tools: Arc<ToolRegistry>,
    width: usize,
}

impl Terminal {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|c| c.parse().ok())
            .unwrap_or(80);
        Self { tools, width }
    }

    pub fn banner(&self, model: &str, cwd: &Path) {
        println!();
        println!(
            "               {BOLD}codeloop{RESET} | {DIM}{model}{RESET} | {DIM}cwd={}{RESET}",
            cwd.display()
        );
        println!();
    }

    pub fn separator(&self) {
        println!("{DIM}{}{RESET}", "─".repeat(self.width));
    }

    pub fn prompt(&self) -> io::Result<()> {
        self.separator();
        print!("{BLUE}❯{RESET} ");
        io::stdout().flush()
    }

    pub fn goodbye(&self) {
        println!("{YELLOW}Exiting codeloop{RESET}");
    }

    pub fn cleared(&self) {
        println!("{DIM}Conversation cleared{RESET}\n");
    }

    pub fn error(&self, error: &AgentError) {
        println!("{RED}✗ {}{RESET}", error.user_message());
    }

    /// First declared argument of the call, for the summary line
    fn key_argument(&self, call: &ToolCall) -> String {
        self.tools
            .spec(&call.name)
            .and_then(|spec| spec.parameters.first())
            .and_then(|param| call.argument_text(&param.name))
            .unwrap_or_default()
    }
}

/// "glob_files" → "Glob", "run_shell" → "Run Shell"
fn label(name: &str) -> String {
    name.replace("_files", "")
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dimmed detail line shown under a finished tool call
fn detail(call: &ToolCall, output: &Value) -> Option<String> {
    if is_failure(output) {
        let message = output["error"]["message"].as_str().unwrap_or("failed");
        return Some(format!("{RED}failed: {message}"));
    }

    let text = output.as_str().unwrap_or_default();
    let path = call.argument_text("path").unwrap_or_default();

    match call.name.as_str() {
        "read_file" => Some(format!("{path} ... +{} lines", text.lines().count())),
        "glob_files" => {
            let files: Vec<&str> = text.lines().collect();
            match files.first() {
                Some(first) if *first != "none" => {
                    Some(format!("{first} ... +{} files", files.len() - 1))
                }
                _ => Some("none".into()),
            }
        }
        "grep_files" => {
            let hits = if text == "none" { 0 } else { text.lines().count() };
            Some(format!("{hits} matches"))
        }
        "write_file" => Some(format!("wrote {path}")),
        "run_shell" => output
            .get("exit_code")
            .and_then(Value::as_i64)
            .filter(|code| *code != 0)
            .map(|code| format!("exit code {code}")),
        _ => None,
    }
}

impl TurnObserver for Terminal {
    fn assistant_text(&mut self, text: &str) {
        println!("{CYAN}=>{RESET} {text}");
    }

    fn tool_started(&mut self, call: &ToolCall) {
        println!(
            "{GREEN}● {}({}){RESET}",
            label(&call.name),
            self.key_argument(call)
        );
    }

    fn tool_finished(&mut self, call: &ToolCall, output: &Value) {
        if let Some(line) = detail(call, output) {
            println!("{DIM}  └ {line}{RESET}");
        }
    }
}
