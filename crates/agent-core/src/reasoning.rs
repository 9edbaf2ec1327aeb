//! Agent Loop
//!
//! Drives one user turn through the request → act → observe cycle:
//!
//! ```text
//! AwaitingUserInput ──user line──▶ CallingModel ──tool calls──▶ DispatchingTools
//!        ▲                             │    ▲                          │
//!        │                     no tool │    └──────────────────────────┘
//!        │                       calls ▼
//!        └──────────────────────── TurnComplete
//! ```
//!
//! Control commands (exit, clear) are handled before a turn starts and never
//! reach the model.

use std::sync::Arc;

use serde_json::Value;

use crate::config::SessionConfig;
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Turn};
use crate::provider::{ModelClient, OutputItem};
use crate::session::{Session, UserInput};
use crate::tool::{ToolCall, ToolRegistry, ToolSpec, failure_payload};

/// Where the loop currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    AwaitingUserInput,
    CallingModel,
    DispatchingTools,
    TurnComplete,
}

/// Receives what happens during a turn, in order
pub trait TurnObserver: Send {
    /// Text the model produced
    fn assistant_text(&mut self, _text: &str) {}

    /// A tool is about to run
    fn tool_started(&mut self, _call: &ToolCall) {}

    /// A tool finished (successfully or with a failure payload)
    fn tool_finished(&mut self, _call: &ToolCall, _output: &Value) {}
}

impl TurnObserver for () {}

/// What one completed user turn produced
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnSummary {
    /// Every text segment emitted, in order
    pub texts: Vec<String>,

    /// Tool calls dispatched
    pub tool_calls: usize,

    /// Model calls made
    pub model_calls: usize,
}

impl TurnSummary {
    pub fn final_text(&self) -> String {
        self.texts.join("\n")
    }
}

/// Outcome of one prompt line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// The user asked to leave
    Exit,
    /// The conversation was reset
    Cleared,
    /// Blank line, nothing happened
    Ignored,
    /// A user turn ran to completion
    Completed(TurnSummary),
}

/// The main Agent struct
pub struct Agent {
    client: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    specs: Vec<ToolSpec>,
    max_iterations: usize,
    session: Session,
    state: LoopState,
}

impl Agent {
    /// Create a new agent with an empty session
    pub fn new(
        client: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        config: &SessionConfig,
    ) -> Self {
        Self::with_limit(client, tools, config.max_iterations)
    }

    fn with_limit(
        client: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        max_iterations: usize,
    ) -> Self {
        let specs = tools.describe();
        let session = Session::new();
        tracing::info!(session = %session.id, tools = specs.len(), "Agent session started");

        Self {
            client,
            tools,
            specs,
            max_iterations,
            session,
            state: LoopState::AwaitingUserInput,
        }
    }

    /// Handle one prompt line
    pub async fn submit(
        &mut self,
        line: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<Submission> {
        match UserInput::parse(line) {
            UserInput::Exit => Ok(Submission::Exit),
            UserInput::Clear => {
                self.clear();
                Ok(Submission::Cleared)
            }
            UserInput::Empty => Ok(Submission::Ignored),
            UserInput::Message(text) => self
                .run_turn(text, observer)
                .await
                .map(Submission::Completed),
        }
    }

    /// Run one user turn until the model stops asking for tools.
    ///
    /// On error the turn is abandoned but every turn already appended stays
    /// in the log.
    pub async fn run_turn(
        &mut self,
        text: impl Into<String>,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnSummary> {
        self.session.record(Turn::user(text));

        let result = self.drive(observer).await;
        if let Err(e) = &result {
            tracing::warn!(session = %self.session.id, error = %e, "Turn aborted");
        }

        self.state = LoopState::AwaitingUserInput;
        result
    }

    async fn drive(&mut self, observer: &mut dyn TurnObserver) -> Result<TurnSummary> {
        let mut summary = TurnSummary::default();

        loop {
            if summary.model_calls >= self.max_iterations {
                return Err(AgentError::MaxIterations(self.max_iterations));
            }

            self.state = LoopState::CallingModel;
            summary.model_calls += 1;

            let response = self
                .client
                .complete(self.session.conversation().turns(), &self.specs)
                .await?;

            tracing::debug!(
                items = response.items.len(),
                tool_calls = response.tool_calls().count(),
                usage = ?response.usage,
                "Model responded"
            );

            if !response.has_tool_calls() {
                self.state = LoopState::TurnComplete;
                for item in response.items {
                    if let OutputItem::Text { text } = item {
                        self.emit_text(text, observer, &mut summary);
                    }
                }
                return Ok(summary);
            }

            self.state = LoopState::DispatchingTools;
            for item in response.items {
                match item {
                    OutputItem::Text { text } => self.emit_text(text, observer, &mut summary),
                    OutputItem::ToolCall(call) => {
                        self.dispatch(call, None, observer).await;
                        summary.tool_calls += 1;
                    }
                    OutputItem::MalformedCall { call, reason } => {
                        self.dispatch(call, Some(reason), observer).await;
                        summary.tool_calls += 1;
                    }
                }
            }
        }
    }

    fn emit_text(
        &mut self,
        text: String,
        observer: &mut dyn TurnObserver,
        summary: &mut TurnSummary,
    ) {
        observer.assistant_text(&text);
        self.session.record(Turn::assistant(text.clone()));
        summary.texts.push(text);
    }

    /// Record the request, run it (or reject it when its arguments never
    /// decoded) and record the output right after it.
    async fn dispatch(
        &mut self,
        call: ToolCall,
        malformed: Option<String>,
        observer: &mut dyn TurnObserver,
    ) {
        tracing::debug!(tool = %call.name, call_id = %call.call_id, "Executing tool");

        observer.tool_started(&call);
        self.session.record(Turn::ToolRequest(call.clone()));

        let output = match malformed {
            None => self.tools.dispatch_call(&call).await,
            Some(reason) => {
                tracing::warn!(tool = %call.name, call_id = %call.call_id, %reason, "Undecodable tool arguments");
                failure_payload(&AgentError::InvalidArguments {
                    tool: call.name.clone(),
                    reason,
                })
            }
        };

        observer.tool_finished(&call, &output);
        self.session.record(Turn::tool_output(call.call_id, output));
    }

    /// Reset the conversation log
    pub fn clear(&mut self) {
        self.session.clear();
        tracing::info!(session = %self.session.id, "Conversation cleared");
    }

    /// Conversation so far
    pub const fn conversation(&self) -> &Conversation {
        self.session.conversation()
    }

    /// Current session
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Current loop state
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Shared tool registry
    pub const fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Model identifier in use
    pub fn model(&self) -> &str {
        self.client.model()
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    client: Option<Arc<dyn ModelClient>>,
    tools: ToolRegistry,
    max_iterations: usize,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            tools: ToolRegistry::new(),
            max_iterations: 50,
        }
    }

    pub fn client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Result<Self> {
        self.tools.register(tool)?;
        Ok(self)
    }

    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let client = self
            .client
            .ok_or_else(|| AgentError::Config("Model client is required".into()))?;

        if self.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        Ok(Agent::with_limit(
            client,
            Arc::new(self.tools),
            self.max_iterations,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Map, json};

    use super::*;
    use crate::provider::ModelResponse;
    use crate::tool::{ParamType, ParameterSchema, Tool};

    /// Replays canned responses and records every log it was sent
    #[derive(Default)]
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<ModelResponse>>>,
        requests: Mutex<Vec<Vec<Turn>>>,
        declared: Mutex<Vec<Vec<ToolSpec>>>,
        repeat_tool_call: bool,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<ModelResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            })
        }

        fn requests(&self) -> Vec<Vec<Turn>> {
            self.requests.lock().unwrap().clone()
        }

        fn declared(&self) -> Vec<Vec<ToolSpec>> {
            self.declared.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn complete(&self, log: &[Turn], tools: &[ToolSpec]) -> Result<ModelResponse> {
            self.declared.lock().unwrap().push(tools.to_vec());
            let mut requests = self.requests.lock().unwrap();
            requests.push(log.to_vec());

            if self.repeat_tool_call {
                let id = format!("loop-{}", requests.len());
                return Ok(ModelResponse::new(vec![call_item(&id, "glob_files", json!({"pat": "*"}))]));
            }

            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AgentError::Transport("script exhausted".into())))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    struct FakeGlob;

    #[async_trait]
    impl Tool for FakeGlob {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "glob_files".into(),
                description: None,
                parameters: vec![
                    ParameterSchema::required("pat", ParamType::String),
                    ParameterSchema::optional("path", ParamType::String),
                ],
            }
        }

        async fn invoke(&self, arguments: &Map<String, Value>) -> Result<Value> {
            let pat = arguments.get("pat").and_then(Value::as_str).unwrap_or_default();
            Ok(json!(format!("a{}\nb{}", &pat[1..], &pat[1..])))
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl TurnObserver for Recorder {
        fn assistant_text(&mut self, text: &str) {
            self.events.push(format!("text:{text}"));
        }

        fn tool_started(&mut self, call: &ToolCall) {
            self.events.push(format!("start:{}", call.call_id));
        }

        fn tool_finished(&mut self, call: &ToolCall, _output: &Value) {
            self.events.push(format!("done:{}", call.call_id));
        }
    }

    fn call_item(id: &str, name: &str, args: Value) -> OutputItem {
        OutputItem::ToolCall(ToolCall::new(id, name, args.as_object().cloned().unwrap_or_default()))
    }

    fn text_item(text: &str) -> OutputItem {
        OutputItem::Text { text: text.into() }
    }

    fn agent(client: Arc<ScriptedClient>) -> Agent {
        AgentBuilder::new()
            .client(client)
            .tool(FakeGlob)
            .unwrap()
            .max_iterations(5)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_text_only_turns_interleave() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::text("one")),
            Ok(ModelResponse::text("two")),
            Ok(ModelResponse::text("three")),
        ]);
        let mut agent = agent(client.clone());

        for q in ["a", "b", "c"] {
            agent.submit(q, &mut ()).await.unwrap();
        }

        assert_eq!(
            agent.conversation().turns(),
            &[
                Turn::user("a"),
                Turn::assistant("one"),
                Turn::user("b"),
                Turn::assistant("two"),
                Turn::user("c"),
                Turn::assistant("three"),
            ]
        );
        assert_eq!(client.requests()[2].len(), 5);
        assert_eq!(agent.state(), LoopState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn test_list_files_scenario() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::new(vec![call_item("c1", "glob_files", json!({"pat": "*.py"}))])),
            Ok(ModelResponse::text("Two python files.")),
        ]);
        let mut agent = agent(client.clone());
        let mut recorder = Recorder::default();

        let outcome = agent.submit("list files", &mut recorder).await.unwrap();

        let Submission::Completed(summary) = outcome else {
            panic!("expected a completed turn");
        };
        assert_eq!(summary.final_text(), "Two python files.");
        assert_eq!(summary.tool_calls, 1);
        assert_eq!(summary.model_calls, 2);

        let turns = agent.conversation().turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0], Turn::user("list files"));
        assert!(matches!(&turns[1], Turn::ToolRequest(call) if call.name == "glob_files"));
        assert_eq!(turns[2], Turn::tool_output("c1", json!("a.py\nb.py")));
        assert_eq!(turns[3], Turn::assistant("Two python files."));

        let requests = client.requests();
        assert_eq!(requests[1].len(), 3);
        assert_eq!(recorder.events, vec!["start:c1", "done:c1", "text:Two python files."]);
    }

    #[tokio::test]
    async fn test_every_request_answered_before_next_call() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::new(vec![
                call_item("c1", "glob_files", json!({"pat": "*.rs"})),
                call_item("c2", "glob_files", json!({"pat": "*.md"})),
            ])),
            Ok(ModelResponse::new(vec![call_item("c3", "glob_files", json!({"pat": "*.toml"}))])),
            Ok(ModelResponse::text("done")),
        ]);
        let mut agent = agent(client.clone());
        agent.submit("survey", &mut ()).await.unwrap();

        for request in client.requests() {
            let log = Conversation::from_turns(request);
            assert!(log.unanswered_calls().is_empty());
        }

        let ids: Vec<_> = agent
            .conversation()
            .turns()
            .iter()
            .filter_map(Turn::call_id)
            .collect();
        assert_eq!(ids, vec!["c1", "c1", "c2", "c2", "c3", "c3"]);
        assert!(agent.conversation().check_pairing().is_ok());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fed_back() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::new(vec![call_item("c1", "delete_everything", json!({}))])),
            Ok(ModelResponse::text("That tool does not exist.")),
        ]);
        let mut agent = agent(client.clone());

        let outcome = agent.submit("go", &mut ()).await.unwrap();
        assert!(matches!(outcome, Submission::Completed(_)));

        let Turn::ToolOutput { output, .. } = &agent.conversation().turns()[2] else {
            panic!("expected tool output");
        };
        assert_eq!(output["error"]["kind"], "unknown_tool");
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_fed_back() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::new(vec![call_item("c1", "glob_files", json!({"pattern": "*"}))])),
            Ok(ModelResponse::text("retrying")),
        ]);
        let mut agent = agent(client);
        agent.submit("go", &mut ()).await.unwrap();

        let Turn::ToolOutput { output, .. } = &agent.conversation().turns()[2] else {
            panic!("expected tool output");
        };
        assert_eq!(output["error"]["kind"], "invalid_arguments");
    }

    #[tokio::test]
    async fn test_mixed_response_emits_text_then_dispatches() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::new(vec![
                text_item("checking"),
                call_item("c1", "glob_files", json!({"pat": "*.rs"})),
            ])),
            Ok(ModelResponse::text("found two")),
        ]);
        let mut agent = agent(client);
        let mut recorder = Recorder::default();

        let Submission::Completed(summary) = agent.submit("go", &mut recorder).await.unwrap() else {
            panic!("expected a completed turn");
        };

        assert_eq!(recorder.events, vec!["text:checking", "start:c1", "done:c1", "text:found two"]);
        assert_eq!(summary.texts, vec!["checking", "found two"]);
        assert_eq!(summary.model_calls, 2);
        assert_eq!(agent.conversation().turns()[1], Turn::assistant("checking"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_answered_alongside_valid_call() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::new(vec![
                call_item("c1", "glob_files", json!({"pat": "*.py"})),
                OutputItem::MalformedCall {
                    call: ToolCall::new("c2", "read_file", Map::new()),
                    reason: "EOF while parsing a string at line 1 column 16".into(),
                },
            ])),
            Ok(ModelResponse::text("retrying the read")),
        ]);
        let mut agent = agent(client.clone());
        let mut recorder = Recorder::default();

        let Submission::Completed(summary) = agent.submit("read main", &mut recorder).await.unwrap() else {
            panic!("expected a completed turn");
        };
        assert_eq!(summary.tool_calls, 2);
        assert_eq!(summary.model_calls, 2);
        assert_eq!(recorder.events[..4], ["start:c1", "done:c1", "start:c2", "done:c2"]);

        let turns = agent.conversation().turns();
        assert_eq!(turns[2], Turn::tool_output("c1", json!("a.py\nb.py")));
        let Turn::ToolOutput { call_id, output } = &turns[4] else {
            panic!("expected tool output");
        };
        assert_eq!(call_id, "c2");
        assert_eq!(output["error"]["kind"], "invalid_arguments");
        assert!(output["error"]["message"].as_str().unwrap().contains("EOF while parsing"));

        let second = Conversation::from_turns(client.requests()[1].clone());
        assert_eq!(second.len(), 5);
        assert!(second.unanswered_calls().is_empty());
    }

    #[tokio::test]
    async fn test_tool_declarations_fixed_for_session() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::new(vec![call_item("c1", "glob_files", json!({"pat": "*.rs"}))])),
            Ok(ModelResponse::text("done")),
            Ok(ModelResponse::text("after clear")),
        ]);
        let mut agent = agent(client.clone());

        agent.submit("survey", &mut ()).await.unwrap();
        agent.submit("clear", &mut ()).await.unwrap();
        agent.submit("again", &mut ()).await.unwrap();

        let declared = client.declared();
        assert_eq!(declared.len(), 3);
        for tools in declared {
            assert_eq!(tools, agent.tools().describe());
        }
    }

    #[tokio::test]
    async fn test_clear_resets_log() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::text("first")),
            Ok(ModelResponse::text("second")),
        ]);
        let mut agent = agent(client.clone());

        agent.submit("hello", &mut ()).await.unwrap();
        assert_eq!(agent.submit("/c", &mut ()).await.unwrap(), Submission::Cleared);
        assert!(agent.conversation().is_empty());

        agent.submit("again", &mut ()).await.unwrap();
        assert_eq!(client.requests()[1], vec![Turn::user("again")]);
    }

    #[tokio::test]
    async fn test_control_commands_skip_model() {
        let client = ScriptedClient::new(vec![]);
        let mut agent = agent(client.clone());

        assert_eq!(agent.submit("", &mut ()).await.unwrap(), Submission::Ignored);
        assert_eq!(agent.submit("/quit", &mut ()).await.unwrap(), Submission::Exit);
        assert!(client.requests().is_empty());
        assert!(agent.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_model_error_keeps_log() {
        let client = ScriptedClient::new(vec![
            Ok(ModelResponse::new(vec![call_item("c1", "glob_files", json!({"pat": "*.rs"}))])),
            Err(AgentError::Remote {
                status: 503,
                message: "overloaded".into(),
            }),
            Ok(ModelResponse::text("back")),
        ]);
        let mut agent = agent(client);

        let err = agent.submit("go", &mut ()).await.unwrap_err();
        assert!(matches!(err, AgentError::Remote { status: 503, .. }));
        assert_eq!(agent.state(), LoopState::AwaitingUserInput);
        assert_eq!(agent.conversation().len(), 3);

        agent.submit("retry", &mut ()).await.unwrap();
        assert_eq!(agent.conversation().len(), 5);
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let client = Arc::new(ScriptedClient {
            repeat_tool_call: true,
            ..ScriptedClient::default()
        });
        let mut agent = agent(client.clone());

        let err = agent.submit("forever", &mut ()).await.unwrap_err();
        assert!(matches!(err, AgentError::MaxIterations(5)));
        assert_eq!(client.requests().len(), 5);
        assert!(agent.conversation().check_pairing().is_ok());
    }

    #[test]
    fn test_builder_requires_client() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }
}
