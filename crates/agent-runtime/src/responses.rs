//! Responses API Client
//!
//! Implementation of `ModelClient` for OpenAI-compatible `/responses`
//! endpoints. Every call carries the full conversation; nothing is kept
//! server-side between calls.

use agent_core::{
    AgentError, ModelClient, ModelResponse, OutputItem, Result, SessionConfig, TokenUsage,
    ToolCall, ToolSpec, Turn,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Responses API client
pub struct ResponsesClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    instructions: String,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    tools: Vec<FunctionTool<'a>>,
    input: Vec<InputItem<'a>>,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct FunctionTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    parameters: Value,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputItem<'a> {
    Message {
        role: &'static str,
        content: &'a str,
    },
    FunctionCall {
        call_id: &'a str,
        name: &'a str,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: &'a str,
        output: String,
    },
}

#[derive(Deserialize)]
struct ResponsesBody {
    output: Vec<RawItem>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawItem {
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    Message {
        #[serde(default)]
        content: Vec<RawContent>,
    },
    OutputText {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawContent {
    OutputText { text: String },
    #[serde(other)]
    Other,
}

impl ResponsesClient {
    /// Create from session configuration
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AgentError::Transport(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: config.responses_url(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            instructions: config.instructions(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Request body for one call. Depends only on the arguments and the
    /// client's configuration.
    pub fn build_request(&self, log: &[Turn], tools: &[ToolSpec]) -> Result<Value> {
        let input = log
            .iter()
            .map(convert_turn)
            .collect::<Result<Vec<_>>>()?;

        let tools = tools
            .iter()
            .map(|spec| FunctionTool {
                kind: "function",
                name: &spec.name,
                description: spec.description.as_deref(),
                parameters: spec.json_schema(),
            })
            .collect();

        let request = ResponsesRequest {
            model: &self.model,
            instructions: &self.instructions,
            tools,
            input,
            max_output_tokens: self.max_output_tokens,
        };

        Ok(serde_json::to_value(request)?)
    }

    /// Decode a successful response body
    pub fn parse_response(body: &str) -> Result<ModelResponse> {
        let body: ResponsesBody = serde_json::from_str(body)
            .map_err(|e| AgentError::Protocol(format!("malformed response body: {e}")))?;

        let mut items = Vec::new();
        for raw in body.output {
            match raw {
                RawItem::FunctionCall {
                    call_id,
                    name,
                    arguments,
                } => items.push(match decode_arguments(&arguments) {
                    Ok(arguments) => OutputItem::ToolCall(ToolCall::new(call_id, name, arguments)),
                    Err(reason) => {
                        tracing::debug!(call_id = %call_id, name = %name, %reason, "Undecodable function call arguments");
                        OutputItem::MalformedCall {
                            call: ToolCall::new(call_id, name, Map::new()),
                            reason,
                        }
                    }
                }),
                RawItem::Message { content } => {
                    items.extend(content.into_iter().filter_map(|c| match c {
                        RawContent::OutputText { text } => Some(OutputItem::Text { text }),
                        RawContent::Other => None,
                    }));
                }
                RawItem::OutputText { text } => items.push(OutputItem::Text { text }),
                RawItem::Other => tracing::debug!("Skipping unhandled output item"),
            }
        }

        Ok(ModelResponse {
            items,
            usage: body
                .usage
                .and_then(|u| serde_json::from_value::<TokenUsage>(u).ok()),
        })
    }
}

fn convert_turn(turn: &Turn) -> Result<InputItem<'_>> {
    Ok(match turn {
        Turn::User { content } => InputItem::Message {
            role: "user",
            content,
        },
        Turn::Assistant { content } => InputItem::Message {
            role: "assistant",
            content,
        },
        Turn::ToolRequest(call) => InputItem::FunctionCall {
            call_id: &call.call_id,
            name: &call.name,
            arguments: serde_json::to_string(&call.arguments)?,
        },
        Turn::ToolOutput { call_id, output } => InputItem::FunctionCallOutput {
            call_id,
            output: serde_json::to_string(output)?,
        },
    })
}

/// Arguments arrive as a JSON string; an empty string means no arguments
fn decode_arguments(raw: &str) -> std::result::Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    serde_json::from_str(raw).map_err(|e| format!("arguments are not a JSON object: {e}"))
}

/// Pull `error.message` out of an error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ModelClient for ResponsesClient {
    async fn complete(&self, log: &[Turn], tools: &[ToolSpec]) -> Result<ModelResponse> {
        if log.is_empty() {
            return Err(AgentError::EmptyConversation);
        }

        let body = self.build_request(log, tools)?;
        tracing::debug!(url = %self.url, turns = log.len(), "Calling model");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Transport(format!("request timed out: {e}"))
                } else {
                    AgentError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::Transport(format!("failed reading response: {e}")))?;

        if !status.is_success() {
            return Err(AgentError::Remote {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Self::parse_response(&text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
