//! Tool System
//!
//! Tools are registered once at startup and invoked by the agent loop.
//! Arguments are validated against each tool's declared parameters before the
//! tool runs, and [`ToolRegistry::dispatch_call`] turns every failure into a
//! result payload the model can read.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{AgentError, Result};

/// Tool call request from the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates the call with its output
    pub call_id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Argument rendered as text, for one-line summaries
    pub fn argument_text(&self, name: &str) -> Option<String> {
        self.arguments.get(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// JSON Schema type of a parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Whether `value` has this JSON type
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type
    #[serde(rename = "type")]
    pub param_type: ParamType,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Tool declaration sent to the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSpec {
    /// JSON Schema object for the parameters. Undeclared properties are
    /// rejected.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut prop = json!({ "type": param.param_type.as_str() });
            if let Some(desc) = &param.description {
                prop["description"] = json!(desc);
            }
            properties.insert(param.name.clone(), prop);
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check arguments against the declared parameters
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<()> {
        let invalid = |reason: String| AgentError::InvalidArguments {
            tool: self.name.clone(),
            reason,
        };

        for param in &self.parameters {
            match arguments.get(&param.name) {
                None if param.required => {
                    return Err(invalid(format!(
                        "missing required parameter '{}'",
                        param.name
                    )));
                }
                Some(Value::Null) if !param.required => {}
                Some(value) if !param.param_type.matches(value) => {
                    return Err(invalid(format!(
                        "parameter '{}' must be {}, got {}",
                        param.name,
                        param.param_type,
                        json_type_name(value)
                    )));
                }
                _ => {}
            }
        }

        if let Some(extra) = arguments
            .keys()
            .find(|k| !self.parameters.iter().any(|p| &p.name == *k))
        {
            return Err(invalid(format!("unexpected parameter '{extra}'")));
        }

        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's declaration
    fn spec(&self) -> ToolSpec;

    /// Run the tool. Arguments have already been validated against
    /// [`Tool::spec`].
    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<Value>;
}

/// Registry for available tools, in registration order
pub struct ToolRegistry {
    tools: Vec<(ToolSpec, Arc<dyn Tool>)>,
    index: HashMap<String, usize>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_shared(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let spec = tool.spec();
        if self.index.contains_key(&spec.name) {
            return Err(AgentError::Config(format!(
                "tool '{}' registered twice",
                spec.name
            )));
        }

        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push((spec, tool));
        Ok(())
    }

    /// Tool declarations in registration order
    pub fn describe(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|(spec, _)| spec.clone()).collect()
    }

    /// Get a tool's declaration by name
    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i].0)
    }

    /// Validate and run a tool
    pub async fn dispatch(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value> {
        let (spec, tool) = self
            .index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        spec.validate(arguments)?;
        tool.invoke(arguments).await
    }

    /// Run a model-requested call. Failures come back as an error payload,
    /// never as `Err`.
    pub async fn dispatch_call(&self, call: &ToolCall) -> Value {
        match self.dispatch(&call.name, &call.arguments).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = %call.name, call_id = %call.call_id, error = %e, "Tool call failed");
                failure_payload(&e)
            }
        }
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|(spec, _)| spec.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Payload recorded in the log when a tool call fails
pub fn failure_payload(error: &AgentError) -> Value {
    json!({
        "error": {
            "kind": error.kind(),
            "message": error.to_string(),
        }
    })
}

/// Whether an output value is a failure payload
pub fn is_failure(output: &Value) -> bool {
    output
        .get("error")
        .and_then(|e| e.get("kind"))
        .is_some_and(Value::is_string)
}
