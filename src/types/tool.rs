//! Tool calling definitions shared by every provider driver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool definition (for function calling).
///
/// `id` doubles as the function name on the wire, so it must satisfy the
/// strictest vendor naming rule (`[a-zA-Z0-9_-]{1,64}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the arguments.
    #[serde(default = "empty_object_schema")]
    pub parameters: Value,
    /// Preset parameters merged underneath model-supplied arguments.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub usage_control: UsageControl,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDefinition {
    pub fn new(id: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            parameters,
            params: Map::new(),
            usage_control: UsageControl::Auto,
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_usage_control(mut self, usage_control: UsageControl) -> Self {
        self.usage_control = usage_control;
        self
    }

    /// Merge preset parameters with model arguments. Presets are spread
    /// first, so model arguments win on key conflicts.
    pub fn merge_arguments(&self, arguments: &Map<String, Value>) -> Map<String, Value> {
        let mut merged = self.params.clone();
        for (k, v) in arguments {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

/// Per-tool usage constraint supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageControl {
    /// The model decides whether to call the tool.
    #[default]
    Auto,
    /// The model must call the tool.
    Force,
    /// The tool is withheld from the model.
    None,
}

/// Tool-choice directive for the next vendor call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    /// Force a single tool.
    Tool(String),
    /// Force tools in order; the head is the one currently forced.
    Sequence(Vec<String>),
}

impl ToolChoice {
    /// Tool the vendor is compelled to call on the next request, if any.
    pub fn forced_tool(&self) -> Option<&str> {
        match self {
            ToolChoice::Tool(name) => Some(name.as_str()),
            ToolChoice::Sequence(names) => names.first().map(String::as_str),
            ToolChoice::Auto | ToolChoice::None => None,
        }
    }

    pub fn is_forced(&self) -> bool {
        self.forced_tool().is_some()
    }
}

/// Tool call (invocation from model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Vendor-assigned id; empty when the vendor does not issue one.
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// A tool execution observed and completed during one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub result: Value,
}
