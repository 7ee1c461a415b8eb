//! Vendor-neutral conversation turns.

use serde::{Deserialize, Serialize};

/// One prior turn of the conversation, independent of any vendor wire format.
///
/// A single turn may expand into several vendor messages: an assistant turn
/// carrying a [`FunctionCall`] becomes a tool-invocation message, and a
/// `Function` turn becomes the paired tool-result message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    /// Function name for `Function` turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, text)
    }

    /// Assistant turn that invoked a function.
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            name: None,
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }

    /// Result of a function invocation, keyed by function name.
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Function,
            content: content.into(),
            name: Some(name.into()),
            function_call: None,
        }
    }

    fn with_role(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: text.into(),
            name: None,
            function_call: None,
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    #[serde(alias = "tool")]
    Function,
}

/// Function invocation descriptor attached to an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as emitted by the model.
    #[serde(default)]
    pub arguments: String,
}

impl FunctionCall {
    /// Parse the arguments string; empty or malformed input yields an empty object.
    pub fn parsed_arguments(&self) -> serde_json::Value {
        let trimmed = self.arguments.trim();
        if trimmed.is_empty() {
            return serde_json::json!({});
        }
        serde_json::from_str(trimmed).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accepts_tool_alias() {
        let m: Message =
            serde_json::from_str(r#"{"role":"tool","content":"42","name":"calc"}"#).unwrap();
        assert_eq!(m.role, MessageRole::Function);
        assert_eq!(m.name.as_deref(), Some("calc"));
    }

    #[test]
    fn test_function_call_arguments_parsing() {
        let m = Message::function_call("get_weather", r#"{"city":"Paris"}"#);
        let call = m.function_call.unwrap();
        assert_eq!(call.parsed_arguments()["city"], "Paris");

        let broken = FunctionCall {
            name: "x".into(),
            arguments: "{not json".into(),
        };
        assert_eq!(broken.parsed_arguments(), serde_json::json!({}));
    }
}
