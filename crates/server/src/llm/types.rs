//! Types for the `OpenAI` chat-completions API.
//!
//! Only the parts of the wire format the orchestrator uses are modelled.
//! Unknown response fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use helper_core::ConversationRole;

/// A message in the transcript sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ConversationRole,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
        }
    }
}

/// A function the model may invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDefinition>,
}

/// Response from `POST /chat/completions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One completion alternative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: ResponseMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Message produced by the model: text, a function invocation, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Newer API versions report invocations here instead.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ResponseMessage {
    /// The function invocation, preferring `function_call` over the first
    /// entry of `tool_calls`.
    #[must_use]
    pub fn invocation(&self) -> Option<&FunctionCall> {
        self.function_call
            .as_ref()
            .or_else(|| self.tool_calls.first().map(|call| &call.function))
    }

    /// Text content, if any non-whitespace text was returned.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// A named invocation with an opaque arguments payload.
///
/// `arguments` is normally a JSON-encoded string but some models send the
/// object directly; see [`super::arguments`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Entry of the `tool_calls` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub function: FunctionCall,
}

impl ChatResponse {
    /// A response with a single plain-text choice.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_message(ResponseMessage {
            content: Some(content.into()),
            ..Default::default()
        })
    }

    /// A response with a single function invocation.
    #[must_use]
    pub fn function_call(name: impl Into<String>, arguments: Value) -> Self {
        Self::from_message(ResponseMessage {
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments,
            }),
            ..Default::default()
        })
    }

    fn from_message(message: ResponseMessage) -> Self {
        Self {
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: None,
            }],
        }
    }

    /// Message of the first choice, if the model returned any.
    #[must_use]
    pub fn first_message(&self) -> Option<&ResponseMessage> {
        self.choices.first().map(|choice| &choice.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_roles_lowercase() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage::system("rules"), ChatMessage::user("hi")],
            functions: Vec::new(),
        };

        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json.get("functions").is_none());
    }

    #[test]
    fn test_response_with_function_call() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "function_call": {
                        "name": "store_provider",
                        "arguments": "{\"location\": \"New York, NY\"}"
                    }
                },
                "finish_reason": "function_call"
            }]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).expect("deserialize");
        let message = response.first_message().expect("choice");
        let call = message.invocation().expect("invocation");
        assert_eq!(call.name, "store_provider");
        assert!(call.arguments.is_string());
        assert!(message.text().is_none());
    }

    #[test]
    fn test_response_with_tool_calls() {
        let json = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_providers", "arguments": "{}"}
                    }]
                }
            }]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).expect("deserialize");
        let call = response
            .first_message()
            .and_then(ResponseMessage::invocation)
            .expect("invocation");
        assert_eq!(call.name, "list_providers");
    }

    #[test]
    fn test_response_without_choices() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices": []}"#).expect("deserialize");
        assert!(response.first_message().is_none());
    }
}
