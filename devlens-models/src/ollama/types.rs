//! Ollama wire types.
//!
//! Request bodies borrow from the caller; responses keep only the fields
//! devlens reads.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::messages::{Role, ToolDefinition};

/// `POST /api/generate` body.
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<SamplingOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<&'a str>,
    /// `"json"` constrains the output to a JSON value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
}

/// `POST /api/generate` reply.
#[derive(Debug, Deserialize)]
pub struct GenerateReply {
    pub response: String,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

/// `POST /api/chat` body.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<OutgoingMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<FunctionTool<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<SamplingOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<&'a str>,
}

/// A message sent to `/api/chat`.
#[derive(Debug, Serialize)]
pub struct OutgoingMessage<'a> {
    pub role: Role,
    pub content: &'a str,
}

/// Sampling parameters; only temperature is set by devlens.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SamplingOptions {
    pub temperature: f64,
}

/// A tool offered to the model. Ollama takes the OpenAI function shape.
#[derive(Debug, Serialize)]
pub struct FunctionTool<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: &'a ToolDefinition,
}

impl<'a> From<&'a ToolDefinition> for FunctionTool<'a> {
    fn from(function: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function,
        }
    }
}

/// `POST /api/chat` reply.
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub message: ReplyMessage,
}

/// The assistant turn in a chat reply.
#[derive(Debug, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ReplyToolCall>,
}

/// A tool invocation. Ollama sends arguments as an object, not a string.
#[derive(Debug, Deserialize)]
pub struct ReplyToolCall {
    pub function: CalledFunction,
}

#[derive(Debug, Deserialize)]
pub struct CalledFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: JsonValue,
}

/// `GET /api/tags` reply.
#[derive(Debug, Deserialize)]
pub struct TagsReply {
    #[serde(default)]
    pub models: Vec<InstalledModel>,
}

#[derive(Debug, Deserialize)]
pub struct InstalledModel {
    /// e.g. `llama3.1:latest`.
    pub name: String,
}
