//! The protocol-agnostic intermediate representation every request, response, and
//! stream chunk passes through on its way from Protocol A (Anthropic) to Protocol B
//! (OpenAI) and back.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) mod from_anthropic;
pub(crate) mod from_openai;
pub(crate) mod to_anthropic;
pub(crate) mod to_openai;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedRequest {
    pub model: String,
    pub messages: Vec<UnifiedMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<UnifiedTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<UnifiedToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<UnifiedMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMessage {
    pub role: UnifiedRole,
    pub content: UnifiedContentContainer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<UnifiedToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl UnifiedMessage {
    /// Extract `tool_use` blocks from content on demand, for callers that didn't
    /// populate `tool_calls` at construction time.
    pub fn compute_tool_calls(&self) -> Option<Vec<UnifiedToolCall>> {
        let UnifiedContentContainer::Blocks(blocks) = &self.content else {
            return None;
        };

        let calls: Vec<_> = blocks
            .iter()
            .filter_map(|block| match block {
                UnifiedContent::ToolUse { id, name, input } => Some(UnifiedToolCall {
                    id: id.clone(),
                    function: UnifiedFunctionCall {
                        name: name.clone(),
                        arguments: UnifiedArguments::Value(input.clone()),
                    },
                }),
                _ => None,
            })
            .collect();

        if calls.is_empty() {
            None
        } else {
            Some(calls)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnifiedRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnifiedContentContainer {
    Text(String),
    Blocks(Vec<UnifiedContent>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnifiedContent {
    Text {
        text: String,
    },
    Image {
        source: UnifiedImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: UnifiedToolResultContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl UnifiedContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            UnifiedContent::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnifiedToolResultContent {
    Text(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnifiedImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedTool {
    pub function: UnifiedFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedFunction {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnifiedToolChoice {
    Mode(UnifiedToolChoiceMode),
    Specific { function: UnifiedFunctionChoice },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifiedToolChoiceMode {
    None,
    Auto,
    #[serde(alias = "required", alias = "any")]
    Required,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedFunctionChoice {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedToolCall {
    pub id: String,
    pub function: UnifiedFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedFunctionCall {
    pub name: String,
    pub arguments: UnifiedArguments,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnifiedArguments {
    String(String),
    Value(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<UnifiedChoice>,
    pub usage: UnifiedUsage,
    pub created: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<UnifiedStopReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedChoice {
    pub index: u32,
    pub message: UnifiedMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<UnifiedFinishReason>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UnifiedUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifiedFinishReason {
    Stop,
    #[serde(alias = "max_tokens")]
    Length,
    ContentFilter,
    ToolCalls,
}

impl std::fmt::Display for UnifiedFinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnifiedFinishReason::Stop => "stop",
            UnifiedFinishReason::Length => "length",
            UnifiedFinishReason::ContentFilter => "content_filter",
            UnifiedFinishReason::ToolCalls => "tool_calls",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifiedStopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedChunk {
    pub id: Cow<'static, str>,
    pub model: Cow<'static, str>,
    pub choices: Vec<UnifiedChoiceDelta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UnifiedUsage>,
    pub created: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedChoiceDelta {
    pub index: u32,
    pub delta: UnifiedMessageDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<UnifiedFinishReason>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnifiedMessageDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UnifiedRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<UnifiedStreamingToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnifiedStreamingToolCall {
    Start {
        index: usize,
        id: String,
        function: UnifiedFunctionStart,
    },
    Delta {
        index: usize,
        function: UnifiedFunctionDelta,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedFunctionStart {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedFunctionDelta {
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifiedObjectType {
    Model,
    List,
    #[serde(rename = "chat.completion")]
    ChatCompletion,
    #[serde(rename = "chat.completion.chunk")]
    ChatCompletionChunk,
    Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedModel {
    pub id: String,
    pub object_type: UnifiedObjectType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedModelsResponse {
    pub object_type: UnifiedObjectType,
    pub models: Vec<UnifiedModel>,
    pub has_more: bool,
}
