//! Anthropic (Protocol A) → unified IR: the direction a client's incoming request
//! travels before being translated for an OpenAI-shaped upstream.

use crate::messages::anthropic::{
    AnthropicChatRequest, AnthropicContent, AnthropicMessage, AnthropicMessageContent, AnthropicMetadata,
    AnthropicRole, AnthropicTool, AnthropicToolChoice, AnthropicToolResultContent,
};
use crate::messages::unified::{
    UnifiedArguments, UnifiedContent, UnifiedContentContainer, UnifiedFunction, UnifiedFunctionCall,
    UnifiedFunctionChoice, UnifiedImageSource, UnifiedMessage, UnifiedMetadata, UnifiedRequest, UnifiedRole,
    UnifiedTool, UnifiedToolCall, UnifiedToolChoice, UnifiedToolChoiceMode, UnifiedToolResultContent,
};

impl From<AnthropicChatRequest> for UnifiedRequest {
    fn from(req: AnthropicChatRequest) -> Self {
        UnifiedRequest {
            model: req.model,
            messages: req.messages.into_iter().flat_map(unified_messages_from).collect(),
            system: req.system,
            max_tokens: Some(req.max_tokens),
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: req.top_k,
            frequency_penalty: None,
            presence_penalty: None,
            stop_sequences: req.stop_sequences,
            stream: req.stream,
            tools: req.tools.map(|tools| tools.into_iter().map(UnifiedTool::from).collect()),
            tool_choice: req.tool_choice.map(UnifiedToolChoice::from),
            parallel_tool_calls: None,
            metadata: req.metadata.map(UnifiedMetadata::from),
        }
    }
}

impl From<AnthropicRole> for UnifiedRole {
    fn from(role: AnthropicRole) -> Self {
        match role {
            AnthropicRole::User => UnifiedRole::User,
            AnthropicRole::Assistant => UnifiedRole::Assistant,
        }
    }
}

impl From<AnthropicContent> for UnifiedContent {
    fn from(content: AnthropicContent) -> Self {
        match content {
            AnthropicContent::Text { text } => UnifiedContent::Text { text },
            AnthropicContent::Image { source } => UnifiedContent::Image {
                source: UnifiedImageSource::Base64 {
                    media_type: source.media_type,
                    data: source.data,
                },
            },
            AnthropicContent::ToolUse { id, name, input } => UnifiedContent::ToolUse { id, name, input },
            AnthropicContent::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                let texts: Vec<String> = content
                    .into_iter()
                    .map(|c| match c {
                        AnthropicToolResultContent::Text { text } => text,
                        AnthropicToolResultContent::Error { error } => error,
                    })
                    .collect();

                let content = match texts.len() {
                    1 => UnifiedToolResultContent::Text(texts.into_iter().next().unwrap()),
                    _ => UnifiedToolResultContent::Multiple(texts),
                };

                UnifiedContent::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                }
            }
        }
    }
}

/// Converts a single Anthropic message into one or more unified messages.
///
/// A `tool_result` block cannot stay embedded in the surrounding user message: it becomes
/// its own `role: tool` message, split out in place so message order is preserved.
fn unified_messages_from(message: AnthropicMessage) -> Vec<UnifiedMessage> {
    let role = UnifiedRole::from(message.role);
    let mut messages = Vec::new();
    let mut pending: Vec<UnifiedContent> = Vec::new();

    for block in message.content.into_blocks() {
        let block = UnifiedContent::from(block);
        if let UnifiedContent::ToolResult { tool_use_id, content, .. } = &block {
            if !pending.is_empty() {
                messages.push(build_message(role, std::mem::take(&mut pending)));
            }
            messages.push(UnifiedMessage {
                role: UnifiedRole::Tool,
                content: UnifiedContentContainer::Text(tool_result_text(content)),
                tool_calls: None,
                tool_call_id: Some(tool_use_id.clone()),
            });
        } else {
            pending.push(block);
        }
    }

    if !pending.is_empty() || messages.is_empty() {
        messages.push(build_message(role, pending));
    }

    messages
}

fn build_message(role: UnifiedRole, blocks: Vec<UnifiedContent>) -> UnifiedMessage {
    let tool_calls = if role == UnifiedRole::Assistant {
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

        if calls.is_empty() { None } else { Some(calls) }
    } else {
        None
    };

    UnifiedMessage {
        role,
        content: UnifiedContentContainer::Blocks(blocks),
        tool_calls,
        tool_call_id: None,
    }
}

fn tool_result_text(content: &UnifiedToolResultContent) -> String {
    match content {
        UnifiedToolResultContent::Text(text) => text.clone(),
        UnifiedToolResultContent::Multiple(parts) => parts.join("\n"),
    }
}

impl From<AnthropicTool> for UnifiedTool {
    fn from(tool: AnthropicTool) -> Self {
        UnifiedTool {
            function: UnifiedFunction {
                name: tool.name,
                description: Some(tool.description),
                parameters: tool.input_schema,
                strict: None,
            },
        }
    }
}

impl From<AnthropicToolChoice> for UnifiedToolChoice {
    fn from(choice: AnthropicToolChoice) -> Self {
        match choice {
            AnthropicToolChoice::Auto => UnifiedToolChoice::Mode(UnifiedToolChoiceMode::Auto),
            AnthropicToolChoice::Any => UnifiedToolChoice::Mode(UnifiedToolChoiceMode::Required),
            AnthropicToolChoice::Tool { name } => UnifiedToolChoice::Specific {
                function: UnifiedFunctionChoice { name },
            },
        }
    }
}

impl From<AnthropicMetadata> for UnifiedMetadata {
    fn from(metadata: AnthropicMetadata) -> Self {
        UnifiedMetadata {
            user_id: metadata.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_a_basic_text_request() {
        let req = AnthropicChatRequest {
            model: "claude-3-opus-20240229".to_string(),
            messages: vec![AnthropicMessage {
                role: AnthropicRole::User,
                content: AnthropicMessageContent::Blocks(vec![AnthropicContent::Text {
                    text: "hi".to_string(),
                }]),
            }],
            max_tokens: 100,
            system: Some("be terse".to_string()),
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            stream: None,
            metadata: None,
            tools: None,
            tool_choice: None,
        };

        let unified = UnifiedRequest::from(req);
        assert_eq!(unified.max_tokens, Some(100));
        assert_eq!(unified.system.as_deref(), Some("be terse"));
        assert_eq!(unified.messages.len(), 1);
    }

    #[test]
    fn converts_plain_string_content() {
        let message = AnthropicMessage {
            role: AnthropicRole::User,
            content: AnthropicMessageContent::Text("hi".to_string()),
        };

        let mut messages = unified_messages_from(message);
        assert_eq!(messages.len(), 1);
        let UnifiedContentContainer::Blocks(blocks) = &messages.remove(0).content else {
            unreachable!("expected blocks");
        };
        let UnifiedContent::Text { text } = &blocks[0] else {
            unreachable!("expected text content");
        };
        assert_eq!(text, "hi");
    }

    #[test]
    fn tool_use_in_assistant_message_populates_tool_calls() {
        let message = AnthropicMessage {
            role: AnthropicRole::Assistant,
            content: AnthropicMessageContent::Blocks(vec![AnthropicContent::ToolUse {
                id: "call_1".to_string(),
                name: "get_weather".to_string(),
                input: serde_json::json!({"location": "NYC"}),
            }]),
        };

        let mut messages = unified_messages_from(message);
        assert_eq!(messages.len(), 1);
        let calls = messages.remove(0).tool_calls.expect("tool calls should be populated");
        assert_eq!(calls[0].function.name, "get_weather");
    }

    #[test]
    fn tool_result_becomes_a_separate_tool_message() {
        let message = AnthropicMessage {
            role: AnthropicRole::User,
            content: AnthropicMessageContent::Blocks(vec![
                AnthropicContent::Text {
                    text: "here's the result".to_string(),
                },
                AnthropicContent::ToolResult {
                    tool_use_id: "call_1".to_string(),
                    content: vec![AnthropicToolResultContent::Text {
                        text: "boom".to_string(),
                    }],
                    is_error: Some(true),
                },
            ]),
        };

        let messages = unified_messages_from(message);
        assert_eq!(messages.len(), 2);

        assert_eq!(messages[0].role, UnifiedRole::User);

        assert_eq!(messages[1].role, UnifiedRole::Tool);
        assert_eq!(messages[1].tool_call_id.as_deref(), Some("call_1"));
        assert!(messages[1].tool_calls.is_none());
        let UnifiedContentContainer::Text(text) = &messages[1].content else {
            unreachable!("expected plain text content");
        };
        assert_eq!(text, "boom");
    }

    #[test]
    fn tool_result_content_preserves_is_error() {
        let content = AnthropicContent::ToolResult {
            tool_use_id: "call_1".to_string(),
            content: vec![AnthropicToolResultContent::Text {
                text: "boom".to_string(),
            }],
            is_error: Some(true),
        };

        let UnifiedContent::ToolResult { is_error, .. } = UnifiedContent::from(content) else {
            unreachable!("expected tool result");
        };
        assert_eq!(is_error, Some(true));
    }
}
