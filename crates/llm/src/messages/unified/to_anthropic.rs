//! Unified IR → Anthropic (Protocol A): the direction a translated upstream response
//! travels on its way back to the client. The streaming direction is handled directly
//! by the stream processor (see `crate::stream`) since it carries per-request state
//! the unified IR's stateless conversions can't express; this module covers the unary
//! response shape only.

use crate::messages::anthropic::{
    AnthropicChatResponse, AnthropicContent, AnthropicRole, AnthropicStopReason, AnthropicUsage,
};
use crate::messages::unified::{UnifiedContentContainer, UnifiedFinishReason, UnifiedResponse};
use crate::metrics::Metrics;

impl From<UnifiedFinishReason> for AnthropicStopReason {
    fn from(reason: UnifiedFinishReason) -> Self {
        match reason {
            UnifiedFinishReason::Stop => AnthropicStopReason::EndTurn,
            UnifiedFinishReason::Length => AnthropicStopReason::MaxTokens,
            UnifiedFinishReason::ToolCalls => AnthropicStopReason::ToolUse,
            // Erases the content-filter distinction on the wire; see DESIGN.md.
            UnifiedFinishReason::ContentFilter => AnthropicStopReason::EndTurn,
        }
    }
}

/// Build the Protocol-A response for a completed upstream request.
///
/// `original_model` is the model string the client sent, restored here since the
/// upstream may have been called with a mapped model id.
pub fn unified_response_to_anthropic(
    response: UnifiedResponse,
    message_id: String,
    original_model: String,
    metrics: &Metrics,
) -> AnthropicChatResponse {
    let choice = response.choices.into_iter().next();

    let (message, finish_reason) = match choice {
        Some(choice) => (choice.message, choice.finish_reason),
        None => {
            return AnthropicChatResponse {
                id: message_id,
                r#type: "message".to_string(),
                role: AnthropicRole::Assistant,
                content: vec![AnthropicContent::Text { text: String::new() }],
                model: original_model,
                stop_reason: Some(AnthropicStopReason::EndTurn),
                stop_sequence: None,
                usage: AnthropicUsage {
                    input_tokens: response.usage.prompt_tokens as i32,
                    output_tokens: response.usage.completion_tokens as i32,
                },
            };
        }
    };

    let mut content = Vec::new();

    match &message.content {
        UnifiedContentContainer::Text(text) if !text.is_empty() => {
            content.push(AnthropicContent::Text { text: text.clone() });
        }
        UnifiedContentContainer::Blocks(blocks) => {
            let joined: String = blocks.iter().filter_map(|b| b.as_text()).collect::<Vec<_>>().join("\n");
            if !joined.is_empty() {
                content.push(AnthropicContent::Text { text: joined });
            }
        }
        _ => {}
    }

    if let Some(tool_calls) = message.tool_calls {
        for call in tool_calls {
            let input = match call.function.arguments {
                crate::messages::unified::UnifiedArguments::Value(v) => v,
                crate::messages::unified::UnifiedArguments::String(s) => {
                    serde_json::from_str(&s).unwrap_or(serde_json::json!({}))
                }
            };

            content.push(AnthropicContent::ToolUse {
                id: call.id,
                name: call.function.name,
                input,
            });
        }
    }

    if content.is_empty() {
        content.push(AnthropicContent::Text { text: String::new() });
    }

    if finish_reason == Some(UnifiedFinishReason::ContentFilter) {
        metrics.record_content_filter_stop();
    }

    AnthropicChatResponse {
        id: message_id,
        r#type: "message".to_string(),
        role: AnthropicRole::Assistant,
        content,
        model: original_model,
        stop_reason: Some(finish_reason.map(AnthropicStopReason::from).unwrap_or(AnthropicStopReason::EndTurn)),
        stop_sequence: None,
        usage: AnthropicUsage {
            input_tokens: response.usage.prompt_tokens as i32,
            output_tokens: response.usage.completion_tokens as i32,
        },
    }
}
