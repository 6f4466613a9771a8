//! OpenAI (Protocol B) → unified IR: the direction an upstream response or stream
//! chunk travels before being translated back into Anthropic's wire shape.

use std::borrow::Cow;

use crate::messages::openai::{
    self, ChatChoice, ChatCompletionChunk, ChatCompletionResponse, ChatMessage, FinishReason, StreamingToolCall,
};
use crate::messages::unified::{
    UnifiedArguments, UnifiedChoice, UnifiedChoiceDelta, UnifiedChunk, UnifiedContentContainer, UnifiedFinishReason,
    UnifiedFunctionCall, UnifiedFunctionDelta, UnifiedFunctionStart, UnifiedMessage, UnifiedMessageDelta,
    UnifiedResponse, UnifiedRole, UnifiedStreamingToolCall, UnifiedToolCall, UnifiedUsage,
};

impl From<FinishReason> for UnifiedFinishReason {
    fn from(reason: FinishReason) -> Self {
        match reason {
            FinishReason::Stop => UnifiedFinishReason::Stop,
            FinishReason::Length => UnifiedFinishReason::Length,
            FinishReason::ContentFilter => UnifiedFinishReason::ContentFilter,
            FinishReason::ToolCalls => UnifiedFinishReason::ToolCalls,
            // Providers occasionally emit reasons outside the documented set; treat
            // anything unrecognized as a plain stop rather than failing the response.
            FinishReason::Other(_) => UnifiedFinishReason::Stop,
        }
    }
}

impl From<openai::ChatRole> for UnifiedRole {
    fn from(role: openai::ChatRole) -> Self {
        match role {
            openai::ChatRole::System => UnifiedRole::System,
            openai::ChatRole::User => UnifiedRole::User,
            openai::ChatRole::Assistant => UnifiedRole::Assistant,
            openai::ChatRole::Tool => UnifiedRole::Tool,
            openai::ChatRole::Other(_) => UnifiedRole::Assistant,
        }
    }
}

impl From<ChatMessage> for UnifiedMessage {
    fn from(message: ChatMessage) -> Self {
        let tool_calls = message.tool_calls.map(|calls| calls.into_iter().map(UnifiedToolCall::from).collect());

        UnifiedMessage {
            role: UnifiedRole::from(message.role),
            content: UnifiedContentContainer::Text(message.content.unwrap_or_default()),
            tool_calls,
            tool_call_id: message.tool_call_id,
        }
    }
}

impl From<openai::ToolCall> for UnifiedToolCall {
    fn from(call: openai::ToolCall) -> Self {
        UnifiedToolCall {
            id: call.id,
            function: UnifiedFunctionCall {
                name: call.function.name,
                arguments: UnifiedArguments::String(call.function.arguments),
            },
        }
    }
}

impl From<ChatChoice> for UnifiedChoice {
    fn from(choice: ChatChoice) -> Self {
        UnifiedChoice {
            index: choice.index,
            message: UnifiedMessage::from(choice.message),
            finish_reason: choice.finish_reason.map(UnifiedFinishReason::from),
        }
    }
}

impl From<openai::Usage> for UnifiedUsage {
    fn from(usage: openai::Usage) -> Self {
        UnifiedUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

impl From<ChatCompletionResponse> for UnifiedResponse {
    fn from(response: ChatCompletionResponse) -> Self {
        UnifiedResponse {
            id: response.id,
            model: response.model,
            choices: response.choices.into_iter().map(UnifiedChoice::from).collect(),
            usage: UnifiedUsage::from(response.usage),
            created: response.created,
            stop_reason: None,
            stop_sequence: None,
        }
    }
}

impl From<StreamingToolCall> for UnifiedStreamingToolCall {
    fn from(call: StreamingToolCall) -> Self {
        let index = call.index as usize;
        let function = call.function.unwrap_or_default();

        match call.id {
            Some(id) => UnifiedStreamingToolCall::Start {
                index,
                id,
                function: UnifiedFunctionStart {
                    name: function.name.unwrap_or_default(),
                    arguments: function.arguments.unwrap_or_default(),
                },
            },
            None => UnifiedStreamingToolCall::Delta {
                index,
                function: UnifiedFunctionDelta {
                    arguments: function.arguments.unwrap_or_default(),
                },
            },
        }
    }
}

impl From<ChatCompletionChunk> for UnifiedChunk {
    fn from(chunk: ChatCompletionChunk) -> Self {
        let choices = chunk
            .choices
            .into_iter()
            .map(|choice| UnifiedChoiceDelta {
                index: choice.index,
                delta: UnifiedMessageDelta {
                    role: choice.delta.role.map(UnifiedRole::from),
                    content: choice.delta.content,
                    tool_calls: choice
                        .delta
                        .tool_calls
                        .map(|calls| calls.into_iter().map(UnifiedStreamingToolCall::from).collect()),
                },
                finish_reason: choice.finish_reason.map(UnifiedFinishReason::from),
            })
            .collect();

        UnifiedChunk {
            id: Cow::Owned(chunk.id),
            model: Cow::Owned(chunk.model),
            choices,
            usage: chunk.usage.map(UnifiedUsage::from),
            created: chunk.created,
        }
    }
}
