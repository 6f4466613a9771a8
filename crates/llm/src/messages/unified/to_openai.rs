//! Unified IR → OpenAI (Protocol B): the direction a translated request travels on
//! its way to an upstream OpenAI-compatible provider.

use crate::messages::openai::{
    self, ChatMessage, ChatRole, FunctionCall, FunctionDefinition, Tool, ToolCall, ToolChoice, ToolChoiceFunction,
    ToolChoiceMode,
};
use crate::messages::unified::{
    UnifiedArguments, UnifiedContent, UnifiedContentContainer, UnifiedFunctionCall, UnifiedMessage, UnifiedRequest,
    UnifiedRole, UnifiedTool, UnifiedToolCall, UnifiedToolChoice, UnifiedToolChoiceMode,
};

impl From<UnifiedRequest> for openai::ChatCompletionRequest {
    fn from(req: UnifiedRequest) -> Self {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);

        if let Some(system) = req.system {
            messages.push(ChatMessage {
                role: ChatRole::System,
                content: Some(system),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        messages.extend(req.messages.into_iter().map(ChatMessage::from));

        openai::ChatCompletionRequest {
            model: req.model,
            messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            top_p: req.top_p,
            frequency_penalty: req.frequency_penalty,
            presence_penalty: req.presence_penalty,
            stop: req.stop_sequences,
            stream: req.stream,
            tools: req.tools.map(|tools| tools.into_iter().map(Tool::from).collect()),
            tool_choice: req.tool_choice.map(ToolChoice::from),
            parallel_tool_calls: req.parallel_tool_calls,
            user: req.metadata.and_then(|m| m.user_id),
        }
    }
}

impl From<UnifiedRole> for ChatRole {
    fn from(role: UnifiedRole) -> Self {
        match role {
            UnifiedRole::System => ChatRole::System,
            UnifiedRole::User => ChatRole::User,
            UnifiedRole::Assistant => ChatRole::Assistant,
            UnifiedRole::Tool => ChatRole::Tool,
        }
    }
}

impl From<UnifiedMessage> for ChatMessage {
    fn from(message: UnifiedMessage) -> Self {
        let content = match message.content {
            UnifiedContentContainer::Text(text) => Some(text),
            UnifiedContentContainer::Blocks(blocks) => {
                let joined: String = blocks
                    .iter()
                    .filter_map(|block| match block {
                        UnifiedContent::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                if joined.is_empty() { None } else { Some(joined) }
            }
        };

        let tool_calls = message.tool_calls.map(|calls| calls.into_iter().map(ToolCall::from).collect());

        ChatMessage {
            role: ChatRole::from(message.role),
            content,
            tool_calls,
            tool_call_id: message.tool_call_id,
        }
    }
}

impl From<UnifiedToolCall> for ToolCall {
    fn from(call: UnifiedToolCall) -> Self {
        ToolCall {
            id: call.id,
            tool_type: "function".to_string(),
            function: FunctionCall::from(call.function),
        }
    }
}

impl From<UnifiedFunctionCall> for FunctionCall {
    fn from(call: UnifiedFunctionCall) -> Self {
        let arguments = match call.arguments {
            UnifiedArguments::String(s) => s,
            UnifiedArguments::Value(v) => v.to_string(),
        };

        FunctionCall {
            name: call.name,
            arguments,
        }
    }
}

impl From<UnifiedTool> for Tool {
    fn from(tool: UnifiedTool) -> Self {
        Tool {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: tool.function.name,
                description: tool.function.description,
                parameters: tool.function.parameters,
                strict: tool.function.strict,
            },
        }
    }
}

impl From<UnifiedToolChoiceMode> for ToolChoiceMode {
    fn from(mode: UnifiedToolChoiceMode) -> Self {
        match mode {
            UnifiedToolChoiceMode::None => ToolChoiceMode::None,
            UnifiedToolChoiceMode::Auto => ToolChoiceMode::Auto,
            UnifiedToolChoiceMode::Required => ToolChoiceMode::Required,
        }
    }
}

impl From<UnifiedToolChoice> for ToolChoice {
    fn from(choice: UnifiedToolChoice) -> Self {
        match choice {
            UnifiedToolChoice::Mode(mode) => ToolChoice::Mode(ToolChoiceMode::from(mode)),
            UnifiedToolChoice::Specific { function } => ToolChoice::Specific {
                choice_type: "function".to_string(),
                function: ToolChoiceFunction { name: function.name },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::unified::{UnifiedFunction, UnifiedFunctionChoice};

    #[test]
    fn system_prompt_becomes_a_leading_system_message() {
        let req = UnifiedRequest {
            model: "gpt-4o".to_string(),
            messages: vec![UnifiedMessage {
                role: UnifiedRole::User,
                content: UnifiedContentContainer::Text("hi".to_string()),
                tool_calls: None,
                tool_call_id: None,
            }],
            system: Some("be terse".to_string()),
            max_tokens: Some(100),
            temperature: None,
            top_p: None,
            top_k: None,
            frequency_penalty: None,
            presence_penalty: None,
            stop_sequences: None,
            stream: None,
            tools: None,
            tool_choice: None,
            parallel_tool_calls: None,
            metadata: None,
        };

        let openai_req = openai::ChatCompletionRequest::from(req);
        assert_eq!(openai_req.messages.len(), 2);
        assert_eq!(openai_req.messages[0].role, ChatRole::System);
        assert_eq!(openai_req.messages[0].content.as_deref(), Some("be terse"));
    }

    #[test]
    fn tool_role_message_carries_its_call_id_and_content() {
        let message = UnifiedMessage {
            role: UnifiedRole::Tool,
            content: UnifiedContentContainer::Text("boom".to_string()),
            tool_calls: None,
            tool_call_id: Some("call_1".to_string()),
        };

        let chat_message = ChatMessage::from(message);
        assert_eq!(chat_message.role, ChatRole::Tool);
        assert_eq!(chat_message.content.as_deref(), Some("boom"));
        assert_eq!(chat_message.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_choice_specific_carries_the_function_name() {
        let choice = UnifiedToolChoice::Specific {
            function: UnifiedFunctionChoice {
                name: "get_weather".to_string(),
            },
        };

        let ToolChoice::Specific { function, .. } = ToolChoice::from(choice) else {
            unreachable!("expected specific tool choice");
        };
        assert_eq!(function.name, "get_weather");
    }

    #[test]
    fn tool_definition_carries_parameters_through_unchanged() {
        let tool = UnifiedTool {
            function: UnifiedFunction {
                name: "get_weather".to_string(),
                description: Some("fetch weather".to_string()),
                parameters: serde_json::json!({"type": "object"}),
                strict: Some(true),
            },
        };

        let converted = Tool::from(tool);
        assert_eq!(converted.function.parameters, serde_json::json!({"type": "object"}));
        assert_eq!(converted.function.strict, Some(true));
    }
}
