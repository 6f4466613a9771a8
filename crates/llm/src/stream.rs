//! The byte-level SSE decoder and the chunk-semantics state machine that together
//! turn one upstream Protocol-B event stream into a well-formed Protocol-A event
//! stream. This is the hardest subsystem in the crate: §4.3's buffer/partial-UTF8
//! handling is pinned down precisely enough that a generic SSE library's internals
//! aren't a substitute for implementing it directly.

use std::collections::HashMap;
use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::error::OpenCcError;
use crate::messages::anthropic::{
    AnthropicContent, AnthropicContentDelta, AnthropicMessageDelta, AnthropicStopReason, AnthropicStreamEvent,
    AnthropicStreamMessageStart, AnthropicUsage,
};
use crate::messages::openai::ChatCompletionChunk;
use crate::messages::unified::UnifiedFinishReason;
use crate::metrics::Metrics;

/// One fully-decoded SSE event, stripped of the `data: ` framing.
#[derive(Debug, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Decode a byte stream into SSE events per §4.3: a streaming UTF-8 decoder preserving
/// partial multi-byte sequences across chunks, line-buffered on `\n`, one `data: `
/// payload per complete line.
pub fn decode_sse<S>(bytes: S) -> impl Stream<Item = Result<SseEvent, OpenCcError>>
where
    S: Stream<Item = Result<bytes::Bytes, OpenCcError>> + Unpin,
{
    struct State<S> {
        bytes: S,
        pending_bytes: Vec<u8>,
        line_buffer: String,
        queued: std::collections::VecDeque<Result<SseEvent, OpenCcError>>,
        done: bool,
    }

    let state = State {
        bytes,
        pending_bytes: Vec::new(),
        line_buffer: String::new(),
        queued: std::collections::VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.queued.pop_front() {
                let is_done = matches!(event, Ok(SseEvent::Done)) || event.is_err();
                if is_done {
                    state.done = true;
                }
                return Some((event, state));
            }

            if state.done {
                return None;
            }

            let chunk = match state.bytes.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(err)) => return Some((Err(err), state)),
                None => return None,
            };

            state.pending_bytes.extend_from_slice(&chunk);

            let (decoded, consumed) = decode_utf8_prefix(&state.pending_bytes);
            state.line_buffer.push_str(&decoded);
            state.pending_bytes.drain(..consumed);

            let mut lines: Vec<&str> = state.line_buffer.split('\n').collect();
            let remainder = lines.pop().unwrap_or("").to_string();

            for line in lines {
                let Some(rest) = line.strip_prefix("data: ") else { continue };
                let rest = rest.trim();

                if rest.is_empty() {
                    continue;
                }

                if rest == "[DONE]" {
                    state.queued.push_back(Ok(SseEvent::Done));
                    break;
                }

                state.queued.push_back(Ok(SseEvent::Data(rest.to_string())));
            }

            state.line_buffer = remainder;
        }
    })
}

/// Decode the longest valid UTF-8 prefix of `bytes`, returning the decoded string and
/// how many bytes were consumed. Any trailing incomplete multi-byte sequence is left
/// for the next call.
fn decode_utf8_prefix(bytes: &[u8]) -> (String, usize) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), bytes.len()),
        Err(err) => {
            let valid_up_to = err.valid_up_to();
            let decoded = std::str::from_utf8(&bytes[..valid_up_to]).unwrap().to_string();
            (decoded, valid_up_to)
        }
    }
}

/// Per-request streaming state: `S = {first_chunk, open_block_index, total_output_tokens,
/// connected}` from §4.3, plus bookkeeping to detect a tool call's first appearance.
pub struct StreamProcessor {
    message_id: String,
    original_model: String,
    first_chunk: bool,
    open_block_index: Option<u32>,
    next_block_index: u32,
    total_output_tokens: u32,
    /// Maps an upstream tool-call index to the Protocol-A block index assigned to it.
    tool_call_blocks: HashMap<usize, u32>,
    metrics: Arc<Metrics>,
}

impl StreamProcessor {
    pub fn new(message_id: String, original_model: String, metrics: Arc<Metrics>) -> Self {
        Self {
            message_id,
            original_model,
            first_chunk: true,
            open_block_index: None,
            next_block_index: 0,
            total_output_tokens: 0,
            tool_call_blocks: HashMap::new(),
            metrics,
        }
    }

    /// Apply one upstream chunk, producing zero or more well-formed Protocol-A events.
    ///
    /// Tool-use streaming emits only a `content_block_start` on first appearance of a
    /// tool call — no argument deltas, no matching `content_block_stop` for that block.
    /// The unary response remains the source of truth for tool arguments; this is
    /// deliberate, not an oversight (see DESIGN.md).
    pub fn process(&mut self, chunk: ChatCompletionChunk) -> Vec<AnthropicStreamEvent> {
        let mut events = Vec::new();

        if self.first_chunk {
            events.push(AnthropicStreamEvent::MessageStart {
                message: AnthropicStreamMessageStart {
                    id: self.message_id.clone(),
                    message_type: "message".to_string(),
                    role: crate::messages::anthropic::AnthropicRole::Assistant,
                    content: vec![],
                    model: self.original_model.clone(),
                    usage: AnthropicUsage {
                        input_tokens: 0,
                        output_tokens: 0,
                    },
                },
            });

            events.push(AnthropicStreamEvent::ContentBlockStart {
                index: 0,
                content_block: AnthropicContent::Text { text: String::new() },
            });

            self.open_block_index = Some(0);
            self.next_block_index = 1;
            self.first_chunk = false;
        }

        for choice in &chunk.choices {
            if let Some(content) = &choice.delta.content {
                if !content.is_empty() {
                    events.push(AnthropicStreamEvent::ContentBlockDelta {
                        index: self.open_block_index.unwrap_or(0),
                        delta: AnthropicContentDelta::TextDelta { text: content.clone() },
                    });
                }
            }

            if let Some(tool_calls) = &choice.delta.tool_calls {
                for call in tool_calls {
                    let upstream_index = call.index as usize;

                    if self.tool_call_blocks.contains_key(&upstream_index) {
                        continue;
                    }

                    let Some(function) = &call.function else { continue };
                    let Some(name) = &function.name else { continue };

                    let block_index = self.next_block_index;
                    self.next_block_index += 1;
                    self.tool_call_blocks.insert(upstream_index, block_index);

                    events.push(AnthropicStreamEvent::ContentBlockStart {
                        index: block_index,
                        content_block: AnthropicContent::ToolUse {
                            id: call.id.clone().unwrap_or_default(),
                            name: name.clone(),
                            input: serde_json::json!({}),
                        },
                    });
                }
            }

            if let Some(usage) = &chunk.usage {
                self.total_output_tokens = usage.completion_tokens;
            }

            if let Some(finish_reason) = &choice.finish_reason {
                let unified_reason = UnifiedFinishReason::from(finish_reason.clone());

                if unified_reason == UnifiedFinishReason::ContentFilter {
                    self.metrics.record_content_filter_stop();
                }

                events.push(AnthropicStreamEvent::ContentBlockStop {
                    index: self.open_block_index.unwrap_or(0),
                });

                events.push(AnthropicStreamEvent::MessageDelta {
                    delta: AnthropicMessageDelta {
                        stop_reason: Some(AnthropicStopReason::from(unified_reason)),
                        stop_sequence: None,
                    },
                    usage: AnthropicUsage {
                        input_tokens: 0,
                        output_tokens: self.total_output_tokens as i32,
                    },
                });

                events.push(AnthropicStreamEvent::MessageStop);
            }
        }

        events
    }
}

/// Render one Protocol-A event as its outbound SSE frame: `data: <json>\n\n`.
pub fn render_event(event: &AnthropicStreamEvent) -> String {
    let json = serde_json::to_string(event).expect("AnthropicStreamEvent always serializes");
    format!("data: {json}\n\n")
}

/// Render the terminal `[DONE]` sentinel.
pub fn render_done() -> &'static str {
    "data: [DONE]\n\n"
}

/// Render a mid-stream error per §4.3: `event: error\ndata: <json>\n\n`.
pub fn render_error(err: &OpenCcError) -> String {
    let json = serde_json::to_string(&err.to_payload()).expect("ErrorPayload always serializes");
    format!("event: error\ndata: {json}\n\n")
}

/// The initial `event: connected` ping emitted immediately after headers.
pub fn render_connected() -> &'static str {
    "event: connected\ndata: {\"type\":\"ping\"}\n\n"
}

pub(crate) fn fresh_message_id() -> String {
    format!("msg_{}", &uuid::Uuid::new_v4().simple().to_string()[..24])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::openai::{ChatChoiceDelta, ChatMessageDelta, FinishReason, StreamingFunctionCall, StreamingToolCall, Usage};
    use futures::stream as futures_stream;
    use futures::StreamExt;

    fn chunk(choices: Vec<ChatChoiceDelta>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: "chatcmpl-1".to_string(),
            object: "chat.completion.chunk".to_string(),
            created: 0,
            model: "gpt-4o".to_string(),
            choices,
            usage: None,
            system_fingerprint: None,
        }
    }

    #[tokio::test]
    async fn decode_sse_splits_on_newline_and_stops_at_done() {
        let bytes_stream = futures_stream::iter(vec![
            Ok(bytes::Bytes::from_static(b"data: {\"a\":1}\n\n")),
            Ok(bytes::Bytes::from_static(b"data: [DONE]\n\n")),
        ]);

        let events: Vec<_> = decode_sse(bytes_stream).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap(), &SseEvent::Data("{\"a\":1}".to_string()));
        assert_eq!(events[1].as_ref().unwrap(), &SseEvent::Done);
    }

    #[tokio::test]
    async fn decode_sse_carries_a_partial_line_across_chunks() {
        let bytes_stream = futures_stream::iter(vec![
            Ok(bytes::Bytes::from_static(b"data: {\"a\"")),
            Ok(bytes::Bytes::from_static(b":1}\n\n")),
        ]);

        let events: Vec<_> = decode_sse(bytes_stream).collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap(), &SseEvent::Data("{\"a\":1}".to_string()));
    }

    #[test]
    fn first_chunk_emits_message_start_and_an_open_text_block() {
        let mut processor = StreamProcessor::new("msg_1".to_string(), "claude-3-sonnet-20240229".to_string(), Arc::new(Metrics::new()));

        let events = processor.process(chunk(vec![ChatChoiceDelta {
            index: 0,
            delta: ChatMessageDelta {
                role: None,
                content: Some("hel".to_string()),
                tool_calls: None,
            },
            finish_reason: None,
        }]));

        assert!(matches!(events[0], AnthropicStreamEvent::MessageStart { .. }));
        assert!(matches!(events[1], AnthropicStreamEvent::ContentBlockStart { index: 0, .. }));
        assert!(matches!(events[2], AnthropicStreamEvent::ContentBlockDelta { index: 0, .. }));
    }

    #[test]
    fn finish_reason_closes_the_block_and_emits_delta_then_stop() {
        let mut processor = StreamProcessor::new("msg_1".to_string(), "claude-3-sonnet-20240229".to_string(), Arc::new(Metrics::new()));
        processor.process(chunk(vec![ChatChoiceDelta {
            index: 0,
            delta: ChatMessageDelta {
                role: None,
                content: Some("hi".to_string()),
                tool_calls: None,
            },
            finish_reason: None,
        }]));

        let events = processor.process(chunk(vec![ChatChoiceDelta {
            index: 0,
            delta: ChatMessageDelta::default(),
            finish_reason: Some(FinishReason::Stop),
        }]));

        assert!(matches!(events[0], AnthropicStreamEvent::ContentBlockStop { index: 0 }));
        assert!(matches!(events[1], AnthropicStreamEvent::MessageDelta { .. }));
        assert!(matches!(events[2], AnthropicStreamEvent::MessageStop));
    }

    #[test]
    fn tool_call_name_first_appearance_emits_a_new_content_block_start() {
        let mut processor = StreamProcessor::new("msg_1".to_string(), "claude-3-sonnet-20240229".to_string(), Arc::new(Metrics::new()));
        processor.process(chunk(vec![ChatChoiceDelta {
            index: 0,
            delta: ChatMessageDelta::default(),
            finish_reason: None,
        }]));

        let events = processor.process(chunk(vec![ChatChoiceDelta {
            index: 0,
            delta: ChatMessageDelta {
                role: None,
                content: None,
                tool_calls: Some(vec![StreamingToolCall {
                    index: 0,
                    id: Some("call_1".to_string()),
                    r#type: Some("function".to_string()),
                    function: Some(StreamingFunctionCall {
                        name: Some("get_weather".to_string()),
                        arguments: Some(String::new()),
                    }),
                }]),
            },
            finish_reason: None,
        }]));

        assert!(matches!(events[0], AnthropicStreamEvent::ContentBlockStart { index: 1, .. }));
    }

    #[test]
    fn usage_accumulates_from_the_most_recent_chunk() {
        let mut processor = StreamProcessor::new("msg_1".to_string(), "claude-3-sonnet-20240229".to_string(), Arc::new(Metrics::new()));
        processor.process(chunk(vec![ChatChoiceDelta {
            index: 0,
            delta: ChatMessageDelta::default(),
            finish_reason: None,
        }]));

        let mut with_usage = chunk(vec![ChatChoiceDelta {
            index: 0,
            delta: ChatMessageDelta::default(),
            finish_reason: Some(FinishReason::Stop),
        }]);
        with_usage.usage = Some(Usage {
            prompt_tokens: 5,
            completion_tokens: 12,
            total_tokens: 17,
        });

        let events = processor.process(with_usage);
        let AnthropicStreamEvent::MessageDelta { usage, .. } = &events[1] else {
            unreachable!("expected message_delta");
        };
        assert_eq!(usage.output_tokens, 12);
    }

    #[test]
    fn content_filter_finish_reason_is_recorded_in_metrics() {
        let metrics = Arc::new(Metrics::new());
        let mut processor = StreamProcessor::new("msg_1".to_string(), "claude-3-sonnet-20240229".to_string(), Arc::clone(&metrics));

        processor.process(chunk(vec![ChatChoiceDelta {
            index: 0,
            delta: ChatMessageDelta::default(),
            finish_reason: Some(FinishReason::ContentFilter),
        }]));

        assert_eq!(metrics.snapshot().content_filter_stops, 1);
    }
}
