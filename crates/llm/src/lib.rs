//! Crate root: wires the provider abstraction, message converters, and the streaming
//! processor into the `/v1/messages` and `/v1/models` handlers this proxy exposes.

pub mod auth;
pub mod context;
pub mod error;
pub mod factory;
mod messages;
pub mod metrics;
pub mod provider;
pub mod stream;

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use futures::{Stream, StreamExt};
use uuid::Uuid;

pub use error::OpenCcError;
pub use messages::{anthropic, openai};

use config::Config;
use context::RequestContext;
use factory::ProviderFactory;
use messages::unified::UnifiedRequest;
use metrics::Metrics;

/// Shared state behind every handler.
pub struct AppState {
    factory: ProviderFactory,
    metrics: Arc<Metrics>,
    /// The configuration mode this deployment answers requests for. Resolved once at
    /// startup: the `"default"` key if present, else whichever mode sorts first.
    active_mode: String,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, OpenCcError> {
        let active_mode = if config.providers.contains_key("default") {
            "default".to_string()
        } else {
            config
                .providers
                .keys()
                .next()
                .cloned()
                .ok_or_else(|| OpenCcError::ProviderInit("no providers configured".to_string()))?
        };

        Ok(Self {
            factory: ProviderFactory::new(config),
            metrics: Arc::new(Metrics::new()),
            active_mode,
        })
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn factory(&self) -> &ProviderFactory {
        &self.factory
    }

    pub fn active_mode(&self) -> &str {
        &self.active_mode
    }
}

/// Build the axum router for the two LLM endpoints this proxy exposes. `/health` and
/// friends are assembled separately, in `crates/server`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/messages", post(messages_handler))
        .route("/v1/models", get(models_handler))
        .with_state(state)
}

fn extract_context(headers: &HeaderMap, original_model: String) -> RequestContext {
    let request_id = headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    RequestContext::new(request_id, original_model, user_agent, ip)
}

/// §4.1's input contract: `InvalidRequest` when `model` is missing/empty, `max_tokens`
/// is absent or `<= 0`, `messages` is empty. An unknown role fails during JSON
/// deserialization before this function ever runs.
fn validate_request(request: &anthropic::AnthropicChatRequest) -> Result<(), OpenCcError> {
    if request.model.trim().is_empty() {
        return Err(OpenCcError::InvalidRequest("model is required".to_string()));
    }

    if request.max_tokens == 0 {
        return Err(OpenCcError::InvalidRequest(
            "max_tokens must be greater than 0".to_string(),
        ));
    }

    if request.messages.is_empty() {
        return Err(OpenCcError::InvalidRequest("messages must not be empty".to_string()));
    }

    Ok(())
}

fn json_body_response(status: StatusCode, body: String) -> Result<Response, OpenCcError> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|err| OpenCcError::Internal(format!("failed to build response: {err}")))
}

async fn messages_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<anthropic::AnthropicChatRequest>,
) -> Result<Response, OpenCcError> {
    state.metrics.record_request();

    let result = handle_messages(&state, headers, request).await;

    if let Err(err) = &result {
        state.metrics.record_error(err);
    }

    result
}

async fn handle_messages(
    state: &AppState,
    headers: HeaderMap,
    request: anthropic::AnthropicChatRequest,
) -> Result<Response, OpenCcError> {
    validate_request(&request)?;

    let original_model = request.model.clone();
    let streaming = request.stream.unwrap_or(false);
    let ctx = extract_context(&headers, original_model.clone());
    let unified_request = UnifiedRequest::from(request);

    let provider = state.factory.get(&state.active_mode).await?;

    if streaming {
        let message_id = stream::fresh_message_id();
        let upstream = provider.send_stream_request(unified_request, &ctx).await?;

        state.metrics.stream_started();

        let processor = stream::StreamProcessor::new(message_id, original_model, Arc::clone(&state.metrics));
        let frames = sse_frames(upstream, processor, Arc::clone(&state.metrics));

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from_stream(frames))
            .map_err(|err| OpenCcError::Internal(format!("failed to build streaming response: {err}")))
    } else {
        let response = provider.send_request(unified_request, &ctx).await?;
        let message_id = stream::fresh_message_id();
        let anthropic_response =
            messages::unified::to_anthropic::unified_response_to_anthropic(response, message_id, original_model, &state.metrics);

        let body = sonic_rs::to_string(&anthropic_response)
            .map_err(|err| OpenCcError::Internal(format!("failed to serialize response: {err}")))?;

        json_body_response(StatusCode::OK, body)
    }
}

/// Turn an upstream chunk stream into well-framed SSE bytes: each chunk may expand into
/// zero or more events, a `message_stop` is followed by the `[DONE]` sentinel, and a
/// mid-stream error closes the stream immediately without one (§4.3, Open Question 3).
fn sse_frames(
    upstream: provider::ChatCompletionStream,
    processor: stream::StreamProcessor,
    metrics: Arc<Metrics>,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    struct State {
        upstream: provider::ChatCompletionStream,
        processor: stream::StreamProcessor,
        metrics: Arc<Metrics>,
        queued: std::collections::VecDeque<String>,
        done: bool,
    }

    let state = State {
        upstream,
        processor,
        metrics,
        queued: std::collections::VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.queued.pop_front() {
                return Some((Ok(Bytes::from(frame)), state));
            }

            if state.done {
                return None;
            }

            match state.upstream.next().await {
                Some(Ok(chunk)) => {
                    let events = state.processor.process(chunk);
                    let saw_stop = events
                        .iter()
                        .any(|event| matches!(event, anthropic::AnthropicStreamEvent::MessageStop));

                    for event in &events {
                        state.queued.push_back(stream::render_event(event));
                    }

                    if saw_stop {
                        state.queued.push_back(stream::render_done().to_string());
                        state.done = true;
                        state.metrics.stream_ended();
                    }
                }
                Some(Err(err)) => {
                    state.queued.push_back(stream::render_error(&err));
                    state.done = true;
                    state.metrics.stream_ended();
                }
                None => {
                    state.metrics.stream_ended();
                    return None;
                }
            }
        }
    })
}

async fn models_handler(State(state): State<Arc<AppState>>) -> Result<Response, OpenCcError> {
    let provider = state.factory.get(&state.active_mode).await?;
    let models = provider.get_models().await?;

    let data = models
        .into_iter()
        .map(|model| openai::Model {
            id: model.id,
            object: "model".to_string(),
            created: model.created,
            owned_by: model.owned_by.unwrap_or_default(),
        })
        .collect();

    let body = sonic_rs::to_string(&openai::ModelsResponse {
        object: "list".to_string(),
        data,
    })
    .map_err(|err| OpenCcError::Internal(format!("failed to serialize response: {err}")))?;

    json_body_response(StatusCode::OK, body)
}
