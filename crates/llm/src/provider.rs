//! The provider abstraction: a capability surface over one upstream that isolates
//! auth, base URL, and endpoint differences from the rest of the core.

use async_trait::async_trait;
use futures::stream::Stream;
use http::header::HeaderName;
use reqwest::{Client, Method};
use std::pin::Pin;
use std::sync::Arc;

use config::ProviderConfig;

use crate::auth::{self, AuthProvider, AuthStatus};
use crate::context::RequestContext;
use crate::error::OpenCcError;
use crate::messages::openai;
use crate::messages::unified::{UnifiedModel, UnifiedObjectType, UnifiedRequest, UnifiedResponse};

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// What a provider can do, reported once at construction time.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub supports_streaming: bool,
    pub supports_tools: bool,
    pub supports_vision: bool,
    pub max_tokens: Option<u32>,
    pub max_context_length: Option<u32>,
    pub protocol_version: &'static str,
}

pub type ChunkResult = Result<openai::ChatCompletionChunk, OpenCcError>;
pub type ChatCompletionStream = Pin<Box<dyn Stream<Item = ChunkResult> + Send>>;

/// A single upstream LLM provider: authentication, base URL, and the request/response
/// cycle, unified behind one interface regardless of which upstream it talks to.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn initialize(&self) -> Result<(), OpenCcError>;

    async fn send_request(&self, request: UnifiedRequest, ctx: &RequestContext) -> Result<UnifiedResponse, OpenCcError>;

    async fn send_stream_request(
        &self,
        request: UnifiedRequest,
        ctx: &RequestContext,
    ) -> Result<ChatCompletionStream, OpenCcError>;

    async fn get_models(&self) -> Result<Vec<UnifiedModel>, OpenCcError>;

    async fn test_connection(&self) -> Result<bool, OpenCcError>;

    async fn get_auth_headers(&self) -> Result<Vec<(HeaderName, http::HeaderValue)>, OpenCcError>;

    /// Auth health, as surfaced through `/health`.
    async fn auth_status(&self) -> AuthStatus;

    /// Release any held resources. Safe to call more than once.
    fn dispose(&self);

    fn capabilities(&self) -> Capabilities;

    fn name(&self) -> &str;
}

/// The one concrete `Provider` implementation this system ships: any upstream that
/// speaks the OpenAI Chat Completions wire shape.
pub struct OpenAiCompatibleProvider {
    name: String,
    client: Client,
    base_url: String,
    config: ProviderConfig,
    auth: Arc<dyn AuthProvider>,
}

impl OpenAiCompatibleProvider {
    pub async fn new(name: String, config: ProviderConfig) -> Result<Self, OpenCcError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string());

        let auth = match &config.auth {
            Some(auth_config) => auth::build_auth_provider(&name, auth_config).await?,
            None => return Err(OpenCcError::ProviderInit(format!("providers.{name}: no auth configured"))),
        };

        Ok(Self {
            name,
            client: Client::new(),
            base_url,
            config,
            auth,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn authorized_request(&self, method: Method, url: &str) -> Result<reqwest::RequestBuilder, OpenCcError> {
        let headers = self.auth.auth_headers().await?;
        let mut builder = self.client.request(method, url);

        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        Ok(builder)
    }

    fn resolve_model(&self, requested: &str) -> String {
        self.config.resolve_model(requested).to_string()
    }

    fn map_status_error(status: reqwest::StatusCode, body: String) -> OpenCcError {
        match status.as_u16() {
            401 => OpenCcError::Authentication(body),
            403 => OpenCcError::Authentication(body),
            404 => OpenCcError::InvalidRequest(format!("model not found: {body}")),
            429 => OpenCcError::RateLimit(body),
            400 => OpenCcError::InvalidRequest(body),
            408 => OpenCcError::Timeout(body),
            _ => OpenCcError::Api(format!("upstream returned {status}: {body}")),
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn initialize(&self) -> Result<(), OpenCcError> {
        Ok(())
    }

    async fn send_request(&self, mut request: UnifiedRequest, _ctx: &RequestContext) -> Result<UnifiedResponse, OpenCcError> {
        request.model = self.resolve_model(&request.model);
        request.stream = Some(false);

        let url = self.endpoint("/chat/completions");
        let openai_request = openai::ChatCompletionRequest::from(request);

        let response = self
            .authorized_request(Method::POST, &url)
            .await?
            .json(&openai_request)
            .send()
            .await
            .map_err(|err| OpenCcError::Api(format!("failed to reach upstream: {err}")))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, body));
        }

        let parsed: openai::ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| OpenCcError::Internal(format!("failed to parse upstream response: {err}")))?;

        Ok(UnifiedResponse::from(parsed))
    }

    async fn send_stream_request(
        &self,
        mut request: UnifiedRequest,
        _ctx: &RequestContext,
    ) -> Result<ChatCompletionStream, OpenCcError> {
        use futures_util::StreamExt;

        request.model = self.resolve_model(&request.model);
        request.stream = Some(true);

        let url = self.endpoint("/chat/completions");
        let openai_request = openai::ChatCompletionRequest::from(request);

        let response = self
            .authorized_request(Method::POST, &url)
            .await?
            .json(&openai_request)
            .send()
            .await
            .map_err(|err| OpenCcError::Api(format!("failed to reach upstream: {err}")))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, body));
        }

        let byte_stream = Box::pin(response.bytes_stream().map(|chunk| {
            chunk.map_err(|err| OpenCcError::Stream(format!("upstream connection error: {err}")))
        }));

        // Delegate raw-byte-to-event decoding to the shared SSE decoder; here we only
        // translate the resulting JSON payloads into typed chunks.
        let decoded = crate::stream::decode_sse(byte_stream).filter_map(|event| async move {
            match event {
                Ok(crate::stream::SseEvent::Done) => None,
                Ok(crate::stream::SseEvent::Data(data)) => match serde_json::from_str::<openai::ChatCompletionChunk>(&data) {
                    Ok(chunk) => Some(Ok(chunk)),
                    Err(err) => {
                        log::warn!("failed to parse upstream stream chunk: {err}");
                        None
                    }
                },
                Err(err) => Some(Err(err)),
            }
        });

        Ok(Box::pin(decoded))
    }

    async fn get_models(&self) -> Result<Vec<UnifiedModel>, OpenCcError> {
        let mut models = Vec::new();

        let has_api_key = matches!(self.config.auth, Some(config::AuthConfig::ApiKey { .. }));

        if has_api_key {
            let url = self.endpoint("/models");
            let response = self
                .authorized_request(Method::GET, &url)
                .await?
                .send()
                .await
                .map_err(|err| OpenCcError::Api(format!("failed to list upstream models: {err}")))?;

            if response.status().is_success() {
                let parsed: openai::ModelsResponse = response
                    .json()
                    .await
                    .map_err(|err| OpenCcError::Internal(format!("failed to parse models response: {err}")))?;

                models.extend(parsed.data.into_iter().map(|model| UnifiedModel {
                    id: model.id,
                    object_type: UnifiedObjectType::Model,
                    display_name: None,
                    created: model.created,
                    owned_by: Some(model.owned_by),
                }));
            }
        }

        for (alias, _) in &self.config.models {
            models.push(UnifiedModel {
                id: format!("{}/{}", self.name, alias),
                object_type: UnifiedObjectType::Model,
                display_name: None,
                created: 0,
                owned_by: Some(self.name.clone()),
            });
        }

        Ok(models)
    }

    async fn test_connection(&self) -> Result<bool, OpenCcError> {
        Ok(self.auth.status().await.has_credentials || matches!(self.config.auth, Some(config::AuthConfig::ApiKey { .. })))
    }

    async fn get_auth_headers(&self) -> Result<Vec<(HeaderName, http::HeaderValue)>, OpenCcError> {
        self.auth.auth_headers().await
    }

    async fn auth_status(&self) -> AuthStatus {
        self.auth.status().await
    }

    fn dispose(&self) {}

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_streaming: true,
            supports_tools: true,
            supports_vision: false,
            max_tokens: None,
            max_context_length: None,
            protocol_version: "openai-chat-completions",
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
