//! Per-provider configuration: how to authenticate, where to send requests, and which
//! models this provider should answer for.

use std::{borrow::Cow, collections::BTreeMap, fmt};

use regex::{Regex, RegexBuilder};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Case-insensitive regex filter for routing a model id to a provider.
#[derive(Clone)]
pub struct ModelFilter {
    regex: Regex,
}

impl ModelFilter {
    fn new(pattern: &str) -> Result<Self, String> {
        let trimmed = pattern.trim();

        if trimmed.is_empty() {
            return Err("model_filter cannot be empty".to_string());
        }

        let regex = RegexBuilder::new(trimmed)
            .case_insensitive(true)
            .build()
            .map_err(|err| format!("invalid model_filter regex: {err}"))?;

        Ok(Self { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, model: &str) -> bool {
        self.regex.is_match(model)
    }
}

impl fmt::Debug for ModelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFilter").field("pattern", &self.pattern()).finish()
    }
}

impl<'de> Deserialize<'de> for ModelFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pattern = Cow::<'de, str>::deserialize(deserializer)?;
        ModelFilter::new(pattern.as_ref()).map_err(serde::de::Error::custom)
    }
}

/// Per-model overrides within a provider (currently just the upstream rename).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelMapping {
    /// Upstream model id, if it differs from the map key used by clients.
    pub rename: Option<String>,
}

/// How a provider authenticates with its upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AuthConfig {
    /// Static bearer API key, optionally scoped to an organization.
    ApiKey {
        api_key: SecretString,
        #[serde(default)]
        organization: Option<String>,
    },
    /// OAuth2 refresh-token flow, backed by the credential store.
    OAuth {
        client_id: String,
        token_url: String,
        #[serde(default = "default_refresh_timeout_secs")]
        refresh_timeout_secs: u64,
    },
}

fn default_refresh_timeout_secs() -> u64 {
    10
}

/// A single upstream provider: where it lives, how to authenticate, and which models
/// it should serve.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL for the provider's OpenAI-compatible API. Required unless supplied by
    /// OAuth-discovered `resource_url` at runtime.
    pub base_url: Option<String>,

    pub auth: Option<AuthConfig>,

    /// Regular expression selecting which client-requested models route here.
    pub model_filter: Option<ModelFilter>,

    /// Explicit per-model overrides, keyed by the client-facing model id.
    pub models: BTreeMap<String, ModelMapping>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth: None,
            model_filter: None,
            models: BTreeMap::new(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the upstream model id for a client-requested model: an explicit rename
    /// if configured, else the input verbatim.
    pub fn resolve_model<'a>(&'a self, requested: &'a str) -> &'a str {
        self.models
            .get(requested)
            .and_then(|mapping| mapping.rename.as_deref())
            .unwrap_or(requested)
    }
}
