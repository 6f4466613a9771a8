//! Per-request authentication header production, and auth health reporting, for a
//! single configured provider.

use std::sync::Arc;

use async_trait::async_trait;
use http::{header, HeaderValue};
use secrecy::ExposeSecret;

use config::AuthConfig;
use credentials::{CredentialStore, OAuthConfig};

use crate::error::OpenCcError;

/// Auth health as surfaced through `/health`.
#[derive(Debug, Clone)]
pub struct AuthStatus {
    pub has_credentials: bool,
    pub is_expired: bool,
}

/// Produces the `Authorization` (and any auxiliary) headers for upstream requests.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn auth_headers(&self) -> Result<Vec<(header::HeaderName, HeaderValue)>, OpenCcError>;
    async fn status(&self) -> AuthStatus;
}

/// Static bearer API key, optionally scoped to an organization.
pub struct ApiKeyAuth {
    authorization: HeaderValue,
    organization: Option<HeaderValue>,
}

impl ApiKeyAuth {
    pub fn new(api_key: &secrecy::SecretString, organization: Option<&str>) -> Result<Self, OpenCcError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|err| OpenCcError::ProviderInit(format!("invalid api_key header value: {err}")))?;
        authorization.set_sensitive(true);

        let organization = organization
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|err| OpenCcError::ProviderInit(format!("invalid organization header value: {err}")))?;

        Ok(Self {
            authorization,
            organization,
        })
    }
}

#[async_trait]
impl AuthProvider for ApiKeyAuth {
    async fn auth_headers(&self) -> Result<Vec<(header::HeaderName, HeaderValue)>, OpenCcError> {
        let mut headers = vec![(header::AUTHORIZATION, self.authorization.clone())];

        if let Some(organization) = &self.organization {
            headers.push((
                header::HeaderName::from_static("openai-organization"),
                organization.clone(),
            ));
        }

        Ok(headers)
    }

    async fn status(&self) -> AuthStatus {
        AuthStatus {
            has_credentials: true,
            is_expired: false,
        }
    }
}

/// OAuth2 refresh-token flow, backed by the shared credential store.
pub struct OAuthAuth {
    store: Arc<CredentialStore>,
}

impl OAuthAuth {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthProvider for OAuthAuth {
    async fn auth_headers(&self) -> Result<Vec<(header::HeaderName, HeaderValue)>, OpenCcError> {
        let token = self
            .store
            .get_valid_access_token()
            .await
            .map_err(|err| OpenCcError::Authentication(err.to_string()))?;

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|err| OpenCcError::Internal(format!("invalid access token header value: {err}")))?;
        value.set_sensitive(true);

        Ok(vec![(header::AUTHORIZATION, value)])
    }

    async fn status(&self) -> AuthStatus {
        let status = self.store.get_status().await;
        AuthStatus {
            has_credentials: status.has_credentials,
            is_expired: status.is_expired,
        }
    }
}

/// Build the configured [`AuthProvider`] for a provider's auth config. OAuth providers
/// get a fresh [`CredentialStore`] keyed by `mode` (used to derive the default
/// credentials path).
pub async fn build_auth_provider(mode: &str, auth: &AuthConfig) -> Result<Arc<dyn AuthProvider>, OpenCcError> {
    match auth {
        AuthConfig::ApiKey { api_key, organization } => {
            Ok(Arc::new(ApiKeyAuth::new(api_key, organization.as_deref())?))
        }
        AuthConfig::OAuth {
            client_id,
            token_url,
            refresh_timeout_secs,
        } => {
            let store = CredentialStore::new(
                CredentialStore::resolve_path(mode),
                OAuthConfig {
                    client_id: client_id.clone(),
                    token_url: token_url.clone(),
                    refresh_timeout: std::time::Duration::from_secs(*refresh_timeout_secs),
                },
            );

            store
                .load()
                .await
                .map_err(|err| OpenCcError::ProviderInit(format!("failed to load credentials: {err}")))?;

            Ok(Arc::new(OAuthAuth::new(Arc::new(store))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn api_key_auth_produces_a_bearer_header() {
        let auth = ApiKeyAuth::new(&secrecy::SecretString::from("sk-test"), None).unwrap();
        let headers = auth.auth_headers().await.unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].1.to_str().unwrap(), "Bearer sk-test");
    }

    #[tokio::test]
    async fn api_key_auth_with_organization_adds_a_second_header() {
        let auth = ApiKeyAuth::new(&secrecy::SecretString::from("sk-test"), Some("org-123")).unwrap();
        let headers = auth.auth_headers().await.unwrap();
        assert_eq!(headers.len(), 2);
    }

    #[tokio::test]
    async fn oauth_auth_without_credentials_reports_unhealthy_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(
            dir.path().join("missing.json"),
            OAuthConfig {
                client_id: "id".to_string(),
                token_url: "http://unused".to_string(),
                refresh_timeout: std::time::Duration::from_secs(1),
            },
        ));

        let auth = OAuthAuth::new(store);
        let status = auth.status().await;
        assert!(!status.has_credentials);
    }
}
