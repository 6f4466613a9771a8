use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, RwLock};

use crate::{
    error::CredentialError,
    record::{CredentialRecord, RefreshResponse},
};

/// Everything needed to hit a provider's OAuth token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub token_url: String,
    pub refresh_timeout: Duration,
}

/// Current health of the credential store, as reported by `/health`.
#[derive(Debug, Clone)]
pub struct CredentialStatus {
    pub has_credentials: bool,
    pub is_expired: bool,
    pub expiry_epoch_ms: Option<i64>,
    pub resource_url: Option<String>,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as i64
}

/// Loads, refreshes, and persists a single OAuth [`CredentialRecord`].
///
/// Token vend is serialized through `refresh_lock`: the first caller to observe a stale
/// record performs the refresh HTTP call while holding the lock; every other concurrent
/// caller blocks on the same lock and then re-reads the (now fresh) record instead of
/// issuing its own refresh request. Refresh failures propagate to every waiter, since the
/// lock is simply released without a record update and the next acquirer retries.
pub struct CredentialStore {
    path: PathBuf,
    oauth: OAuthConfig,
    client: reqwest::Client,
    record: RwLock<Option<CredentialRecord>>,
    refresh_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: PathBuf, oauth: OAuthConfig) -> Self {
        Self {
            path,
            oauth,
            client: reqwest::Client::new(),
            record: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Resolve the persisted-credentials path: `$CREDS_PATH`, or `<home>/.<provider>/oauth_creds.json`.
    pub fn resolve_path(provider: &str) -> PathBuf {
        if let Ok(path) = std::env::var("CREDS_PATH") {
            return PathBuf::from(path);
        }

        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Path::new(&home).join(format!(".{provider}")).join("oauth_creds.json")
    }

    /// Load the credential record from disk. Non-fatal if missing: the store simply has
    /// no credentials until the first successful load or refresh.
    pub async fn load(&self) -> Result<(), CredentialError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no credentials file at {}", self.path.display());
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let loaded: CredentialRecord = serde_json::from_str(&content)?;
        *self.record.write().await = Some(loaded);

        Ok(())
    }

    /// Return an access token guaranteed valid for at least one minute, refreshing if needed.
    pub async fn get_valid_access_token(&self) -> Result<SecretString, CredentialError> {
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let previous = self
            .record
            .read()
            .await
            .clone()
            .ok_or(CredentialError::MissingCredentials)?;

        let refreshed = self.refresh(&previous).await?;
        self.persist(&refreshed).await?;
        let token = refreshed.access_token.clone();
        *self.record.write().await = Some(refreshed);

        Ok(token)
    }

    async fn fresh_token(&self) -> Option<SecretString> {
        let record = self.record.read().await;
        let record = record.as_ref()?;

        if record.is_stale(now_ms()) {
            None
        } else {
            Some(record.access_token.clone())
        }
    }

    pub async fn get_base_url(&self) -> Result<String, CredentialError> {
        self.record
            .read()
            .await
            .as_ref()
            .map(CredentialRecord::base_url)
            .ok_or(CredentialError::MissingCredentials)
    }

    pub async fn get_status(&self) -> CredentialStatus {
        let record = self.record.read().await;

        match record.as_ref() {
            Some(record) => CredentialStatus {
                has_credentials: true,
                is_expired: record.is_stale(now_ms()),
                expiry_epoch_ms: Some(record.expiry_epoch_ms),
                resource_url: Some(record.resource_url.clone()),
            },
            None => CredentialStatus {
                has_credentials: false,
                is_expired: true,
                expiry_epoch_ms: None,
                resource_url: None,
            },
        }
    }

    async fn refresh(&self, previous: &CredentialRecord) -> Result<CredentialRecord, CredentialError> {
        let form = [
            ("client_id", self.oauth.client_id.as_str()),
            ("refresh_token", previous.refresh_token.expose_secret()),
            ("grant_type", "refresh_token"),
        ];

        let response = tokio::time::timeout(
            self.oauth.refresh_timeout,
            self.client.post(&self.oauth.token_url).form(&form).send(),
        )
        .await
        .map_err(|_| CredentialError::RefreshTimeout)??;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::RefreshRejected {
                status: status.as_u16(),
                body,
            });
        }

        let refresh: RefreshResponse = response.json().await?;

        Ok(refresh.into_record(now_ms(), previous))
    }

    /// Write the record atomically: write to a sibling temp file, then rename over the target.
    async fn persist(&self, record: &CredentialRecord) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let serialized = serde_json::to_vec_pretty(record)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &serialized).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }
}
