use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// A persisted OAuth credential for one upstream provider.
///
/// `expiry_epoch_ms` is absolute (milliseconds since the Unix epoch), not a
/// duration — see [`CredentialRecord::is_stale`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expiry_epoch_ms: i64,
    pub resource_url: String,
}

impl CredentialRecord {
    /// A record is stale once `now_ms >= expiry_epoch_ms`.
    pub fn is_stale(&self, now_ms: i64) -> bool {
        now_ms >= self.expiry_epoch_ms
    }

    /// The upstream base URL, prefixed with `https://` if the stored value has no scheme.
    pub fn base_url(&self) -> String {
        if self.resource_url.contains("://") {
            self.resource_url.clone()
        } else {
            format!("https://{}", self.resource_url)
        }
    }
}

/// Response body from the OAuth token refresh endpoint.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access_token: SecretString,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
    pub expires_in: i64,
    #[serde(default)]
    pub resource_url: Option<String>,
}

/// Safety margin subtracted from the advertised expiry so callers always get a token
/// valid for at least one minute.
pub const EXPIRY_SAFETY_MARGIN_MS: i64 = 60_000;

impl RefreshResponse {
    pub fn into_record(self, now_ms: i64, previous: &CredentialRecord) -> CredentialRecord {
        CredentialRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token.unwrap_or_else(|| previous.refresh_token.clone()),
            expiry_epoch_ms: now_ms + self.expires_in * 1000 - EXPIRY_SAFETY_MARGIN_MS,
            resource_url: self.resource_url.unwrap_or_else(|| previous.resource_url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn record(expiry_epoch_ms: i64) -> CredentialRecord {
        CredentialRecord {
            access_token: SecretString::from("at"),
            refresh_token: SecretString::from("rt"),
            expiry_epoch_ms,
            resource_url: "api.example.com".to_string(),
        }
    }

    #[test]
    fn stale_iff_now_at_or_past_expiry() {
        let rec = record(1_000);
        assert!(!rec.is_stale(999));
        assert!(rec.is_stale(1_000));
        assert!(rec.is_stale(1_001));
    }

    #[test]
    fn base_url_gets_https_prefix_when_missing() {
        assert_eq!(record(0).base_url(), "https://api.example.com");

        let mut with_scheme = record(0);
        with_scheme.resource_url = "http://localhost:8080".to_string();
        assert_eq!(with_scheme.base_url(), "http://localhost:8080");
    }

    #[test]
    fn refresh_preserves_previous_refresh_token_when_omitted() {
        let previous = record(0);
        let refresh = RefreshResponse {
            access_token: SecretString::from("new-at"),
            refresh_token: None,
            expires_in: 3600,
            resource_url: None,
        };

        let updated = refresh.into_record(10_000, &previous);

        assert_eq!(updated.refresh_token.expose_secret(), "rt");
        assert_eq!(updated.resource_url, "api.example.com");
        assert_eq!(updated.expiry_epoch_ms, 10_000 + 3_600_000 - EXPIRY_SAFETY_MARGIN_MS);
    }

    #[test]
    fn refresh_uses_new_refresh_token_when_present() {
        let previous = record(0);
        let refresh = RefreshResponse {
            access_token: SecretString::from("new-at"),
            refresh_token: Some(SecretString::from("new-rt")),
            expires_in: 60,
            resource_url: Some("new.example.com".to_string()),
        };

        let updated = refresh.into_record(0, &previous);

        assert_eq!(updated.refresh_token.expose_secret(), "new-rt");
        assert_eq!(updated.resource_url, "new.example.com");
    }
}
