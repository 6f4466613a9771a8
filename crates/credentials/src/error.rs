use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credentials loaded")]
    MissingCredentials,

    #[error("failed to read credentials file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse credentials file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("token refresh request failed: {0}")]
    RefreshRequest(#[from] reqwest::Error),

    #[error("token refresh rejected ({status}): {body}")]
    RefreshRejected { status: u16, body: String },

    #[error("token refresh timed out")]
    RefreshTimeout,
}
