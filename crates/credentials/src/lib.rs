//! Persistent OAuth credential storage for upstream LLM providers: load, refresh,
//! atomically persist, and vend access tokens under concurrent access.

mod error;
mod record;
mod store;

pub use error::CredentialError;
pub use record::CredentialRecord;
pub use store::{CredentialStatus, CredentialStore, OAuthConfig};
