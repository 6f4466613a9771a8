//! Configuration loading and validation for the proxy: upstream providers, server
//! listener settings, and the TOML file format (with `{{ env.VAR }}` expansion) they
//! come from.

mod error;
mod loader;
mod provider;
mod server;

use std::collections::BTreeMap;

use serde::Deserialize;

pub use error::Error;
pub use loader::load;
pub use provider::{AuthConfig, ModelFilter, ModelMapping, ProviderConfig};
pub use server::{HealthConfig, ServerConfig};

/// Top-level configuration: the HTTP listener plus every configured upstream
/// provider, keyed by its configuration mode (the symbolic name clients and the
/// provider factory use to select it).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,

    /// Upstream providers, keyed by configuration mode (e.g. `"default"`, `"openai"`).
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Config {
    /// Parse and validate a configuration file, expanding `{{ env.VAR }}` placeholders
    /// against the process environment first.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Error> {
        loader::load(path)
    }

    /// Structural checks that can't be expressed in `serde` alone.
    pub fn validate(&self) -> Result<(), String> {
        if self.providers.is_empty() {
            return Err(
                "no providers configured: at least one [providers.<mode>] section is required".to_string(),
            );
        }

        for (mode, provider) in &self.providers {
            if provider.auth.is_none() && provider.base_url.is_none() {
                return Err(format!(
                    "providers.{mode}: must configure either `auth` or `base_url` (or both)"
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn validate_rejects_empty_provider_map() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_a_minimal_toml_document() {
        let toml = indoc! {r#"
            [server]
            listen_address = "127.0.0.1:8080"

            [providers.default]
            base_url = "https://api.openai.com/v1"

            [providers.default.auth]
            type = "api_key"
            api_key = "sk-test"
        "#};

        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers.len(), 1);
        assert!(config.providers.contains_key("default"));
    }
}
