//! Provider factory: instantiates a [`Provider`] for a configuration mode and caches
//! it, invalidating the cache entry when a health probe reports unhealthy.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use config::Config;

use crate::error::OpenCcError;
use crate::provider::{OpenAiCompatibleProvider, Provider};

/// Caches one [`Provider`] per configuration mode, constructing (and
/// `initialize()`-ing) lazily on first lookup and re-constructing whenever the cached
/// provider's health probe fails.
pub struct ProviderFactory {
    config: Config,
    cache: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// All configured modes, for `/v1/models` and `/health`.
    pub fn modes(&self) -> Vec<String> {
        self.config.providers.keys().cloned().collect()
    }

    /// Resolve the provider for `mode`: return the cached instance if a cheap health
    /// probe succeeds; otherwise construct, initialize, cache, and return a fresh one.
    pub async fn get(&self, mode: &str) -> Result<Arc<dyn Provider>, OpenCcError> {
        if let Some(provider) = self.cache.read().await.get(mode) {
            if provider.test_connection().await.unwrap_or(false) {
                return Ok(provider.clone());
            }
        }

        let mut cache = self.cache.write().await;

        // Another caller may have refreshed the entry while we waited for the lock.
        if let Some(provider) = cache.get(mode) {
            if provider.test_connection().await.unwrap_or(false) {
                return Ok(provider.clone());
            }
        }

        let provider = self.construct(mode).await?;
        cache.insert(mode.to_string(), provider.clone());

        Ok(provider)
    }

    /// Drop a cached provider's entry, forcing reconstruction on next lookup. Exposed
    /// for tests.
    pub async fn invalidate(&self, mode: &str) {
        if let Some(provider) = self.cache.write().await.remove(mode) {
            provider.dispose();
        }
    }

    async fn construct(&self, mode: &str) -> Result<Arc<dyn Provider>, OpenCcError> {
        let provider_config = self
            .config
            .providers
            .get(mode)
            .ok_or_else(|| OpenCcError::InvalidRequest(format!("no provider configured for mode '{mode}'")))?;

        let provider: Arc<dyn Provider> =
            Arc::new(OpenAiCompatibleProvider::new(mode.to_string(), provider_config.clone()).await?);
        provider.initialize().await?;

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config_with_one_provider() -> Config {
        let mut providers = BTreeMap::new();
        providers.insert("default".to_string(), {
            let mut provider = config::ProviderConfig::default();
            provider.base_url = Some("https://example.com/v1".to_string());
            provider.auth = Some(config::AuthConfig::ApiKey {
                api_key: secrecy::SecretString::from("sk-test"),
                organization: None,
            });
            provider
        });

        Config {
            server: config::ServerConfig::default(),
            providers,
        }
    }

    #[tokio::test]
    async fn get_constructs_and_caches_a_provider() {
        let factory = ProviderFactory::new(config_with_one_provider());
        let first = factory.get("default").await.unwrap();
        let second = factory.get("default").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn get_for_an_unconfigured_mode_is_an_error() {
        let factory = ProviderFactory::new(config_with_one_provider());
        assert!(factory.get("nonexistent").await.is_err());
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_provider_on_next_lookup() {
        let factory = ProviderFactory::new(config_with_one_provider());
        let first = factory.get("default").await.unwrap();
        factory.invalidate("default").await;
        let second = factory.get("default").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
