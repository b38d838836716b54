use jsonwebtoken::jwk::{Jwk, JwkSet};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

const GOOGLE_SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Error, Debug)]
pub enum KeyFetchError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("No signing key with id '{0}'")]
    UnknownKey(String),
}

#[derive(Clone)]
struct CachedKeys {
    keys: HashMap<String, Jwk>,
    expires_at: Instant,
}

/// Fetches and caches the public keys Firebase signs ID tokens with.
///
/// Keys are cached for the `max-age` announced by the endpoint (one hour if absent).
pub struct PublicKeyManager {
    client: Client,
    url: String,
    cache: Arc<RwLock<Option<CachedKeys>>>,
}

impl Default for PublicKeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PublicKeyManager {
    pub fn new() -> Self {
        Self::new_with_url(GOOGLE_SECURE_TOKEN_JWKS_URL.to_string())
    }

    pub fn new_with_url(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Looks up the key with `kid`.
    ///
    /// The endpoint is only contacted when the cached set is missing or expired. An
    /// unknown `kid` against a live cache is rejected without a refetch.
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, KeyFetchError> {
        if let Some(found) = self.lookup_live(kid).await {
            return found;
        }

        self.refresh_keys().await?;

        let cache = self.cache.read().await;
        cache
            .as_ref()
            .and_then(|cached| cached.keys.get(kid).cloned())
            .ok_or_else(|| KeyFetchError::UnknownKey(kid.to_string()))
    }

    // `None` means the cache must be refreshed first.
    async fn lookup_live(&self, kid: &str) -> Option<Result<Jwk, KeyFetchError>> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref().filter(|c| Instant::now() < c.expires_at)?;
        Some(
            cached
                .keys
                .get(kid)
                .cloned()
                .ok_or_else(|| KeyFetchError::UnknownKey(kid.to_string())),
        )
    }

    async fn refresh_keys(&self) -> Result<(), KeyFetchError> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(3600);

        let set: JwkSet = response.json().await?;
        let keys = set
            .keys
            .into_iter()
            .filter_map(|jwk| jwk.common.key_id.clone().map(|kid| (kid, jwk)))
            .collect::<HashMap<_, _>>();
        debug!(count = keys.len(), max_age, "refreshed token signing keys");

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeys {
            keys,
            expires_at: Instant::now() + Duration::from_secs(max_age),
        });

        Ok(())
    }
}

fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control.split(',').find_map(|part| {
        part.trim()
            .strip_prefix("max-age=")
            .and_then(|age| age.parse::<u64>().ok())
    })
}
