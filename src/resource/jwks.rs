//! JWKS fetching and caching for the Token Validator.
//!
//! Shaped after the key server's own `JwksCache`, but keyed by `kid`
//! rather than by issuer (this gateway only ever trusts the one
//! configured IdP), with a shorter TTL and a small cap so a rotating
//! key set cannot grow the cache without bound, and a rate limiter
//! guarding the outbound fetch itself.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use backon::{ExponentialBuilder, Retryable};
use dashmap::DashMap;
use governor::{Quota, RateLimiter};
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::AlgorithmParameters;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TTL: Duration = Duration::from_secs(600);
const CAP: usize = 5;

/// Errors that can occur while resolving a signing key.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// The JWKS endpoint could not be reached or returned a bad response.
    #[error("JWKS fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    /// `kid` was not present in the fetched key set.
    #[error("unknown key id: {0}")]
    UnknownKeyId(String),
    /// Outbound fetches are currently rate limited.
    #[error("JWKS fetch rate limit exceeded")]
    RateLimited,
    /// The key material for a matched `kid` was not an RSA key, or was
    /// malformed.
    #[error("unsupported or malformed key material for kid {0}")]
    UnsupportedKey(String),
}

struct CachedKey {
    key: DecodingKey,
    fetched_at: Instant,
}

/// Per-process JWKS cache for the single configured IdP.
pub struct JwksCache {
    jwks_uri: String,
    http: reqwest::Client,
    keys: DashMap<String, CachedKey>,
    fetch_lock: Mutex<()>,
    limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl JwksCache {
    /// Build a cache for `jwks_uri`, rate limited to ~10 fetches/minute.
    #[must_use]
    pub fn new(jwks_uri: String, http: reqwest::Client) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(10).expect("10 is nonzero"));
        Self {
            jwks_uri,
            http,
            keys: DashMap::new(),
            fetch_lock: Mutex::new(()),
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Resolve the decoding key for `kid`, fetching and caching the JWKS
    /// on a miss. Concurrent misses coalesce into a single outbound fetch.
    pub async fn key_for(&self, kid: &str) -> Result<DecodingKey, JwksError> {
        if let Some(cached) = self.fresh_entry(kid) {
            return Ok(cached);
        }

        let _guard = self.fetch_lock.lock().await;

        // Re-check after acquiring the lock: another task may have just
        // populated the entry we were about to fetch for.
        if let Some(cached) = self.fresh_entry(kid) {
            return Ok(cached);
        }

        if self.limiter.check().is_err() {
            return Err(JwksError::RateLimited);
        }

        debug!(jwks_uri = %self.jwks_uri, "fetching JWKS");
        // A single flaky connection to the IdP shouldn't fail every request
        // waiting on this coalesced fetch; retry transient errors a couple
        // of times with a short exponential backoff before giving up.
        let jwk_set: jsonwebtoken::jwk::JwkSet = (|| async {
            self.http.get(&self.jwks_uri).send().await?.json().await
        })
        .retry(ExponentialBuilder::default().with_max_times(3))
        .await?;

        for jwk in &jwk_set.keys {
            let Some(key_id) = jwk.common.key_id.clone() else {
                continue;
            };
            let decoding_key = match &jwk.algorithm {
                AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                    .map_err(|_| JwksError::UnsupportedKey(key_id.clone()))?,
                _ => {
                    warn!(kid = %key_id, "skipping non-RSA key in JWKS");
                    continue;
                }
            };
            self.keys.insert(
                key_id,
                CachedKey {
                    key: decoding_key,
                    fetched_at: Instant::now(),
                },
            );
        }

        self.evict_over_cap();

        self.keys
            .get(kid)
            .map(|entry| entry.key.clone())
            .ok_or_else(|| JwksError::UnknownKeyId(kid.to_string()))
    }

    fn fresh_entry(&self, kid: &str) -> Option<DecodingKey> {
        let entry = self.keys.get(kid)?;
        if entry.fetched_at.elapsed() >= TTL {
            return None;
        }
        Some(entry.key.clone())
    }

    fn evict_over_cap(&self) {
        if self.keys.len() <= CAP {
            return;
        }
        let mut by_age: Vec<(String, Instant)> = self
            .keys
            .iter()
            .map(|entry| (entry.key().clone(), entry.fetched_at))
            .collect();
        by_age.sort_by_key(|(_, fetched_at)| *fetched_at);
        for (kid, _) in by_age.into_iter().take(self.keys.len().saturating_sub(CAP)) {
            self.keys.remove(&kid);
        }
    }
}

/// Shared handle type used throughout the validator.
pub type SharedJwksCache = Arc<JwksCache>;
