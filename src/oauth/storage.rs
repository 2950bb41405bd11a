//! In-memory storage for client registrations, pending authorization
//! transactions, and one-shot authorization codes.
//!
//! `DashMap` gives lock-free concurrent access per shard, the same idiom
//! the key server uses for its token store. Transactions and codes are
//! read with `remove` (atomic lookup-then-delete) everywhere they are
//! consumed, which is what makes single-use enforcement race-free without
//! an extra lock.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use super::models::{AuthTransaction, AuthorizationCodeRecord, ClientRegistration, now_secs};

/// Registered DCR clients. Entries are immutable after insertion and
/// never swept — see `DESIGN.md`'s Open Question on unbounded growth.
#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<String, ClientRegistration>,
}

impl ClientRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly minted registration.
    pub fn insert(&self, registration: ClientRegistration) {
        self.clients
            .insert(registration.client_id.clone(), registration);
    }

    /// Look up a client by id.
    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<ClientRegistration> {
        self.clients.get(client_id).map(|entry| entry.clone())
    }
}

/// Pending authorization transactions, keyed by `proxy_state`, with a TTL
/// of [`GatewayAuthConfig::transaction_ttl`](crate::config::GatewayAuthConfig).
#[derive(Default)]
pub struct TransactionStore {
    transactions: DashMap<String, AuthTransaction>,
    ttl: Duration,
}

impl TransactionStore {
    /// Create a store that expires entries after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            transactions: DashMap::new(),
            ttl,
        }
    }

    /// Persist a new transaction keyed by `proxy_state`.
    pub fn insert(&self, proxy_state: String, transaction: AuthTransaction) {
        self.transactions.insert(proxy_state, transaction);
    }

    /// Atomically remove and return the transaction for `proxy_state`, if
    /// it exists and has not expired. An expired entry is removed and
    /// treated as absent, honoring the TTL-safety invariant even if the
    /// sweeper hasn't reaped it yet.
    #[must_use]
    pub fn take(&self, proxy_state: &str) -> Option<AuthTransaction> {
        let (_, transaction) = self.transactions.remove(proxy_state)?;
        if now_secs().saturating_sub(transaction.created_at) > self.ttl.as_secs() {
            debug!(proxy_state, "transaction expired before consumption");
            return None;
        }
        Some(transaction)
    }

    /// Remove every transaction older than `ttl`. Returns the count removed.
    pub fn sweep(&self) -> usize {
        let ttl_secs = self.ttl.as_secs();
        let now = now_secs();
        let expired: Vec<String> = self
            .transactions
            .iter()
            .filter(|entry| now.saturating_sub(entry.created_at) > ttl_secs)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &expired {
            self.transactions.remove(key);
        }
        expired.len()
    }
}

/// One-shot authorization codes, keyed by `proxy_code`, with a TTL of
/// [`GatewayAuthConfig::code_ttl`](crate::config::GatewayAuthConfig).
#[derive(Default)]
pub struct CodeStore {
    codes: DashMap<String, AuthorizationCodeRecord>,
    ttl: Duration,
}

impl CodeStore {
    /// Create a store that expires entries after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            codes: DashMap::new(),
            ttl,
        }
    }

    /// Persist a freshly minted code record.
    pub fn insert(&self, proxy_code: String, record: AuthorizationCodeRecord) {
        self.codes.insert(proxy_code, record);
    }

    /// Atomically remove and return the record for `proxy_code`, honoring
    /// single-use semantics: the record is gone after this call regardless
    /// of whether it is returned as valid or expired.
    #[must_use]
    pub fn take(&self, proxy_code: &str) -> Option<AuthorizationCodeRecord> {
        let (_, record) = self.codes.remove(proxy_code)?;
        if now_secs().saturating_sub(record.created_at) > self.ttl.as_secs() {
            debug!(proxy_code, "authorization code expired before redemption");
            return None;
        }
        Some(record)
    }

    /// Remove every code record older than `ttl`. Returns the count removed.
    pub fn sweep(&self) -> usize {
        let ttl_secs = self.ttl.as_secs();
        let now = now_secs();
        let expired: Vec<String> = self
            .codes
            .iter()
            .filter(|entry| now.saturating_sub(entry.created_at) > ttl_secs)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &expired {
            self.codes.remove(key);
        }
        expired.len()
    }
}

/// Spawn the background sweeper that periodically reaps expired
/// transactions and codes. The sweeper never blocks request handling —
/// each pass is a bounded scan-and-remove, not a lock held across await
/// points.
pub fn spawn_sweeper(
    transactions: Arc<TransactionStore>,
    codes: Arc<CodeStore>,
    interval: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let swept_transactions = transactions.sweep();
            let swept_codes = codes.sweep();
            if swept_transactions > 0 || swept_codes > 0 {
                debug!(
                    swept_transactions,
                    swept_codes, "sweeper reclaimed expired auth state"
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transaction() -> AuthTransaction {
        AuthTransaction {
            client_id: "c1".to_string(),
            client_redirect_uri: "https://app/cb".to_string(),
            client_state: Some("s1".to_string()),
            client_code_challenge: "challenge".to_string(),
            client_code_challenge_method: "S256".to_string(),
            proxy_code_verifier: "verifier".to_string(),
            requested_scope: None,
            created_at: now_secs(),
        }
    }

    fn sample_code_record() -> AuthorizationCodeRecord {
        AuthorizationCodeRecord {
            access_token: "JWT1".to_string(),
            refresh_token: Some("R1".to_string()),
            expires_in: 3600,
            scope: None,
            client_code_challenge: "challenge".to_string(),
            client_code_challenge_method: "S256".to_string(),
            created_at: now_secs(),
        }
    }

    #[test]
    fn transaction_take_is_single_use() {
        let store = TransactionStore::new(Duration::from_secs(600));
        store.insert("state1".to_string(), sample_transaction());
        assert!(store.take("state1").is_some());
        assert!(store.take("state1").is_none());
    }

    #[test]
    fn transaction_take_rejects_expired_entry() {
        let store = TransactionStore::new(Duration::from_secs(0));
        let mut txn = sample_transaction();
        txn.created_at = now_secs() - 10;
        store.insert("state1".to_string(), txn);
        assert!(store.take("state1").is_none());
    }

    #[test]
    fn transaction_sweep_removes_only_expired() {
        let store = TransactionStore::new(Duration::from_secs(600));
        store.insert("fresh".to_string(), sample_transaction());
        let mut stale = sample_transaction();
        stale.created_at = now_secs() - 1000;
        store.insert("stale".to_string(), stale);

        assert_eq!(store.sweep(), 1);
        assert!(store.take("fresh").is_some());
    }

    #[test]
    fn code_take_is_single_use() {
        let store = CodeStore::new(Duration::from_secs(300));
        store.insert("code1".to_string(), sample_code_record());
        assert!(store.take("code1").is_some());
        assert!(store.take("code1").is_none());
    }

    #[test]
    fn client_registry_roundtrip() {
        let registry = ClientRegistry::new();
        let registration = ClientRegistration {
            client_id: "c1".to_string(),
            client_name: Some("X".to_string()),
            redirect_uris: vec!["https://app/cb".to_string()],
            grant_types: vec!["authorization_code".to_string()],
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: "none".to_string(),
            client_secret: None,
            created_at: now_secs(),
        };
        registry.insert(registration);

        let fetched = registry.get("c1").expect("registration present");
        assert!(fetched.allows_redirect_uri("https://app/cb"));
        assert!(!fetched.allows_redirect_uri("https://evil/cb"));
    }
}
