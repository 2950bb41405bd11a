//! OAuth 2.1 proxy authorization server for MCP clients.
//!
//! Implements Dynamic Client Registration (RFC 7591), the OAuth
//! discovery documents (RFC 8414, RFC 9728), and the Authorization-Code
//! Broker that bridges DCR-registered MCP clients against the gateway's
//! single pre-registered confidential client at the enterprise IdP.

pub mod authorize;
pub mod callback;
pub mod idp_client;
pub mod metadata;
pub mod models;
pub mod pkce;
pub mod registration;
pub mod resource;
pub mod revoke;
pub mod storage;
pub mod token;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::config::Config;
use idp_client::IdpClient;
use storage::{ClientRegistry, CodeStore, TransactionStore};

/// Shared state for every OAuth-facing handler.
pub struct OAuthState {
    /// The gateway's configuration (IdP identity, base URL, TTLs, ...).
    pub config: Config,
    /// DCR-registered MCP clients.
    pub clients: ClientRegistry,
    /// Pending authorization transactions, keyed by `proxy_state`.
    pub transactions: Arc<TransactionStore>,
    /// One-shot authorization codes, keyed by `proxy_code`.
    pub codes: Arc<CodeStore>,
    /// Outbound HTTP client for the gateway's confidential relationship
    /// with the IdP.
    pub idp_client: IdpClient,
}

impl OAuthState {
    /// Build the shared OAuth state. Does not start the sweeper — call
    /// [`spawn_sweeper`] once the state is wrapped in an `Arc`.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client to the IdP cannot be
    /// constructed.
    pub fn new(config: Config) -> reqwest::Result<Self> {
        let idp_client = IdpClient::new(config.idp.clone())?;
        Ok(Self {
            clients: ClientRegistry::new(),
            transactions: Arc::new(TransactionStore::new(config.gateway.transaction_ttl)),
            codes: Arc::new(CodeStore::new(config.gateway.code_ttl)),
            idp_client,
            config,
        })
    }
}

/// Mount every OAuth-facing route onto a router already carrying
/// `Arc<OAuthState>` as its state.
#[must_use]
pub fn router() -> Router<Arc<OAuthState>> {
    Router::new()
        .route(
            "/.well-known/oauth-protected-resource",
            get(resource::serve),
        )
        .route(
            "/.well-known/oauth-authorization-server",
            get(metadata::serve),
        )
        .route("/register", post(registration::register))
        .route("/authorize", get(authorize::authorize))
        .route("/auth/callback", get(callback::callback))
        .route("/token", post(token::token))
        .route("/revoke", post(revoke::revoke))
}

/// Start the background task that reaps expired transactions and codes.
pub fn spawn_sweeper(state: &Arc<OAuthState>) {
    storage::spawn_sweeper(
        Arc::clone(&state.transactions),
        Arc::clone(&state.codes),
        state.config.gateway.sweep_interval,
    );
}
