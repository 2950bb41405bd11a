//! Authorization-Code Broker, first leg — `GET /authorize`.
//!
//! Validates the client's request, opens a fresh PKCE relationship with
//! the IdP (distinct from the client's own), stashes both alongside the
//! client's original request in an [`AuthTransaction`], and redirects the
//! user-agent to the IdP.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use super::OAuthState;
use super::models::{AuthTransaction, OAuthError, OAuthErrorKind, now_secs};
use super::pkce::{challenge_s256, generate_opaque_id, generate_verifier};

/// Query parameters a client presents to `GET /authorize`.
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub state: Option<String>,
    pub code_challenge: String,
    pub code_challenge_method: Option<String>,
    pub scope: Option<String>,
}

/// `GET /authorize`
pub async fn authorize(
    State(state): State<Arc<OAuthState>>,
    Query(request): Query<AuthorizeRequest>,
) -> Response {
    if request.response_type != "code" {
        return OAuthError::with_description(
            OAuthErrorKind::UnsupportedResponseType,
            "only response_type=code is supported",
        )
        .into_response();
    }

    let Some(client) = state.clients.get(&request.client_id) else {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidRequest,
            "unknown client_id",
        )
        .into_response();
    };

    if !client.allows_redirect_uri(&request.redirect_uri) {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidRequest,
            "redirect_uri was not registered for this client",
        )
        .into_response();
    }

    let challenge_method = request
        .code_challenge_method
        .unwrap_or_else(|| "plain".to_string());
    if challenge_method != "S256" && challenge_method != "plain" {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidRequest,
            "code_challenge_method must be S256 or plain",
        )
        .into_response();
    }

    let proxy_state = generate_opaque_id();
    let proxy_code_verifier = generate_verifier();
    let proxy_code_challenge = challenge_s256(&proxy_code_verifier);

    let transaction = AuthTransaction {
        client_id: request.client_id,
        client_redirect_uri: request.redirect_uri,
        client_state: request.state,
        client_code_challenge: request.code_challenge,
        client_code_challenge_method: challenge_method,
        proxy_code_verifier,
        requested_scope: request.scope.clone(),
        created_at: now_secs(),
    };
    state.transactions.insert(proxy_state.clone(), transaction);

    // The client's own `scope` travels only as far as the transaction
    // (kept above for diagnostics); the IdP always sees the gateway's
    // fixed composite scope, never whatever the client asked for.
    let scope = state.config.gateway.composite_scope();

    let authorize_url = match url::Url::parse_with_params(
        &state.config.idp.authorization_endpoint(),
        &[
            ("response_type", "code"),
            ("client_id", state.config.idp.client_id.as_str()),
            (
                "redirect_uri",
                state.config.gateway.callback_url().as_str(),
            ),
            ("state", proxy_state.as_str()),
            ("code_challenge", proxy_code_challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("scope", scope.as_str()),
        ],
    ) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "failed to build IdP authorization URL");
            return OAuthError::new(OAuthErrorKind::ServerError).into_response();
        }
    };

    warn_if_localhost(&state.config.gateway.base_url);
    (
        StatusCode::FOUND,
        [(header::LOCATION, authorize_url.as_str().to_string())],
    )
        .into_response()
}

fn warn_if_localhost(base_url: &str) {
    if base_url.contains("localhost") || base_url.contains("127.0.0.1") {
        warn!("gateway base_url is a loopback address; the IdP will not accept it in production");
    }
}
