//! Authorization Server Metadata (RFC 8414) — served by this gateway,
//! describing itself rather than an upstream server.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::OAuthState;

/// RFC 8414 Authorization Server Metadata document.
#[derive(Debug, Serialize)]
pub struct AuthorizationServerMetadata {
    /// The gateway's own base URL.
    pub issuer: String,
    /// Where clients start the authorization-code flow.
    pub authorization_endpoint: String,
    /// Where clients redeem codes (and refresh tokens) for access tokens.
    pub token_endpoint: String,
    /// Where clients dynamically register (RFC 7591).
    pub registration_endpoint: String,
    /// Accepted, but a no-op — see spec.md §4.3.
    pub revocation_endpoint: String,
    /// Always `["code"]`.
    pub response_types_supported: Vec<String>,
    /// Must list exactly what the broker honors.
    pub grant_types_supported: Vec<String>,
    /// Public clients (`none`) and confidential clients (`client_secret_post`).
    pub token_endpoint_auth_methods_supported: Vec<String>,
    /// Both PKCE methods the broker accepts at `/token`.
    pub code_challenge_methods_supported: Vec<String>,
}

impl AuthorizationServerMetadata {
    fn for_gateway(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            issuer: base.to_string(),
            authorization_endpoint: format!("{base}/authorize"),
            token_endpoint: format!("{base}/token"),
            registration_endpoint: format!("{base}/register"),
            revocation_endpoint: format!("{base}/revoke"),
            response_types_supported: vec!["code".to_string()],
            grant_types_supported: vec![
                "authorization_code".to_string(),
                "refresh_token".to_string(),
            ],
            token_endpoint_auth_methods_supported: vec![
                "none".to_string(),
                "client_secret_post".to_string(),
            ],
            code_challenge_methods_supported: vec!["S256".to_string(), "plain".to_string()],
        }
    }
}

/// `GET /.well-known/oauth-authorization-server`
pub async fn serve(State(state): State<Arc<OAuthState>>) -> Json<AuthorizationServerMetadata> {
    Json(AuthorizationServerMetadata::for_gateway(
        &state.config.gateway.base_url,
    ))
}
