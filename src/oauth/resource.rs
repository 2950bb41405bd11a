//! Protected Resource Metadata (RFC 9728) — the document a client fetches
//! after receiving the Token Validator's 401 challenge.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::OAuthState;

/// RFC 9728 Protected Resource Metadata document.
#[derive(Debug, Serialize)]
pub struct ProtectedResourceMetadata {
    /// The protected MCP endpoint this document describes.
    pub resource: String,
    /// The authorization server(s) that can issue tokens for `resource` —
    /// the gateway's own base URL, per the proxy pattern.
    pub authorization_servers: Vec<String>,
    /// The single scope the gateway enforces as `aud`.
    pub scopes_supported: Vec<String>,
    /// Always `["header"]`: bearer tokens are only accepted via the
    /// `Authorization` header.
    pub bearer_methods_supported: Vec<String>,
}

impl ProtectedResourceMetadata {
    fn for_gateway(base_url: &str, api_scope: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            resource: format!("{base}/mcp"),
            authorization_servers: vec![base.to_string()],
            scopes_supported: vec![api_scope.to_string()],
            bearer_methods_supported: vec!["header".to_string()],
        }
    }
}

/// `GET /.well-known/oauth-protected-resource`
pub async fn serve(State(state): State<Arc<OAuthState>>) -> Json<ProtectedResourceMetadata> {
    Json(ProtectedResourceMetadata::for_gateway(
        &state.config.gateway.base_url,
        &state.config.gateway.api_scope,
    ))
}

/// The absolute URL of the PRM document, used in the Token Validator's
/// `WWW-Authenticate` challenge.
#[must_use]
pub fn prm_url(base_url: &str) -> String {
    format!(
        "{}/.well-known/oauth-protected-resource",
        base_url.trim_end_matches('/')
    )
}
