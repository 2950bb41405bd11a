//! Dynamic Client Registration (RFC 7591) — `POST /register`.

use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::OAuthState;
use super::models::{ClientRegistration, RegisterRequest, RegisterResponse, now_secs};
use crate::oauth::pkce::generate_opaque_id;

/// `POST /register` — unauthenticated by design (spec.md §4.2); production
/// deployments that need to gate registration do so upstream of this
/// gateway.
pub async fn register(
    State(state): State<Arc<OAuthState>>,
    Json(request): Json<RegisterRequest>,
) -> (StatusCode, Json<RegisterResponse>) {
    // A v4 UUID's 122 random bits line up exactly with spec.md §3's
    // "≥122 bits of entropy" requirement for `client_id`.
    let client_id = format!("mcp_{}", Uuid::new_v4());
    let grant_types = request
        .grant_types
        .unwrap_or_else(|| vec!["authorization_code".to_string()]);
    let response_types = request
        .response_types
        .unwrap_or_else(|| vec!["code".to_string()]);
    let token_endpoint_auth_method = request
        .token_endpoint_auth_method
        .unwrap_or_else(|| "none".to_string());

    let client_secret = (token_endpoint_auth_method == "client_secret_post")
        .then(|| format!("secret_{}", generate_opaque_id()));

    let registration = ClientRegistration {
        client_id: client_id.clone(),
        client_name: request.client_name.clone(),
        redirect_uris: request.redirect_uris,
        grant_types: grant_types.clone(),
        response_types: response_types.clone(),
        token_endpoint_auth_method: token_endpoint_auth_method.clone(),
        client_secret: client_secret.clone(),
        created_at: now_secs(),
    };

    info!(client_id = %client_id, "registered new DCR client");
    state.clients.insert(registration.clone());

    (
        StatusCode::CREATED,
        Json(RegisterResponse {
            client_id,
            client_name: registration.client_name,
            redirect_uris: registration.redirect_uris,
            grant_types,
            response_types,
            token_endpoint_auth_method,
            client_secret,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::oauth::OAuthState;

    fn test_state() -> Arc<OAuthState> {
        let mut config = Config::default();
        config.idp.tenant_id = "tenant".to_string();
        config.idp.client_id = "gw-client".to_string();
        config.idp.client_secret = "gw-secret".to_string();
        Arc::new(OAuthState::new(config).expect("test state builds"))
    }

    #[tokio::test]
    async fn register_mints_public_client_by_default() {
        let state = test_state();
        let (status, Json(body)) = register(
            State(state.clone()),
            Json(RegisterRequest {
                client_name: Some("X".to_string()),
                redirect_uris: vec!["https://app/cb".to_string()],
                grant_types: None,
                response_types: None,
                token_endpoint_auth_method: None,
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.token_endpoint_auth_method, "none");
        assert!(body.client_secret.is_none());
        assert!(state.clients.get(&body.client_id).is_some());
    }

    #[tokio::test]
    async fn register_mints_secret_for_confidential_clients() {
        let state = test_state();
        let (_, Json(body)) = register(
            State(state),
            Json(RegisterRequest {
                client_name: None,
                redirect_uris: vec!["https://app/cb".to_string()],
                grant_types: None,
                response_types: None,
                token_endpoint_auth_method: Some("client_secret_post".to_string()),
            }),
        )
        .await;

        assert!(body.client_secret.is_some());
    }

    #[tokio::test]
    async fn register_stores_redirect_uris_verbatim() {
        let state = test_state();
        let (_, Json(body)) = register(
            State(state.clone()),
            Json(RegisterRequest {
                client_name: None,
                redirect_uris: vec!["https://app/cb?x=1".to_string()],
                grant_types: None,
                response_types: None,
                token_endpoint_auth_method: None,
            }),
        )
        .await;

        let stored = state.clients.get(&body.client_id).unwrap();
        assert!(stored.allows_redirect_uri("https://app/cb?x=1"));
    }
}
