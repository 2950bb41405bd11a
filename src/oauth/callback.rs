//! Authorization-Code Broker, second leg — `GET /auth/callback`.
//!
//! The IdP redirects the user-agent back here after the user authenticates.
//! This handler redeems the transaction the IdP's `state` points to,
//! exchanges the IdP's code for tokens using the gateway's own PKCE
//! verifier, mints a fresh proxy code for the client, and redirects the
//! user-agent onward to the client's registered `redirect_uri`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, warn};

use super::OAuthState;
use super::idp_client::IdpResult;
use super::models::{AuthorizationCodeRecord, OAuthError, OAuthErrorKind, now_secs};
use super::pkce::generate_opaque_id;

/// Query parameters the IdP appends to the callback redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /auth/callback`
pub async fn callback(
    State(state): State<Arc<OAuthState>>,
    Query(request): Query<CallbackRequest>,
) -> Response {
    let Some(proxy_state) = request.state else {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidState,
            "missing state parameter",
        )
        .into_response();
    };

    let Some(transaction) = state.transactions.take(&proxy_state) else {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidState,
            "state is unknown, already consumed, or expired",
        )
        .into_response();
    };

    if let Some(idp_error) = request.error {
        warn!(error = %idp_error, "IdP reported an authorization error");
        return redirect_with_error(
            &transaction.client_redirect_uri,
            transaction.client_state.as_deref(),
            &idp_error,
            request.error_description.as_deref(),
        );
    }

    let Some(code) = request.code else {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidRequest,
            "missing code parameter",
        )
        .into_response();
    };

    let exchange = state
        .idp_client
        .exchange_code(
            &code,
            &state.config.gateway.callback_url(),
            &transaction.proxy_code_verifier,
        )
        .await;

    let tokens = match exchange {
        Ok(IdpResult::Ok(tokens)) => tokens,
        Ok(IdpResult::Err(err)) => {
            return redirect_with_error(
                &transaction.client_redirect_uri,
                transaction.client_state.as_deref(),
                &err.error,
                err.error_description.as_deref(),
            );
        }
        Err(e) => {
            error!(error = %e, "IdP code exchange request failed");
            return redirect_with_error(
                &transaction.client_redirect_uri,
                transaction.client_state.as_deref(),
                OAuthErrorKind::ServerError.as_str(),
                Some("failed to reach the identity provider"),
            );
        }
    };

    let proxy_code = generate_opaque_id();
    state.codes.insert(
        proxy_code.clone(),
        AuthorizationCodeRecord {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            scope: tokens.scope,
            client_code_challenge: transaction.client_code_challenge,
            client_code_challenge_method: transaction.client_code_challenge_method,
            created_at: now_secs(),
        },
    );

    let mut redirect_url = match url::Url::parse(&transaction.client_redirect_uri) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "registered redirect_uri is not a valid URL");
            return OAuthError::new(OAuthErrorKind::ServerError).into_response();
        }
    };
    redirect_url
        .query_pairs_mut()
        .append_pair("code", &proxy_code);
    if let Some(client_state) = transaction.client_state {
        redirect_url
            .query_pairs_mut()
            .append_pair("state", &client_state);
    }

    found_redirect(redirect_url.as_str())
}

fn found_redirect(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

fn redirect_with_error(
    redirect_uri: &str,
    client_state: Option<&str>,
    error: &str,
    description: Option<&str>,
) -> Response {
    let Ok(mut url) = url::Url::parse(redirect_uri) else {
        return OAuthError::new(OAuthErrorKind::ServerError).into_response();
    };
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("error", error);
        if let Some(description) = description {
            pairs.append_pair("error_description", description);
        }
        if let Some(client_state) = client_state {
            pairs.append_pair("state", client_state);
        }
    }
    found_redirect(url.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::oauth::models::AuthTransaction;

    fn test_state() -> Arc<OAuthState> {
        let mut config = Config::default();
        config.idp.tenant_id = "tenant".to_string();
        config.idp.client_id = "gw-client".to_string();
        config.idp.client_secret = "gw-secret".to_string();
        Arc::new(OAuthState::new(config).expect("test state builds"))
    }

    #[tokio::test]
    async fn rejects_unknown_state() {
        let state = test_state();
        let response = callback(
            State(state),
            Query(CallbackRequest {
                code: Some("abc".to_string()),
                state: Some("never-issued".to_string()),
                error: None,
                error_description: None,
            }),
        )
        .await;
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let state = test_state();
        state.transactions.insert(
            "st1".to_string(),
            AuthTransaction {
                client_id: "c1".to_string(),
                client_redirect_uri: "https://app/cb".to_string(),
                client_state: Some("xyz".to_string()),
                client_code_challenge: "challenge".to_string(),
                client_code_challenge_method: "S256".to_string(),
                proxy_code_verifier: "verifier".to_string(),
                requested_scope: None,
                created_at: now_secs(),
            },
        );

        // First consumption removes the transaction even though the IdP
        // call itself will fail in this test (no network access); the
        // second call must see it as already consumed.
        let _ = callback(
            State(state.clone()),
            Query(CallbackRequest {
                code: Some("abc".to_string()),
                state: Some("st1".to_string()),
                error: None,
                error_description: None,
            }),
        )
        .await;

        let second = callback(
            State(state),
            Query(CallbackRequest {
                code: Some("abc".to_string()),
                state: Some("st1".to_string()),
                error: None,
                error_description: None,
            }),
        )
        .await;
        assert_eq!(second.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn idp_error_is_forwarded_to_client_redirect_uri() {
        let state = test_state();
        state.transactions.insert(
            "st2".to_string(),
            AuthTransaction {
                client_id: "c1".to_string(),
                client_redirect_uri: "https://app/cb".to_string(),
                client_state: Some("xyz".to_string()),
                client_code_challenge: "challenge".to_string(),
                client_code_challenge_method: "S256".to_string(),
                proxy_code_verifier: "verifier".to_string(),
                requested_scope: None,
                created_at: now_secs(),
            },
        );

        let response = callback(
            State(state),
            Query(CallbackRequest {
                code: None,
                state: Some("st2".to_string()),
                error: Some("access_denied".to_string()),
                error_description: None,
            }),
        )
        .await;
        assert_eq!(response.status(), axum::http::StatusCode::FOUND);
        let location = response
            .headers()
            .get(axum::http::header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.starts_with("https://app/cb?"));
        assert!(location.contains("error=access_denied"));
    }
}
