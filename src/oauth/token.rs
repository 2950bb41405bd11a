//! Authorization-Code Broker, final leg — `POST /token`.
//!
//! Redeems a one-shot proxy code (verifying the client's own PKCE
//! verifier) or proxies a `refresh_token` grant straight through to the
//! IdP. Any other `grant_type` is rejected.

use std::sync::Arc;

use axum::{Form, extract::State, response::IntoResponse};
use serde::Deserialize;
use tracing::error;

use super::OAuthState;
use super::idp_client::IdpResult;
use super::models::{OAuthError, OAuthErrorKind, TokenResponse};
use super::pkce;

/// `POST /token` request body, form-encoded per RFC 6749 §4.1.3/§6.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// `POST /token`
pub async fn token(
    State(state): State<Arc<OAuthState>>,
    Form(request): Form<TokenRequest>,
) -> axum::response::Response {
    match request.grant_type.as_str() {
        "authorization_code" => authorization_code_grant(&state, request).await,
        "refresh_token" => refresh_token_grant(&state, request).await,
        _ => OAuthError::with_description(
            OAuthErrorKind::UnsupportedGrantType,
            "only authorization_code and refresh_token are supported",
        )
        .into_response(),
    }
}

async fn authorization_code_grant(
    state: &Arc<OAuthState>,
    request: TokenRequest,
) -> axum::response::Response {
    let Some(code) = request.code else {
        return OAuthError::with_description(OAuthErrorKind::InvalidRequest, "missing code")
            .into_response();
    };
    let Some(code_verifier) = request.code_verifier else {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidRequest,
            "missing code_verifier",
        )
        .into_response();
    };

    let Some(record) = state.codes.take(&code) else {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidGrant,
            "code is unknown, already redeemed, or expired",
        )
        .into_response();
    };

    if !pkce::verify(
        &code_verifier,
        &record.client_code_challenge,
        &record.client_code_challenge_method,
    ) {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidGrant,
            "PKCE verification failed",
        )
        .into_response();
    }

    axum::Json(TokenResponse {
        access_token: record.access_token,
        token_type: "Bearer".to_string(),
        expires_in: record.expires_in,
        refresh_token: record.refresh_token,
        scope: record.scope,
    })
    .into_response()
}

async fn refresh_token_grant(
    state: &Arc<OAuthState>,
    request: TokenRequest,
) -> axum::response::Response {
    let Some(refresh_token) = request.refresh_token else {
        return OAuthError::with_description(
            OAuthErrorKind::InvalidRequest,
            "missing refresh_token",
        )
        .into_response();
    };

    // Per spec.md §4.3, the refresh grant always carries the gateway's
    // original composite scope string to the IdP, not whatever scope (if
    // any) the client passed along with the refresh token.
    let scope = state.config.gateway.composite_scope();
    let exchange = state.idp_client.refresh_token(&refresh_token, &scope).await;

    match exchange {
        Ok(IdpResult::Ok(tokens)) => axum::Json(TokenResponse {
            access_token: tokens.access_token,
            token_type: "Bearer".to_string(),
            expires_in: tokens.expires_in,
            refresh_token: tokens.refresh_token,
            scope: tokens.scope,
        })
        .into_response(),
        Ok(IdpResult::Err(err)) => {
            OAuthError::from_idp_payload(err.error, err.error_description).into_response()
        }
        Err(e) => {
            error!(error = %e, "IdP refresh_token request failed");
            OAuthError::with_description(
                OAuthErrorKind::ServerError,
                "failed to reach the identity provider",
            )
            .into_response()
        }
    }
}
