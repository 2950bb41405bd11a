//! Token Validator — per-request Bearer token verification.
//!
//! Two middleware variants share one verification routine: strict
//! rejects missing/invalid tokens with an RFC 6750 challenge, permissive
//! lets the request through without an identity attached.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::Serialize;
use tracing::{debug, warn};

use super::claims::{TokenClaims, UserIdentity};
use super::jwks::SharedJwksCache;
use crate::oauth::resource::prm_url;

/// Shared configuration the validator needs: the expected issuer,
/// expected audience, and the JWKS cache.
pub struct ValidatorConfig {
    /// Expected `iss` claim.
    pub issuer: String,
    /// Expected `aud` claim — the gateway's configured API scope.
    pub audience: String,
    /// The gateway's own base URL, for the `WWW-Authenticate` challenge.
    pub base_url: String,
    /// JWKS cache used to resolve signing keys.
    pub jwks: SharedJwksCache,
}

/// `{error, error_description?}` body returned on a 401.
#[derive(Debug, Serialize)]
struct BearerError {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_description: Option<&'static str>,
}

fn unauthorized_response(base_url: &str, description: Option<&'static str>) -> Response {
    let challenge = format!("Bearer resource_metadata=\"{}\"", prm_url(base_url));
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(BearerError {
            error: "unauthorized",
            error_description: description,
        }),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

/// Extract and verify the Bearer token on `request`, if present.
///
/// Returns `Ok(Some(identity))` when a token was present and valid,
/// `Ok(None)` when no `Authorization` header was present at all, and
/// `Err(())` when a token was present but failed verification — the
/// specific cause is logged, never returned to the caller.
async fn verify_bearer(
    config: &ValidatorConfig,
    request: &Request,
) -> Result<Option<UserIdentity>, ()> {
    let Some(header_value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let Ok(header_value) = header_value.to_str() else {
        return Err(());
    };
    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Err(());
    };

    let header = decode_header(token).map_err(|e| {
        debug!(error = %e, "failed to decode JWT header");
    })?;
    let Some(kid) = header.kid else {
        debug!("JWT header missing kid");
        return Err(());
    };
    if header.alg != Algorithm::RS256 {
        debug!(alg = ?header.alg, "rejecting non-RS256 token");
        return Err(());
    }

    let decoding_key = config.jwks.key_for(&kid).await.map_err(|e| {
        debug!(error = %e, "failed to resolve signing key");
    })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);
    validation.leeway = 60;

    let token_data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
        debug!(error = %e, "JWT claim validation failed");
    })?;

    Ok(Some(UserIdentity::new(
        token.to_string(),
        config.audience.clone(),
        token_data.claims,
    )))
}

/// Strict variant: missing or invalid tokens are rejected with a 401 and
/// the RFC 6750 discovery challenge.
pub async fn strict(
    State(config): State<Arc<ValidatorConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    match verify_bearer(&config, &request).await {
        Ok(Some(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(None) => {
            warn!("rejecting request with no Authorization header");
            unauthorized_response(&config.base_url, None)
        }
        Err(()) => unauthorized_response(&config.base_url, None),
    }
}

/// Permissive variant: a valid token attaches identity; anything else
/// (including a missing header) proceeds without one.
pub async fn permissive(
    State(config): State<Arc<ValidatorConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Ok(Some(identity)) = verify_bearer(&config, &request).await {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}
