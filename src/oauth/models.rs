//! Data model for the OAuth proxy: client registrations, pending
//! authorization transactions, and one-shot authorization codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// A client registered via Dynamic Client Registration (RFC 7591).
///
/// Created at `/register`, never mutated afterward, and kept for the
/// lifetime of the process — see the Dynamic Client Registry's open
/// concern about unbounded growth in `DESIGN.md`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistration {
    /// Opaque, unguessable client identifier.
    pub client_id: String,
    /// Human-readable label. Display-only, never trusted for authorization.
    #[serde(default)]
    pub client_name: Option<String>,
    /// Absolute redirect URIs declared at registration, stored verbatim.
    pub redirect_uris: Vec<String>,
    /// Requested grant types, subset of {authorization_code, refresh_token}.
    pub grant_types: Vec<String>,
    /// Requested response types, subset of {code}.
    pub response_types: Vec<String>,
    /// `none` (public, PKCE-only) or `client_secret_post` (confidential).
    pub token_endpoint_auth_method: String,
    /// Minted only when `token_endpoint_auth_method == client_secret_post`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Registration time (Unix epoch seconds).
    pub created_at: u64,
}

impl ClientRegistration {
    /// Whether `uri` was declared verbatim at registration time.
    #[must_use]
    pub fn allows_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == uri)
    }
}

/// A pending authorization request, from `/authorize` through
/// `/auth/callback`. Keyed by `proxy_state` and single-use: deleted
/// atomically the moment the callback consumes it, successful or not.
#[derive(Debug, Clone)]
pub struct AuthTransaction {
    /// The client that initiated this attempt.
    pub client_id: String,
    /// Where to send the user-agent once a proxy code has been minted.
    pub client_redirect_uri: String,
    /// The client's own `state`, echoed back verbatim on completion.
    pub client_state: Option<String>,
    /// The client's PKCE commitment (layer 1: client↔gateway).
    pub client_code_challenge: String,
    /// `S256` or `plain`.
    pub client_code_challenge_method: String,
    /// The gateway's own PKCE verifier (layer 2: gateway↔IdP) — never
    /// shared with the client.
    pub proxy_code_verifier: String,
    /// The scope the client requested, kept for diagnostics only.
    pub requested_scope: Option<String>,
    /// Creation time (Unix epoch seconds), for TTL enforcement.
    pub created_at: u64,
}

/// A one-shot authorization code, minted in `/auth/callback` and redeemed
/// exactly once at `/token`.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeRecord {
    /// The IdP access token obtained during the callback's code exchange.
    pub access_token: String,
    /// The IdP refresh token, if the IdP granted one.
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds, as reported by the IdP.
    pub expires_in: u64,
    /// Granted scope string, as reported by the IdP.
    pub scope: Option<String>,
    /// The originating transaction's client PKCE commitment, so `/token`
    /// can verify the client's verifier.
    pub client_code_challenge: String,
    /// `S256` or `plain`.
    pub client_code_challenge_method: String,
    /// Creation time (Unix epoch seconds), for TTL enforcement.
    pub created_at: u64,
}

/// Current time as Unix epoch seconds, used for every TTL comparison in
/// the gateway's transaction/code stores — spec.md §3's single monotonic
/// clock requirement.
#[must_use]
pub fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Request body for `POST /register` (RFC 7591). Every field but
/// `redirect_uris` is optional; missing fields are defaulted.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Human readable client name.
    #[serde(default)]
    pub client_name: Option<String>,
    /// Absolute redirect URIs the client will use.
    pub redirect_uris: Vec<String>,
    /// Requested grant types; defaults to `["authorization_code"]`.
    #[serde(default)]
    pub grant_types: Option<Vec<String>>,
    /// Requested response types; defaults to `["code"]`.
    #[serde(default)]
    pub response_types: Option<Vec<String>>,
    /// Requested auth method; defaults to `"none"` (public client).
    #[serde(default)]
    pub token_endpoint_auth_method: Option<String>,
}

/// Response body for a successful `POST /register`.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// The minted client id.
    pub client_id: String,
    /// Echoed back verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Echoed back verbatim.
    pub redirect_uris: Vec<String>,
    /// Echoed back verbatim (possibly defaulted).
    pub grant_types: Vec<String>,
    /// Echoed back verbatim (possibly defaulted).
    pub response_types: Vec<String>,
    /// Echoed back verbatim (possibly defaulted).
    pub token_endpoint_auth_method: String,
    /// Present only for confidential (`client_secret_post`) clients,
    /// and only in this one response — it is never returned again.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// The stable `error` codes used across the OAuth-facing endpoints
/// (spec.md §6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthErrorKind {
    /// `/authorize` was called with `response_type != "code"`.
    UnsupportedResponseType,
    /// `/auth/callback`'s `state` was never issued, already consumed, or expired.
    InvalidState,
    /// `/token`'s `code` or `refresh_token` is unknown, expired, or fails PKCE.
    InvalidGrant,
    /// A required field is missing or malformed.
    InvalidRequest,
    /// `/token`'s `grant_type` is not one the gateway implements.
    UnsupportedGrantType,
    /// An unexpected internal or upstream failure.
    ServerError,
    /// No or invalid bearer token on a protected endpoint.
    Unauthorized,
}

impl OAuthErrorKind {
    /// The wire value of this error code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidState => "invalid_state",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidRequest => "invalid_request",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::ServerError => "server_error",
            Self::Unauthorized => "unauthorized",
        }
    }

    fn status(self) -> StatusCode {
        match self {
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// The `{error, error_description?}` body every OAuth endpoint returns
/// on failure (spec.md §6).
#[derive(Debug, Serialize)]
pub struct OAuthError {
    /// One of the stable error codes in [`OAuthErrorKind`], or an IdP
    /// error code passed through verbatim.
    pub error: String,
    /// Human-readable detail. Never contains a token or secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl OAuthError {
    /// Build an error with no description.
    #[must_use]
    pub fn new(kind: OAuthErrorKind) -> Self {
        Self {
            error: kind.as_str().to_string(),
            error_description: None,
            status: kind.status(),
        }
    }

    /// Build an error carrying a human-readable description.
    #[must_use]
    pub fn with_description(kind: OAuthErrorKind, description: impl Into<String>) -> Self {
        Self {
            error: kind.as_str().to_string(),
            error_description: Some(description.into()),
            status: kind.status(),
        }
    }

    /// Construct directly from an IdP's own `{error, error_description}`
    /// payload, passed through verbatim per spec.md §7.
    #[must_use]
    pub fn from_idp_payload(error: String, description: Option<String>) -> Self {
        Self {
            error,
            error_description: description,
            status: StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Successful `POST /token` body (spec.md §4.3).
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// The (IdP-issued) access token.
    pub access_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    /// Present only when the IdP granted one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scope string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}
