//! Outbound HTTP client for the gateway's own confidential-client
//! relationship with the upstream IdP: exchanging authorization codes,
//! refreshing tokens, and performing On-Behalf-Of delegation all share
//! this one form-POST-to-token-endpoint shape.

use serde::Deserialize;
use tracing::warn;

use crate::config::IdpConfig;

/// The subset of an IdP token-endpoint response this gateway cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpTokenResponse {
    /// The issued access token.
    pub access_token: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    /// Present when the grant yields a refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scope string, if the IdP reports one.
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_expires_in() -> u64 {
    3600
}

/// An IdP's `{error, error_description}` error payload, passed through
/// verbatim to the client per spec.md §7.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpErrorResponse {
    /// The IdP's own error code.
    pub error: String,
    /// The IdP's own human-readable description, if present.
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Either a successful token response or the IdP's own error payload.
pub enum IdpResult {
    /// The IdP granted tokens.
    Ok(IdpTokenResponse),
    /// The IdP rejected the request; this is its own error body.
    Err(IdpErrorResponse),
}

/// Thin wrapper around `reqwest` for the gateway's calls to the IdP's
/// token endpoint. One instance is built at startup and shared for the
/// lifetime of the process.
#[derive(Clone)]
pub struct IdpClient {
    http: reqwest::Client,
    config: IdpConfig,
}

impl IdpClient {
    /// Build a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest` client cannot be built.
    pub fn new(config: IdpConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Exchange an authorization code the IdP issued (during
    /// `/auth/callback`) for access/refresh tokens, presenting the
    /// gateway's own PKCE verifier.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> reqwest::Result<IdpResult> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ];
        self.post_token_endpoint(&params).await
    }

    /// Proxy a `refresh_token` grant straight through to the IdP,
    /// per spec.md §4.3 — the client's PKCE is not re-checked here.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        scope: &str,
    ) -> reqwest::Result<IdpResult> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope),
        ];
        self.post_token_endpoint(&params).await
    }

    /// Perform an RFC 7523 JWT-Bearer On-Behalf-Of exchange: trade a
    /// validated incoming token for a downstream-scoped access token.
    pub async fn exchange_on_behalf_of(
        &self,
        assertion: &str,
        scope: &str,
    ) -> reqwest::Result<IdpResult> {
        let params = [
            (
                "grant_type",
                "urn:ietf:params:oauth:grant-type:jwt-bearer",
            ),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("assertion", assertion),
            ("requested_token_use", "on_behalf_of"),
            ("scope", scope),
        ];
        self.post_token_endpoint(&params).await
    }

    async fn post_token_endpoint(&self, params: &[(&str, &str)]) -> reqwest::Result<IdpResult> {
        let response = self
            .http
            .post(self.config.token_endpoint())
            .form(params)
            .send()
            .await?;

        if response.status().is_success() {
            let tokens: IdpTokenResponse = response.json().await?;
            Ok(IdpResult::Ok(tokens))
        } else {
            match response.json::<IdpErrorResponse>().await {
                Ok(err) => Ok(IdpResult::Err(err)),
                Err(e) => {
                    warn!(error = %e, "IdP returned a non-JSON error body");
                    Ok(IdpResult::Err(IdpErrorResponse {
                        error: "server_error".to_string(),
                        error_description: Some("IdP returned an unparseable error".to_string()),
                    }))
                }
            }
        }
    }
}
