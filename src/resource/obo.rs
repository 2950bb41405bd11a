//! Delegation Helper — RFC 7523 JWT-Bearer On-Behalf-Of token exchange.
//!
//! Given a validated incoming token and a target scope, trades it for a
//! downstream-scoped access token using the gateway's own confidential
//! credentials. One instance is built at startup and shared for the
//! process lifetime, matching the single memoized confidential-client
//! instance called for in spec.md §9.

use tracing::error;

use crate::oauth::idp_client::{IdpClient, IdpResult};

/// A tool-level OBO failure: the caller is authenticated to the gateway,
/// they simply lack delegated consent (or the IdP rejected the
/// exchange) for the requested downstream scope. Distinct from a
/// gateway authentication failure.
#[derive(Debug, thiserror::Error)]
pub enum OboError {
    /// The IdP rejected the exchange; carries its own error code.
    #[error("on-behalf-of exchange rejected: {0}")]
    Rejected(String),
    /// The IdP could not be reached.
    #[error("on-behalf-of exchange failed: {0}")]
    Unreachable(#[from] reqwest::Error),
}

/// Performs On-Behalf-Of exchanges against the configured IdP.
pub struct OnBehalfOfExchanger {
    idp_client: IdpClient,
}

impl OnBehalfOfExchanger {
    /// Wrap an `IdpClient` already built for the gateway's confidential
    /// credentials.
    #[must_use]
    pub fn new(idp_client: IdpClient) -> Self {
        Self { idp_client }
    }

    /// Exchange `assertion` (the validated incoming token) for a
    /// downstream access token scoped to `scope`.
    pub async fn exchange(&self, assertion: &str, scope: &str) -> Result<String, OboError> {
        match self.idp_client.exchange_on_behalf_of(assertion, scope).await {
            Ok(IdpResult::Ok(tokens)) => Ok(tokens.access_token),
            Ok(IdpResult::Err(err)) => {
                error!(error = %err.error, "IdP rejected on-behalf-of exchange");
                Err(OboError::Rejected(err.error))
            }
            Err(e) => Err(OboError::Unreachable(e)),
        }
    }
}
