//! The protected-resource side of the gateway: verifying inbound Bearer
//! tokens and performing On-Behalf-Of delegation for tool calls.

pub mod claims;
pub mod jwks;
pub mod obo;
pub mod validator;

use std::sync::Arc;

use crate::config::Config;
use crate::oauth::idp_client::IdpClient;
use jwks::JwksCache;
use obo::OnBehalfOfExchanger;
use validator::ValidatorConfig;

/// Shared state for the resource-server side of the gateway: the Token
/// Validator's configuration and the Delegation Helper.
pub struct ResourceState {
    /// Configuration consumed by the strict/permissive middleware.
    pub validator: Arc<ValidatorConfig>,
    /// The On-Behalf-Of exchanger, memoized once per process.
    pub obo: OnBehalfOfExchanger,
}

impl ResourceState {
    /// Build resource state from the gateway's configuration, reusing
    /// the same outbound HTTP client shape the OAuth side uses for the
    /// IdP's token endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.idp.request_timeout)
            .build()?;
        let jwks = Arc::new(JwksCache::new(config.idp.jwks_uri(), http));
        let validator = Arc::new(ValidatorConfig {
            issuer: config.idp.issuer(),
            audience: config.gateway.api_scope.clone(),
            base_url: config.gateway.base_url.clone(),
            jwks,
        });
        let idp_client = IdpClient::new(config.idp.clone())?;
        Ok(Self {
            validator,
            obo: OnBehalfOfExchanger::new(idp_client),
        })
    }
}
