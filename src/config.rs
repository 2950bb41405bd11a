//! Configuration management

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    #[serde(default)]
    pub env_files: Vec<String>,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Enterprise identity provider configuration
    pub idp: IdpConfig,
    /// This gateway's own OAuth-facing configuration
    pub gateway: GatewayAuthConfig,
}

impl Config {
    /// Load configuration from an optional YAML file, the process
    /// environment (`GATEWAY_` prefix), and any configured env files.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is missing, the merged
    /// configuration fails to deserialize, or required IdP fields are unset.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Nested sections (server.*) follow the teacher's GATEWAY_SECTION__FIELD
        // convention. The IdP and top-level gateway identity fields are flat,
        // externally-documented names (`IDP_TENANT_ID`, `GATEWAY_BASE_URL`, ...)
        // and are layered on separately below so their names don't have to
        // match the nested struct shape.
        figment = figment.merge(Env::prefixed("GATEWAY_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Env files are loaded before the flat-name overrides so a `.env`
        // file can supply IDP_CLIENT_SECRET etc. without touching the process
        // environment ahead of time.
        config.load_env_files();
        config.apply_flat_env_overrides();

        config.idp.validate()?;

        Ok(config)
    }

    /// Apply the flat, externally-documented environment variables
    /// (`IDP_TENANT_ID`, `IDP_CLIENT_ID`, `IDP_CLIENT_SECRET`,
    /// `GATEWAY_BASE_URL`, `GATEWAY_API_SCOPE`) over whatever the YAML file
    /// or `GATEWAY_` prefixed figment environment already produced.
    fn apply_flat_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("IDP_TENANT_ID") {
            self.idp.tenant_id = v;
        }
        if let Ok(v) = std::env::var("IDP_CLIENT_ID") {
            self.idp.client_id = v;
        }
        if let Ok(v) = std::env::var("IDP_CLIENT_SECRET") {
            self.idp.client_secret = v;
        }
        if let Ok(v) = std::env::var("IDP_AUTHORITY") {
            self.idp.authority_override = Some(v);
        }
        if let Ok(v) = std::env::var("GATEWAY_BASE_URL") {
            self.gateway.base_url = v;
        }
        if let Ok(v) = std::env::var("GATEWAY_API_SCOPE") {
            self.gateway.api_scope = v;
        }
    }

    /// Load environment files into the process environment.
    /// Supports `~` expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs_home() {
                    path_str.replacen('~', &home, 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                    Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }
}

fn dirs_home() -> Option<String> {
    std::env::var("HOME").ok()
}

/// HTTP server bind configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration describing the enterprise identity provider this gateway
/// brokers authorization against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdpConfig {
    /// Azure AD / Entra tenant id.
    pub tenant_id: String,
    /// The IdP application (client) id this gateway is pre-registered as.
    pub client_id: String,
    /// The confidential client secret for the gateway's own IdP registration.
    pub client_secret: String,
    /// Override for the IdP authority base URL. Derived from `tenant_id`
    /// when unset (`https://login.microsoftonline.com/{tenant_id}`).
    #[serde(default)]
    pub authority_override: Option<String>,
    /// HTTP client timeout for calls to the IdP.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            authority_override: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl IdpConfig {
    fn validate(&self) -> Result<()> {
        if self.tenant_id.is_empty() {
            return Err(Error::Config("IDP_TENANT_ID is required".to_string()));
        }
        if self.client_id.is_empty() {
            return Err(Error::Config("IDP_CLIENT_ID is required".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(Error::Config("IDP_CLIENT_SECRET is required".to_string()));
        }
        Ok(())
    }

    /// The IdP authority base URL (e.g. `https://login.microsoftonline.com/<tenant>`).
    #[must_use]
    pub fn authority(&self) -> String {
        self.authority_override.clone().unwrap_or_else(|| {
            format!("https://login.microsoftonline.com/{}", self.tenant_id)
        })
    }

    /// The `iss` value this gateway expects on IdP-issued tokens.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("{}/v2.0", self.authority())
    }

    /// The IdP's JWKS endpoint, Entra v2.0 discovery convention.
    #[must_use]
    pub fn jwks_uri(&self) -> String {
        format!("{}/discovery/v2.0/keys", self.authority())
    }

    /// The IdP's authorization endpoint.
    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.authority())
    }

    /// The IdP's token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority())
    }
}

/// Configuration for this gateway's own OAuth-facing identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayAuthConfig {
    /// The externally reachable base URL of this gateway, used to build
    /// `redirect_uri`s and metadata document URLs.
    pub base_url: String,
    /// The scope this gateway's protected resource requires.
    pub api_scope: String,
    /// IdP-required companion scopes requested alongside `api_scope` on
    /// every gateway↔IdP exchange (OIDC basics, offline access for
    /// refresh tokens). Per spec.md §4.3, these ride along with the
    /// gateway's own PKCE relationship — never substituted by whatever
    /// scope the MCP client asked for.
    pub companion_scopes: Vec<String>,
    /// TTL for pending authorization transactions.
    #[serde(with = "humantime_serde")]
    pub transaction_ttl: Duration,
    /// TTL for minted authorization codes.
    #[serde(with = "humantime_serde")]
    pub code_ttl: Duration,
    /// Interval between sweeps of expired transactions/codes.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for GatewayAuthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_scope: "mcp.tools.invoke".to_string(),
            companion_scopes: vec![
                "openid".to_string(),
                "profile".to_string(),
                "offline_access".to_string(),
            ],
            transaction_ttl: Duration::from_secs(600),
            code_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl GatewayAuthConfig {
    /// The `redirect_uri` this gateway registers with the IdP for its own
    /// confidential client, i.e. where the IdP sends users back to.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.base_url.trim_end_matches('/'))
    }

    /// The composite scope string sent to the IdP on every gateway↔IdP
    /// exchange: the gateway's own API scope plus its companion scopes,
    /// space-delimited. Distinct from whatever scope the MCP client
    /// requested (spec.md §4.3) — that value is kept only for diagnostics.
    #[must_use]
    pub fn composite_scope(&self) -> String {
        std::iter::once(self.api_scope.as_str())
            .chain(self.companion_scopes.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
