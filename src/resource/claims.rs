//! Claim shapes read off a validated IdP access token.

use serde::Deserialize;

/// The minimal claim set the gateway expects on an IdP-issued access
/// token. `oid` is required; everything else is optional and carried
/// through for display/diagnostics only.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Token issuer. Must equal the configured IdP issuer.
    pub iss: String,
    /// Intended audience. Must equal the configured gateway API scope.
    #[serde(default)]
    pub aud: serde_json::Value,
    /// Expiry (Unix seconds). Validated by `jsonwebtoken` internally.
    pub exp: u64,
    /// Not-before (Unix seconds), optional.
    #[serde(default)]
    pub nbf: Option<u64>,
    /// Stable, tenant-scoped user identifier. The partition key for
    /// per-user data downstream of this gateway.
    pub oid: String,
    /// Space-delimited granted scopes.
    #[serde(default)]
    pub scp: Option<String>,
    /// Display name, if the IdP includes one.
    #[serde(default)]
    pub name: Option<String>,
    /// Username/UPN, if the IdP includes one.
    #[serde(default)]
    pub preferred_username: Option<String>,
    /// Subject claim.
    #[serde(default)]
    pub sub: Option<String>,
    /// Tenant id, if the IdP includes one.
    #[serde(default)]
    pub tid: Option<String>,
}

/// The identity attached to the request context once a Bearer token has
/// been validated.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    /// The raw, validated token — retained so the Delegation Helper can
    /// use it as the OBO assertion.
    pub token: String,
    /// The `aud` claim: the gateway API identifier the token was issued for.
    pub client_id: String,
    /// Scopes parsed from `scp`, split on whitespace.
    pub scopes: Vec<String>,
    /// The full claim set.
    pub claims: TokenClaims,
}

impl UserIdentity {
    /// Build from a raw token and its validated claims.
    #[must_use]
    pub fn new(token: String, client_id: String, claims: TokenClaims) -> Self {
        let scopes = claims
            .scp
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            token,
            client_id,
            scopes,
            claims,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_split_on_whitespace() {
        let claims = TokenClaims {
            iss: "iss".to_string(),
            aud: serde_json::json!("api://mcp"),
            exp: 0,
            nbf: None,
            oid: "u1".to_string(),
            scp: Some("mcp.tools.invoke offline_access".to_string()),
            name: None,
            preferred_username: None,
            sub: None,
            tid: None,
        };
        let identity = UserIdentity::new("jwt".to_string(), "api://mcp".to_string(), claims);
        assert_eq!(
            identity.scopes,
            vec!["mcp.tools.invoke".to_string(), "offline_access".to_string()]
        );
    }

    #[test]
    fn missing_scp_yields_empty_scopes() {
        let claims = TokenClaims {
            iss: "iss".to_string(),
            aud: serde_json::json!("api://mcp"),
            exp: 0,
            nbf: None,
            oid: "u1".to_string(),
            scp: None,
            name: None,
            preferred_username: None,
            sub: None,
            tid: None,
        };
        let identity = UserIdentity::new("jwt".to_string(), "api://mcp".to_string(), claims);
        assert!(identity.scopes.is_empty());
    }
}
