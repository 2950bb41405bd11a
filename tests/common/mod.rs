//! Shared fixtures for the gateway's end-to-end tests: a mock IdP
//! (wiremock) standing in for the enterprise identity provider's
//! `/authorize`, `/token`, and JWKS endpoints, plus RSA key generation
//! and JWT signing so the Token Validator can be exercised against
//! genuinely signature-valid tokens.

#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{EncodingKey, Header, encode};
use rsa::RsaPrivateKey;
use rsa::traits::PublicKeyParts;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcp_oauth_gateway::config::Config;

/// A running mock enterprise IdP, standing in for Entra's
/// `/oauth2/v2.0/{authorize,token}` and `/discovery/v2.0/keys`.
pub struct MockIdp {
    pub server: MockServer,
}

impl MockIdp {
    /// Start a fresh mock IdP with no mocked responses yet.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// The mock server's base URL — set as `IDP_AUTHORITY`/`authority_override`.
    pub fn authority(&self) -> String {
        self.server.uri()
    }

    /// Mount a successful `/oauth2/v2.0/token` response.
    pub async fn mock_token_success(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        scope: &str,
    ) {
        let mut body = json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": scope,
        });
        if let Some(refresh) = refresh_token {
            body["refresh_token"] = json!(refresh);
        }
        Mock::given(method("POST"))
            .and(path("/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Mount an error `/oauth2/v2.0/token` response.
    pub async fn mock_token_error(&self, error: &str, description: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": error,
                "error_description": description,
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount `/discovery/v2.0/keys` serving the given JWK set.
    pub async fn mock_jwks(&self, keys: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/discovery/v2.0/keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.server)
            .await;
    }
}

/// A freshly generated RSA keypair plus its JWK representation, for
/// signing and validating test tokens without a real IdP.
pub struct TestSigningKey {
    pub kid: String,
    private_key: RsaPrivateKey,
}

impl TestSigningKey {
    /// Generate a new 2048-bit RSA key under `kid`.
    pub fn generate(kid: &str) -> Self {
        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("RSA keygen");
        Self {
            kid: kid.to_string(),
            private_key,
        }
    }

    /// The JWK (public-key-only) representation of this key, as served
    /// from the mock IdP's JWKS endpoint.
    pub fn jwk(&self) -> Value {
        let public_key = self.private_key.to_public_key();
        json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": self.kid,
            "n": URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        })
    }

    /// Sign `claims` as an RS256 JWT under this key's `kid`.
    pub fn sign(&self, claims: &Value) -> String {
        use rsa::pkcs8::EncodePrivateKey;
        let pkcs8_pem = self
            .private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .expect("PKCS8 PEM encode");
        let encoding_key = EncodingKey::from_rsa_pem(pkcs8_pem.as_bytes())
            .expect("valid RSA PEM for encoding");
        let mut header = Header::new(jsonwebtoken::Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &encoding_key).expect("JWT signing")
    }
}

/// Unix epoch seconds, `now`.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Build a minimal valid claim set for `oid` against `issuer`/`audience`,
/// expiring `ttl_secs` from now (negative for an already-expired token).
pub fn sample_claims(issuer: &str, audience: &str, oid: &str, ttl_secs: i64) -> Value {
    json!({
        "iss": issuer,
        "aud": audience,
        "exp": (now_secs() as i64 + ttl_secs) as u64,
        "oid": oid,
        "scp": "mcp.tools.invoke",
        "sub": oid,
        "tid": "tenant",
    })
}

/// A `Config` pointed at a mock IdP, with the broker's own confidential
/// credentials and a deterministic `base_url`.
pub fn test_config(idp: &MockIdp) -> Config {
    let mut config = Config::default();
    config.idp.tenant_id = "test-tenant".to_string();
    config.idp.client_id = "gateway-client".to_string();
    config.idp.client_secret = "gateway-secret".to_string();
    config.idp.authority_override = Some(idp.authority());
    config.gateway.base_url = "https://gateway.example.com".to_string();
    config
}
