//! End-to-end tests for the Delegation Helper (On-Behalf-Of exchange).
//! Mirrors spec.md §8 scenario F.

mod common;

use common::MockIdp;
use mcp_oauth_gateway::config::IdpConfig;
use mcp_oauth_gateway::oauth::idp_client::IdpClient;
use mcp_oauth_gateway::resource::obo::{OboError, OnBehalfOfExchanger};

fn idp_config(idp: &MockIdp) -> IdpConfig {
    IdpConfig {
        tenant_id: "test-tenant".to_string(),
        client_id: "gateway-client".to_string(),
        client_secret: "gateway-secret".to_string(),
        authority_override: Some(idp.authority()),
        request_timeout: std::time::Duration::from_secs(5),
    }
}

#[tokio::test]
async fn obo_exchange_returns_downstream_access_token() {
    let idp = MockIdp::start().await;
    idp.mock_token_success("GRAPHJWT", None, "https://graph.example.com/User.Read")
        .await;

    let client = IdpClient::new(idp_config(&idp)).expect("idp client");
    let exchanger = OnBehalfOfExchanger::new(client);

    let token = exchanger
        .exchange("JWT1", "https://graph.example.com/User.Read")
        .await
        .expect("obo exchange succeeds");

    assert_eq!(token, "GRAPHJWT");
}

#[tokio::test]
async fn obo_exchange_surfaces_idp_rejection_as_a_tool_level_error() {
    let idp = MockIdp::start().await;
    idp.mock_token_error("invalid_grant", "the user has not consented to this scope")
        .await;

    let client = IdpClient::new(idp_config(&idp)).expect("idp client");
    let exchanger = OnBehalfOfExchanger::new(client);

    let error = exchanger
        .exchange("JWT1", "https://graph.example.com/User.Read")
        .await
        .expect_err("IdP rejection surfaces as an error");

    match error {
        OboError::Rejected(reason) => assert!(reason.contains("invalid_grant")),
        other => panic!("expected a Rejected error, got {other:?}"),
    }
}
