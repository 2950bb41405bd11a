//! MCP OAuth Gateway
//!
//! An authenticating gateway that sits in front of a Model Context Protocol
//! (MCP) server and brokers OAuth 2.1 authorization between MCP clients —
//! which expect Dynamic Client Registration — and an enterprise identity
//! provider that only recognizes pre-registered applications.
//!
//! The gateway publishes OAuth discovery metadata, registers MCP clients
//! dynamically, proxies the authorization-code flow (with PKCE) against the
//! upstream IdP, validates bearer tokens on every tool call, and performs
//! On-Behalf-Of token exchange for downstream API calls made while serving
//! a request.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod oauth;
pub mod resource;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Set up the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a subscriber has already been installed.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
