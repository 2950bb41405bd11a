//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::router::{AppState, create_router};
use crate::config::Config;
use crate::oauth::{self, OAuthState};
use crate::resource::ResourceState;
use crate::{Error, Result};

/// MCP OAuth Gateway server.
pub struct Gateway {
    config: Config,
    oauth: Arc<OAuthState>,
    resource: Arc<ResourceState>,
}

impl Gateway {
    /// Build the gateway's OAuth proxy and resource-validation state from
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP clients used to reach the IdP
    /// cannot be constructed.
    #[allow(clippy::unused_async)] // async for parity with future initialization needs
    pub async fn new(config: Config) -> Result<Self> {
        let oauth = Arc::new(OAuthState::new(config.clone()).map_err(Error::Http)?);
        let resource = Arc::new(ResourceState::new(&config).map_err(Error::Http)?);
        Ok(Self {
            config,
            oauth,
            resource,
        })
    }

    /// Bind the configured address and serve until a shutdown signal
    /// arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the configured address
    /// or if an unrecoverable runtime error occurs while serving.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        oauth::spawn_sweeper(&self.oauth);

        let state = Arc::new(AppState {
            oauth: self.oauth,
            resource: self.resource,
        });
        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("MCP OAUTH GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(issuer = %self.config.idp.issuer(), "Brokering against upstream IdP");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("Gateway shutdown complete");
        Ok(())
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    warn!("Shutdown signal received");
}
