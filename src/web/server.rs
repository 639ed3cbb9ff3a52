//! Web server using Axum.

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::router::create_app_router;
use super::AppState;
use crate::config::ServerConfig;
use crate::error::{Error, Result};

/// Web server configuration.
pub struct WebServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        ServerConfig::default().into()
    }
}

impl From<ServerConfig> for WebServerConfig {
    fn from(config: ServerConfig) -> Self {
        Self {
            port: config.port,
            host: config.host,
        }
    }
}

impl WebServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address {}:{}: {}", self.host, self.port, e)))
    }
}

/// Bind the listening socket.
pub async fn bind(config: &WebServerConfig) -> Result<TcpListener> {
    let addr = config.addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Backend API listening on {}", addr);
    Ok(listener)
}

/// Serve the API on `listener` until `shutdown` fires.
pub async fn serve(listener: TcpListener, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let app = create_app_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::Web(e.to_string()))?;

    tracing::info!("Web server stopped");
    Ok(())
}

/// Bind and run the web server.
pub async fn run_server(config: WebServerConfig, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let listener = bind(&config).await?;
    serve(listener, state, shutdown).await
}
