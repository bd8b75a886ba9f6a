//! HTTP server module
//!
//! Binds the listener, accepts connections and hands each request to the
//! [`Router`]. Built directly on `hyper` and `tokio`:
//! - HTTP/1.1, one task per connection
//! - Port 0 supported; [`Server::local_addr`] reports the real port
//! - Stops accepting on Ctrl-C or a caller-supplied shutdown future

pub mod handler;
pub mod routes;

use crate::config::{Config, ConfigError};
use crate::convert::{Converter, GpsBabel};
use handler::ConvertHandler;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use routes::Router;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// HTTP Server
pub struct Server {
    router: Arc<Router>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Create a server that converts with the configured gpsbabel binary
    ///
    /// Binds to the configured address immediately.
    pub async fn new(config: Config) -> Result<Self, ServerError> {
        let converter = Arc::new(GpsBabel::from_config(&config.convert));
        Self::with_converter(&config, converter).await
    }

    /// Create a server with a custom converter
    pub async fn with_converter(
        config: &Config,
        converter: Arc<dyn Converter>,
    ) -> Result<Self, ServerError> {
        let addr: SocketAddr = config
            .server
            .address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let handler = ConvertHandler::new(&config.convert, converter)?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        // Get actual bound address (important for port 0)
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!("Server bound to {}", local_addr);

        Ok(Self {
            router: Arc::new(Router::new(handler)),
            listener,
            local_addr,
        })
    }

    /// Get the local address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the server until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C"),
                Err(e) => {
                    // Without a signal handler, keep serving until the process is killed
                    error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await
                }
            }
        })
        .await
    }

    /// Run the server until `shutdown` completes
    ///
    /// Each connection is handled in a separate task. Accept errors are
    /// logged and do not stop the server. Connections already in flight are
    /// left to finish on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Accepting connections on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let router = Arc::clone(&self.router);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let router = Arc::clone(&router);
                    async move { Ok::<_, Infallible>(router.route(req).await) }
                });

                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    error!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }

        info!("Shutting down server");
        Ok(())
    }
}
