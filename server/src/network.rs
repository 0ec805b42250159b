//! Listener and session lifecycle

use crate::config::ServerConfig;
use crate::registry::{Registry, SharedRegistry};
use crate::session::Session;
use log::{error, info, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Relay server: owns the listening socket and the shared registry
pub struct Server {
    listener: TcpListener,
    registry: SharedRegistry,
    config: Arc<ServerConfig>,
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    /// Binds the listening socket. Failure here is fatal to startup.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        info!(
            "Server started on {}. Max clients: {}",
            listener.local_addr()?,
            config.max_clients
        );

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Server {
            listener,
            registry: Registry::shared(config.max_clients),
            config: Arc::new(config),
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the registry, mainly for inspection
    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Accepts connections forever
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then closes every
    /// session and waits for them to finish
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Some(session) = self.admit(stream, addr).await {
                            sessions.spawn(session.run());
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        error!("Session task failed: {}", e);
                    }
                },
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        let _ = self.shutdown_tx.send(true);
        while let Some(finished) = sessions.join_next().await {
            if let Err(e) = finished {
                error!("Session task failed: {}", e);
            }
        }

        info!("All sessions closed");
        Ok(())
    }

    /// Assigns a slot to an accepted connection, or closes it when full
    async fn admit(&self, stream: TcpStream, addr: SocketAddr) -> Option<Session> {
        let session = Session::open(
            stream,
            addr,
            Arc::clone(&self.registry),
            Arc::clone(&self.config),
            self.shutdown_tx.subscribe(),
        )
        .await;

        if session.is_none() {
            warn!(
                "[CONNECTION] Maximum clients reached. Disconnected new client from {}",
                addr
            );
        }
        session
    }
}
