//! Connection supervisor: TCP accept loop and per-connection tasks.

use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::context::ServerContext;
use crate::error::ConnectionError;
use crate::registry::SessionRegistry;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Accepts connections and runs one independent task per connection.
///
/// Every task owns its stream; the stream is closed and any registry entry
/// removed however the task ends.
pub struct Server {
    context: Arc<ServerContext>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_context(ServerContext::new(config))
    }

    pub fn with_context(context: ServerContext) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            context: Arc::new(context),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Registry of active sessions, shared with every connection.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.context.registry)
    }

    /// Binds the configured address and runs the accept loop.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.context.config.bind_addr).await?;
        self.run_with_listener(listener).await
    }

    /// Runs the accept loop on an already bound listener until shutdown.
    pub async fn run_with_listener(&self, listener: TcpListener) -> std::io::Result<()> {
        info!("Listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            if let Err(e) = stream.set_nodelay(true) {
                                debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
                            }
                            self.serve(stream, peer);
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Server shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawns the task for one accepted stream.
    pub fn serve<S>(&self, stream: S, peer: SocketAddr) -> JoinHandle<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let context = Arc::clone(&self.context);
        let shutdown = self.shutdown_rx.clone();

        tokio::spawn(async move {
            debug!("Accepted connection from {}", peer);
            match handle_connection(stream, peer, &context, shutdown).await {
                Ok(()) => debug!("Connection from {} closed", peer),
                Err(e) if e.is_disconnect() => debug!("{} disconnected", peer),
                // Already logged when the kick was sent.
                Err(ConnectionError::UnsupportedVersion(_)) | Err(ConnectionError::ServerFull) => {}
                Err(e) => debug!("Dropped connection from {}: {}", peer, e),
            }
        })
    }

    /// Stops the accept loop and every connection task.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
