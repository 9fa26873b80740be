//! TCP Server
//!
//! Accepts connections and spawns one task per client. Owns everything the
//! connection tasks share: the storage engine, the statistics and the
//! connection limit.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionStats};
use crate::protocol::Response;
use crate::storage::{ShardedMap, StorageEngine};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Response sent to clients beyond the connection limit.
pub const TOO_MANY_CONNECTIONS: &str = "too many connections";

/// The memrydb server.
pub struct Server<E = ShardedMap> {
    handler: CommandHandler<E>,
    stats: Arc<ConnectionStats>,
    /// `None` means unlimited
    limiter: Option<Arc<Semaphore>>,
    read_timeout: Duration,
}

impl Server<ShardedMap> {
    /// Builds a server and its sharded storage from the configuration.
    pub fn from_config(config: &Config) -> Self {
        let storage = Arc::new(ShardedMap::new(config.number_of_shard));
        Self::new(
            storage,
            config.max_number_of_connexion,
            config.server.read_timeout(),
        )
    }
}

impl<E: StorageEngine> Server<E> {
    /// Creates a server over `storage`.
    ///
    /// `max_connections` of `0` disables the connection limit.
    pub fn new(storage: Arc<E>, max_connections: u64, read_timeout: Duration) -> Self {
        let limiter = (max_connections > 0).then(|| {
            let permits = usize::try_from(max_connections)
                .unwrap_or(usize::MAX)
                .min(Semaphore::MAX_PERMITS);
            Arc::new(Semaphore::new(permits))
        });

        Self {
            handler: CommandHandler::new(storage),
            stats: Arc::new(ConnectionStats::new()),
            limiter,
            read_timeout,
        }
    }

    pub fn storage(&self) -> &Arc<E> {
        self.handler.storage()
    }

    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Connections already being served keep running to completion before
    /// this returns. Each is bounded by the read timeout.
    pub async fn run(&self, listener: TcpListener, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => self.dispatch(&mut connections, stream, addr),
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    log_task_failure(finished);
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        if !connections.is_empty() {
            info!(
                active = connections.len(),
                "Waiting for open connections to finish"
            );
        }
        while let Some(finished) = connections.join_next().await {
            log_task_failure(finished);
        }
    }

    /// Spawns the task for an accepted connection, or turns it away.
    fn dispatch(
        &self,
        connections: &mut JoinSet<()>,
        stream: TcpStream,
        addr: std::net::SocketAddr,
    ) {
        let permit = match &self.limiter {
            None => None,
            Some(limiter) => match Arc::clone(limiter).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!(client = %addr, "Connection limit reached, rejecting client");
                    self.stats.connection_rejected();
                    connections.spawn(reject(stream));
                    return;
                }
            },
        };

        let handler = self.handler.clone();
        let stats = Arc::clone(&self.stats);
        let read_timeout = self.read_timeout;

        connections.spawn(async move {
            handle_connection(stream, addr, handler, stats, read_timeout).await;
            drop(permit);
        });
    }
}

fn log_task_failure(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        error!(error = %e, "Connection task failed");
    }
}

async fn reject(mut stream: TcpStream) {
    let message = Response::error(TOO_MANY_CONNECTIONS).serialize();
    if let Err(e) = stream.write_all(&message).await {
        debug!(error = %e, "Failed to notify rejected client");
    }
    let _ = stream.shutdown().await;
}
