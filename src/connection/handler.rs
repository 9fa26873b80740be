//! Connection Handler Module
//!
//! This module handles individual client connections to memrydb.
//! Each client gets its own task, which serves exactly one request.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │  Read bytes from socket      │◄──┐
//!    └──────────────┬───────────────┘   │ declared value
//!                   ▼                   │ not fully here yet
//!    ┌──────────────────────────────┐   │
//!    │  Decode request              │───┘
//!    └──────────────┬───────────────┘
//!                   ▼
//!    ┌──────────────────────────────┐
//!    │  Execute, send response      │
//!    └──────────────┬───────────────┘
//!                   ▼
//! 4. Connection closed by the server
//! ```
//!
//! ## Buffer Management
//!
//! A request is normally read in one go. TCP may still split a large SET
//! across segments, so while the decoder reports the value as cut short and
//! the buffer has room, we keep reading. Every read is bounded by the
//! connection's read deadline and the buffer by [`MAX_REQUEST_SIZE`].

use crate::commands::CommandHandler;
use crate::protocol::{decode, DecodeError, Response};
use crate::storage::StorageEngine;
use bytes::{BufMut, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Maximum size of a single request (1000 KB)
pub const MAX_REQUEST_SIZE: usize = 1024 * 1000;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Connections turned away by the connection limit
    pub connections_rejected: AtomicU64,
    /// Total requests answered
    pub requests_processed: AtomicU64,
    /// Requests answered with an error
    pub request_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_processed(&self, failed: bool) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.request_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler<E> {
    /// The TCP stream for this connection
    stream: TcpStream,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for the incoming request
    buffer: BytesMut,

    /// The command handler (shared storage)
    command_handler: CommandHandler<E>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Deadline for each read from the client
    read_timeout: Duration,
}

impl<E: StorageEngine> ConnectionHandler<E> {
    /// Creates a new connection handler.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler<E>,
        stats: Arc<ConnectionStats>,
        read_timeout: Duration,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream,
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
            read_timeout,
        }
    }

    /// Serves the connection's request and closes it.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        debug!(client = %self.addr, "Client connected");

        let result = self.serve().await;

        if let Err(e @ ConnectionError::Timeout(_)) = &result {
            // Best effort: tell the client why we are hanging up
            let _ = self.send_response(&Response::error(e.to_string())).await;
        }

        match &result {
            Ok(()) => trace!(client = %self.addr, "Request served"),
            Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "Client disconnected without a request")
            }
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        let _ = self.stream.shutdown().await;
        self.stats.connection_closed();
        result
    }

    /// Reads one request, executes it and writes the response.
    async fn serve(&mut self) -> Result<(), ConnectionError> {
        let decoded = loop {
            let n = self.read_more_data().await?;
            let decoded = decode(&self.buffer);

            let cut_short = matches!(decoded, Err(DecodeError::SliceOutOfRange));
            if n == 0 || !cut_short || self.buffer.len() >= MAX_REQUEST_SIZE {
                break decoded;
            }
            trace!(
                client = %self.addr,
                buffered = self.buffer.len(),
                "Value incomplete, need more data"
            );
        };

        let response = match decoded {
            Ok(request) => {
                debug!(client = %self.addr, request = %request, "Request");
                self.command_handler.execute(request)
            }
            Err(e) => {
                info!(client = %self.addr, error = %e, "Invalid request");
                Response::error(e.to_string())
            }
        };

        self.stats.request_processed(response.is_error());
        self.send_response(&response).await
    }

    /// Reads more data from the socket into the buffer.
    ///
    /// Returns the number of bytes read; `0` means the client closed its side.
    async fn read_more_data(&mut self) -> Result<usize, ConnectionError> {
        let room = MAX_REQUEST_SIZE - self.buffer.len();
        let mut limited = (&mut self.buffer).limit(room);
        let read = self.stream.read_buf(&mut limited);

        let n = tokio::time::timeout(self.read_timeout, read)
            .await
            .map_err(|_| ConnectionError::Timeout(self.read_timeout))??;

        if n == 0 && self.buffer.is_empty() {
            return Err(ConnectionError::ClientDisconnected);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(n)
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The client did not send its request in time
    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    /// Client closed the connection before sending anything
    #[error("Client disconnected")]
    ClientDisconnected,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Errors are logged, never propagated: one
/// connection failing has no effect on any other.
pub async fn handle_connection<E: StorageEngine>(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler<E>,
    stats: Arc<ConnectionStats>,
    read_timeout: Duration,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, read_timeout);
    if let Err(e) = handler.run().await {
        trace!(client = %addr, error = %e, "Connection ended with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode, Method};
    use crate::storage::ShardedMap;
    use bytes::Bytes;
    use tokio::net::TcpListener;

    async fn create_test_server(
        read_timeout: Duration,
    ) -> (SocketAddr, Arc<ShardedMap>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(ShardedMap::new(8));
        let stats = Arc::new(ConnectionStats::new());

        let handler = CommandHandler::new(Arc::clone(&storage));
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    handler.clone(),
                    stats,
                    read_timeout,
                ));
            }
        });

        (addr, storage, stats)
    }

    async fn request(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(raw).await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_set_get_del() {
        let (addr, storage, _) = create_test_server(Duration::from_secs(5)).await;

        assert_eq!(request(addr, b"SET 4 6 name cedric").await, b"ok");
        assert_eq!(request(addr, b"GET 4 name").await, b"cedric");
        assert_eq!(storage.len(), 1);

        assert_eq!(request(addr, b"DEL 4 name").await, b"ok");
        assert_eq!(request(addr, b"GET 4 name").await, b"");
    }

    #[tokio::test]
    async fn test_invalid_request_gets_error_text() {
        let (addr, _, stats) = create_test_server(Duration::from_secs(5)).await;

        let response = request(addr, b"PUT 4 name").await;
        assert_eq!(response, DecodeError::InvalidCommand.to_string().into_bytes());

        // The server keeps serving other connections
        assert_eq!(request(addr, b"SET 1 1 a b").await, b"ok");

        assert_eq!(stats.requests_processed.load(Ordering::Relaxed), 2);
        assert_eq!(stats.request_errors.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_value_split_across_writes() {
        let (addr, storage, _) = create_test_server(Duration::from_secs(5)).await;
        let value = vec![b'x'; 200 * 1024];
        let raw = encode(Method::Set, b"big", &value);
        let (head, tail) = raw.split_at(raw.len() / 2);

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(head).await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.write_all(tail).await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();

        assert_eq!(response, b"ok");
        assert_eq!(storage.get(b"big"), Some(Bytes::from(value)));
    }

    #[tokio::test]
    async fn test_request_split_after_key() {
        let (addr, storage, _) = create_test_server(Duration::from_secs(5)).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"SET 4 6 name").await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.write_all(b" cedric").await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();

        assert_eq!(response, b"ok");
        assert_eq!(storage.get(b"name"), Some(Bytes::from("cedric")));
    }

    #[tokio::test]
    async fn test_truncated_value_after_close() {
        let (addr, _, _) = create_test_server(Duration::from_secs(5)).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"SET 4 10 name short").await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, DecodeError::SliceOutOfRange.to_string().into_bytes());
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let timeout = Duration::from_millis(100);
        let (addr, _, stats) = create_test_server(timeout).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();

        assert_eq!(
            response,
            ConnectionError::Timeout(timeout).to_string().into_bytes()
        );
        assert_eq!(stats.requests_processed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server(Duration::from_secs(5)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Give the server time to accept the connection
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"GET 4 name").await.unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.requests_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 10);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 0);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_disconnect_without_request() {
        let (addr, _, stats) = create_test_server(Duration::from_secs(5)).await;

        drop(TcpStream::connect(addr).await.unwrap());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.requests_processed.load(Ordering::Relaxed), 0);
    }
}
