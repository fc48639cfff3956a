//! TCP Receiver
//!
//! Accepts connections from the predecessor and reads exactly one token
//! record per connection. Records are handed to the node controller
//! unparsed; the controller decides what a record means.
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::stats::{FrozenReceiverStats, ReceiverStats};
use crate::error::{RingError, Result};
use crate::settings::TransportConfig;
use crate::transport_error;

/// A raw record delivered by the predecessor
#[derive(Clone, Debug)]
pub struct InboundToken {
    pub line: String,
    pub peer_addr: SocketAddr,
}

/// TCP token receiver
pub struct TcpTokenReceiver {
    pub local_addr: SocketAddr,
    socket: Arc<TcpListener>,
    read_timeout: Duration,
    max_record_len: usize,
    stats: Arc<ReceiverStats>,
}

impl TcpTokenReceiver {
    /// Bind the listen address. Port 0 picks an ephemeral port, see `local_addr`.
    pub async fn bind(transport_config: &TransportConfig) -> Result<Self> {
        let socket = TcpListener::bind(transport_config.listen)
            .await
            .map_err(|e| {
                transport_error!("Bind to {} failed: {}", transport_config.listen, e)
            })?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| transport_error!("Socket creation failed: {}", e))?;

        Ok(Self {
            local_addr,
            socket: Arc::new(socket),
            read_timeout: transport_config.read_timeout,
            max_record_len: transport_config.max_record_len,
            stats: Arc::new(ReceiverStats::default()),
        })
    }

    /// Start the accept loop, pushing every record into `inbox`.
    ///
    /// The loop ends once the inbox is closed.
    pub fn start(&self, inbox: mpsc::Sender<InboundToken>) -> JoinHandle<()> {
        let socket = self.socket.clone();
        let stats = self.stats.clone();
        let read_timeout = self.read_timeout;
        let max_record_len = self.max_record_len;

        tokio::spawn(async move {
            loop {
                let (stream, peer_addr) = match socket.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("TCP accept failed: {}", e);
                        continue;
                    }
                };
                if inbox.is_closed() {
                    debug!("Inbox closed, receiver exiting");
                    break;
                }

                let tx = inbox.clone();
                let stats = stats.clone();
                tokio::spawn(async move {
                    match read_record(stream, read_timeout, max_record_len).await {
                        Ok(line) => {
                            stats.messages_received.fetch_add(1, Ordering::Relaxed);
                            if tx.send(InboundToken { line, peer_addr }).await.is_err() {
                                debug!("Inbox closed, dropped record from {}", peer_addr);
                            }
                        }
                        Err(e) => {
                            stats.receive_errors.fetch_add(1, Ordering::Relaxed);
                            warn!("Failed to read token record from {}: {}", peer_addr, e);
                        }
                    }
                });
            }
        })
    }

    /// Get receiver statistics
    pub fn get_stats(&self) -> FrozenReceiverStats {
        self.stats.freeze()
    }

    pub(crate) fn shared_stats(&self) -> Arc<ReceiverStats> {
        self.stats.clone()
    }
}

async fn read_record(
    stream: TcpStream,
    read_timeout: Duration,
    max_record_len: usize,
) -> Result<String> {
    // One byte past the limit tells an overlong record from one that fits exactly
    let mut reader = BufReader::new(stream.take(max_record_len as u64 + 1));
    let mut line = String::new();

    let read = timeout(read_timeout, reader.read_line(&mut line))
        .await
        .map_err(|_| transport_error!("no record within {}ms", read_timeout.as_millis()))?
        .map_err(RingError::Io)?;

    if read == 0 {
        return Err(transport_error!("connection closed before a record was sent"));
    }
    if line.len() > max_record_len {
        return Err(transport_error!("record longer than {} bytes", max_record_len));
    }
    Ok(line.trim_end().to_string())
}
