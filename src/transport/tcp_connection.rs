//! TCP Sender
//!
//! One connection per token: connect, write a single line, close.
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::stats::{FrozenSenderStats, SenderStats};
use super::traits::TokenSender;
use crate::error::{RingError, Result};
use crate::settings::TransportConfig;
use crate::token::Token;

#[derive(Clone, Debug)]
pub struct TcpTokenSender {
    connect_timeout: Duration,
    stats: Arc<SenderStats>,
}

impl TcpTokenSender {
    pub fn new(transport_config: &TransportConfig) -> Self {
        Self {
            connect_timeout: transport_config.connect_timeout,
            stats: Arc::new(SenderStats::default()),
        }
    }

    async fn write_record(&self, successor: SocketAddr, token: &Token) -> Result<()> {
        let mut stream = match timeout(self.connect_timeout, TcpStream::connect(successor)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RingError::Unreachable(format!("{}: {}", successor, e)));
            }
            Err(_) => {
                return Err(RingError::Unreachable(format!(
                    "{}: no answer within {}ms",
                    successor,
                    self.connect_timeout.as_millis()
                )));
            }
        };

        let mut record = token.to_wire();
        record.push('\n');
        stream
            .write_all(record.as_bytes())
            .await
            .map_err(|e| RingError::Unreachable(format!("{}: write failed: {}", successor, e)))?;
        stream.flush().await?;
        stream.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl TokenSender for TcpTokenSender {
    async fn send(&self, successor: SocketAddr, token: &Token) -> Result<()> {
        match self.write_record(successor, token).await {
            Ok(()) => {
                self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
                debug!("Delivered {} to {}", token, successor);
                Ok(())
            }
            Err(e) => {
                self.stats.send_errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    fn get_stats(&self) -> FrozenSenderStats {
        self.stats.freeze()
    }
}
