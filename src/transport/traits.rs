//! Transport traits for the token link
//!
//! The node controller only talks to its successor through [`TokenSender`],
//! so the protocol can be driven over TCP or over an in-memory link in tests.

use std::net::SocketAddr;

use async_trait::async_trait;

use super::stats::FrozenSenderStats;
use crate::error::Result;
use crate::token::Token;

/// Trait for delivering a token to the next node in the ring
#[async_trait]
pub trait TokenSender: Send + Sync {
    /// Deliver one token record. A refused or timed out connection is
    /// reported as [`crate::error::RingError::Unreachable`].
    async fn send(&self, successor: SocketAddr, token: &Token) -> Result<()>;

    /// Get sender statistics for monitoring
    fn get_stats(&self) -> FrozenSenderStats;
}
