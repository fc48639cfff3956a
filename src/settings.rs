//! Token ring node settings
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::Result;
use crate::node::node_id::validate_node_id;
use crate::node::NodeId;
use crate::operation::{OperationChoice, PendingOperation};
use crate::config_error;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_AUTHORITY: &str = "1";
pub const DEFAULT_INITIAL_BALANCE: &str = "1000";
pub const DEFAULT_TOKEN_TIMEOUT_MS: &str = "8000";
pub const DEFAULT_MONITOR_INTERVAL_MS: &str = "2000";
pub const DEFAULT_SETTLE_DELAY_MS: &str = "8000";
pub const DEFAULT_RETRY_BACKOFF_MS: &str = "2000";
pub const DEFAULT_CONNECT_TIMEOUT_MS: &str = "2000";
pub const DEFAULT_READ_TIMEOUT_MS: &str = "5000";

/// Longest token record accepted on a connection
pub const MAX_RECORD_LEN: usize = 256;

#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub listen: SocketAddr,
    pub successor: SocketAddr,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_record_len: usize,
}

/// Timers driving the authority's bootstrap and loss detection
#[derive(Clone, Copy, Debug)]
pub struct MonitorSettings {
    pub token_timeout: Duration,
    pub monitor_interval: Duration,
    pub settle_delay: Duration,
}

#[derive(Clone, Debug)]
pub struct Settings {
    // This node's place in the ring
    pub node_id: NodeId,

    // Node that mints, regenerates and detects completion
    pub authority: NodeId,

    // Token listener address
    pub listen: SocketAddr,

    // Next node in the ring
    pub successor: SocketAddr,

    // Fail-stop simulation
    pub crashed: bool,

    // Balance carried by a freshly minted token
    pub initial_balance: u64,

    pub operation: OperationChoice,

    pub token_timeout: Duration,
    pub monitor_interval: Duration,
    pub settle_delay: Duration,
    pub retry_backoff: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Settings {
    /// Settings with the demonstration defaults
    pub fn new(node_id: NodeId, listen: SocketAddr, successor: SocketAddr) -> Self {
        Self {
            node_id,
            authority: NodeId::new(1),
            listen,
            successor,
            crashed: false,
            initial_balance: 1000,
            operation: OperationChoice::Auto,
            token_timeout: Duration::from_millis(8000),
            monitor_interval: Duration::from_millis(2000),
            settle_delay: Duration::from_millis(8000),
            retry_backoff: Duration::from_millis(2000),
            connect_timeout: Duration::from_millis(2000),
            read_timeout: Duration::from_millis(5000),
        }
    }

    pub fn is_authority(&self) -> bool {
        self.node_id == self.authority
    }

    pub fn pending_operation(&self) -> Option<PendingOperation> {
        self.operation.resolve(self.node_id)
    }

    pub fn validate(&self) -> Result<()> {
        if !validate_node_id(self.node_id) {
            return Err(config_error!("Node id must be positive, got {}", self.node_id));
        }
        if !validate_node_id(self.authority) {
            return Err(config_error!(
                "Authority id must be positive, got {}",
                self.authority
            ));
        }
        if self.monitor_interval.is_zero() {
            return Err(config_error!("Monitor interval must be positive"));
        }
        if self.token_timeout <= self.monitor_interval {
            return Err(config_error!(
                "Token timeout ({}ms) must exceed the monitor interval ({}ms)",
                self.token_timeout.as_millis(),
                self.monitor_interval.as_millis()
            ));
        }
        if self.listen.port() != 0 && self.listen == self.successor {
            return Err(config_error!(
                "Successor {} is this node's own listen address",
                self.successor
            ));
        }
        Ok(())
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            listen: self.listen,
            successor: self.successor,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            max_record_len: MAX_RECORD_LEN,
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            token_timeout: self.token_timeout,
            monitor_interval: self.monitor_interval,
            settle_delay: self.settle_delay,
        }
    }
}

/// Accepts `host:port`, or a bare port on localhost.
pub fn parse_successor(value: &str) -> Result<SocketAddr> {
    if let Ok(port) = value.parse::<u16>() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
    }
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    value
        .to_socket_addrs()
        .map_err(|e| config_error!("Invalid successor '{}': {}", value, e))?
        .next()
        .ok_or_else(|| config_error!("Successor '{}' resolved to no address", value))
}
