//! CLI for this application
//!
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::config_error;
use crate::error::Result;
use crate::node::NodeId;
use crate::operation::OperationChoice;
use crate::settings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Clone, Debug, clap::Parser)]
#[command(name = settings::APP_NAME, version = settings::APP_VERSION)]
pub struct Cli {
    // Position of this node in the ring
    #[clap(long, env("RING_NODE_ID"), help = "Node id, unique within the ring (1..N)")]
    pub node_id: u32,

    // Token listener address
    #[clap(
        long,
        default_value = "127.0.0.1",
        env("RING_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // Token listener port
    #[clap(long, env("RING_LISTEN_PORT"), help = "Port to receive the token on")]
    pub listen_port: u16,

    // Next node in the ring
    #[clap(
        long,
        env("RING_SUCCESSOR"),
        help = "Successor address (host:port, or a bare port on localhost)"
    )]
    pub successor: String,

    // Simulated fail-stop crash
    #[clap(long, env("RING_CRASH"), help = "Start crashed: drop every token forever")]
    pub crash: bool,

    #[clap(
        long,
        default_value = settings::DEFAULT_AUTHORITY,
        env("RING_AUTHORITY"),
        help = "Node that mints the token and detects completion"
    )]
    pub authority: u32,

    #[clap(
        long,
        default_value = settings::DEFAULT_INITIAL_BALANCE,
        env("RING_INITIAL_BALANCE"),
        help = "Balance carried by a freshly minted token"
    )]
    pub initial_balance: u64,

    #[clap(
        long,
        default_value = "auto",
        env("RING_OPERATION"),
        help = "Pending operation: 'auto', 'none', 'withdraw:N' or 'deposit:N'"
    )]
    pub operation: OperationChoice,

    #[clap(
        long,
        default_value = settings::DEFAULT_TOKEN_TIMEOUT_MS,
        env("RING_TOKEN_TIMEOUT_MS"),
        help = "Silence after which the authority considers the token lost"
    )]
    pub token_timeout_ms: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_MONITOR_INTERVAL_MS,
        env("RING_MONITOR_INTERVAL_MS"),
        help = "Interval between token-loss checks"
    )]
    pub monitor_interval_ms: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_SETTLE_DELAY_MS,
        env("RING_SETTLE_DELAY_MS"),
        help = "Delay before the authority mints the first token"
    )]
    pub settle_delay_ms: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_RETRY_BACKOFF_MS,
        env("RING_RETRY_BACKOFF_MS"),
        help = "Wait between attempts to reach an unavailable successor"
    )]
    pub retry_backoff_ms: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_CONNECT_TIMEOUT_MS,
        env("RING_CONNECT_TIMEOUT_MS"),
        help = "Bound on a single connection attempt"
    )]
    pub connect_timeout_ms: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_READ_TIMEOUT_MS,
        env("RING_READ_TIMEOUT_MS"),
        help = "Bound on reading a token record from a connection"
    )]
    pub read_timeout_ms: u64,

    #[clap(
        long,
        default_value = "text",
        env("RING_LOG_FORMAT"),
        help = "Log output: 'text' or 'json'"
    )]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn into_settings(self) -> Result<settings::Settings> {
        let listen_address: IpAddr = self
            .listen_address
            .parse::<IpAddr>()
            .map_err(|e| config_error!("Invalid listen address '{}': {}", self.listen_address, e))?;
        let listen = SocketAddr::new(listen_address, self.listen_port);
        let successor = settings::parse_successor(&self.successor)?;

        let settings = settings::Settings {
            node_id: NodeId::new(self.node_id),
            authority: NodeId::new(self.authority),
            listen,
            successor,
            crashed: self.crash,
            initial_balance: self.initial_balance,
            operation: self.operation,
            token_timeout: Duration::from_millis(self.token_timeout_ms),
            monitor_interval: Duration::from_millis(self.monitor_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::operation::PendingOperation;

    #[test]
    fn test_parse_minimal_args() {
        let cli = Cli::try_parse_from([
            "tokenring",
            "--node-id",
            "2",
            "--listen-port",
            "5002",
            "--successor",
            "5003",
        ])
        .unwrap();
        let settings = cli.into_settings().unwrap();

        assert_eq!(settings.node_id, NodeId::new(2));
        assert_eq!(settings.listen.port(), 5002);
        assert_eq!(settings.successor, "127.0.0.1:5003".parse().unwrap());
        assert!(!settings.crashed);
        assert_eq!(settings.initial_balance, 1000);
        assert_eq!(settings.token_timeout, Duration::from_secs(8));
        assert_eq!(settings.pending_operation(), Some(PendingOperation::withdraw(200)));
    }

    #[test]
    fn test_parse_crash_and_operation() {
        let cli = Cli::try_parse_from([
            "tokenring",
            "--node-id",
            "3",
            "--listen-port",
            "5003",
            "--successor",
            "127.0.0.1:5004",
            "--crash",
            "--operation",
            "deposit:42",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        let settings = cli.into_settings().unwrap();

        assert!(settings.crashed);
        assert_eq!(settings.pending_operation(), Some(PendingOperation::deposit(42)));
    }

    #[test]
    fn test_non_numeric_identity_rejected() {
        let result = Cli::try_parse_from([
            "tokenring",
            "--node-id",
            "first",
            "--listen-port",
            "5001",
            "--successor",
            "5002",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = Cli::try_parse_from([
            "tokenring",
            "--node-id",
            "1",
            "--listen-port",
            "70000",
            "--successor",
            "5002",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_timing_rejected_at_settings() {
        let cli = Cli::try_parse_from([
            "tokenring",
            "--node-id",
            "1",
            "--listen-port",
            "5001",
            "--successor",
            "5002",
            "--token-timeout-ms",
            "500",
            "--monitor-interval-ms",
            "1000",
        ])
        .unwrap();
        assert!(cli.into_settings().is_err());
    }
}
