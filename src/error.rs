use std::fmt;

use crate::token::TokenParseError;

/// Main error type for a token ring node
#[derive(Debug)]
pub enum RingError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Successor refused the connection or did not answer in time
    Unreachable(String),

    /// Transport layer errors other than an unreachable successor
    Transport(String),

    /// Malformed token records
    Protocol(TokenParseError),

    /// Node controller and task errors
    Node(String),

    /// System I/O errors
    Io(std::io::Error),
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::Config(msg) => write!(f, "Configuration error: {}", msg),
            RingError::Unreachable(msg) => write!(f, "Successor unreachable: {}", msg),
            RingError::Transport(msg) => write!(f, "Transport error: {}", msg),
            RingError::Protocol(err) => write!(f, "Protocol error: {}", err),
            RingError::Node(msg) => write!(f, "Node error: {}", msg),
            RingError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for RingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RingError::Io(err) => Some(err),
            RingError::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for ring operations
pub type Result<T> = std::result::Result<T, RingError>;

impl From<std::io::Error> for RingError {
    fn from(err: std::io::Error) -> Self {
        RingError::Io(err)
    }
}

impl From<TokenParseError> for RingError {
    fn from(err: TokenParseError) -> Self {
        RingError::Protocol(err)
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::RingError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::RingError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! node_error {
    ($msg:expr) => {
        $crate::error::RingError::Node($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::RingError::Node(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! transport_error {
    ($msg:expr) => {
        $crate::error::RingError::Transport($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::RingError::Transport(format!($fmt, $($arg)*))
    };
}
