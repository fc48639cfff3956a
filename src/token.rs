//! The circulating token and its wire format.
//!
//! A token travels as a single colon-delimited text line:
//! `TOKEN:<origin>:<balance>` or `TOKEN:<origin>:<balance>:STOP`.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

const TOKEN_TAG: &str = "TOKEN";
const STOP_TAG: &str = "STOP";

/// Permission to enter the critical section, carrying the shared balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Node that minted this circulation instance
    pub origin: NodeId,
    pub balance: u64,
    pub stop: bool,
}

impl Token {
    /// Mint a fresh, normal token.
    pub fn mint(origin: NodeId, balance: u64) -> Self {
        Self {
            origin,
            balance,
            stop: false,
        }
    }

    /// Same origin and balance, stop flag raised.
    pub fn with_stop(self) -> Self {
        Self { stop: true, ..self }
    }

    /// Same origin and stop flag, new balance.
    pub fn with_balance(self, balance: u64) -> Self {
        Self { balance, ..self }
    }

    /// Wire record without the trailing newline.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", TOKEN_TAG, self.origin, self.balance)?;
        if self.stop {
            write!(f, ":{}", STOP_TAG)?;
        }
        Ok(())
    }
}

/// Reasons a token record is rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenParseError {
    /// Record is empty after trimming
    Empty,
    /// First field is not `TOKEN`
    BadTag(String),
    /// Neither 3 nor 4 fields
    FieldCount(usize),
    BadOrigin(String),
    BadBalance(String),
    /// Fourth field present but not `STOP`
    BadFlag(String),
}

impl fmt::Display for TokenParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenParseError::Empty => write!(f, "empty token record"),
            TokenParseError::BadTag(tag) => write!(f, "unexpected record tag '{}'", tag),
            TokenParseError::FieldCount(n) => {
                write!(f, "expected 3 or 4 fields, found {}", n)
            }
            TokenParseError::BadOrigin(v) => write!(f, "origin '{}' is not a node id", v),
            TokenParseError::BadBalance(v) => {
                write!(f, "balance '{}' is not a non-negative integer", v)
            }
            TokenParseError::BadFlag(v) => write!(f, "unknown token flag '{}'", v),
        }
    }
}

impl std::error::Error for TokenParseError {}

impl FromStr for Token {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let record = s.trim();
        if record.is_empty() {
            return Err(TokenParseError::Empty);
        }

        let fields: Vec<&str> = record.split(':').collect();
        if fields[0] != TOKEN_TAG {
            return Err(TokenParseError::BadTag(fields[0].to_string()));
        }
        if fields.len() != 3 && fields.len() != 4 {
            return Err(TokenParseError::FieldCount(fields.len()));
        }

        let origin = fields[1]
            .parse::<NodeId>()
            .map_err(|_| TokenParseError::BadOrigin(fields[1].to_string()))?;
        let balance = fields[2]
            .parse::<u64>()
            .map_err(|_| TokenParseError::BadBalance(fields[2].to_string()))?;
        let stop = match fields.get(3) {
            None => false,
            Some(flag) if *flag == STOP_TAG => true,
            Some(other) => return Err(TokenParseError::BadFlag(other.to_string())),
        };

        Ok(Self {
            origin,
            balance,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_normal_and_stop() {
        let token = Token::mint(NodeId::new(1), 1000);
        assert_eq!(token.to_wire(), "TOKEN:1:1000");
        assert_eq!(token.with_stop().to_wire(), "TOKEN:1:1000:STOP");
    }

    #[test]
    fn test_parse_valid_records() {
        let token: Token = "TOKEN:1:400:STOP".parse().unwrap();
        assert_eq!(token.origin, NodeId::new(1));
        assert_eq!(token.balance, 400);
        assert!(token.stop);

        // trailing newline from the line reader
        let token: Token = "TOKEN:2:800\r\n".parse().unwrap();
        assert_eq!(token, Token::mint(NodeId::new(2), 800));
    }

    #[test]
    fn test_parse_malformed_records() {
        assert_eq!("TOKEN:abc".parse::<Token>(), Err(TokenParseError::FieldCount(2)));
        assert_eq!("".parse::<Token>(), Err(TokenParseError::Empty));
        assert!(matches!(
            "TICKET:1:100".parse::<Token>(),
            Err(TokenParseError::BadTag(_))
        ));
        assert!(matches!(
            "TOKEN:x:100".parse::<Token>(),
            Err(TokenParseError::BadOrigin(_))
        ));
        assert!(matches!(
            "TOKEN:1:ten".parse::<Token>(),
            Err(TokenParseError::BadBalance(_))
        ));
        assert!(matches!(
            "TOKEN:1:-5".parse::<Token>(),
            Err(TokenParseError::BadBalance(_))
        ));
        assert!(matches!(
            "TOKEN:1:100:HALT".parse::<Token>(),
            Err(TokenParseError::BadFlag(_))
        ));
        assert_eq!(
            "TOKEN:1:100:STOP:extra".parse::<Token>(),
            Err(TokenParseError::FieldCount(5))
        );
    }

    #[test]
    fn test_with_balance_keeps_origin() {
        let token = Token::mint(NodeId::new(1), 1000).with_balance(800);
        assert_eq!(token.origin, NodeId::new(1));
        assert_eq!(token.balance, 800);
        assert!(!token.stop);
    }
}
