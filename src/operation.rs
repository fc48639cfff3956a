//! Pending account operations executed inside the critical section.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Withdraw,
    Deposit,
}

/// A single operation a node holds until the token reaches it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub kind: OperationKind,
    pub amount: u64,
}

/// Result of running an operation against a balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    Applied { before: u64, after: u64 },
    /// Withdrawal larger than the balance; balance unchanged
    InsufficientFunds { balance: u64 },
    /// Deposit would overflow the balance; balance unchanged
    Overflow { balance: u64 },
}

impl OperationOutcome {
    /// Balance after the operation, whether or not it applied.
    pub fn balance(&self) -> u64 {
        match self {
            OperationOutcome::Applied { after, .. } => *after,
            OperationOutcome::InsufficientFunds { balance } => *balance,
            OperationOutcome::Overflow { balance } => *balance,
        }
    }
}

impl PendingOperation {
    pub fn withdraw(amount: u64) -> Self {
        Self {
            kind: OperationKind::Withdraw,
            amount,
        }
    }

    pub fn deposit(amount: u64) -> Self {
        Self {
            kind: OperationKind::Deposit,
            amount,
        }
    }

    pub fn apply(&self, balance: u64) -> OperationOutcome {
        match self.kind {
            OperationKind::Withdraw => match balance.checked_sub(self.amount) {
                Some(after) => OperationOutcome::Applied {
                    before: balance,
                    after,
                },
                None => OperationOutcome::InsufficientFunds { balance },
            },
            OperationKind::Deposit => match balance.checked_add(self.amount) {
                Some(after) => OperationOutcome::Applied {
                    before: balance,
                    after,
                },
                None => OperationOutcome::Overflow { balance },
            },
        }
    }

    /// Fixed demonstration assignment for a four node ring.
    pub fn demo_for(node_id: NodeId) -> Option<Self> {
        match node_id.value() {
            2 => Some(Self::withdraw(200)),
            3 => Some(Self::deposit(100)),
            4 => Some(Self::withdraw(500)),
            _ => None,
        }
    }
}

impl fmt::Display for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OperationKind::Withdraw => write!(f, "withdraw:{}", self.amount),
            OperationKind::Deposit => write!(f, "deposit:{}", self.amount),
        }
    }
}

impl FromStr for PendingOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, amount) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid operation '{}', expected kind:amount", s))?;
        let amount = amount
            .parse::<u64>()
            .map_err(|_| format!("Invalid operation amount '{}'", amount))?;
        if amount == 0 {
            return Err("Operation amount must be positive".to_string());
        }
        match kind.to_lowercase().as_str() {
            "withdraw" => Ok(Self::withdraw(amount)),
            "deposit" => Ok(Self::deposit(amount)),
            _ => Err(format!("Invalid operation kind '{}'", kind)),
        }
    }
}

/// How a node's pending slot is filled at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationChoice {
    /// Use the demonstration table
    Auto,
    None,
    Explicit(PendingOperation),
}

impl OperationChoice {
    pub fn resolve(&self, node_id: NodeId) -> Option<PendingOperation> {
        match self {
            OperationChoice::Auto => PendingOperation::demo_for(node_id),
            OperationChoice::None => None,
            OperationChoice::Explicit(op) => Some(*op),
        }
    }
}

impl fmt::Display for OperationChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationChoice::Auto => write!(f, "auto"),
            OperationChoice::None => write!(f, "none"),
            OperationChoice::Explicit(op) => write!(f, "{}", op),
        }
    }
}

impl FromStr for OperationChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(OperationChoice::Auto),
            "none" => Ok(OperationChoice::None),
            _ => s.parse::<PendingOperation>().map(OperationChoice::Explicit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdraw_applies_when_funded() {
        let outcome = PendingOperation::withdraw(200).apply(1000);
        assert_eq!(
            outcome,
            OperationOutcome::Applied {
                before: 1000,
                after: 800
            }
        );
    }

    #[test]
    fn test_withdraw_exact_balance() {
        assert_eq!(PendingOperation::withdraw(500).apply(500).balance(), 0);
    }

    #[test]
    fn test_withdraw_insufficient_is_noop() {
        let outcome = PendingOperation::withdraw(500).apply(400);
        assert_eq!(outcome, OperationOutcome::InsufficientFunds { balance: 400 });
        assert_eq!(outcome.balance(), 400);
    }

    #[test]
    fn test_deposit_and_overflow() {
        assert_eq!(PendingOperation::deposit(100).apply(800).balance(), 900);
        assert_eq!(
            PendingOperation::deposit(1).apply(u64::MAX),
            OperationOutcome::Overflow { balance: u64::MAX }
        );
    }

    #[test]
    fn test_demo_table() {
        assert_eq!(PendingOperation::demo_for(NodeId::new(1)), None);
        assert_eq!(
            PendingOperation::demo_for(NodeId::new(2)),
            Some(PendingOperation::withdraw(200))
        );
        assert_eq!(
            PendingOperation::demo_for(NodeId::new(3)),
            Some(PendingOperation::deposit(100))
        );
        assert_eq!(
            PendingOperation::demo_for(NodeId::new(4)),
            Some(PendingOperation::withdraw(500))
        );
        assert_eq!(PendingOperation::demo_for(NodeId::new(5)), None);
    }

    #[test]
    fn test_operation_choice_parse() {
        assert_eq!("auto".parse::<OperationChoice>(), Ok(OperationChoice::Auto));
        assert_eq!("NONE".parse::<OperationChoice>(), Ok(OperationChoice::None));
        assert_eq!(
            "Deposit:75".parse::<OperationChoice>(),
            Ok(OperationChoice::Explicit(PendingOperation::deposit(75)))
        );
        assert!("withdraw:0".parse::<OperationChoice>().is_err());
        assert!("withdraw".parse::<OperationChoice>().is_err());
        assert!("transfer:10".parse::<OperationChoice>().is_err());
    }

    #[test]
    fn test_operation_choice_resolve() {
        let explicit = OperationChoice::Explicit(PendingOperation::deposit(5));
        assert_eq!(explicit.resolve(NodeId::new(2)), Some(PendingOperation::deposit(5)));
        assert_eq!(OperationChoice::None.resolve(NodeId::new(2)), None);
        assert_eq!(
            OperationChoice::Auto.resolve(NodeId::new(2)),
            Some(PendingOperation::withdraw(200))
        );
    }
}
