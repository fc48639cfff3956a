//! Node state reported to operators and tests
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::operation::PendingOperation;
use crate::transport::{FrozenReceiverStats, FrozenSenderStats};

/// Fail-stop tag; a crashed node never leaves this state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Liveness {
    Active,
    Crashed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    AwaitingToken,
    ProcessingToken,
    Forwarding,
    Stopped,
}

/// Snapshot of the protocol engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolStatus {
    pub node_id: NodeId,
    pub is_authority: bool,
    pub liveness: Liveness,
    pub phase: Phase,
    pub pending_operation: Option<PendingOperation>,
    pub operations_executed: u32,
    /// Balance of the last token this node held
    pub last_balance: Option<u64>,
    pub last_token_at: Option<DateTime<Utc>>,
    pub ring_ready: bool,
    pub token_in_transit: bool,
    pub tokens_handled: u64,
    pub records_dropped: u64,
    pub regenerations: u64,
}

/// Snapshot published by the node controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub protocol: ProtocolStatus,
    pub received: FrozenReceiverStats,
    pub sent: FrozenSenderStats,
}

/// How a node's run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeOutcome {
    Stopped { final_balance: u64 },
}
