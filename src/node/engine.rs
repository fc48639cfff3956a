//! Per-node token ring state machine.
//!
//! The engine is synchronous and owns all protocol state of one node. It
//! decides what to do with each delivered record and each monitor tick; the
//! controller performs the resulting sends and reports back through
//! [`ProtocolEngine::forwarded`].
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::messages::{Liveness, Phase, ProtocolStatus};
use super::monitor::TokenWatch;
use super::NodeId;
use crate::error::Result;
use crate::operation::{OperationOutcome, PendingOperation};
use crate::settings::Settings;
use crate::token::Token;

/// What the controller must do after the engine handled an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Nothing to send
    Ignore,
    /// Send to the successor and keep running
    Forward(Token),
    /// Send the stop-flagged token to the successor, then stop
    Terminate(Token),
}

#[derive(Debug)]
pub struct ProtocolEngine {
    node_id: NodeId,
    authority: NodeId,
    liveness: Liveness,
    phase: Phase,
    pending: Option<PendingOperation>,
    baseline_balance: u64,
    watch: TokenWatch,
    stop_after_forward: bool,

    // Reporting only
    last_balance: Option<u64>,
    last_token_at: Option<chrono::DateTime<Utc>>,
    operations_executed: u32,
    tokens_handled: u64,
    records_dropped: u64,
    regenerations: u64,
}

impl ProtocolEngine {
    pub fn new(settings: &Settings, now: Instant) -> Self {
        let liveness = if settings.crashed {
            Liveness::Crashed
        } else {
            Liveness::Active
        };
        Self {
            node_id: settings.node_id,
            authority: settings.authority,
            liveness,
            phase: Phase::AwaitingToken,
            pending: settings.pending_operation(),
            baseline_balance: settings.initial_balance,
            watch: TokenWatch::new(now),
            stop_after_forward: false,
            last_balance: None,
            last_token_at: None,
            operations_executed: 0,
            tokens_handled: 0,
            records_dropped: 0,
            regenerations: 0,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn is_authority(&self) -> bool {
        self.node_id == self.authority
    }

    pub fn is_crashed(&self) -> bool {
        self.liveness == Liveness::Crashed
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending(&self) -> Option<PendingOperation> {
        self.pending
    }

    pub fn watch(&self) -> &TokenWatch {
        &self.watch
    }

    #[cfg(test)]
    pub(crate) fn watch_mut(&mut self) -> &mut TokenWatch {
        &mut self.watch
    }

    /// Handle one raw record from the predecessor.
    ///
    /// Malformed records are dropped: the error is returned for logging and
    /// the node stays in `AwaitingToken` without forwarding anything.
    pub fn on_record(&mut self, line: &str, now: Instant) -> Result<Action> {
        if self.is_crashed() || self.is_stopped() {
            return Ok(Action::Ignore);
        }
        match line.parse::<Token>() {
            Ok(token) => Ok(self.on_token(token, now)),
            Err(e) => {
                self.records_dropped += 1;
                Err(e.into())
            }
        }
    }

    /// Handle one parsed token.
    pub fn on_token(&mut self, token: Token, now: Instant) -> Action {
        if self.is_crashed() || self.is_stopped() {
            return Action::Ignore;
        }

        self.phase = Phase::ProcessingToken;
        self.tokens_handled += 1;
        self.watch.token_seen(now);
        self.last_balance = Some(token.balance);
        self.last_token_at = Some(Utc::now());

        if self.is_authority() && token.origin == self.node_id {
            self.watch.token_returned();
        }

        // A token minted here came all the way around
        if self.is_authority() && token.origin == self.node_id && !token.stop {
            info!(
                "[Node<{}>] Token ring completed with balance {}, sending STOP",
                self.node_id, token.balance
            );
            return self.begin_forward(token.with_stop(), true);
        }

        if token.stop {
            info!(
                "[Node<{}>] Received STOP (origin={} balance={}), terminating",
                self.node_id, token.origin, token.balance
            );
            return self.begin_forward(token, true);
        }

        info!(
            "[Node<{}>] Received TOKEN from origin={} balance={}",
            self.node_id, token.origin, token.balance
        );

        let token = match self.pending.take() {
            Some(operation) => token.with_balance(self.execute(operation, token.balance)),
            None => token,
        };
        self.begin_forward(token, false)
    }

    fn execute(&mut self, operation: PendingOperation, balance: u64) -> u64 {
        info!("[Node<{}>] Starting transaction: {}", self.node_id, operation);
        self.operations_executed += 1;
        let outcome = operation.apply(balance);
        match outcome {
            OperationOutcome::Applied { before, after } => info!(
                "[Node<{}>] Transaction done: {} -> {}",
                self.node_id, before, after
            ),
            OperationOutcome::InsufficientFunds { balance } => warn!(
                "[Node<{}>] Insufficient funds for {} (balance {}), skipped",
                self.node_id, operation, balance
            ),
            OperationOutcome::Overflow { balance } => warn!(
                "[Node<{}>] Deposit {} would overflow balance {}, skipped",
                self.node_id, operation, balance
            ),
        }
        self.last_balance = Some(outcome.balance());
        outcome.balance()
    }

    fn begin_forward(&mut self, token: Token, stop: bool) -> Action {
        self.phase = Phase::Forwarding;
        self.stop_after_forward = stop;
        if stop {
            Action::Terminate(token)
        } else {
            Action::Forward(token)
        }
    }

    /// The authority mints the first token once the ring has had time to bind.
    pub fn bootstrap(&mut self, now: Instant) -> Option<Token> {
        if !self.is_authority() || self.is_crashed() || self.phase != Phase::AwaitingToken {
            return None;
        }
        self.watch.mark_ready();
        self.watch.token_seen(now);
        let token = Token::mint(self.node_id, self.baseline_balance);
        info!("[Node<{}>] Created initial {}", self.node_id, token);
        self.begin_forward(token, false);
        Some(token)
    }

    /// Periodic loss check; returns a replacement token when one is due.
    pub fn on_monitor_tick(&mut self, now: Instant, token_timeout: Duration) -> Option<Token> {
        if !self.is_authority() || self.is_crashed() || self.phase != Phase::AwaitingToken {
            return None;
        }
        if !self.watch.should_regenerate(now, token_timeout) {
            if self.watch.is_ready() && self.watch.in_transit() {
                debug!(
                    "[Node<{}>] Token in transit for {}ms, not regenerating",
                    self.node_id,
                    self.watch.silence(now).as_millis()
                );
            }
            return None;
        }

        let token = Token::mint(self.node_id, self.baseline_balance);
        warn!(
            "[Node<{}>] No token for {}ms, regenerating {}",
            self.node_id,
            self.watch.silence(now).as_millis(),
            token
        );
        self.watch.token_seen(now);
        self.regenerations += 1;
        self.begin_forward(token, false);
        Some(token)
    }

    /// The token handed out by the last action has left this node.
    pub fn forwarded(&mut self) {
        if self.stop_after_forward {
            self.phase = Phase::Stopped;
            return;
        }
        if self.is_authority() {
            self.watch.token_sent();
        }
        self.phase = Phase::AwaitingToken;
    }

    pub fn status(&self) -> ProtocolStatus {
        ProtocolStatus {
            node_id: self.node_id,
            is_authority: self.is_authority(),
            liveness: self.liveness,
            phase: self.phase,
            pending_operation: self.pending,
            operations_executed: self.operations_executed,
            last_balance: self.last_balance,
            last_token_at: self.last_token_at,
            ring_ready: self.watch.is_ready(),
            token_in_transit: self.watch.in_transit(),
            tokens_handled: self.tokens_handled,
            records_dropped: self.records_dropped,
            regenerations: self.regenerations,
        }
    }
}
