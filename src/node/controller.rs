use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::engine::{Action, ProtocolEngine};
use super::messages::{NodeOutcome, NodeStatus};
use crate::error::Result;
use crate::node_error;
use crate::settings::Settings;
use crate::token::Token;
use crate::transport::{InboundToken, ReceiverStats, TokenSender};

/// Delivery attempts for a relayed stop token before the node stops anyway.
/// The last hop of the stop flood targets the authority, which has already exited.
/// The authority itself retries its STOP without limit.
pub const STOP_FORWARD_ATTEMPTS: u32 = 3;

/// Single owner of a node's protocol state.
///
/// Inbound records, monitor ticks and the bootstrap timer are funneled
/// through one select loop, so the liveness timestamp and in-transit flag
/// are never touched concurrently.
pub struct RingController {
    settings: Settings,
    engine: ProtocolEngine,
    sender: Arc<dyn TokenSender>,
    receiver_stats: Arc<ReceiverStats>,
    status_tx: watch::Sender<NodeStatus>,
}

impl RingController {
    pub fn new(
        settings: Settings,
        sender: Arc<dyn TokenSender>,
        receiver_stats: Arc<ReceiverStats>,
    ) -> (Self, watch::Receiver<NodeStatus>) {
        let engine = ProtocolEngine::new(&settings, Instant::now());
        let initial = NodeStatus {
            protocol: engine.status(),
            received: receiver_stats.freeze(),
            sent: sender.get_stats(),
        };
        let (status_tx, status_rx) = watch::channel(initial);
        (
            Self {
                settings,
                engine,
                sender,
                receiver_stats,
                status_tx,
            },
            status_rx,
        )
    }

    /// Drive the node until it stops. A crashed node never returns.
    pub async fn run(mut self, mut inbox: mpsc::Receiver<InboundToken>) -> Result<NodeOutcome> {
        let node_id = self.engine.node_id();
        let monitor = self.settings.monitor_settings();
        info!(
            "[Node<{}>] Starting controller: successor={} authority={} crashed={} pending={:?}",
            node_id,
            self.settings.successor,
            self.engine.is_authority(),
            self.engine.is_crashed(),
            self.engine.pending()
        );

        let mut monitor_timer = time::interval(monitor.monitor_interval);
        monitor_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let settle = time::sleep(monitor.settle_delay);
        tokio::pin!(settle);
        let mut bootstrap_pending = self.engine.is_authority() && !self.engine.is_crashed();

        loop {
            tokio::select! {
                inbound = inbox.recv() => {
                    let Some(inbound) = inbound else {
                        return Err(node_error!("[Node<{}>] Inbox closed", node_id));
                    };
                    if let Some(outcome) = self.handle_inbound(inbound).await? {
                        self.publish();
                        return Ok(outcome);
                    }
                }
                _ = &mut settle, if bootstrap_pending => {
                    bootstrap_pending = false;
                    if let Some(token) = self.engine.bootstrap(Instant::now()) {
                        self.forward(token).await?;
                    }
                }
                _ = monitor_timer.tick() => {
                    let now = Instant::now();
                    if let Some(token) = self.engine.on_monitor_tick(now, monitor.token_timeout) {
                        self.forward(token).await?;
                    }
                }
            }
            self.publish();
        }
    }

    async fn handle_inbound(&mut self, inbound: InboundToken) -> Result<Option<NodeOutcome>> {
        let node_id = self.engine.node_id();
        match self.engine.on_record(&inbound.line, Instant::now()) {
            Err(e) => {
                warn!(
                    "[Node<{}>] Dropped record {:?} from {}: {}",
                    node_id, inbound.line, inbound.peer_addr, e
                );
                Ok(None)
            }
            Ok(Action::Ignore) => {
                debug!(
                    "[Node<{}>] Discarded {:?} from {}",
                    node_id, inbound.line, inbound.peer_addr
                );
                Ok(None)
            }
            Ok(Action::Forward(token)) => {
                self.forward(token).await?;
                Ok(None)
            }
            Ok(Action::Terminate(token)) => {
                self.forward(token).await?;
                info!("[Node<{}>] Stopped with balance {}", node_id, token.balance);
                Ok(Some(NodeOutcome::Stopped {
                    final_balance: token.balance,
                }))
            }
        }
    }

    /// Send to the successor, retrying with a fixed backoff.
    ///
    /// Normal tokens are retried until delivered: the ring has no other path.
    /// So is the STOP the authority starts. Relayed stop tokens get a bounded
    /// number of attempts.
    async fn forward(&mut self, token: Token) -> Result<()> {
        let node_id = self.engine.node_id();
        let successor = self.settings.successor;
        let bounded = token.stop && !self.engine.is_authority();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.sender.send(successor, &token).await {
                Ok(()) => {
                    info!("[Node<{}>] Forwarded {} to {}", node_id, token, successor);
                    self.engine.forwarded();
                    return Ok(());
                }
                Err(e) if bounded && attempt >= STOP_FORWARD_ATTEMPTS => {
                    warn!(
                        "[Node<{}>] Could not deliver {} after {} attempts ({}), stopping anyway",
                        node_id, token, attempt, e
                    );
                    self.engine.forwarded();
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "[Node<{}>] Successor not available ({}), retrying in {}ms",
                        node_id,
                        e,
                        self.settings.retry_backoff.as_millis()
                    );
                    self.publish();
                    time::sleep(self.settings.retry_backoff).await;
                }
            }
        }
    }

    fn publish(&self) {
        let status = NodeStatus {
            protocol: self.engine.status(),
            received: self.receiver_stats.freeze(),
            sent: self.sender.get_stats(),
        };
        // Nobody watching is fine
        let _ = self.status_tx.send(status);
    }
}
