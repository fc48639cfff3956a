use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

pub mod controller;
pub mod engine;
pub mod messages;
pub mod monitor;
pub mod node_id;

use crate::error::Result;
use crate::node_error;
use crate::settings;
use crate::transport::{TcpTokenReceiver, TcpTokenSender, TokenSender};
pub use controller::RingController;
pub use engine::{Action, ProtocolEngine};
pub use messages::{Liveness, NodeOutcome, NodeStatus, Phase, ProtocolStatus};
pub use node_id::{validate_node_id, NodeId};

const INBOX_CAPACITY: usize = 64;

/// A ring node with its listener bound but not yet running.
pub struct RingNode {
    settings: settings::Settings,
    receiver: TcpTokenReceiver,
    sender: Arc<dyn TokenSender>,
}

impl RingNode {
    pub async fn bind(settings: settings::Settings) -> Result<Self> {
        settings.validate()?;
        let transport_config = settings.transport_config();
        let receiver = TcpTokenReceiver::bind(&transport_config).await?;
        info!(
            "[Node<{}>] Listening on {}",
            settings.node_id, receiver.local_addr
        );
        let sender: Arc<dyn TokenSender> = Arc::new(TcpTokenSender::new(&transport_config));
        Ok(Self {
            settings,
            receiver,
            sender,
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.settings.node_id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.receiver.local_addr
    }

    /// Point the node at its successor once that address is known.
    pub fn set_successor(&mut self, successor: SocketAddr) {
        self.settings.successor = successor;
    }

    /// Start the receiver and controller tasks.
    pub fn spawn(self) -> NodeHandle {
        let node_id = self.settings.node_id;
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let receiver_task = self.receiver.start(inbox_tx);
        let (controller, status_rx) =
            RingController::new(self.settings, self.sender, self.receiver.shared_stats());
        let controller_task = tokio::spawn(controller.run(inbox_rx));
        NodeHandle {
            node_id,
            status_rx,
            controller_task,
            receiver_task,
        }
    }

    /// Run until the node stops.
    pub async fn run(self) -> Result<NodeOutcome> {
        self.spawn().wait().await
    }
}

/// A running node.
pub struct NodeHandle {
    node_id: NodeId,
    status_rx: watch::Receiver<NodeStatus>,
    controller_task: JoinHandle<Result<NodeOutcome>>,
    receiver_task: JoinHandle<()>,
}

impl NodeHandle {
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Latest published status
    pub fn status(&self) -> NodeStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch status updates independently of the handle
    pub fn subscribe(&self) -> watch::Receiver<NodeStatus> {
        self.status_rx.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.controller_task.is_finished()
    }

    /// Wait for the controller to stop, then close the listener.
    pub async fn wait(self) -> Result<NodeOutcome> {
        let result = self.controller_task.await;
        self.receiver_task.abort();
        result.map_err(|e| node_error!("[Node<{}>] Controller task failed: {}", self.node_id, e))?
    }

    /// Kill the node, as an operator would kill the process.
    pub fn abort(&self) {
        self.controller_task.abort();
        self.receiver_task.abort();
    }
}
