//! Token link between a node and its ring successor
//!
//! Every token is delivered on its own TCP connection as a single text line.
//! Ordering holds per connection only; the ring never has more than one
//! record in flight per hop, so nothing relies on ordering across connections.

pub mod stats;
pub mod tcp_connection;
pub mod tcp_receiver;
pub mod traits;

pub use stats::{FrozenReceiverStats, FrozenSenderStats, ReceiverStats, SenderStats};
pub use tcp_connection::TcpTokenSender;
pub use tcp_receiver::{InboundToken, TcpTokenReceiver};
pub use traits::TokenSender;
