//! Token-ring mutual exclusion over a fixed ring of peer processes.
//!
//! Each node guards a shared account balance that only travels inside the
//! circulating token. The authority node mints the token, regenerates it on
//! loss, and stops the ring once its token completes a circuit.
pub mod cli;
pub mod error;
pub mod node;
pub mod operation;
pub mod settings;
pub mod token;
pub mod transport;
