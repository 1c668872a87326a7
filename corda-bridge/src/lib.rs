//! Per-connection AMQP 1.0 connection state machine for a Corda-style
//! distributed-ledger messaging layer: translates between the engine's
//! event stream, an application-facing per-address message queue, and a
//! byte-oriented socket transport. See [`state_machine::ConnectionStateMachine`].

mod adapter;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod message;
mod queue;
mod registry;
mod session_state;
pub mod state_machine;

pub use channel::SocketChannel;
pub use config::Config;
pub use error::Error;
pub use message::{MessageStatus, ReceivedMessage, SendableMessage};
pub use session_state::SessionState;
pub use state_machine::{ConnectionParams, ConnectionStateMachine};
