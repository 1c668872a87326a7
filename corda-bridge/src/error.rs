//! Bridge-level error kinds (spec §7). `StaleEvent` is deliberately not a
//! variant here: it is a no-op (logged and ignored in `drain_events`), not
//! an error that reaches a caller.

use err_derive::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(display = "failed to encode outbound message: {}", _0)]
    Encode(#[source] amqp_wire::Error),
    #[error(display = "transport I/O error: {}", _0)]
    TransportIo(#[source] amqp_wire::Error),
    #[error(display = "remote link error {}: {}", symbol, description)]
    RemoteLink { symbol: String, description: String },
}
