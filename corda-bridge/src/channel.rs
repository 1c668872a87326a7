//! The socket channel this bridge writes to (spec §6 downstream interface):
//! a non-blocking channel that accepts both raw outbound wire bytes and
//! fully decoded `ReceivedMessage`s, and whose endpoints are inspected to
//! populate `ReceivedMessage.remote_endpoint`/`local_endpoint`.
//!
//! The state machine holds this behind a trait object rather than the
//! engine-context weak reference the source uses (spec §5 "the state
//! machine holds only a weak reference, looked up via the engine's
//! context field") — an owned `Option<Box<dyn SocketChannel>>` field gives
//! the same lifecycle (attach once, drop on connection-final) without an
//! untyped context slot.

use crate::message::ReceivedMessage;

pub trait SocketChannel {
    /// Writes a chunk of outbound wire bytes produced by the transport.
    fn write_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Flushes any buffered output.
    fn flush(&mut self) -> std::io::Result<()>;

    /// Forwards a fully decoded inbound message upstream.
    fn deliver(&mut self, message: ReceivedMessage);

    /// This side's (host, port).
    fn local_endpoint(&self) -> (String, u16);

    /// The peer's (host, port).
    fn remote_endpoint(&self) -> (String, u16);

    /// Closes the underlying socket.
    fn close(&mut self);
}
