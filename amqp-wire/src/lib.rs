//! Wire-level vocabulary for AMQP 1.0: performatives, SASL frames, the
//! primitive binary codec, and [`engine`], a small synchronous protocol
//! engine (Connection/Transport/Session/Link/Collector) that plays the
//! role of the embedded AMQP engine a connection-level bridge wraps.

use std::array::TryFromSliceError;
use std::{fmt, io, str};

use err_derive::Error;

mod de;
mod ser;

pub mod engine;
pub mod frame;
pub mod performative;
pub mod sasl;

pub use performative::{
    Accepted, AmqpError, Any, ApplicationProperties, Attach, Begin, Body, Close, Data,
    DeliveryState, Detach, Disposition, ExpiryPolicy, Flow, Header, Message, Modified, Open,
    Outcome, Performative, Properties, Received, Rejected, Released, ReceiverSettleMode, Role,
    SenderSettleMode, Source, Target, TerminusDurability,
};

/// Marker trait implemented by `#[amqp]`-derived composite types; carries
/// the descriptor (a symbolic name, a numeric code, or neither) that the
/// codec writes immediately ahead of a composite's field list.
pub trait Described {
    const NAME: Option<&'static [u8]>;
    const CODE: Option<u64>;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(display = "invalid data")]
    InvalidData,
    #[error(display = "syntax")]
    Syntax,
    #[error(display = "unexpected end of input")]
    UnexpectedEnd,
    #[error(display = "I/O error: {}", _0)]
    Io(#[source] io::Error),
    #[error(display = "deserialization failed: {}", _0)]
    Deserialization(String),
    #[error(display = "serialization failed: {}", _0)]
    Serialization(String),
    #[error(display = "buffer not empty after deserialization")]
    TrailingCharacters,
}

impl serde::de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Error::Deserialization(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Error::Serialization(msg.to_string())
    }
}

impl From<TryFromSliceError> for Error {
    fn from(e: TryFromSliceError) -> Self {
        Error::Deserialization(e.to_string())
    }
}

pub const MIN_MAX_FRAME_SIZE: usize = 512;
pub const AMQP_PROTO_HEADER: &[u8] = b"AMQP\x00\x01\x00\x00";
pub const SASL_PROTO_HEADER: &[u8] = b"AMQP\x03\x01\x00\x00";
