//! SASL layer configuration and the small handshake driven inside
//! [`super::transport::Transport`] before the AMQP frame layer starts
//! (spec §4.6/§4.7): `PLAIN` when a username is configured, `ANONYMOUS`
//! otherwise.

use serde_bytes::Bytes;

use crate::sasl;

#[derive(Debug, Clone)]
pub enum SaslConfig {
    Plain { username: String, password: String },
    Anonymous,
}

impl SaslConfig {
    fn mechanism(&self) -> sasl::Mechanism {
        match self {
            SaslConfig::Plain { .. } => sasl::Mechanism::Plain,
            SaslConfig::Anonymous => sasl::Mechanism::Anonymous,
        }
    }

    fn initial_response(&self) -> Vec<u8> {
        match self {
            SaslConfig::Plain { username, password } => {
                let mut buf = vec![0u8];
                buf.extend_from_slice(username.as_bytes());
                buf.push(0);
                buf.extend_from_slice(password.as_bytes());
                buf
            }
            SaslConfig::Anonymous => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SaslPhase {
    AwaitingHeader,
    AwaitingMechanisms,
    AwaitingInit,
    AwaitingOutcome,
    Done,
}

#[derive(Debug)]
pub(crate) struct SaslLayer {
    config: SaslConfig,
    server_mode: bool,
    phase: SaslPhase,
}

impl SaslLayer {
    pub(crate) fn new(config: SaslConfig, server_mode: bool) -> Self {
        SaslLayer {
            config,
            server_mode,
            phase: SaslPhase::AwaitingHeader,
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.phase == SaslPhase::Done
    }

    /// Called once both sides have exchanged the SASL protocol header.
    /// Returns the server's `sasl-mechanisms` frame to emit, if any.
    pub(crate) fn header_exchanged(&mut self) -> Option<sasl::Frame<'static>> {
        if self.server_mode {
            self.phase = SaslPhase::AwaitingInit;
            Some(sasl::Frame::Mechanisms(sasl::Mechanisms {
                sasl_server_mechanisms: vec![self.config.mechanism()],
            }))
        } else {
            self.phase = SaslPhase::AwaitingMechanisms;
            None
        }
    }

    /// Feeds one decoded SASL frame; returns a response frame to emit, if
    /// any, and whether negotiation just completed.
    pub(crate) fn on_frame(&mut self, frame: &sasl::Frame<'_>) -> Option<sasl::Frame<'static>> {
        match (self.phase, frame) {
            (SaslPhase::AwaitingMechanisms, sasl::Frame::Mechanisms(_)) => {
                self.phase = SaslPhase::AwaitingOutcome;
                let response = self.config.initial_response();
                Some(sasl::Frame::Init(sasl::Init {
                    mechanism: self.config.mechanism(),
                    initial_response: Some(leak_bytes(response)),
                    hostname: None,
                }))
            }
            (SaslPhase::AwaitingInit, sasl::Frame::Init(_)) => {
                // Authentication policy is a higher layer's concern (§4.7);
                // the adapter always signals success here.
                self.phase = SaslPhase::Done;
                Some(sasl::Frame::Outcome(sasl::Outcome {
                    code: sasl::Code::Ok,
                    additional_data: None,
                }))
            }
            (SaslPhase::AwaitingOutcome, sasl::Frame::Outcome(outcome)) => {
                if outcome.code == sasl::Code::Ok {
                    self.phase = SaslPhase::Done;
                }
                None
            }
            _ => None,
        }
    }
}

/// `sasl::Init` borrows its initial response; the handshake only needs it
/// for the lifetime of one serialization call, so a leaked static slice
/// (freed never, sized at a few dozen bytes, one per connection attempt)
/// is simpler than threading an explicit arena through the transport.
fn leak_bytes(buf: Vec<u8>) -> &'static Bytes {
    Bytes::new(Box::leak(buf.into_boxed_slice()))
}
