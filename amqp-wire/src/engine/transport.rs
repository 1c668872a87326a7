//! The byte-level pump: protocol header negotiation, SASL handshake, and
//! AMQP frame encode/decode, all driven synchronously by the methods the
//! connection state machine calls (§4.2, §4.6).
//!
//! Connection and transport are modeled as a single owned tree
//! (`Transport` owns its `Connection`) rather than the independently
//! addressable handles a C proton binding exposes — this bridge only
//! ever has exactly one transport bound to exactly one connection, so
//! the extra indirection buys nothing and an owned field is the more
//! idiomatic Rust shape.

use std::time::{Duration, Instant};

use crate::frame::{self, Frame, Protocol};
use crate::performative::{self, Performative, Role};
use crate::sasl;
use crate::Error as WireError;

use super::clock::{Clock, SystemClock};
use super::connection::Connection;
use super::event::{ErrorCondition, Event};
use super::sasl::SaslConfig;
use super::session::SessionLifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    SaslHeader,
    SaslNegotiating,
    AmqpHeader,
    Amqp,
}

pub struct Transport {
    connection: Connection,
    clock: Box<dyn Clock>,
    idle_timeout_ms: u32,
    max_frame_size: usize,
    #[allow(dead_code)]
    emit_flow_event_on_send: bool,
    sasl: super::sasl::SaslLayer,
    phase: Phase,
    input: Vec<u8>,
    output: Vec<u8>,
    head_closed: bool,
    tail_closed: bool,
    condition: Option<ErrorCondition>,
    sasl_header_sent: bool,
    amqp_header_sent: bool,
    open_sent: bool,
    begin_sent: bool,
    last_activity: Instant,
    /// AMQP performative frames queued while negotiation (SASL and the
    /// AMQP protocol header) is still in progress — `Attach`/`Transfer`/
    /// `Flow`/`Disposition` requested by the bridge before the transport
    /// reaches `Phase::Amqp`. Flushed, in order, right after `Open`/
    /// `Begin` the first time `drain_outgoing` observes `Phase::Amqp`.
    pending_frames: Vec<Vec<u8>>,
}

impl Transport {
    pub fn bind(connection: Connection, sasl_config: SaslConfig) -> Self {
        let server_mode = connection.server_mode;
        let clock: Box<dyn Clock> = Box::new(SystemClock);
        let last_activity = clock.now();
        Transport {
            connection,
            clock,
            idle_timeout_ms: 10_000,
            max_frame_size: 131_072,
            emit_flow_event_on_send: false,
            sasl: super::sasl::SaslLayer::new(sasl_config, server_mode),
            phase: Phase::SaslHeader,
            input: Vec::new(),
            output: Vec::new(),
            head_closed: false,
            tail_closed: false,
            condition: None,
            sasl_header_sent: false,
            amqp_header_sent: false,
            open_sent: false,
            begin_sent: false,
            last_activity,
            pending_frames: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.last_activity = clock.now();
        self.clock = clock;
        self
    }

    pub fn set_idle_timeout(&mut self, ms: u32) {
        self.idle_timeout_ms = ms;
    }

    pub fn set_max_frame_size(&mut self, bytes: usize) {
        self.max_frame_size = bytes;
    }

    pub fn set_emit_flow_event_on_send(&mut self, emit: bool) {
        self.emit_flow_event_on_send = emit;
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub fn condition(&self) -> Option<&ErrorCondition> {
        self.condition.as_ref()
    }

    pub fn set_condition(&mut self, symbol: impl Into<String>, description: impl Into<String>) {
        self.condition = Some(ErrorCondition::new(symbol, description));
    }

    /// The chunk size `transportProcessInput` should feed per call
    /// (spec §4.6: "chunks sized to the buffer's current remaining
    /// capacity").
    pub fn capacity(&self) -> usize {
        self.max_frame_size
    }

    pub fn is_closed(&self) -> bool {
        self.head_closed && self.tail_closed
    }

    pub fn close_tail(&mut self) {
        if !self.tail_closed {
            self.tail_closed = true;
            if self.connection.session_opened() {
                self.connection.finalize_session();
            }
            self.connection
                .push_event(Event::TransportTailClosed(self.connection.id()));
        }
    }

    pub fn close_head(&mut self) {
        if !self.head_closed {
            self.head_closed = true;
            self.connection
                .push_event(Event::TransportHeadClosed(self.connection.id()));
        }
        if self.head_closed && self.tail_closed {
            let id = self.connection.id();
            self.connection.push_event(Event::ConnectionFinal(id));
            self.connection.push_event(Event::TransportClosed(id));
        }
    }

    /// Runs the internal state machine forward and returns the number of
    /// bytes now ready in the output buffer, or a negative sentinel once
    /// the transport is fully closed — mirroring `pn_transport_pending`.
    pub fn pending(&mut self) -> isize {
        self.check_idle_timeout();
        self.drain_outgoing();
        if self.is_closed() && self.output.is_empty() {
            -1
        } else {
            self.output.len() as isize
        }
    }

    pub fn output_bytes(&self) -> &[u8] {
        &self.output
    }

    /// Consumes `n` bytes from the front of the output buffer; used both
    /// for ordinary output consumption and for the `pop(max(0, pending()))`
    /// discard idiom in the error paths of §4.6.
    pub fn outputted(&mut self, n: usize) {
        let n = n.min(self.output.len());
        self.output.drain(..n);
    }

    pub fn pop(&mut self, n: usize) {
        self.outputted(n);
    }

    /// Forces a generic transport-progress event, used by
    /// `processTransport()` to poke frame generation after external
    /// state changes with no new bytes in either direction.
    pub fn poke(&mut self) {
        self.drain_outgoing();
        let id = self.connection.id();
        self.connection.push_event(Event::Transport(id));
    }

    pub fn process_input(&mut self, bytes: &[u8]) -> Result<usize, WireError> {
        self.last_activity = self.clock.now();
        self.input.extend_from_slice(bytes);
        let consumed = bytes.len();

        while let Some(len) = frame::frame_length(&self.input) {
            let framed: Vec<u8> = self.input.drain(..len).collect();
            let body = if framed.len() > 4 { &framed[4..] } else { &framed[..] };
            let decoded = if framed.len() >= 4 && &framed[..4] == b"AMQP" {
                Frame::decode(&framed)
            } else {
                Frame::decode(body)
            }?;
            self.handle_frame(decoded)?;
        }

        self.drain_outgoing();
        Ok(consumed)
    }

    fn handle_frame(&mut self, frame: Frame<'_>) -> Result<(), WireError> {
        match (self.phase, frame) {
            (Phase::SaslHeader, Frame::Header(Protocol::Sasl)) => {
                if let Some(mechanisms) = self.sasl.header_exchanged() {
                    self.queue(&Frame::Sasl(mechanisms))?;
                }
                self.phase = Phase::SaslNegotiating;
            }
            (Phase::SaslNegotiating, Frame::Sasl(f)) => {
                if let Some(response) = self.sasl.on_frame(&f) {
                    self.queue(&Frame::Sasl(response))?;
                }
                if self.sasl.is_done() {
                    self.phase = Phase::AmqpHeader;
                    // Emitted the moment negotiation completes rather than
                    // left for `drain_outgoing` to notice: a single
                    // `process_input` call can carry the SASL outcome and
                    // the peer's AMQP protocol header back to back, which
                    // advances `phase` straight past `AmqpHeader` to
                    // `Amqp` before `drain_outgoing` ever runs, and this
                    // transport would never send its own header.
                    self.send_amqp_header();
                }
            }
            (Phase::AmqpHeader, Frame::Header(Protocol::Amqp)) => {
                self.phase = Phase::Amqp;
            }
            (Phase::Amqp, Frame::Amqp(f)) => self.handle_amqp_frame(f),
            _ => return Err(WireError::InvalidData),
        }
        Ok(())
    }

    fn handle_amqp_frame(&mut self, frame: performative::Frame<'_>) {
        let id = self.connection.id();
        let payload = frame.payload;
        match frame.performative {
            Performative::Open(_) => {
                self.connection.remote_opened = true;
                // Symmetric auto-open: a server that hasn't opened yet
                // echoes the remote's open, mirroring how this transport
                // already auto-echoes `begin` for the one logical session.
                if self.connection.server_mode {
                    self.connection.open();
                }
            }
            Performative::Begin(_) => {
                let session = self.connection.session_mut();
                session.state = match session.state {
                    SessionLifecycle::BeginSent => SessionLifecycle::Mapped,
                    _ => SessionLifecycle::BeginRcvd,
                };
            }
            Performative::Attach(attach) => self.handle_attach(attach),
            Performative::Flow(flow) => self.handle_flow(flow),
            Performative::Transfer(transfer) => {
                self.handle_transfer(transfer, payload);
            }
            Performative::Disposition(disposition) => self.handle_disposition(disposition),
            Performative::Detach(detach) => self.handle_detach(detach),
            Performative::Close(close) => {
                self.connection.push_event(Event::ConnectionUnbound(id));
                if let Some(err) = close.error {
                    let condition = ErrorCondition {
                        symbol: err.condition.to_string(),
                        description: err.description.map(|d| d.to_string()),
                    };
                    self.connection
                        .push_event(Event::TransportError(id, Some(condition)));
                }
            }
        }
    }

    fn handle_attach(&mut self, attach: performative::Attach<'_>) {
        let id = self.connection.id();
        let role = attach.role;
        let handle = attach.handle;
        // The wire layer has no distinct `coordinator` terminus type; a
        // targetless attach is the closest approximation available and
        // errs toward treating ambiguous attaches as coordinator links
        // (whose handler is a no-op besides logging either way).
        let is_coordinator = attach.target.is_none();
        match role {
            Role::Sender => {
                // Remote is sending to us: we are the receiver of this link.
                let name = attach.name.to_string();
                let target_address = attach.target.as_ref().and_then(|t| t.address.as_ref()).map(|c| c.to_string());
                let session = self.connection.session_mut();
                let receiver = session.create_receiver(handle, name);
                receiver.remote_attached = true;
                receiver.target = target_address
                    .map(|addr| performative::Target { address: Some(std::borrow::Cow::Owned(addr)), ..Default::default() });
                let window = receiver.credit_window;
                self.connection.push_event(Event::LinkRemoteOpen {
                    connection: id,
                    handle,
                    role: Role::Receiver,
                    is_coordinator,
                });
                // The engine auto-opens receivers locally in response to
                // a remote attach (spec §4.4: "receivers are not created
                // by the state machine; they appear when the remote opens
                // a link ... tracked keyed by their target address on
                // link-local-open"), then grants its initial credit window.
                if let Some(r) = self.connection.session_mut().receiver_mut(handle) {
                    r.state = super::link::LinkState::Attached;
                }
                self.connection
                    .push_event(Event::LinkLocalOpen { connection: id, handle, role: Role::Receiver });
                let _ = self.send_flow(handle, window, 0);
            }
            Role::Receiver => {
                if let Some(sender) = self.connection.session_mut().sender_mut(handle) {
                    sender.remote_attached = true;
                }
                self.connection.push_event(Event::LinkRemoteOpen {
                    connection: id,
                    handle,
                    role: Role::Sender,
                    is_coordinator,
                });
            }
        }
    }

    fn handle_flow(&mut self, flow: performative::Flow<'_>) {
        let id = self.connection.id();
        if let Some(handle) = flow.handle {
            if let Some(sender) = self.connection.session_mut().sender_mut(handle) {
                sender.credit = flow.link_credit.unwrap_or(0);
                self.connection
                    .push_event(Event::LinkFlow { connection: id, handle });
            }
        }
    }

    fn handle_transfer(&mut self, transfer: performative::Transfer, payload: Option<&[u8]>) {
        let id = self.connection.id();
        let handle = transfer.handle;
        let tag = transfer
            .delivery_tag
            .map(|t| t.into_vec())
            .unwrap_or_default();
        let more = transfer.more.unwrap_or(false);
        let remote_delivery_id = transfer.delivery_id;

        let mut body = Vec::new();
        if let Some(raw) = payload {
            if let Ok(message) = performative::Message::from_bytes(raw) {
                if let Some(performative::Body::Data(d)) = message.body {
                    body.extend_from_slice(d.0);
                }
            }
        }

        if let Some(receiver) = self.connection.session_mut().receiver_mut(handle) {
            let delivery = receiver.receive(tag, &body, more);
            // Stashed so the bridge's `disposition` reply (§4.6 delivery
            // handler, receiver side) can settle by the id the remote
            // actually used, not a locally-assigned one.
            if let Some(d) = receiver.delivery_mut(delivery) {
                d.delivery_id = remote_delivery_id;
            }
            self.connection.push_event(Event::Delivery {
                connection: id,
                handle,
                role: Role::Receiver,
                delivery,
            });
        }
    }

    fn handle_disposition(&mut self, disposition: performative::Disposition) {
        let id = self.connection.id();
        let first = disposition.first;
        let last = disposition.last.unwrap_or(first);
        // A sender-role disposition settles deliveries *we* sent, in the
        // `first..=last` session-wide delivery-id range; every sender's
        // outstanding deliveries are scanned since the range is not
        // scoped to one link.
        let handles: Vec<u32> = self
            .connection
            .session()
            .senders()
            .map(|s| s.handle)
            .collect();
        for handle in handles {
            let settled_delivery = {
                let session = self.connection.session_mut();
                let sender = match session.sender_mut(handle) {
                    Some(s) => s,
                    None => continue,
                };
                sender.remote_settlement_by_id(
                    first,
                    last,
                    disposition.settled.unwrap_or(false),
                    disposition.state.clone(),
                )
            };
            if let Some(delivery) = settled_delivery {
                self.connection.push_event(Event::Delivery {
                    connection: id,
                    handle,
                    role: Role::Sender,
                    delivery,
                });
            }
        }
    }

    fn handle_detach(&mut self, detach: performative::Detach<'_>) {
        let id = self.connection.id();
        let handle = detach.handle;
        let condition = detach.error.map(|e| ErrorCondition {
            symbol: e.condition.to_string(),
            description: e.description.map(|d| d.to_string()),
        });
        let is_sender = self.connection.session().sender(handle).is_some();
        let role = if is_sender { Role::Sender } else { Role::Receiver };

        let already_closing = if is_sender {
            self.connection.session().sender(handle).map(|s| s.state) == Some(super::link::LinkState::DetachSent)
        } else {
            self.connection.session().receiver(handle).map(|r| r.state) == Some(super::link::LinkState::DetachSent)
        };

        if already_closing && condition.is_none() {
            if is_sender {
                self.connection.session_mut().remove_sender(handle);
            } else {
                self.connection.session_mut().remove_receiver(handle);
            }
            self.connection
                .push_event(Event::LinkFinal { connection: id, handle, role });
        } else {
            self.connection.push_event(Event::LinkRemoteClose {
                connection: id,
                handle,
                role,
                condition,
            });
        }
    }

    fn queue(&mut self, frame: &Frame<'_>) -> Result<(), WireError> {
        let bytes = frame.to_vec()?;
        self.output.extend_from_slice(&bytes);
        Ok(())
    }

    /// Emits the local AMQP protocol header exactly once. Called from
    /// `handle_frame` the instant SASL negotiation completes, rather than
    /// waiting for `drain_outgoing` to next observe `Phase::AmqpHeader` —
    /// see the comment at that call site.
    fn send_amqp_header(&mut self) {
        if !self.amqp_header_sent {
            self.output.extend_from_slice(crate::AMQP_PROTO_HEADER);
            self.amqp_header_sent = true;
        }
    }

    fn drain_outgoing(&mut self) {
        if self.phase == Phase::SaslHeader && !self.sasl_header_sent {
            self.output.extend_from_slice(crate::SASL_PROTO_HEADER);
            self.sasl_header_sent = true;
        }

        if self.phase != Phase::Amqp {
            return;
        }

        if self.connection.state == super::connection::ConnectionState::Opened && !self.open_sent {
            let container_id = self.connection.container_id.clone();
            let open = performative::Open {
                container_id: &container_id,
                max_frame_size: Some(self.max_frame_size as u32),
                idle_timeout: Some(self.idle_timeout_ms),
                ..Default::default()
            };
            let _ = self.send_performative(Performative::Open(open), None);
            self.open_sent = true;
        }

        if self.connection.session_requested && !self.begin_sent {
            let begin = performative::Begin {
                remote_channel: None,
                next_outgoing_id: 1,
                incoming_window: 8,
                outgoing_window: 8,
                handle_max: None,
                offered_capabilities: None,
                desired_capabilities: None,
                properties: None,
            };
            let _ = self.send_performative(Performative::Begin(begin), None);
            self.begin_sent = true;
            self.connection.session_mut().state = SessionLifecycle::BeginSent;
        }

        if !self.pending_frames.is_empty() {
            for bytes in self.pending_frames.drain(..) {
                self.output.extend_from_slice(&bytes);
            }
        }
    }

    /// Encodes a performative frame and either queues it straight to the
    /// wire or, if negotiation hasn't reached `Phase::Amqp` yet, holds it
    /// in `pending_frames` — the bridge opens its sender (and may already
    /// have a transfer ready) before a single byte has moved on the wire,
    /// so without this gate an `Attach`/`Transfer` could be written ahead
    /// of the SASL/AMQP protocol headers and `Open`/`Begin`.
    fn send_performative(&mut self, performative: Performative<'_>, payload: Option<&[u8]>) -> Result<(), WireError> {
        let frame = performative::Frame {
            channel: 0,
            extended_header: None,
            performative,
            payload,
        };
        let bytes = Frame::Amqp(frame).to_vec()?;
        if self.phase == Phase::Amqp {
            self.output.extend_from_slice(&bytes);
        } else {
            self.pending_frames.push(bytes);
        }
        Ok(())
    }

    /// Creates a sender on the one logical session, attaches it locally,
    /// and queues its `attach` frame — the engine-level half of
    /// `getSender` (spec §4.4). The bridge supplies the fresh random name
    /// and the address to use for both source and target; `rand`/`uuid`
    /// are bridge-side dependencies, not the wire layer's.
    pub fn open_sender(&mut self, name: String, address: &str) -> Result<u32, WireError> {
        let source = performative::Source {
            address: Some(std::borrow::Cow::Owned(address.to_string())),
            durable: Some(performative::TerminusDurability::None),
            ..Default::default()
        };
        let target = performative::Target {
            address: Some(std::borrow::Cow::Owned(address.to_string())),
            durable: Some(performative::TerminusDurability::UnsettledState),
            ..Default::default()
        };
        let session = self.connection.session_mut();
        let sender = session.create_sender(name.clone());
        let handle = sender.handle;
        sender.source = Some(source.clone());
        sender.target = Some(target.clone());
        sender.snd_settle_mode = Some(performative::SenderSettleMode::Unsettled);
        sender.rcv_settle_mode = Some(performative::ReceiverSettleMode::First);
        sender.state = super::link::LinkState::AttachSent;

        let id = self.connection.id();
        self.send_attach_sender(handle, name, source, target)?;
        self.connection
            .push_event(Event::LinkLocalOpen { connection: id, handle, role: Role::Sender });
        Ok(handle)
    }

    /// Sends an `attach` for a sender the bridge just opened locally.
    fn send_attach_sender(&mut self, handle: u32, name: String, source: performative::Source<'static>, target: performative::Target<'static>) -> Result<(), WireError> {
        let attach = performative::Attach {
            name: name.into(),
            handle,
            role: Role::Sender,
            snd_settle_mode: Some(performative::SenderSettleMode::Unsettled),
            rcv_settle_mode: Some(performative::ReceiverSettleMode::First),
            source: Some(source),
            target: Some(target),
            unsettled: None,
            incomplete_unsettled: None,
            initial_delivery_count: Some(0),
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        self.send_performative(Performative::Attach(attach), None)
    }

    /// Sends one `transfer` frame carrying an already-encoded message
    /// body for the named sender's current delivery, assigning it the
    /// next session-wide delivery-id so a later `disposition` can settle
    /// it (§4.6 delivery handler).
    pub fn send_transfer(&mut self, handle: u32, tag: Vec<u8>, payload: Vec<u8>) -> Result<(), WireError> {
        let delivery_id = {
            let session = self.connection.session_mut();
            let did = session.next_outgoing_id;
            session.next_outgoing_id += 1;
            if let Some(sender) = session.sender_mut(handle) {
                sender.set_current_delivery_id(did);
            }
            did
        };
        let transfer = performative::Transfer {
            handle,
            delivery_id: Some(delivery_id),
            delivery_tag: Some(serde_bytes::ByteBuf::from(tag)),
            message_format: Some(0),
            settled: Some(false),
            more: Some(false),
            rcv_settle_mode: None,
            state: None,
            resume: None,
            aborted: None,
            batchable: None,
        };
        let message = performative::Message {
            header: Some(performative::Header {
                durable: Some(true),
                ..Default::default()
            }),
            body: Some(performative::Body::Data(performative::Data(serde_bytes::Bytes::new(&payload)))),
            ..Default::default()
        };
        let body = message.to_vec()?;
        self.send_performative(Performative::Transfer(transfer), Some(&body))
    }

    pub fn send_disposition(&mut self, role: Role, first: u32, state: performative::DeliveryState, settled: bool) -> Result<(), WireError> {
        let disposition = performative::Disposition {
            role,
            first,
            last: None,
            settled: Some(settled),
            state: Some(state),
            batchable: None,
        };
        self.send_performative(Performative::Disposition(disposition), None)
    }

    pub fn send_flow(&mut self, handle: u32, link_credit: u32, delivery_count: u32) -> Result<(), WireError> {
        let flow = performative::Flow {
            next_incoming_id: None,
            incoming_window: 8,
            next_outgoing_id: 1,
            outgoing_window: 8,
            handle: Some(handle),
            delivery_count: Some(delivery_count),
            link_credit: Some(link_credit),
            available: None,
            drain: Some(false),
            echo: Some(false),
            properties: None,
        };
        self.send_performative(Performative::Flow(flow), None)
    }

    fn check_idle_timeout(&mut self) {
        if self.idle_timeout_ms == 0 || self.phase != Phase::Amqp {
            return;
        }
        let elapsed = self.clock.now().saturating_duration_since(self.last_activity);
        let limit = Duration::from_millis(self.idle_timeout_ms as u64 * 2);
        if elapsed >= limit && self.condition.is_none() {
            self.set_condition("amqp:resource-limit-exceeded", "local-idle-timeout expired");
            let id = self.connection.id();
            self.connection
                .push_event(Event::TransportError(id, self.condition.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::clock::FakeClock;
    use std::rc::Rc;

    fn bound(clock: Rc<FakeClock>) -> Transport {
        let connection = Connection::new("test", false);
        Transport::bind(connection, SaslConfig::Anonymous).with_clock(Box::new(RcClock(clock)))
    }

    /// Wraps an `Rc<FakeClock>` so the test can keep advancing the same
    /// clock instance after handing a boxed trait object to the transport.
    #[derive(Debug)]
    struct RcClock(Rc<FakeClock>);

    impl Clock for RcClock {
        fn now(&self) -> Instant {
            self.0.now()
        }
    }

    fn drive_to_amqp_phase(t: &mut Transport) {
        t.process_input(crate::SASL_PROTO_HEADER).unwrap();
        let mechanisms = sasl::Frame::Mechanisms(sasl::Mechanisms {
            sasl_server_mechanisms: vec![sasl::Mechanism::Anonymous],
        });
        t.process_input(&Frame::Sasl(mechanisms).to_vec().unwrap()).unwrap();
        let outcome = sasl::Frame::Outcome(sasl::Outcome {
            code: sasl::Code::Ok,
            additional_data: None,
        });
        t.process_input(&Frame::Sasl(outcome).to_vec().unwrap()).unwrap();
        t.process_input(crate::AMQP_PROTO_HEADER).unwrap();
    }

    #[test]
    fn idle_timeout_fires_after_twice_the_configured_interval() {
        let clock = Rc::new(FakeClock::new());
        let mut t = bound(clock.clone());
        t.set_idle_timeout(1_000);
        drive_to_amqp_phase(&mut t);

        assert!(t.pending() >= 0);
        assert!(t.condition().is_none());

        clock.advance(Duration::from_millis(2_500));
        t.pending();

        let condition = t.condition().expect("idle timeout should have set a condition");
        assert_eq!(condition.symbol, "amqp:resource-limit-exceeded");
    }

    #[test]
    fn idle_timeout_disabled_when_zero() {
        let clock = Rc::new(FakeClock::new());
        let mut t = bound(clock.clone());
        t.set_idle_timeout(0);
        drive_to_amqp_phase(&mut t);

        clock.advance(Duration::from_secs(3_600));
        t.pending();

        assert!(t.condition().is_none());
    }
}
