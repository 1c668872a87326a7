//! The Connection State Machine (spec §4.6): the orchestrator that
//! dispatches every engine event through one entry point, manages SASL via
//! the adapter, drives credit-limited transmission, handles remote
//! close/errors, and guarantees queue/registry cleanup on connection-final.

use rand::Rng;
use uuid::Uuid;

use amqp_wire::engine::{DeliveryId, ErrorCondition, Event, SaslConfig};
use amqp_wire::{Accepted, DeliveryState, Rejected, Role};

use crate::adapter::EngineAdapter;
use crate::channel::SocketChannel;
use crate::codec;
use crate::config::Config;
use crate::error::Error;
use crate::message::{DeliveryHandle, MessageStatus, SendableMessage};
use crate::queue::OutboundQueues;
use crate::registry::LinkRegistry;
use crate::session_state::{SessionState, SessionStateMachine};

/// Construction parameters. `local_legal_name`/`remote_legal_name` are
/// resolved by the surrounding TLS/identity layer (out of scope here, per
/// §1 Non-goals) and only consumed for logging and application-properties
/// (§6, §9).
pub struct ConnectionParams {
    pub server_mode: bool,
    pub local_legal_name: String,
    pub remote_legal_name: String,
    pub sasl: SaslConfig,
    pub config: Config,
}

pub struct ConnectionStateMachine {
    adapter: EngineAdapter,
    session_state: SessionStateMachine,
    registry: LinkRegistry,
    queues: OutboundQueues,
    tag_counter: u32,
    channel: Option<Box<dyn SocketChannel>>,
    local_legal_name: String,
    remote_legal_name: String,
    connection_id: u64,
    span: tracing::Span,
    buffer_pool: amqp_wire::engine::buffer::BufferPool,
}

impl ConnectionStateMachine {
    pub fn new(params: ConnectionParams) -> Self {
        let adapter = EngineAdapter::new(params.server_mode, params.sasl, &params.config);
        let connection_id = adapter.connection_id();
        let span = tracing::info_span!(
            "amqp_connection",
            server_mode = params.server_mode,
            local_legal_name = %params.local_legal_name,
            remote_legal_name = %params.remote_legal_name,
            connection_id,
        );
        let mut machine = ConnectionStateMachine {
            adapter,
            session_state: SessionStateMachine::new(),
            registry: LinkRegistry::new(),
            queues: OutboundQueues::new(),
            tag_counter: 0,
            channel: None,
            local_legal_name: params.local_legal_name,
            remote_legal_name: params.remote_legal_name,
            connection_id,
            span,
            buffer_pool: amqp_wire::engine::buffer::BufferPool::new(),
        };
        machine.drain_events();
        machine
    }

    pub fn attach_channel(&mut self, channel: Box<dyn SocketChannel>) {
        self.channel = Some(channel);
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state.state()
    }

    // ---- Public ingress operations (spec §4.6 "Public ingress operations") ----

    /// Encodes `msg`, then queues or transmits or rejects it depending on
    /// `SessionState`.
    pub fn transport_write_message(&mut self, mut msg: SendableMessage) {
        match codec::encode(&msg, &self.local_legal_name, &self.buffer_pool) {
            Ok(buf) => msg.set_buf(buf),
            Err(err) => {
                tracing::warn!(%err, "failed to encode outbound message");
                msg.do_complete(MessageStatus::Rejected);
                return;
            }
        }

        match self.session_state.state() {
            // The literal spec text has `Closed` append the message to
            // `messageQueues` before immediately completing it Rejected,
            // which would otherwise leave a completed message sitting in a
            // queue connection-final can never drain (violating P2/P5).
            // Rejecting without ever enqueuing avoids that.
            SessionState::Closed => msg.do_complete(MessageStatus::Rejected),
            SessionState::Active => {
                let topic = msg.topic.clone();
                self.queues.enqueue(&topic, msg);
                match self.get_or_create_sender(&topic) {
                    Ok(handle) => self.transmit(handle),
                    Err(err) => tracing::warn!(%err, topic = %topic, "failed to open sender"),
                }
            }
            SessionState::Uninitialized => {
                let topic = msg.topic.clone();
                self.queues.enqueue(&topic, msg);
            }
        }
        self.drain_events();
    }

    /// Feeds inbound bytes to the transport in chunks sized to its current
    /// capacity (spec §4.6).
    pub fn transport_process_input(&mut self, bytes: &[u8]) {
        let mut offset = 0;
        while offset < bytes.len() {
            let capacity = self.adapter.transport().capacity().max(1);
            let end = (offset + capacity).min(bytes.len());
            if let Err(err) = self.adapter.process_input(&bytes[offset..end]) {
                tracing::warn!(%err, "transport input error");
                self.adapter
                    .transport_mut()
                    .set_condition("proton:io", err.to_string());
                self.adapter.transport_mut().close_tail();
                let pending = self.adapter.transport_mut().pending().max(0) as usize;
                self.adapter.transport_mut().pop(pending);
                break;
            }
            offset = end;
        }
        self.drain_events();
    }

    /// Repeatedly drains the transport's output buffer onto the attached
    /// channel, flushing once at the end (spec §4.6).
    pub fn transport_process_output(&mut self) {
        loop {
            let pending = self.adapter.pending();
            if pending <= 0 {
                break;
            }
            let bytes = self.adapter.transport().output_bytes().to_vec();
            if bytes.is_empty() {
                break;
            }
            let write_result = self.channel.as_mut().map(|c| c.write_bytes(&bytes));
            match write_result {
                Some(Err(err)) => {
                    tracing::warn!(%err, "transport output error");
                    self.adapter
                        .transport_mut()
                        .set_condition("proton:io", err.to_string());
                    self.adapter.transport_mut().close_head();
                    let pending = self.adapter.transport_mut().pending().max(0) as usize;
                    self.adapter.transport_mut().pop(pending);
                    break;
                }
                _ => {
                    let len = bytes.len();
                    self.adapter.transport_mut().outputted(len);
                }
            }
        }
        if let Some(channel) = self.channel.as_mut() {
            if let Err(err) = channel.flush() {
                tracing::warn!(%err, "failed to flush channel");
            }
        }
        self.drain_events();
    }

    /// Pokes the engine to emit pending frames after external state
    /// changes with no new bytes in either direction.
    pub fn process_transport(&mut self) {
        self.adapter.transport_mut().poke();
        self.drain_events();
    }

    /// Initiates a local, graceful connection close (not named by spec.md
    /// as a public op, but required so something other than a remote event
    /// can start the close cascade; see SPEC_FULL.md).
    pub fn close(&mut self) {
        self.adapter.transport_mut().connection_mut().close();
        self.drain_events();
    }

    // ---- Event dispatch ----

    fn drain_events(&mut self) {
        let _enter = self.span.clone().entered();
        while let Some(event) = self.adapter.next_event() {
            if event.connection_id() != self.connection_id {
                tracing::debug!(?event, "stale event for a different connection, ignoring");
                continue;
            }
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::ConnectionInit(_) => tracing::debug!("connection init"),
            Event::ConnectionLocalOpen(_) => self.handle_connection_local_open(),
            Event::ConnectionLocalClose(_) => tracing::debug!("connection local close"),
            Event::ConnectionUnbound(_) => {
                if let Some(channel) = self.channel.as_mut() {
                    channel.close();
                }
            }
            Event::ConnectionFinal(_) => self.handle_connection_final(),
            Event::TransportHeadClosed(_) => {
                self.adapter.transport_mut().close_tail();
                self.flush_output();
            }
            Event::TransportTailClosed(_) => {
                self.adapter.transport_mut().close_head();
                self.flush_output();
            }
            Event::TransportClosed(_) => self.handle_transport_closed(),
            Event::TransportError(_, condition) => {
                match &condition {
                    Some(c) => tracing::warn!(
                        symbol = %c.symbol,
                        description = %c.description_or_generic(),
                        "transport error"
                    ),
                    None => tracing::warn!("transport error with no condition"),
                }
                self.flush_output();
            }
            Event::Transport(_) => self.handle_transport_progress(),
            Event::SessionInit(_) => tracing::debug!("session init"),
            Event::SessionLocalOpen(_) => tracing::debug!("session local open"),
            Event::SessionLocalClose(_) => tracing::debug!("session local close"),
            Event::SessionFinal(_) => {
                self.session_state.close();
                // Forces transport cleanup so connection-final is still
                // guaranteed even if transport-closed never fires — covers
                // disconnection before a remote session open (spec §4.6).
                self.adapter.transport_mut().close_tail();
                self.adapter.transport_mut().close_head();
            }
            Event::LinkLocalOpen { handle, role, .. } => self.handle_link_local_open(handle, role),
            Event::LinkRemoteOpen {
                handle,
                is_coordinator,
                ..
            } => {
                if is_coordinator {
                    tracing::debug!(handle, "remote transaction coordinator link attached");
                }
            }
            Event::LinkRemoteClose {
                handle,
                role,
                condition,
                ..
            } => self.handle_link_remote_close(handle, role, condition),
            Event::LinkFinal { handle, role, .. } => match role {
                Role::Sender => self.registry.remove_sender_by_handle(handle),
                Role::Receiver => self.registry.remove_receiver_by_handle(handle),
            },
            Event::LinkFlow { handle, .. } => self.transmit(handle),
            Event::Delivery {
                handle,
                role,
                delivery,
                ..
            } => self.handle_delivery(handle, role, delivery),
        }
    }

    fn handle_connection_local_open(&mut self) {
        self.adapter
            .transport_mut()
            .connection_mut()
            .request_session_open();
        self.session_state.init();
        for address in self.queues.addresses() {
            if let Err(err) = self.get_or_create_sender(&address) {
                tracing::warn!(%err, address = %address, "failed to open sender on connection-local-open");
            }
        }
    }

    fn handle_connection_final(&mut self) {
        for mut msg in self.queues.drain_all() {
            msg.release();
            msg.do_complete(MessageStatus::Rejected);
        }
        self.registry.clear();
        self.session_state.close();
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }

    fn handle_transport_closed(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            channel.close();
        }
    }

    fn handle_transport_progress(&mut self) {
        let pending = self.adapter.pending();
        if self.adapter.transport().is_closed() {
            self.handle_transport_closed();
            return;
        }
        if pending > 0 {
            self.flush_output();
        }
    }

    fn handle_link_local_open(&mut self, handle: u32, role: Role) {
        match role {
            Role::Sender => {
                if let Some(address) = self.address_for(handle, Role::Sender) {
                    self.registry.insert_sender(address, handle);
                }
                self.transmit(handle);
            }
            Role::Receiver => {
                if let Some(address) = self.address_for(handle, Role::Receiver) {
                    self.registry.insert_receiver(address, handle);
                }
            }
        }
    }

    fn handle_link_remote_close(&mut self, handle: u32, role: Role, condition: Option<ErrorCondition>) {
        let condition = match condition {
            Some(c) => c,
            None => {
                tracing::debug!(handle, "remote closed link");
                return;
            }
        };
        let err = Error::RemoteLink {
            symbol: condition.symbol.clone(),
            description: condition.description_or_generic().to_string(),
        };
        tracing::warn!(%err, "remote closed link with error");
        if condition
            .description
            .as_deref()
            .map_or(false, |d| d.contains("AMQ119032"))
        {
            if let Some(address) = self.address_for(handle, role) {
                self.handle_remote_create_permission_error(&address);
            }
        }
        self.adapter
            .transport_mut()
            .set_condition(condition.symbol.clone(), condition.description_or_generic().to_string());
        self.adapter.transport_mut().close_tail();
        let pending = self.adapter.transport_mut().pending().max(0) as usize;
        self.adapter.transport_mut().pop(pending);
        self.flush_output();
    }

    /// Address-create permission error: marks every queued message for
    /// `address` Acknowledged rather than retrying forever, then clears
    /// the queue (spec §4.6, §7 kind 3).
    fn handle_remote_create_permission_error(&mut self, address: &str) {
        for mut msg in self.queues.take_queue(address) {
            msg.release();
            msg.do_complete(MessageStatus::Acknowledged);
        }
    }

    fn handle_delivery(&mut self, handle: u32, role: Role, delivery: DeliveryId) {
        match role {
            Role::Receiver => self.handle_inbound_delivery(handle, delivery),
            Role::Sender => self.handle_outbound_settlement(handle, delivery),
        }
    }

    fn handle_inbound_delivery(&mut self, handle: u32, delivery: DeliveryId) {
        let (remote_delivery_id, payload) = {
            let session = self.adapter.transport_mut().connection_mut().session_mut();
            let receiver = match session.receiver_mut(handle) {
                Some(r) => r,
                None => return,
            };
            match receiver.delivery(delivery) {
                Some(d) if d.readable && !d.partial => (d.delivery_id, d.payload().to_vec()),
                _ => return,
            }
        };

        if self.channel.is_none() {
            if let Some(receiver) = self
                .adapter
                .transport_mut()
                .connection_mut()
                .session_mut()
                .receiver_mut(handle)
            {
                receiver.settle(delivery, DeliveryState::Rejected(Rejected::default()));
            }
            if let Some(id) = remote_delivery_id {
                let _ = self.adapter.transport_mut().send_disposition(
                    Role::Receiver,
                    id,
                    DeliveryState::Rejected(Rejected::default()),
                    true,
                );
            }
            return;
        }

        let decoded = match codec::decode(&payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(%err, handle, "failed to decode inbound delivery");
                if let Some(receiver) = self
                    .adapter
                    .transport_mut()
                    .connection_mut()
                    .session_mut()
                    .receiver_mut(handle)
                {
                    receiver.settle(delivery, DeliveryState::Rejected(Rejected::default()));
                }
                if let Some(id) = remote_delivery_id {
                    let _ = self.adapter.transport_mut().send_disposition(
                        Role::Receiver,
                        id,
                        DeliveryState::Rejected(Rejected::default()),
                        true,
                    );
                }
                return;
            }
        };

        let source = self.address_for(handle, Role::Receiver).unwrap_or_default();
        let (remote_endpoint, local_endpoint) = match self.channel.as_ref() {
            Some(channel) => (channel.remote_endpoint(), channel.local_endpoint()),
            None => Default::default(),
        };
        let received = codec::extract_received(
            &decoded,
            &source,
            &self.remote_legal_name,
            &self.local_legal_name,
            remote_endpoint,
            local_endpoint,
            DeliveryHandle {
                link_handle: handle,
                delivery,
            },
        );

        if let Some(channel) = self.channel.as_mut() {
            channel.deliver(received);
        }

        // Receiver-settle-mode FIRST (spec §6) puts the onus on us to
        // settle first; the literal spec text only says "advance the
        // link", but without sending this disposition the remote sender
        // would never see its delivery settled.
        if let Some(id) = remote_delivery_id {
            let _ = self.adapter.transport_mut().send_disposition(
                Role::Receiver,
                id,
                DeliveryState::Accepted(Accepted::default()),
                true,
            );
        }
        if let Some(receiver) = self
            .adapter
            .transport_mut()
            .connection_mut()
            .session_mut()
            .receiver_mut(handle)
        {
            if receiver.delivery(delivery).map_or(false, |d| !d.partial) {
                receiver.advance(delivery);
            }
        }
    }

    fn handle_outbound_settlement(&mut self, handle: u32, delivery: DeliveryId) {
        let outcome = {
            let session = self.adapter.transport_mut().connection_mut().session_mut();
            let sender = match session.sender_mut(handle) {
                Some(s) => s,
                None => return,
            };
            match sender.delivery(delivery) {
                Some(d) => d.is_remotely_accepted(),
                None => return,
            }
        };
        let status = if outcome {
            MessageStatus::Acknowledged
        } else {
            MessageStatus::Rejected
        };
        if let Some(mut msg) = self.queues.take_in_flight(handle, delivery) {
            msg.do_complete(status);
        }
        if let Some(sender) = self
            .adapter
            .transport_mut()
            .connection_mut()
            .session_mut()
            .sender_mut(handle)
        {
            sender.settle(delivery);
        }
    }

    // ---- Transmission (spec §4.5) ----

    fn transmit(&mut self, handle: u32) {
        loop {
            let credit = match self
                .adapter
                .transport()
                .connection()
                .session()
                .sender(handle)
            {
                Some(sender) => sender.credit,
                None => return,
            };
            if credit == 0 {
                break;
            }
            let address = match self.address_for(handle, Role::Sender) {
                Some(address) => address,
                None => break,
            };
            match self.queues.pop_front(&address) {
                Some(msg) => self.send_one(handle, msg),
                None => break,
            }
        }
    }

    fn send_one(&mut self, handle: u32, mut msg: SendableMessage) {
        let tag = self.next_tag();
        let payload = msg.take_buf().unwrap_or_default();

        let delivery = {
            let session = self.adapter.transport_mut().connection_mut().session_mut();
            let sender = match session.sender_mut(handle) {
                Some(s) => s,
                None => return,
            };
            let delivery = sender.new_delivery(tag.clone());
            sender.send(&payload);
            delivery
        };

        if let Err(err) = self
            .adapter
            .transport_mut()
            .send_transfer(handle, tag, payload)
        {
            tracing::warn!(%err, handle, "failed to send transfer frame");
        }
        if let Some(sender) = self
            .adapter
            .transport_mut()
            .connection_mut()
            .session_mut()
            .sender_mut(handle)
        {
            sender.advance();
        }

        msg.mark_sent();
        msg.release();
        self.queues.mark_in_flight(handle, delivery, msg);
    }

    fn next_tag(&mut self) -> Vec<u8> {
        let tag = self.tag_counter;
        self.tag_counter = self.tag_counter.wrapping_add(1);
        tag.to_be_bytes().to_vec()
    }

    fn get_or_create_sender(&mut self, address: &str) -> Result<u32, Error> {
        if let Some(handle) = self.registry.sender(address) {
            return Ok(handle);
        }
        let suffix = rand::thread_rng().gen::<u64>() & 0xefff_ffff_ffff_ffff;
        let name = format!("corda-bridge-{}-{:x}", Uuid::new_v4().to_hyphenated(), suffix);
        self.adapter
            .transport_mut()
            .open_sender(name, address)
            .map_err(Error::TransportIo)
    }

    fn address_for(&self, handle: u32, role: Role) -> Option<String> {
        let session = self.adapter.transport().connection().session();
        match role {
            Role::Sender => session
                .sender(handle)
                .and_then(|s| s.target.as_ref())
                .and_then(|t| t.address.as_ref())
                .map(|c| c.to_string()),
            Role::Receiver => session
                .receiver(handle)
                .and_then(|r| r.target.as_ref())
                .and_then(|t| t.address.as_ref())
                .map(|c| c.to_string()),
        }
    }

    /// Writes the transport's pending output to the attached channel
    /// without an explicit flush — the event-driven counterpart to
    /// `transport_process_output`'s polling flush (SPEC_FULL.md
    /// "Collector draining loop").
    fn flush_output(&mut self) {
        let bytes = self.adapter.transport().output_bytes().to_vec();
        if bytes.is_empty() {
            return;
        }
        if let Some(channel) = self.channel.as_mut() {
            if let Err(err) = channel.write_bytes(&bytes) {
                tracing::warn!(%err, "failed to write transport output to channel");
            }
        }
        let len = bytes.len();
        self.adapter.transport_mut().outputted(len);
    }
}

/// Whitebox unit tests for the scenarios in spec §8 that need to observe
/// or force internal state (credit, in-flight deliveries, registry/queue
/// contents) a one-way public API can't reach directly. Scenarios that
/// only need the public ingress surface (happy path, queued-before-open)
/// are covered end-to-end in `corda-bridge/tests/state_machine.rs`
/// against a second, real `ConnectionStateMachine` standing in for the
/// remote peer.
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NullChannel;

    impl SocketChannel for NullChannel {
        fn write_bytes(&mut self, _bytes: &[u8]) -> std::io::Result<()> {
            Ok(())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
        fn deliver(&mut self, _message: crate::message::ReceivedMessage) {}
        fn local_endpoint(&self) -> (String, u16) {
            ("127.0.0.1".to_string(), 10000)
        }
        fn remote_endpoint(&self) -> (String, u16) {
            ("127.0.0.1".to_string(), 10001)
        }
        fn close(&mut self) {}
    }

    fn new_machine() -> ConnectionStateMachine {
        let mut machine = ConnectionStateMachine::new(ConnectionParams {
            server_mode: false,
            local_legal_name: "clientLegalName".to_string(),
            remote_legal_name: "serverLegalName".to_string(),
            sasl: amqp_wire::engine::SaslConfig::Anonymous,
            config: Config::default(),
        });
        machine.attach_channel(Box::new(NullChannel));
        machine
    }

    fn sample_msg(topic: &str) -> (SendableMessage, Rc<RefCell<Option<MessageStatus>>>) {
        let status = Rc::new(RefCell::new(None));
        let observed = status.clone();
        let msg = SendableMessage::new(topic.to_string(), vec![1, 2, 3], Default::default())
            .on_complete(move |s| *observed.borrow_mut() = Some(s));
        (msg, status)
    }

    /// Scenario 3: session Active, sender credit = 0, two messages
    /// enqueued — neither transmits. Granting one credit and resuming
    /// transmission sends exactly the first.
    #[test]
    fn credit_zero_then_flow_sends_only_first_message() {
        let mut machine = new_machine();
        machine.session_state.init();
        let handle = machine
            .adapter
            .transport_mut()
            .open_sender("s1".to_string(), "addr1")
            .unwrap();
        machine.drain_events();

        let (msg1, status1) = sample_msg("addr1");
        let (msg2, status2) = sample_msg("addr1");
        machine.transport_write_message(msg1);
        machine.transport_write_message(msg2);

        assert!(machine.queues.addresses().contains(&"addr1".to_string()));
        assert_eq!(*status1.borrow(), None);
        assert_eq!(*status2.borrow(), None);

        {
            let sender = machine
                .adapter
                .transport_mut()
                .connection_mut()
                .session_mut()
                .sender_mut(handle)
                .unwrap();
            sender.credit = 1;
        }
        machine.transmit(handle);

        let sender = machine
            .adapter
            .transport()
            .connection()
            .session()
            .sender(handle)
            .unwrap();
        assert_eq!(sender.credit, 0, "the one credit was consumed by the first send");

        let remaining = machine.queues.take_queue("addr1");
        assert_eq!(remaining.len(), 1, "the second message is still queued");
    }

    /// Scenario 4: a remote disposition settles a sent delivery with a
    /// non-Accepted state — the message completes Rejected and leaves the
    /// unacked queue.
    #[test]
    fn remote_reject_completes_message_rejected() {
        let mut machine = new_machine();
        machine.session_state.init();
        let handle = machine
            .adapter
            .transport_mut()
            .open_sender("s1".to_string(), "addr1")
            .unwrap();
        machine.drain_events();
        {
            let sender = machine
                .adapter
                .transport_mut()
                .connection_mut()
                .session_mut()
                .sender_mut(handle)
                .unwrap();
            sender.credit = 1;
        }

        let (msg, status) = sample_msg("addr1");
        machine.transport_write_message(msg);
        assert_eq!(*status.borrow(), None);

        let keys = machine.queues.in_flight_keys();
        assert_eq!(keys.len(), 1);
        let (in_flight_handle, delivery_id) = keys[0];
        assert_eq!(in_flight_handle, handle);

        {
            let sender = machine
                .adapter
                .transport_mut()
                .connection_mut()
                .session_mut()
                .sender_mut(handle)
                .unwrap();
            let delivery = sender.delivery_mut(delivery_id).unwrap();
            delivery.remotely_settled = true;
            delivery.remote_state = Some(DeliveryState::Rejected(Rejected::default()));
        }
        machine.handle_outbound_settlement(handle, delivery_id);

        assert_eq!(*status.borrow(), Some(MessageStatus::Rejected));
        assert!(machine.queues.in_flight_keys().is_empty());
    }

    /// Scenario 5: remote closes a link with an `AMQ119032` condition for
    /// an address with queued messages — both complete Acknowledged
    /// (abandon-as-success, not retried) and the queue is cleared.
    #[test]
    fn address_create_permission_error_acknowledges_and_clears_queue() {
        let mut machine = new_machine();
        machine.session_state.init();
        let handle = machine
            .adapter
            .transport_mut()
            .open_sender("s1".to_string(), "addr_bad")
            .unwrap();
        machine.drain_events();

        let (msg1, status1) = sample_msg("addr_bad");
        let (msg2, status2) = sample_msg("addr_bad");
        machine.queues.enqueue("addr_bad", msg1);
        machine.queues.enqueue("addr_bad", msg2);

        let condition = ErrorCondition::new(
            "amqp:not-allowed",
            "address addr_bad: AMQ119032 insufficient permissions to create",
        );
        machine.handle_link_remote_close(handle, Role::Sender, Some(condition));

        assert_eq!(*status1.borrow(), Some(MessageStatus::Acknowledged));
        assert_eq!(*status2.borrow(), Some(MessageStatus::Acknowledged));
        assert!(!machine.queues.addresses().contains(&"addr_bad".to_string()));
    }

    /// Scenario 6: abrupt disconnect with one message in flight and one
    /// still queued — connection-final cleanup completes both Rejected
    /// and empties every queue/registry (invariant P5).
    #[test]
    fn connection_final_rejects_queued_and_in_flight_messages() {
        let mut machine = new_machine();
        machine.session_state.init();
        let handle = machine
            .adapter
            .transport_mut()
            .open_sender("s1".to_string(), "addr1")
            .unwrap();
        machine.drain_events();
        {
            let sender = machine
                .adapter
                .transport_mut()
                .connection_mut()
                .session_mut()
                .sender_mut(handle)
                .unwrap();
            sender.credit = 1;
        }

        let (msg_in_flight, status_in_flight) = sample_msg("addr1");
        machine.transport_write_message(msg_in_flight);
        let (msg_queued, status_queued) = sample_msg("addr1");
        machine.transport_write_message(msg_queued);

        assert_eq!(machine.queues.in_flight_keys().len(), 1);
        assert!(machine.queues.addresses().contains(&"addr1".to_string()));

        machine.handle_connection_final();

        assert_eq!(*status_in_flight.borrow(), Some(MessageStatus::Rejected));
        assert_eq!(*status_queued.borrow(), Some(MessageStatus::Rejected));
        assert!(machine.queues.is_empty());
        assert!(machine.registry.is_empty());
    }
}
