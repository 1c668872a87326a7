//! End-to-end tests driving two real `ConnectionStateMachine`s against
//! each other over an in-memory byte pipe, standing in for the "non-
//! blocking socket pipeline" each side is attached to. Covers the two
//! spec §8 scenarios whose setup only needs the public ingress surface;
//! the remaining four (credit/flow, remote reject, permission error,
//! abrupt disconnect) are whitebox unit tests in `state_machine.rs`
//! itself, since they need to force or observe internal engine state a
//! one-way public API can't reach.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use amqp_wire::engine::SaslConfig;
use corda_bridge::{
    Config, ConnectionParams, ConnectionStateMachine, MessageStatus, ReceivedMessage,
    SendableMessage, SessionState, SocketChannel,
};

/// A `SocketChannel` that appends outbound bytes to a shared byte queue
/// (the "wire" between the two peers) and records every decoded inbound
/// message it is handed.
struct LinkedChannel {
    outbox: Rc<RefCell<VecDeque<u8>>>,
    received: Rc<RefCell<Vec<ReceivedMessage>>>,
}

impl SocketChannel for LinkedChannel {
    fn write_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.outbox.borrow_mut().extend(bytes.iter().copied());
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn deliver(&mut self, message: ReceivedMessage) {
        self.received.borrow_mut().push(message);
    }

    fn local_endpoint(&self) -> (String, u16) {
        ("10.0.0.1".to_string(), 10000)
    }

    fn remote_endpoint(&self) -> (String, u16) {
        ("10.0.0.2".to_string(), 10001)
    }

    fn close(&mut self) {}
}

struct Peer {
    machine: ConnectionStateMachine,
    outbox: Rc<RefCell<VecDeque<u8>>>,
    received: Rc<RefCell<Vec<ReceivedMessage>>>,
}

fn new_peer(server_mode: bool, local_legal_name: &str, remote_legal_name: &str) -> Peer {
    let outbox = Rc::new(RefCell::new(VecDeque::new()));
    let received = Rc::new(RefCell::new(Vec::new()));
    let mut machine = ConnectionStateMachine::new(ConnectionParams {
        server_mode,
        local_legal_name: local_legal_name.to_string(),
        remote_legal_name: remote_legal_name.to_string(),
        sasl: SaslConfig::Anonymous,
        config: Config::default(),
    });
    machine.attach_channel(Box::new(LinkedChannel {
        outbox: outbox.clone(),
        received: received.clone(),
    }));
    Peer {
        machine,
        outbox,
        received,
    }
}

/// Pumps bytes between the two peers until a full round produces nothing
/// new in either direction (the protocol handshake plus one message
/// transfer converges in well under the round cap).
fn pump(client: &mut Peer, server: &mut Peer) {
    for _ in 0..64 {
        client.machine.transport_process_output();
        server.machine.transport_process_output();

        let to_server: Vec<u8> = client.outbox.borrow_mut().drain(..).collect();
        let to_client: Vec<u8> = server.outbox.borrow_mut().drain(..).collect();

        let progressed = !to_server.is_empty() || !to_client.is_empty();

        if !to_server.is_empty() {
            server.machine.transport_process_input(&to_server);
        }
        if !to_client.is_empty() {
            client.machine.transport_process_input(&to_client);
        }

        if !progressed {
            break;
        }
    }
}

/// Scenario 1 (spec §8): client opens, server pre-authorizes (ANONYMOUS
/// SASL, no application-level gate in this core), client enqueues one
/// message. The remote receives a `ReceivedMessage` carrying the payload,
/// source address, the authenticated sender identity under
/// `_AMQ_VALIDATED_USER`, and the caller's own properties; the client-side
/// message terminates Acknowledged.
#[test]
fn happy_path_single_message() {
    let mut client = new_peer(false, "clientLegalName", "serverLegalName");
    let mut server = new_peer(true, "serverLegalName", "clientLegalName");

    let mut props = HashMap::new();
    props.insert("id".to_string(), "u1".to_string());

    let status = Rc::new(RefCell::new(None));
    let observed = status.clone();
    let msg = SendableMessage::new("addr1".to_string(), vec![0xDE, 0xAD], props)
        .on_complete(move |s| *observed.borrow_mut() = Some(s));

    client.machine.transport_write_message(msg);
    pump(&mut client, &mut server);

    let received = server.received.borrow();
    assert_eq!(received.len(), 1, "server should have received exactly one message");
    let m = &received[0];
    assert_eq!(m.payload, vec![0xDE, 0xAD]);
    assert_eq!(m.source, "addr1");
    assert_eq!(
        m.application_properties.get("_AMQ_VALIDATED_USER"),
        Some(&"clientLegalName".to_string())
    );
    assert_eq!(m.application_properties.get("id"), Some(&"u1".to_string()));

    assert_eq!(*status.borrow(), Some(MessageStatus::Acknowledged));
}

/// Scenario 2 (spec §8): a message is enqueued on the server side while
/// its `SessionState` is still `Uninitialized` (the server machine, unlike
/// the client, does not open its connection locally until the remote's
/// `open` frame arrives). Connecting the client causes connection-local-
/// open to fire on the server, which opens a sender for every address
/// already queued and transmits on first credit.
#[test]
fn message_queued_before_session_ready_transmits_after_open() {
    let mut client = new_peer(false, "clientLegalName", "serverLegalName");
    let mut server = new_peer(true, "serverLegalName", "clientLegalName");

    assert_eq!(server.machine.session_state(), SessionState::Uninitialized);

    let status = Rc::new(RefCell::new(None));
    let observed = status.clone();
    let msg = SendableMessage::new("addr2".to_string(), vec![1, 2, 3], HashMap::new())
        .on_complete(move |s| *observed.borrow_mut() = Some(s));
    server.machine.transport_write_message(msg);

    // Still uninitialized: nothing has touched the wire yet.
    assert_eq!(server.machine.session_state(), SessionState::Uninitialized);

    pump(&mut client, &mut server);

    assert_eq!(server.machine.session_state(), SessionState::Active);
    let received = client.received.borrow();
    assert_eq!(received.len(), 1, "client should have received the queued message");
    assert_eq!(received[0].payload, vec![1, 2, 3]);
    assert_eq!(received[0].source, "addr2");
    assert_eq!(*status.borrow(), Some(MessageStatus::Acknowledged));
}
