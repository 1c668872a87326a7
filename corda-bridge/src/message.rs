//! The narrow, externally observed message capability spec §3 describes:
//! `SendableMessage` (outbound, application-owned) and `ReceivedMessage`
//! (inbound, constructed by the byte codec).

use std::collections::HashMap;

use amqp_wire::engine::DeliveryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Unsent,
    Sent,
    Acknowledged,
    Rejected,
}

/// Identifies an inbound delivery for later upstream settlement: the
/// owning link's handle plus the engine's per-link delivery index.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryHandle {
    pub link_handle: u32,
    pub delivery: DeliveryId,
}

/// An application message queued for transmission. `do_complete` is an
/// idempotent terminal transition that fires its completion hook exactly
/// once (spec §3, invariant P1); `release` drops the encoded buffer and is
/// idempotent. The scheduling model is strictly single-threaded per
/// connection (spec §5), so no synchronization is needed here.
#[derive(Debug)]
pub struct SendableMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub application_properties: HashMap<String, String>,
    buf: Option<Vec<u8>>,
    status: MessageStatus,
    completed: bool,
    on_complete: Option<Box<dyn FnOnce(MessageStatus)>>,
}

impl SendableMessage {
    pub fn new(
        topic: String,
        payload: Vec<u8>,
        application_properties: HashMap<String, String>,
    ) -> Self {
        SendableMessage {
            topic,
            payload,
            application_properties,
            buf: None,
            status: MessageStatus::Unsent,
            completed: false,
            on_complete: None,
        }
    }

    /// Registers a completion hook, called exactly once when `do_complete`
    /// first fires.
    pub fn on_complete(mut self, f: impl FnOnce(MessageStatus) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub(crate) fn set_buf(&mut self, buf: Vec<u8>) {
        self.buf = Some(buf);
    }

    pub(crate) fn take_buf(&mut self) -> Option<Vec<u8>> {
        self.buf.take()
    }

    pub(crate) fn mark_sent(&mut self) {
        self.status = MessageStatus::Sent;
    }

    pub fn do_complete(&mut self, status: MessageStatus) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.status = status;
        if let Some(hook) = self.on_complete.take() {
            hook(status);
        }
    }

    /// Idempotent: drops the encoded buffer if one is still held.
    pub fn release(&mut self) {
        self.buf = None;
    }
}

/// A message decoded from an inbound delivery, ready for upstream
/// forwarding (spec §3).
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub payload: Vec<u8>,
    pub source: String,
    pub remote_legal_name: String,
    pub remote_endpoint: (String, u16),
    pub local_legal_name: String,
    pub local_endpoint: (String, u16),
    pub application_properties: HashMap<String, String>,
    pub delivery_handle: DeliveryHandle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn do_complete_is_idempotent_and_fires_once() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        let mut msg = SendableMessage::new("addr1".to_string(), vec![1], HashMap::new())
            .on_complete(move |status| seen2.borrow_mut().push(status));
        msg.do_complete(MessageStatus::Acknowledged);
        msg.do_complete(MessageStatus::Rejected);
        assert_eq!(msg.status(), MessageStatus::Acknowledged);
        assert_eq!(*seen.borrow(), vec![MessageStatus::Acknowledged]);
    }

    #[test]
    fn release_is_idempotent() {
        let mut msg = SendableMessage::new("addr1".to_string(), vec![1], HashMap::new());
        msg.set_buf(vec![9, 9]);
        msg.release();
        msg.release();
        assert!(msg.take_buf().is_none());
    }
}
