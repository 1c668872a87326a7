//! The engine-level session object: flow-control windows and the link
//! table for the one logical session a connection carries (spec §3
//! describes exactly one session per connection; this engine does not
//! support more than one, so it is modeled as a field of `Connection`
//! rather than a collection).

use std::collections::HashMap;

use super::link::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycle {
    Unmapped,
    BeginSent,
    BeginRcvd,
    Mapped,
    EndSent,
    EndRcvd,
}

#[derive(Debug)]
pub struct Session {
    pub state: SessionLifecycle,
    pub next_outgoing_id: u32,
    pub incoming_window: u32,
    pub outgoing_window: u32,
    next_handle: u32,
    senders: HashMap<u32, Sender>,
    receivers: HashMap<u32, Receiver>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Session {
            state: SessionLifecycle::Unmapped,
            next_outgoing_id: 1,
            incoming_window: 8,
            outgoing_window: 8,
            next_handle: 0,
            senders: HashMap::new(),
            receivers: HashMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionLifecycle::Mapped
    }

    pub(crate) fn open(&mut self) {
        self.state = SessionLifecycle::Mapped;
    }

    pub(crate) fn alloc_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    pub fn create_sender(&mut self, name: String) -> &mut Sender {
        let handle = self.alloc_handle();
        self.senders.insert(handle, Sender::new(handle, name));
        self.senders.get_mut(&handle).unwrap()
    }

    pub(crate) fn create_receiver(&mut self, handle: u32, name: String) -> &mut Receiver {
        self.receivers
            .entry(handle)
            .or_insert_with(|| Receiver::new(handle, name))
    }

    pub fn sender(&self, handle: u32) -> Option<&Sender> {
        self.senders.get(&handle)
    }

    pub fn sender_mut(&mut self, handle: u32) -> Option<&mut Sender> {
        self.senders.get_mut(&handle)
    }

    pub fn receiver(&self, handle: u32) -> Option<&Receiver> {
        self.receivers.get(&handle)
    }

    pub fn receiver_mut(&mut self, handle: u32) -> Option<&mut Receiver> {
        self.receivers.get_mut(&handle)
    }

    pub fn senders(&self) -> impl Iterator<Item = &Sender> {
        self.senders.values()
    }

    pub(crate) fn remove_sender(&mut self, handle: u32) -> Option<Sender> {
        self.senders.remove(&handle)
    }

    pub(crate) fn remove_receiver(&mut self, handle: u32) -> Option<Receiver> {
        self.receivers.remove(&handle)
    }
}
