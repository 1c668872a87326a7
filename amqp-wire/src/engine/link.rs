//! Link and delivery objects. A link is either a `Sender` or a `Receiver`;
//! both sides of the distinction share enough shape that the state
//! machine that drives them (in `corda-bridge`) treats them uniformly
//! through the event stream, but their transmission/reception semantics
//! differ enough that they stay separate types here rather than one enum.

use crate::performative::{
    DeliveryState, ReceiverSettleMode, Role, SenderSettleMode, Source, Target,
};

use super::event::DeliveryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unattached,
    AttachSent,
    AttachRcvd,
    Attached,
    DetachSent,
    DetachRcvd,
    Detached,
}

#[derive(Debug, Default)]
pub struct Delivery {
    pub tag: Vec<u8>,
    pub(crate) buffer: Vec<u8>,
    /// The session-level `delivery-id` assigned when this delivery's
    /// first transfer frame was sent; `disposition` frames settle by this
    /// id range rather than by tag, so it is what settlement-matching
    /// keys on (see `Sender::remote_settlement_by_id`).
    pub delivery_id: Option<u32>,
    pub readable: bool,
    pub partial: bool,
    pub locally_settled: bool,
    pub remotely_settled: bool,
    pub local_state: Option<DeliveryState>,
    pub remote_state: Option<DeliveryState>,
}

impl Delivery {
    pub fn is_remotely_accepted(&self) -> bool {
        self.remotely_settled && matches!(self.remote_state, Some(DeliveryState::Accepted(_)))
    }

    /// The raw message-section bytes carried by this delivery's transfer
    /// frame(s); decoding them into header/properties/body is the byte
    /// codec's job, not the engine's.
    pub fn payload(&self) -> &[u8] {
        &self.buffer
    }
}

#[derive(Debug)]
pub struct Sender {
    pub handle: u32,
    pub name: String,
    pub state: LinkState,
    pub remote_attached: bool,
    pub source: Option<Source<'static>>,
    pub target: Option<Target<'static>>,
    pub snd_settle_mode: Option<SenderSettleMode>,
    pub rcv_settle_mode: Option<ReceiverSettleMode>,
    pub credit: u32,
    delivery_count: u32,
    deliveries: Vec<Delivery>,
    current: Option<usize>,
}

impl Sender {
    pub(crate) fn new(handle: u32, name: String) -> Self {
        Sender {
            handle,
            name,
            state: LinkState::Unattached,
            remote_attached: false,
            source: None,
            target: None,
            snd_settle_mode: None,
            rcv_settle_mode: None,
            credit: 0,
            delivery_count: 0,
            deliveries: Vec::new(),
            current: None,
        }
    }

    pub fn role(&self) -> Role {
        Role::Sender
    }

    /// Begins a new delivery tagged with the caller-supplied bytes; the
    /// delivery tag counter itself is owned by the connection state
    /// machine (spec §3 "Delivery Tag"), not by the engine.
    pub fn new_delivery(&mut self, tag: Vec<u8>) -> DeliveryId {
        let id = self.deliveries.len();
        self.deliveries.push(Delivery {
            tag,
            locally_settled: false,
            ..Delivery::default()
        });
        self.current = Some(id);
        DeliveryId(id)
    }

    /// Appends the full message payload to the current delivery and
    /// consumes one credit; a real proton-like sender would segment
    /// large messages across multiple transfer frames, but every message
    /// this bridge carries fits in one frame.
    pub fn send(&mut self, bytes: &[u8]) {
        if let Some(idx) = self.current {
            self.deliveries[idx].buffer.extend_from_slice(bytes);
        }
        self.credit = self.credit.saturating_sub(1);
        self.delivery_count += 1;
    }

    /// Marks the current delivery as fully transmitted so a subsequent
    /// `new_delivery` starts a fresh one.
    pub fn advance(&mut self) {
        self.current = None;
    }

    /// Records the session-level `delivery-id` the transport assigned to
    /// the current delivery's transfer frame.
    pub(crate) fn set_current_delivery_id(&mut self, id: u32) {
        if let Some(idx) = self.current {
            self.deliveries[idx].delivery_id = Some(id);
        }
    }

    pub fn current_delivery(&self) -> Option<DeliveryId> {
        self.current.map(DeliveryId)
    }

    pub fn delivery(&self, id: DeliveryId) -> Option<&Delivery> {
        self.deliveries.get(id.0)
    }

    pub fn delivery_mut(&mut self, id: DeliveryId) -> Option<&mut Delivery> {
        self.deliveries.get_mut(id.0)
    }

    /// Locally settles and drops a delivery; called once the state
    /// machine has recorded the message's terminal status.
    pub fn settle(&mut self, id: DeliveryId) {
        if let Some(d) = self.deliveries.get_mut(id.0) {
            d.locally_settled = true;
            d.buffer.clear();
        }
    }

    /// Matches an inbound `disposition`'s `first..=last` delivery-id range
    /// against every unsettled delivery this sender holds, not just the
    /// most recent one — `advance()` clears `current` the moment a
    /// message is sent, so settlement can arrive for any outstanding id.
    pub(crate) fn remote_settlement_by_id(
        &mut self,
        first: u32,
        last: u32,
        settled: bool,
        state: Option<DeliveryState>,
    ) -> Option<DeliveryId> {
        let idx = self.deliveries.iter().position(|d| {
            !d.locally_settled
                && matches!(d.delivery_id, Some(id) if id >= first && id <= last)
        })?;
        let d = &mut self.deliveries[idx];
        d.remotely_settled = settled;
        d.remote_state = state;
        Some(DeliveryId(idx))
    }
}

#[derive(Debug)]
pub struct Receiver {
    pub handle: u32,
    pub name: String,
    pub state: LinkState,
    pub remote_attached: bool,
    pub source: Option<Source<'static>>,
    pub target: Option<Target<'static>>,
    pub snd_settle_mode: Option<SenderSettleMode>,
    pub rcv_settle_mode: Option<ReceiverSettleMode>,
    /// Credit window this side auto-replenishes to (SPEC_FULL.md
    /// supplement: "Link credit/flow bookkeeping on the Receiver side").
    pub credit_window: u32,
    delivery_count: u32,
    deliveries: Vec<Delivery>,
    current: Option<usize>,
}

impl Receiver {
    pub(crate) fn new(handle: u32, name: String) -> Self {
        Receiver {
            handle,
            name,
            state: LinkState::Unattached,
            remote_attached: false,
            source: None,
            target: None,
            snd_settle_mode: None,
            rcv_settle_mode: None,
            credit_window: 16,
            delivery_count: 0,
            deliveries: Vec::new(),
            current: None,
        }
    }

    pub fn role(&self) -> Role {
        Role::Receiver
    }

    pub(crate) fn receive(&mut self, tag: Vec<u8>, bytes: &[u8], more: bool) -> DeliveryId {
        let idx = match self.current {
            Some(idx) if self.deliveries[idx].tag == tag => idx,
            _ => {
                let idx = self.deliveries.len();
                self.deliveries.push(Delivery {
                    tag,
                    ..Delivery::default()
                });
                idx
            }
        };
        let d = &mut self.deliveries[idx];
        d.buffer.extend_from_slice(bytes);
        d.partial = more;
        d.readable = !more;
        self.current = if more { Some(idx) } else { None };
        self.delivery_count += 1;
        DeliveryId(idx)
    }

    pub fn delivery(&self, id: DeliveryId) -> Option<&Delivery> {
        self.deliveries.get(id.0)
    }

    pub fn delivery_mut(&mut self, id: DeliveryId) -> Option<&mut Delivery> {
        self.deliveries.get_mut(id.0)
    }

    /// Advances the link past a delivery that has been fully consumed,
    /// settling and dropping its buffer.
    pub fn advance(&mut self, id: DeliveryId) {
        if let Some(d) = self.deliveries.get_mut(id.0) {
            d.locally_settled = true;
            d.buffer.clear();
        }
    }

    pub fn settle(&mut self, id: DeliveryId, state: DeliveryState) {
        if let Some(d) = self.deliveries.get_mut(id.0) {
            d.local_state = Some(state);
            d.locally_settled = true;
        }
    }
}
