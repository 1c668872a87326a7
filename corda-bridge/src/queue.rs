//! Per-address FIFO queues of pending messages, plus the unacked,
//! random-access-by-identity map of in-flight deliveries (spec §3 Outbound
//! Queues; §9 design note "Queue representation": "a small-map+sequence
//! hybrid"). Keying the unacked map by `(handle, DeliveryId)` gives exact
//! identity-based removal on settlement without needing reference
//! equality or an intrusive list.

use std::collections::{HashMap, VecDeque};

use amqp_wire::engine::DeliveryId;

use crate::message::SendableMessage;

#[derive(Debug, Default)]
pub struct OutboundQueues {
    message_queues: HashMap<String, VecDeque<SendableMessage>>,
    unacked: HashMap<(u32, DeliveryId), SendableMessage>,
}

impl OutboundQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, address: &str, msg: SendableMessage) {
        self.message_queues
            .entry(address.to_string())
            .or_default()
            .push_back(msg);
    }

    pub fn pop_front(&mut self, address: &str) -> Option<SendableMessage> {
        let queue = self.message_queues.get_mut(address)?;
        let msg = queue.pop_front();
        if queue.is_empty() {
            self.message_queues.remove(address);
        }
        msg
    }

    /// Removes and returns every queued message for `address`, e.g. for
    /// `handleRemoteCreatePermissionError`'s "clear the queue".
    pub fn take_queue(&mut self, address: &str) -> VecDeque<SendableMessage> {
        self.message_queues.remove(address).unwrap_or_default()
    }

    /// Addresses with at least one queued message, for connection-local-open's
    /// "for every address already present in messageQueues, call getSender".
    pub fn addresses(&self) -> Vec<String> {
        self.message_queues.keys().cloned().collect()
    }

    pub fn mark_in_flight(&mut self, handle: u32, delivery: DeliveryId, msg: SendableMessage) {
        self.unacked.insert((handle, delivery), msg);
    }

    pub fn take_in_flight(&mut self, handle: u32, delivery: DeliveryId) -> Option<SendableMessage> {
        self.unacked.remove(&(handle, delivery))
    }

    /// Drains both queues for connection-final cleanup (invariant P5).
    pub fn drain_all(&mut self) -> Vec<SendableMessage> {
        let mut drained: Vec<SendableMessage> =
            self.message_queues.drain().flat_map(|(_, q)| q).collect();
        drained.extend(self.unacked.drain().map(|(_, m)| m));
        drained
    }

    pub fn is_empty(&self) -> bool {
        self.message_queues.values().all(|q| q.is_empty()) && self.unacked.is_empty()
    }

    /// Test-only: exposes the in-flight keys so a whitebox test can
    /// simulate a remote disposition arriving for a specific delivery
    /// without needing a full wire round-trip.
    #[cfg(test)]
    pub(crate) fn in_flight_keys(&self) -> Vec<(u32, DeliveryId)> {
        self.unacked.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amqp_wire::engine::Connection;

    fn msg(topic: &str) -> SendableMessage {
        SendableMessage::new(topic.to_string(), vec![1, 2, 3], Default::default())
    }

    #[test]
    fn fifo_per_address() {
        let mut q = OutboundQueues::new();
        q.enqueue("addr1", msg("addr1"));
        q.enqueue("addr1", msg("addr1"));
        assert!(q.pop_front("addr1").is_some());
        assert!(q.pop_front("addr1").is_some());
        assert!(q.pop_front("addr1").is_none());
        assert!(q.addresses().is_empty());
    }

    #[test]
    fn in_flight_round_trip_by_identity() {
        let mut connection = Connection::new("test", false);
        let sender = connection.session_mut().create_sender("s1".to_string());
        let handle = sender.handle;
        let delivery = sender.new_delivery(vec![0, 0, 0, 1]);

        let mut q = OutboundQueues::new();
        q.mark_in_flight(handle, delivery, msg("addr1"));
        assert!(q.take_in_flight(handle, delivery).is_some());
        assert!(q.take_in_flight(handle, delivery).is_none());
    }

    #[test]
    fn drain_all_empties_both_queues() {
        let mut connection = Connection::new("test", false);
        let sender = connection.session_mut().create_sender("s1".to_string());
        let handle = sender.handle;
        let delivery = sender.new_delivery(vec![0, 0, 0, 1]);

        let mut q = OutboundQueues::new();
        q.enqueue("addr1", msg("addr1"));
        q.mark_in_flight(handle, delivery, msg("addr1"));
        let drained = q.drain_all();
        assert_eq!(drained.len(), 2);
        assert!(q.is_empty());
    }
}
