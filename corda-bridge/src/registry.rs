//! Per-address maps of senders and receivers (spec §4.4): `address →
//! handle`. Entries are created lazily and removed on link-final.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct LinkRegistry {
    senders: HashMap<String, u32>,
    receivers: HashMap<String, u32>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self, address: &str) -> Option<u32> {
        self.senders.get(address).copied()
    }

    pub fn insert_sender(&mut self, address: String, handle: u32) {
        self.senders.insert(address, handle);
    }

    pub fn insert_receiver(&mut self, address: String, handle: u32) {
        self.receivers.insert(address, handle);
    }

    pub fn remove_sender_by_handle(&mut self, handle: u32) {
        self.senders.retain(|_, h| *h != handle);
    }

    pub fn remove_receiver_by_handle(&mut self, handle: u32) {
        self.receivers.retain(|_, h| *h != handle);
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty() && self.receivers.is_empty()
    }

    pub fn clear(&mut self) {
        self.senders.clear();
        self.receivers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_insert_and_lookup() {
        let mut reg = LinkRegistry::new();
        assert_eq!(reg.sender("addr1"), None);
        reg.insert_sender("addr1".to_string(), 3);
        assert_eq!(reg.sender("addr1"), Some(3));
    }

    #[test]
    fn removal_by_handle_clears_entry() {
        let mut reg = LinkRegistry::new();
        reg.insert_sender("addr1".to_string(), 3);
        reg.insert_receiver("addr2".to_string(), 7);
        reg.remove_sender_by_handle(3);
        assert_eq!(reg.sender("addr1"), None);
        assert!(!reg.is_empty());
        reg.remove_receiver_by_handle(7);
        assert!(reg.is_empty());
    }
}
