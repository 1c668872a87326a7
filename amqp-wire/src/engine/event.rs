//! The engine's event stream. Instead of the virtual-method dispatch a
//! proton-like engine drives through inheritance, events are collected
//! into a closed tagged enum and a [`Collector`] queue — §9 design note
//! "Event-handler class → tagged event dispatch".
//!
//! Every variant carries the owning connection's arena id so a consumer
//! can cheaply discard events left over from a connection it has already
//! torn down (§9 "Back-references and identity checks").

use std::collections::VecDeque;

use crate::performative::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCondition {
    pub symbol: String,
    pub description: Option<String>,
}

impl ErrorCondition {
    pub fn new(symbol: impl Into<String>, description: impl Into<String>) -> Self {
        ErrorCondition {
            symbol: symbol.into(),
            description: Some(description.into()),
        }
    }

    pub fn description_or_generic(&self) -> &str {
        self.description.as_deref().unwrap_or("generic remote close")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeliveryId(pub(crate) usize);

#[derive(Debug)]
pub enum Event {
    ConnectionInit(u64),
    ConnectionLocalOpen(u64),
    ConnectionLocalClose(u64),
    ConnectionUnbound(u64),
    ConnectionFinal(u64),

    TransportHeadClosed(u64),
    TransportTailClosed(u64),
    TransportClosed(u64),
    TransportError(u64, Option<ErrorCondition>),
    /// Generic transport progress: something was produced or consumed
    /// and the caller should check `pending()`.
    Transport(u64),

    SessionInit(u64),
    SessionLocalOpen(u64),
    SessionLocalClose(u64),
    SessionFinal(u64),

    LinkLocalOpen {
        connection: u64,
        handle: u32,
        role: Role,
    },
    LinkRemoteOpen {
        connection: u64,
        handle: u32,
        role: Role,
        /// Best-effort marker for "this attach looks like a transaction
        /// coordinator link" (§4.6 link-remote-open). The wire layer has
        /// no distinct coordinator terminus type, so this approximates
        /// the real descriptor check by testing for a targetless attach;
        /// see DESIGN.md for the open-question resolution.
        is_coordinator: bool,
    },
    LinkRemoteClose {
        connection: u64,
        handle: u32,
        role: Role,
        condition: Option<ErrorCondition>,
    },
    LinkFinal {
        connection: u64,
        handle: u32,
        role: Role,
    },
    LinkFlow {
        connection: u64,
        handle: u32,
    },

    Delivery {
        connection: u64,
        handle: u32,
        role: Role,
        delivery: DeliveryId,
    },
}

impl Event {
    pub fn connection_id(&self) -> u64 {
        match self {
            Event::ConnectionInit(id)
            | Event::ConnectionLocalOpen(id)
            | Event::ConnectionLocalClose(id)
            | Event::ConnectionUnbound(id)
            | Event::ConnectionFinal(id)
            | Event::TransportHeadClosed(id)
            | Event::TransportTailClosed(id)
            | Event::TransportClosed(id)
            | Event::TransportError(id, _)
            | Event::Transport(id)
            | Event::SessionInit(id)
            | Event::SessionLocalOpen(id)
            | Event::SessionLocalClose(id)
            | Event::SessionFinal(id) => *id,
            Event::LinkLocalOpen { connection, .. }
            | Event::LinkRemoteOpen { connection, .. }
            | Event::LinkRemoteClose { connection, .. }
            | Event::LinkFinal { connection, .. }
            | Event::LinkFlow { connection, .. }
            | Event::Delivery { connection, .. } => *connection,
        }
    }
}

/// A FIFO of pending events, mirroring a proton `pn_collector_t`.
#[derive(Debug, Default)]
pub struct Collector {
    events: VecDeque<Event>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
