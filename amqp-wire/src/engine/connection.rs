//! The engine-level connection object: container id, open/close state,
//! the one logical session, and the event collector.

use std::sync::atomic::{AtomicU64, Ordering};

use super::event::{Collector, Event};
use super::session::{Session, SessionLifecycle};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unopened,
    Opened,
    Closed,
}

#[derive(Debug)]
pub struct Connection {
    id: u64,
    pub container_id: String,
    pub hostname: Option<String>,
    pub server_mode: bool,
    pub state: ConnectionState,
    pub remote_opened: bool,
    pub(crate) session_requested: bool,
    session: Session,
    collector: Collector,
    session_finalized: bool,
}

impl Connection {
    pub fn new(container_id: impl Into<String>, server_mode: bool) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let mut collector = Collector::new();
        collector.push(Event::ConnectionInit(id));
        collector.push(Event::SessionInit(id));
        Connection {
            id,
            container_id: container_id.into(),
            hostname: None,
            server_mode,
            state: ConnectionState::Unopened,
            remote_opened: false,
            session_requested: false,
            session: Session::new(),
            collector,
            session_finalized: false,
        }
    }

    /// The arena id stale-event checks compare against (§9 design note).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Marks the connection locally open. Actual `open` frame emission is
    /// gated by the transport on protocol header negotiation completing.
    pub fn open(&mut self) {
        if self.state == ConnectionState::Unopened {
            self.state = ConnectionState::Opened;
            self.collector.push(Event::ConnectionLocalOpen(self.id));
        }
    }

    pub fn close(&mut self) {
        if self.state != ConnectionState::Closed {
            if self.session.state != SessionLifecycle::Unmapped {
                self.session.state = SessionLifecycle::EndSent;
                self.collector.push(Event::SessionLocalClose(self.id));
            }
            self.state = ConnectionState::Closed;
            self.collector.push(Event::ConnectionLocalClose(self.id));
        }
    }

    /// Requests the one logical session be opened; pushed eagerly rather
    /// than waiting for the `begin` frame to actually flush, mirroring
    /// proton's synchronous `pn_session_open()`.
    pub fn request_session_open(&mut self) {
        if !self.session_requested {
            self.session_requested = true;
            self.session.state = SessionLifecycle::BeginSent;
            self.collector.push(Event::SessionLocalOpen(self.id));
        }
    }

    /// Forces the session's terminal event if it hasn't already fired;
    /// called both from normal transport teardown and from
    /// session-final's own "cover disconnection before remote session
    /// open" forced-cleanup path (§4.6).
    pub(crate) fn finalize_session(&mut self) {
        if !self.session_finalized {
            self.session_finalized = true;
            self.collector.push(Event::SessionFinal(self.id));
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn collector_mut(&mut self) -> &mut Collector {
        &mut self.collector
    }

    pub(crate) fn push_event(&mut self, event: Event) {
        self.collector.push(event);
    }

    pub fn session_opened(&self) -> bool {
        self.session.state != SessionLifecycle::Unmapped
    }
}
