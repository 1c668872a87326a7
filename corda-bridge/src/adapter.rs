//! The AMQP engine adapter (spec §4.2): owns the engine's Connection,
//! Transport (which in turn owns the Collector), constructed per the
//! five-step recipe spec.md lays out. Kept private — the orchestrator in
//! `state_machine` is the only consumer.

use uuid::Uuid;

use amqp_wire::engine::{Connection, Event, SaslConfig, Transport};

use crate::config::Config;

pub(crate) struct EngineAdapter {
    transport: Transport,
}

impl EngineAdapter {
    /// 1. Create connection, container id `CORDA:<uuid>`. 2. Create
    /// transport; set idle timeout / max frame size from `config`; enable
    /// emit-flow-event-on-send. 3. The collector is embedded in the
    /// connection already. 4. `sasl` is the caller's SASL configuration
    /// (§4.7). 5. Bind transport to connection. 6. If client mode, open
    /// the connection locally.
    pub(crate) fn new(server_mode: bool, sasl: SaslConfig, config: &Config) -> Self {
        let container_id = format!("CORDA:{}", Uuid::new_v4().to_hyphenated());
        let connection = Connection::new(container_id, server_mode);

        let mut transport = Transport::bind(connection, sasl);
        transport.set_idle_timeout(config.idle_timeout_ms);
        transport.set_max_frame_size(config.max_frame_size as usize);
        transport.set_emit_flow_event_on_send(true);

        if !server_mode {
            transport.connection_mut().open();
        }

        EngineAdapter { transport }
    }

    pub(crate) fn connection_id(&self) -> u64 {
        self.transport.connection().id()
    }

    pub(crate) fn pending(&mut self) -> isize {
        self.transport.pending()
    }

    pub(crate) fn process_input(&mut self, bytes: &[u8]) -> Result<usize, amqp_wire::Error> {
        self.transport.process_input(bytes)
    }

    pub(crate) fn next_event(&mut self) -> Option<Event> {
        self.transport.connection_mut().collector_mut().pop()
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.transport
    }

    pub(crate) fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }
}
