//! Two pure functions bridging application messages and AMQP wire
//! messages (spec §4.1). `encode` pools its working buffer and copies out
//! an owned array before releasing it (§9 "Scoped buffer release");
//! `decode`/`extract_received` turn an inbound delivery's raw bytes into a
//! `ReceivedMessage`.

use std::borrow::Cow;
use std::collections::HashMap;

use amqp_wire::engine::buffer::BufferPool;
use amqp_wire::{Any, ApplicationProperties, Body, Data, Header, Message};
use serde_bytes::Bytes;

use crate::error::Error;
use crate::message::{DeliveryHandle, ReceivedMessage, SendableMessage};

/// Conventional key carrying the authenticated peer identity (spec §6).
pub const VALIDATED_USER_KEY: &str = "_AMQ_VALIDATED_USER";

/// Builds `body = Data(payload)`, `durable = true`, empty `properties`,
/// and an application-properties map formed by copying the caller's
/// properties and setting the authenticated-user key to `local_legal_name`
/// — then encodes to a pooled buffer and copies out an owned array.
pub fn encode(
    msg: &SendableMessage,
    local_legal_name: &str,
    pool: &BufferPool,
) -> Result<Vec<u8>, Error> {
    let mut properties: HashMap<Cow<str>, Any> = msg
        .application_properties
        .iter()
        .map(|(k, v)| (Cow::Owned(k.clone()), Any::Str(Cow::Owned(v.clone()))))
        .collect();
    properties.insert(
        Cow::Borrowed(VALIDATED_USER_KEY),
        Any::Str(Cow::Owned(local_legal_name.to_string())),
    );

    let message = Message {
        header: Some(Header {
            durable: Some(true),
            ..Default::default()
        }),
        application_properties: Some(ApplicationProperties(properties)),
        body: Some(Body::Data(Data(Bytes::new(&msg.payload)))),
        ..Default::default()
    };

    let mut guard = pool.acquire();
    message.encode_into(guard.get_mut()).map_err(Error::Encode)?;
    Ok(guard.get_mut().clone())
}

/// Decodes a readable, non-partial delivery's raw bytes into an AMQP
/// message. The caller is responsible for confirming `readable ∧
/// ¬partial` before calling (spec §4.1).
pub fn decode(bytes: &[u8]) -> Result<Message<'_>, amqp_wire::Error> {
    Message::from_bytes(bytes)
}

/// Synthesizes a `ReceivedMessage` from a decoded AMQP message, augmenting
/// application properties with the authenticated remote identity (spec §3,
/// §6) under the same conventional key `encode` uses for the local side —
/// see §9's open question: this is a trust assertion internal to the
/// messaging fabric and must not be exposed to untrusted peers.
pub fn extract_received(
    message: &Message<'_>,
    source: &str,
    remote_legal_name: &str,
    local_legal_name: &str,
    remote_endpoint: (String, u16),
    local_endpoint: (String, u16),
    delivery_handle: DeliveryHandle,
) -> ReceivedMessage {
    let payload = match &message.body {
        Some(Body::Data(data)) => data.0.to_vec(),
        _ => Vec::new(),
    };

    let mut application_properties = HashMap::new();
    if let Some(ApplicationProperties(props)) = &message.application_properties {
        for (k, v) in props {
            application_properties.insert(k.to_string(), any_to_string(v));
        }
    }
    application_properties.insert(VALIDATED_USER_KEY.to_string(), remote_legal_name.to_string());

    ReceivedMessage {
        payload,
        source: source.to_string(),
        remote_legal_name: remote_legal_name.to_string(),
        remote_endpoint,
        local_legal_name: local_legal_name.to_string(),
        local_endpoint,
        application_properties,
        delivery_handle,
    }
}

fn any_to_string(value: &Any<'_>) -> String {
    match value {
        Any::None => String::new(),
        Any::Bool(b) => b.to_string(),
        Any::U8(v) => v.to_string(),
        Any::U16(v) => v.to_string(),
        Any::U32(v) => v.to_string(),
        Any::U64(v) => v.to_string(),
        Any::I8(v) => v.to_string(),
        Any::I16(v) => v.to_string(),
        Any::I32(v) => v.to_string(),
        Any::I64(v) => v.to_string(),
        Any::F32(v) => v.to_string(),
        Any::F64(v) => v.to_string(),
        Any::Bytes(b) => b.iter().map(|byte| format!("{:02x}", byte)).collect(),
        Any::Symbol(s) | Any::Str(s) => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_payload_and_properties() {
        let pool = BufferPool::new();
        let mut props = HashMap::new();
        props.insert("id".to_string(), "u1".to_string());
        let msg = SendableMessage::new("addr1".to_string(), vec![0xDE, 0xAD], props);

        let bytes = encode(&msg, "clientLegalName", &pool).expect("encode");
        let decoded = decode(&bytes).expect("decode");
        let received = extract_received(
            &decoded,
            "addr1",
            "clientLegalName",
            "serverLegalName",
            ("10.0.0.2".to_string(), 10001),
            ("10.0.0.1".to_string(), 10000),
            DeliveryHandle {
                link_handle: 0,
                delivery: test_delivery_id(),
            },
        );

        assert_eq!(received.payload, vec![0xDE, 0xAD]);
        assert_eq!(
            received.application_properties.get(VALIDATED_USER_KEY),
            Some(&"clientLegalName".to_string())
        );
        assert_eq!(received.application_properties.get("id"), Some(&"u1".to_string()));
    }

    fn test_delivery_id() -> amqp_wire::engine::DeliveryId {
        let mut connection = amqp_wire::engine::Connection::new("test", false);
        let sender = connection.session_mut().create_sender("s1".to_string());
        sender.new_delivery(vec![0, 0, 0, 1])
    }
}
