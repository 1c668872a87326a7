//! SASL negotiation frames (AMQP 1.0 §5.3). The bridge only ever drives
//! `PLAIN` or `ANONYMOUS` (see [`crate::engine::SaslConfig`]); `ScramSha1`
//! is kept because real peers advertise it in their mechanism list and we
//! must still be able to decode `sasl-mechanisms`.

use amqp_wire_macros::amqp;
use serde::{Deserialize, Serialize};
use serde_bytes::Bytes;

use crate::Described;

#[amqp]
#[derive(Debug, Serialize)]
pub enum Frame<'a> {
    Mechanisms(Mechanisms),
    Init(Init<'a>),
    Challenge(Challenge<'a>),
    Response(Response<'a>),
    Outcome(Outcome<'a>),
}

#[amqp(descriptor("amqp:sasl-mechanisms:list", 0x00000000_00000040))]
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename = "amqp:sasl-mechanisms:list")]
pub struct Mechanisms {
    pub sasl_server_mechanisms: Vec<Mechanism>,
}

#[amqp(descriptor("amqp:sasl-init:list", 0x00000000_00000041))]
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename = "amqp:sasl-init:list")]
pub struct Init<'a> {
    pub mechanism: Mechanism,
    #[serde(borrow)]
    pub initial_response: Option<&'a Bytes>,
    pub hostname: Option<&'a str>,
}

#[amqp(descriptor("amqp:sasl-challenge:list", 0x00000000_00000042))]
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename = "amqp:sasl-challenge:list")]
pub struct Challenge<'a>(#[serde(borrow)] pub &'a Bytes);

#[amqp(descriptor("amqp:sasl-response:list", 0x00000000_00000043))]
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename = "amqp:sasl-response:list")]
pub struct Response<'a>(#[serde(borrow)] pub &'a Bytes);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mechanism {
    Anonymous,
    Plain,
    ScramSha1,
}

#[amqp(descriptor("amqp:sasl-outcome:list", 0x00000000_00000044))]
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename = "amqp:sasl-outcome:list")]
pub struct Outcome<'a> {
    pub code: Code,
    #[serde(borrow)]
    pub additional_data: Option<&'a Bytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Code {
    Ok,
    Auth,
    Sys,
    SysPerm,
    SysTemp,
}
