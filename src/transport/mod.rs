//! Transport layer for sending queries to nameservers.
//!
//! Every query goes out over UDP first. A truncated UDP reply is retried
//! over TCP, where DNS messages are prefixed with a 2-byte length.

pub mod tcp;
pub mod udp;

use std::net::SocketAddr;

use hickory_proto::op::{Edns, Message};
use tracing::trace;

use crate::error::ExchangeError;

/// Largest UDP reply a query without EDNS can receive.
const MIN_UDP_PAYLOAD: u16 = 512;

/// The UDP payload size `query` advertises, which bounds the reply.
fn udp_payload(query: &Message) -> usize {
    let advertised = query.extensions().as_ref().map_or(MIN_UDP_PAYLOAD, Edns::max_payload);
    usize::from(advertised.max(MIN_UDP_PAYLOAD))
}

/// A decoded reply and its size on the wire.
#[derive(Debug, Clone)]
pub struct Reply {
    pub message: Message,
    pub size: usize,
}

impl Reply {
    fn decode(wire: &[u8], expected_id: u16) -> Result<Self, ExchangeError> {
        let message = Message::from_vec(wire)?;
        if message.id() != expected_id {
            return Err(ExchangeError::IdMismatch {
                expected: expected_id,
                got: message.id(),
            });
        }
        Ok(Self {
            message,
            size: wire.len(),
        })
    }
}

/// Send one query to one address and wait for its reply.
///
/// Implementations do not apply a timeout; the racer bounds every exchange.
#[allow(async_fn_in_trait)]
pub trait Exchange {
    async fn exchange(&self, query: &Message, addr: SocketAddr) -> Result<Reply, ExchangeError>;
}

/// Exchange over the real network: UDP, falling back to TCP on truncation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkExchange;

impl Exchange for NetworkExchange {
    async fn exchange(&self, query: &Message, addr: SocketAddr) -> Result<Reply, ExchangeError> {
        let wire = query.to_vec()?;

        let reply = udp::exchange(&wire, query.id(), addr, udp_payload(query)).await?;
        if !reply.message.truncated() {
            return Ok(reply);
        }

        trace!(server = %addr, "UDP reply truncated, retrying over TCP");
        tcp::exchange(&wire, query.id(), addr).await
    }
}
