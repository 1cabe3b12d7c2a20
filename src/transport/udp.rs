//! UDP transport for DNS queries.
//!
//! One ephemeral socket per query, connected to the nameserver so the
//! kernel drops datagrams from other sources. Replies whose id does not
//! match the query are discarded and the socket keeps listening.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::trace;

use super::Reply;
use crate::error::ExchangeError;

/// Send `wire` to `addr` and wait for a reply carrying `id`.
///
/// `payload` is the UDP size the query advertised; larger datagrams would
/// be cut short.
pub async fn exchange(wire: &[u8], id: u16, addr: SocketAddr, payload: usize) -> Result<Reply, ExchangeError> {
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(addr).await?;
    socket.send(wire).await?;

    let mut buf = vec![0u8; payload];
    loop {
        let len = socket.recv(&mut buf).await?;

        if len < 12 {
            continue;
        }

        let reply_id = u16::from_be_bytes([buf[0], buf[1]]);
        if reply_id != id {
            trace!(server = %addr, expected = id, got = reply_id, "dropping reply with unexpected id");
            continue;
        }

        return Reply::decode(&buf[..len], id);
    }
}
