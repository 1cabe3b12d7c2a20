//! TCP transport for DNS queries.
//!
//! Used when a UDP reply comes back truncated. TCP DNS messages are
//! prefixed with a 2-byte big-endian length.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::Reply;
use crate::error::ExchangeError;

/// Send `wire` to `addr` over a fresh connection and read one reply.
pub async fn exchange(wire: &[u8], id: u16, addr: SocketAddr) -> Result<Reply, ExchangeError> {
    let mut stream = TcpStream::connect(addr).await?;

    let mut framed = Vec::with_capacity(wire.len() + 2);
    framed.extend_from_slice(&(wire.len() as u16).to_be_bytes());
    framed.extend_from_slice(wire);
    stream.write_all(&framed).await?;

    let response = read_dns_message(&mut stream).await?;

    Reply::decode(&response, id)
}

/// Read a length-prefixed DNS message, returning it without the prefix.
async fn read_dns_message(stream: &mut TcpStream) -> Result<Vec<u8>, ExchangeError> {
    let mut len = [0u8; 2];
    stream.read_exact(&mut len).await?;

    let mut buf = vec![0u8; u16::from_be_bytes(len) as usize];
    stream.read_exact(&mut buf).await?;

    Ok(buf)
}
