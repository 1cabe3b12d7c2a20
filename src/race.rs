//! Racing one query against every address of a nameserver set.
//!
//! All addresses are queried at once and every outcome is collected, the
//! slow ones included: the trace output reports timing and errors for each
//! server, not just the winner. The fastest successful reply is elected
//! afterwards by RTT.

use std::net::{IpAddr, SocketAddr};
use std::rc::Rc;
use std::time::Duration;

use futures::future::join_all;
use hickory_proto::op::Message;
use tokio::time::{Instant, timeout};
use tracing::debug;

use crate::config::{Config, DNS_PORT};
use crate::error::ExchangeError;
use crate::nameserver::Nameserver;
use crate::transport::{Exchange, Reply};

/// One server's answer to one query at one step.
#[derive(Debug)]
pub struct Response {
    pub server: Rc<Nameserver>,
    pub addr: IpAddr,
    pub reply: Result<Reply, ExchangeError>,
    pub rtt: Duration,
    /// The nameserver set was taken from the delegation cache, so finding
    /// its addresses cost nothing for this step.
    pub reused: bool,
}

impl Response {
    pub fn message(&self) -> Option<&Message> {
        self.reply.as_ref().ok().map(|reply| &reply.message)
    }

    pub fn error(&self) -> Option<&ExchangeError> {
        self.reply.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.reply.is_ok()
    }

    /// Bytes received, zero on error.
    pub fn size(&self) -> usize {
        self.reply.as_ref().map_or(0, |reply| reply.size)
    }

    /// What it cost to learn this server's address before querying it.
    pub fn lookup_cost(&self) -> Duration {
        if self.reused || self.server.has_glue {
            Duration::ZERO
        } else {
            self.server.lookup_rtt
        }
    }
}

/// Every response of one step, in dispatch order.
#[derive(Debug, Default)]
pub struct ResponseSet {
    responses: Vec<Response>,
}

impl ResponseSet {
    pub fn new(responses: Vec<Response>) -> Self {
        Self { responses }
    }

    /// The successful response with the smallest RTT.
    ///
    /// Ties go to the one dispatched first. `None` when every address failed.
    pub fn fastest(&self) -> Option<&Response> {
        self.responses
            .iter()
            .filter(|response| response.is_ok())
            .min_by_key(|response| response.rtt)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Response> {
        self.responses.iter()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResponseSet {
    type Item = &'a Response;
    type IntoIter = std::slice::Iter<'a, Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}

/// Fans a query out to a nameserver set and fans the results back in.
#[derive(Debug, Clone)]
pub struct Racer {
    timeout: Duration,
    ipv6: bool,
}

impl Racer {
    pub fn new(timeout: Duration, ipv6: bool) -> Self {
        Self { timeout, ipv6 }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.timeout, config.ipv6)
    }

    /// Query every address of `servers` concurrently and wait for all of them.
    ///
    /// Each exchange is bounded by the per-query timeout; a timeout becomes an
    /// error response for that address and nothing else.
    pub async fn race<E: Exchange>(
        &self,
        exchange: &E,
        query: &Message,
        servers: &[Rc<Nameserver>],
        reused: bool,
    ) -> ResponseSet {
        let ipv6 = self.ipv6;
        let attempts = servers.iter().flat_map(move |server| {
            server
                .addrs
                .iter()
                .filter(move |addr| ipv6 || addr.is_ipv4())
                .map(move |addr| (server, *addr))
        });

        let futures = attempts.map(|(server, addr)| async move {
            let start = Instant::now();
            let reply = match timeout(self.timeout, exchange.exchange(query, SocketAddr::new(addr, DNS_PORT))).await {
                Ok(reply) => reply,
                Err(_) => Err(ExchangeError::Timeout(self.timeout)),
            };
            let rtt = start.elapsed();

            if let Err(e) = &reply {
                debug!(server = %server.name, %addr, error = %e, "query failed");
            }

            Response {
                server: Rc::clone(server),
                addr,
                reply,
                rtt,
                reused,
            }
        });

        ResponseSet::new(join_all(futures).await)
    }
}
