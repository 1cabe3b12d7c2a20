//! The delegation walker.
//!
//! Starting from the root hints, each step races the query against the
//! current zone's nameservers and classifies the fastest reply:
//! 1. Answer / Error: the walk ends
//! 2. CNAME: restart from the root for the target
//! 3. Delegation: move to the child zone's nameservers (from the cache,
//!    or built from the referral, looking up servers that came without glue)
//!
//! A step where no server answered is repeated against the same zone, up to
//! the retry bound. Every step is reported to the tracer as it completes.

use std::net::IpAddr;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use hickory_proto::op::Message;
use hickory_proto::rr::{Name, RData, RecordType};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::DelegationCache;
use crate::classify::{ResponseType, classify};
use crate::config::Config;
use crate::error::{LookupError, ResolveError, TraceError};
use crate::nameserver::Nameserver;
use crate::query::Query;
use crate::race::{Racer, Response};
use crate::tracer::Tracer;
use crate::transport::Exchange;

/// A successful trace.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The reply that ended the walk.
    pub message: Message,
    /// Sum over steps of the fastest RTT plus what it cost to learn that
    /// server's address. Glue and cache hits add nothing for the lookup.
    pub cold_path: Duration,
    /// Queries sent, retries and CNAME restarts included.
    pub steps: usize,
}

/// Owns the state of one trace: its delegation cache and step counter.
pub struct Walker<'a, E> {
    exchange: &'a E,
    config: &'a Config,
    racer: Racer,
    cache: DelegationCache,
    step: usize,
    depth: usize,
}

impl<'a, E: Exchange> Walker<'a, E> {
    pub fn new(exchange: &'a E, config: &'a Config) -> Self {
        Self::at_depth(exchange, config, 0)
    }

    /// A walker with a fresh cache seeded with the root hints.
    fn at_depth(exchange: &'a E, config: &'a Config, depth: usize) -> Self {
        let mut cache = DelegationCache::new();
        cache.put(Name::root(), config.root_nameservers());

        Self {
            exchange,
            config,
            racer: Racer::from_config(config),
            cache,
            step: 0,
            depth,
        }
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &DelegationCache {
        &self.cache
    }

    pub fn steps(&self) -> usize {
        self.step
    }

    /// Walk from the root to the answer for `query`.
    pub async fn run<T: Tracer>(&mut self, query: &Query, mut tracer: T) -> Result<Resolution, TraceError> {
        let mut query = query.clone();
        let mut cold_path = Duration::ZERO;
        let mut hops = 0;

        'restart: loop {
            let mut zone = Name::root();
            let mut servers = self.root_servers();
            let mut reused = true;
            let mut failures = 0;

            loop {
                self.step += 1;
                let request = query.to_message();
                let responses = self.racer.race(self.exchange, &request, &servers, reused).await;

                let fastest = responses.fastest();
                let message = fastest.and_then(Response::message);
                let rtype = classify(message, &query.name, query.rtype, &zone);
                tracer.on_step(self.step, &request, &responses, &rtype);

                let (Some(fastest), Some(message)) = (fastest, message) else {
                    failures += 1;
                    warn!(step = self.step, %zone, attempt = failures, "no nameserver answered");
                    if failures < self.config.max_retries {
                        continue;
                    }
                    let error = ResolveError::MaxRetriesExceeded {
                        name: query.name.clone(),
                        rtype: query.rtype,
                        zone,
                        attempts: failures,
                    };
                    return Err(TraceError::new(error, cold_path));
                };

                cold_path += fastest.rtt + fastest.lookup_cost();
                debug!(
                    step = self.step,
                    server = %fastest.server.name,
                    addr = %fastest.addr,
                    rtt = ?fastest.rtt,
                    response = %rtype,
                    "step complete"
                );

                match rtype {
                    ResponseType::Answer => {
                        return Ok(Resolution {
                            message: message.clone(),
                            cold_path,
                            steps: self.step,
                        });
                    }
                    ResponseType::Error => {
                        let error = ResolveError::Protocol {
                            name: query.name.clone(),
                            rtype: query.rtype,
                            zone,
                            rcode: message.response_code(),
                        };
                        return Err(TraceError::new(error, cold_path));
                    }
                    ResponseType::Cname(target) => {
                        hops += 1;
                        if hops > self.config.max_cname_hops {
                            let error = ResolveError::CnameChainTooLong {
                                name: query.name.clone(),
                                rtype: query.rtype,
                                limit: self.config.max_cname_hops,
                            };
                            return Err(TraceError::new(error, cold_path));
                        }
                        tracer.on_cname(&query.name, &target);
                        query = query.redirect(target, query.rtype);
                        continue 'restart;
                    }
                    ResponseType::Delegation(label) => {
                        let cached = self.cache.get(&label).map(|(generation, set)| (generation, set.to_vec()));
                        let (nameservers, from_cache) = match cached {
                            Some((generation, set)) => {
                                debug!(zone = %label, generation, "reusing cached delegation");
                                (set, true)
                            }
                            None => {
                                let set = self.nameservers_for(&query, &label, message).await;
                                let generation = self.cache.put(label.clone(), set.clone());
                                debug!(
                                    zone = %label,
                                    generation,
                                    servers = set.len(),
                                    cached = self.cache.len(),
                                    "cached delegation"
                                );
                                (set, false)
                            }
                        };
                        tracer.on_delegation(&label, &nameservers, from_cache);

                        zone = label;
                        servers = nameservers;
                        reused = from_cache;
                        failures = 0;
                    }
                }
            }
        }
    }

    fn root_servers(&self) -> Vec<Rc<Nameserver>> {
        match self.cache.get(&Name::root()) {
            Some((_, servers)) => servers.to_vec(),
            None => self.config.root_nameservers(),
        }
    }

    /// Build the nameserver set of `zone` from a referral.
    ///
    /// Servers without glue are looked up with a nested walk; a failed lookup
    /// leaves that server without addresses but keeps the rest of the set.
    async fn nameservers_for(&self, query: &Query, zone: &Name, message: &Message) -> Vec<Rc<Nameserver>> {
        let mut nameservers: Vec<Rc<Nameserver>> = Vec::new();

        for rr in message.name_servers() {
            if rr.name() != zone {
                continue;
            }
            let Some(RData::NS(ns)) = rr.data() else {
                continue;
            };
            let host = &ns.0;
            if nameservers.iter().any(|existing| existing.name == *host) {
                continue;
            }

            let glue = self.glue(message, host);
            let nameserver = if glue.is_empty() {
                let start = Instant::now();
                let addrs = match self.lookup_host(query, host).await {
                    Ok(addrs) => addrs,
                    Err(e) => {
                        warn!(nameserver = %host, %zone, error = %e, "nameserver lookup failed");
                        Vec::new()
                    }
                };
                Nameserver::looked_up(host.clone(), addrs, start.elapsed(), rr.ttl())
            } else {
                Nameserver::with_glue(host.clone(), glue, rr.ttl())
            };
            nameservers.push(Rc::new(nameserver));
        }

        if !nameservers.iter().any(|ns| ns.is_usable()) {
            warn!(%zone, "no nameserver of the zone has an address");
        }
        nameservers
    }

    /// Addresses for `host` supplied in the additional section.
    fn glue(&self, message: &Message, host: &Name) -> Vec<IpAddr> {
        message
            .additionals()
            .iter()
            .filter(|rr| rr.name() == host)
            .filter_map(|rr| match rr.data()? {
                RData::A(a) => Some(IpAddr::V4(a.0)),
                RData::AAAA(aaaa) if self.config.ipv6 => Some(IpAddr::V6(aaaa.0)),
                _ => None,
            })
            .collect()
    }

    /// Resolve a nameserver's own address with a fresh walk from the root.
    ///
    /// The nested walk gets its own cache, so finding a zone's nameserver
    /// never depends on that zone's half-built entry. Boxed because the
    /// nested walk can itself need lookups.
    fn lookup_host<'b>(&'b self, query: &'b Query, host: &'b Name) -> LocalBoxFuture<'b, Result<Vec<IpAddr>, LookupError>> {
        async move {
            if self.depth >= self.config.max_depth {
                return Err(LookupError::DepthExceeded(self.config.max_depth));
            }

            let mut rtypes = vec![RecordType::A];
            if self.config.ipv6 {
                rtypes.push(RecordType::AAAA);
            }

            let mut last_error = None;
            for rtype in rtypes {
                let mut nested = Walker::at_depth(self.exchange, self.config, self.depth + 1);
                match nested.run(&query.redirect(host.clone(), rtype), ()).await {
                    Ok(resolution) => {
                        let addrs = addresses(&resolution.message);
                        if !addrs.is_empty() {
                            debug!(nameserver = %host, ?addrs, steps = nested.steps(), "looked up nameserver");
                            return Ok(addrs);
                        }
                    }
                    Err(e) => last_error = Some(e),
                }
            }

            Err(match last_error {
                Some(e) => e.into(),
                None => LookupError::NoAddress(host.clone()),
            })
        }
        .boxed_local()
    }
}

/// Address records in an answer section.
fn addresses(message: &Message) -> Vec<IpAddr> {
    message
        .answers()
        .iter()
        .filter_map(|rr| match rr.data()? {
            RData::A(a) => Some(IpAddr::V4(a.0)),
            RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
            _ => None,
        })
        .collect()
}
