//! Candidate nameservers for a zone cut.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use hickory_proto::rr::Name;

/// A nameserver discovered in a delegation (or seeded from the root hints).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nameserver {
    pub name: Name,
    pub addrs: Vec<IpAddr>,
    /// Addresses came from the additional section of the delegation.
    pub has_glue: bool,
    /// Cost of the nested resolution that found `addrs` when there was no glue.
    pub lookup_rtt: Duration,
    pub ttl: u32,
}

impl Nameserver {
    /// A nameserver whose addresses were supplied as glue.
    pub fn with_glue(name: Name, addrs: Vec<IpAddr>, ttl: u32) -> Self {
        Self {
            name,
            addrs,
            has_glue: true,
            lookup_rtt: Duration::ZERO,
            ttl,
        }
    }

    /// A nameserver whose addresses had to be looked up separately.
    ///
    /// `addrs` is empty when that lookup failed.
    pub fn looked_up(name: Name, addrs: Vec<IpAddr>, lookup_rtt: Duration, ttl: u32) -> Self {
        Self {
            name,
            addrs,
            has_glue: false,
            lookup_rtt,
            ttl,
        }
    }

    /// A root hint: known ahead of time, costs nothing.
    pub fn hint(name: Name, addrs: Vec<IpAddr>) -> Self {
        Self {
            name,
            addrs,
            has_glue: false,
            lookup_rtt: Duration::ZERO,
            ttl: 0,
        }
    }

    /// Whether this server can be queried at all.
    pub fn is_usable(&self) -> bool {
        !self.addrs.is_empty()
    }
}

impl fmt::Display for Nameserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
