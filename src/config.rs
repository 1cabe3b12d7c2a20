//! Trace configuration and root server hints.

use std::net::IpAddr;
use std::rc::Rc;
use std::time::Duration;

use hickory_proto::rr::Name;

use crate::nameserver::Nameserver;

/// Port every nameserver address is queried on.
pub const DNS_PORT: u16 = 53;

/// Maximum UDP payload advertised in the EDNS0 OPT record.
pub const DEFAULT_UDP_SIZE: u16 = 4096;

/// IANA root servers: (name, IPv4, IPv6).
const ROOT_SERVERS: &[(&str, &str, &str)] = &[
    ("a.root-servers.net.", "198.41.0.4", "2001:503:ba3e::2:30"),
    ("b.root-servers.net.", "170.247.170.2", "2801:1b8:10::b"),
    ("c.root-servers.net.", "192.33.4.12", "2001:500:2::c"),
    ("d.root-servers.net.", "199.7.91.13", "2001:500:2d::d"),
    ("e.root-servers.net.", "192.203.230.10", "2001:500:a8::e"),
    ("f.root-servers.net.", "192.5.5.241", "2001:500:2f::f"),
    ("g.root-servers.net.", "192.112.36.4", "2001:500:12::d0d"),
    ("h.root-servers.net.", "198.97.190.53", "2001:500:1::53"),
    ("i.root-servers.net.", "192.36.148.17", "2001:7fe::53"),
    ("j.root-servers.net.", "192.58.128.30", "2001:503:c27::2:30"),
    ("k.root-servers.net.", "193.0.14.129", "2001:7fd::1"),
    ("l.root-servers.net.", "199.7.83.42", "2001:500:9f::42"),
    ("m.root-servers.net.", "202.12.27.33", "2001:dc3::35"),
];

/// A nameserver the trace starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootHint {
    pub name: Name,
    pub addrs: Vec<IpAddr>,
}

/// Configuration for a trace.
#[derive(Debug, Clone)]
pub struct Config {
    /// Timeout for a single query to a single address.
    pub timeout: Duration,
    /// Attempts against one zone cut before the trace fails.
    pub max_retries: usize,
    /// Set the DO bit in the EDNS0 OPT record.
    pub dnssec_ok: bool,
    /// EDNS0 UDP payload size.
    pub udp_size: u16,
    /// Nesting limit for glue lookups that themselves need glue lookups.
    pub max_depth: usize,
    /// CNAME hops followed before giving up.
    pub max_cname_hops: usize,
    /// Query IPv6 addresses as well as IPv4 ones.
    pub ipv6: bool,
    pub root_hints: Vec<RootHint>,
}

impl Config {
    /// Replace the built-in root hints with explicit addresses.
    pub fn with_roots(mut self, addrs: Vec<IpAddr>) -> Self {
        if !addrs.is_empty() {
            self.root_hints = vec![RootHint {
                name: Name::root(),
                addrs,
            }];
        }
        self
    }

    /// The root hints as the nameserver set seeded for the `.` zone.
    pub fn root_nameservers(&self) -> Vec<Rc<Nameserver>> {
        self.root_hints
            .iter()
            .map(|hint| Rc::new(Nameserver::hint(hint.name.clone(), hint.addrs.clone())))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            max_retries: 10,
            dnssec_ok: true,
            udp_size: DEFAULT_UDP_SIZE,
            max_depth: 4,
            max_cname_hops: 16,
            ipv6: true,
            root_hints: default_root_hints(),
        }
    }
}

/// The IANA root server set.
pub fn default_root_hints() -> Vec<RootHint> {
    ROOT_SERVERS
        .iter()
        .filter_map(|(name, v4, v6)| {
            Some(RootHint {
                name: Name::from_ascii(name).ok()?,
                addrs: vec![v4.parse().ok()?, v6.parse().ok()?],
            })
        })
        .collect()
}
