//! In-memory nameservers for tests.
//!
//! Each mock server is an address, a fixed delay and a handler producing
//! the reply for a question. Run tests with a paused tokio clock so the
//! delays become exact, deterministic RTTs.

use std::cell::RefCell;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::rc::Rc;
use std::time::Duration;

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::{A, CNAME, NS};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use rustc_hash::FxHashMap;
use tokio::time::sleep;

use crate::classify::ResponseType;
use crate::config::{Config, RootHint};
use crate::error::ExchangeError;
use crate::nameserver::Nameserver;
use crate::race::ResponseSet;
use crate::tracer::Tracer;
use crate::transport::{Exchange, Reply};

type Handler = Box<dyn Fn(&Name, RecordType) -> Result<Message, ExchangeError>>;

/// A scripted network. Addresses without a server refuse the connection.
#[derive(Default)]
pub struct MockNetwork {
    servers: FxHashMap<IpAddr, (Duration, Handler)>,
    log: RefCell<Vec<IpAddr>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server(
        mut self,
        addr: &str,
        delay_ms: u64,
        handler: impl Fn(&Name, RecordType) -> Result<Message, ExchangeError> + 'static,
    ) -> Self {
        self.servers.insert(
            addr.parse().unwrap(),
            (Duration::from_millis(delay_ms), Box::new(handler)),
        );
        self
    }

    /// Number of queries sent to `addr`.
    pub fn queries_to(&self, addr: &str) -> usize {
        let addr: IpAddr = addr.parse().unwrap();
        self.log.borrow().iter().filter(|sent| **sent == addr).count()
    }
}

impl Exchange for MockNetwork {
    async fn exchange(&self, query: &Message, addr: SocketAddr) -> Result<Reply, ExchangeError> {
        self.log.borrow_mut().push(addr.ip());

        let Some((delay, handler)) = self.servers.get(&addr.ip()) else {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused).into());
        };
        sleep(*delay).await;

        let question = query.queries()[0].clone();
        let mut message = handler(question.name(), question.query_type())?;
        message
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .add_query(question);
        let size = message.to_vec()?.len();

        Ok(Reply { message, size })
    }
}

pub fn name(s: &str) -> Name {
    Name::from_ascii(s).unwrap()
}

fn response() -> Message {
    let mut message = Message::new();
    message.set_message_type(MessageType::Response);
    message
}

/// An empty reply with the given response code.
pub fn rcode(code: ResponseCode) -> Message {
    let mut message = response();
    message.set_response_code(code).set_authoritative(true);
    message
}

/// A referral to `zone`; servers with an address get an A glue record.
pub fn referral(zone: &str, servers: &[(&str, Option<&str>)]) -> Message {
    let mut message = response();
    for (host, glue) in servers {
        message.add_name_server(Record::from_rdata(name(zone), 172800, RData::NS(NS(name(host)))));
        if let Some(addr) = glue {
            message.add_additional(Record::from_rdata(name(host), 172800, RData::A(A(addr.parse().unwrap()))));
        }
    }
    message
}

pub fn answer_a(owner: &str, addr: &str) -> Message {
    let mut message = response();
    message.set_authoritative(true);
    message.add_answer(Record::from_rdata(name(owner), 300, RData::A(A(addr.parse().unwrap()))));
    message
}

pub fn cname(owner: &str, target: &str) -> Message {
    let mut message = response();
    message.set_authoritative(true);
    message.add_answer(Record::from_rdata(name(owner), 300, RData::CNAME(CNAME(name(target)))));
    message
}

fn under(zone: &str, qname: &Name) -> bool {
    name(zone).zone_of(qname)
}

fn is(qname: &Name, expected: &str) -> bool {
    *qname == name(expected)
}

/// A single root hint pointing at the mock root server, IPv4 only.
pub fn test_config() -> Config {
    Config {
        ipv6: false,
        root_hints: vec![RootHint {
            name: name("a.root-servers.net."),
            addrs: vec!["198.41.0.4".parse().unwrap()],
        }],
        ..Config::default()
    }
}

/// A small internet:
///
/// | address      | server              | delay | serves                         |
/// |--------------|---------------------|-------|--------------------------------|
/// | 198.41.0.4   | a.root-servers.net  | 10ms  | `.` (com, net)                 |
/// | 192.5.6.30   | a.gtld-servers.net  | 20ms  | com, net                       |
/// | 192.0.2.1    | ns1.example.com     | 5ms   | example.com, example.net       |
/// | 203.0.113.1  | ns.other.net        | 30ms  | example.com, example.net       |
/// | 198.51.100.1 | ns1.other.net       | 15ms  | other.net                      |
/// | 192.0.2.50   | ns1.partial.com     | 8ms   | partial.com                    |
/// | 192.0.2.66   | ns.servfail.com     | 5ms   | SERVFAIL for everything        |
///
/// `ns.other.net` has no glue in the example.com/example.net referrals, and
/// `broken.com` is delegated to 192.0.2.99 where nothing listens.
pub fn world() -> MockNetwork {
    MockNetwork::new()
        .server("198.41.0.4", 10, |qname, _| {
            let gtld = [("a.gtld-servers.net.", Some("192.5.6.30"))];
            if under("com.", qname) {
                Ok(referral("com.", &gtld))
            } else if under("net.", qname) {
                Ok(referral("net.", &gtld))
            } else {
                Ok(rcode(ResponseCode::NXDomain))
            }
        })
        .server("192.5.6.30", 20, |qname, _| {
            let message = if under("example.com.", qname) {
                referral(
                    "example.com.",
                    &[("ns1.example.com.", Some("192.0.2.1")), ("ns.other.net.", None)],
                )
            } else if under("example.net.", qname) {
                referral("example.net.", &[("ns.other.net.", None)])
            } else if under("other.net.", qname) {
                referral("other.net.", &[("ns1.other.net.", Some("198.51.100.1"))])
            } else if under("broken.com.", qname) {
                referral("broken.com.", &[("ns.broken.com.", Some("192.0.2.99"))])
            } else if under("servfail.com.", qname) {
                referral("servfail.com.", &[("ns.servfail.com.", Some("192.0.2.66"))])
            } else if under("partial.com.", qname) {
                referral(
                    "partial.com.",
                    &[("ns.nowhere.org.", None), ("ns1.partial.com.", Some("192.0.2.50"))],
                )
            } else {
                rcode(ResponseCode::NXDomain)
            };
            Ok(message)
        })
        .server("192.0.2.1", 5, example_zones)
        .server("203.0.113.1", 30, example_zones)
        .server("198.51.100.1", 15, |qname, qtype| {
            if is(qname, "ns.other.net.") && qtype == RecordType::A {
                Ok(answer_a("ns.other.net.", "203.0.113.1"))
            } else {
                Ok(rcode(ResponseCode::NXDomain))
            }
        })
        .server("192.0.2.50", 8, |qname, _| {
            if is(qname, "www.partial.com.") {
                Ok(answer_a("www.partial.com.", "192.0.2.51"))
            } else {
                Ok(rcode(ResponseCode::NXDomain))
            }
        })
        .server("192.0.2.66", 5, |_, _| Ok(rcode(ResponseCode::ServFail)))
}

fn example_zones(qname: &Name, qtype: RecordType) -> Result<Message, ExchangeError> {
    let message = if is(qname, "www.example.com.") && qtype == RecordType::A {
        answer_a("www.example.com.", "93.184.216.34")
    } else if is(qname, "a.example.com.") {
        cname("a.example.com.", "b.example.com.")
    } else if is(qname, "chain.example.com.") {
        // The whole chain in one reply, the way authoritative servers send it.
        let mut message = cname("chain.example.com.", "b.example.com.");
        message.add_answer(Record::from_rdata(
            name("b.example.com."),
            300,
            RData::A(A("1.2.3.4".parse().unwrap())),
        ));
        message
    } else if is(qname, "b.example.com.") && qtype == RecordType::A {
        answer_a("b.example.com.", "1.2.3.4")
    } else if is(qname, "loop1.example.com.") {
        cname("loop1.example.com.", "loop2.example.com.")
    } else if is(qname, "loop2.example.com.") {
        cname("loop2.example.com.", "loop1.example.com.")
    } else if is(qname, "slow-glue.example.net.") && qtype == RecordType::A {
        answer_a("slow-glue.example.net.", "192.0.2.10")
    } else {
        rcode(ResponseCode::NXDomain)
    };
    Ok(message)
}

/// What a tracer saw for one step.
#[derive(Debug)]
pub struct StepRecord {
    pub index: usize,
    pub qname: Name,
    pub rtype: ResponseType,
    pub responses: usize,
}

/// Tracer that keeps everything it is told.
#[derive(Debug, Default)]
pub struct Recorder {
    pub steps: Vec<StepRecord>,
    pub cnames: Vec<(Name, Name)>,
    pub delegations: Vec<(Name, Vec<Nameserver>, bool)>,
}

impl Recorder {
    pub fn kinds(&self) -> Vec<ResponseType> {
        self.steps.iter().map(|step| step.rtype.clone()).collect()
    }
}

impl Tracer for Recorder {
    fn on_step(&mut self, step: usize, query: &Message, responses: &ResponseSet, rtype: &ResponseType) {
        self.steps.push(StepRecord {
            index: step,
            qname: query.queries()[0].name().clone(),
            rtype: rtype.clone(),
            responses: responses.len(),
        });
    }

    fn on_cname(&mut self, from: &Name, to: &Name) {
        self.cnames.push((from.clone(), to.clone()));
    }

    fn on_delegation(&mut self, zone: &Name, nameservers: &[Rc<Nameserver>], reused: bool) {
        let nameservers = nameservers.iter().map(|ns| Nameserver::clone(ns)).collect();
        self.delegations.push((zone.clone(), nameservers, reused));
    }
}
