//! Outgoing queries.

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query as Question};
use hickory_proto::rr::{Name, RecordType};

use crate::config::{Config, DEFAULT_UDP_SIZE};

/// One resolution request: target name, type and the protocol options
/// every message of the trace is sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub name: Name,
    pub rtype: RecordType,
    pub dnssec_ok: bool,
    pub udp_size: u16,
}

impl Query {
    pub fn new(mut name: Name, rtype: RecordType) -> Self {
        name.set_fqdn(true);
        Self {
            name,
            rtype,
            dnssec_ok: true,
            udp_size: DEFAULT_UDP_SIZE,
        }
    }

    /// Build a query carrying the protocol options from `config`.
    pub fn from_config(name: Name, rtype: RecordType, config: &Config) -> Self {
        Self {
            dnssec_ok: config.dnssec_ok,
            udp_size: config.udp_size,
            ..Self::new(name, rtype)
        }
    }

    /// The same protocol options pointed at another name and type.
    pub fn redirect(&self, name: Name, rtype: RecordType) -> Self {
        Self {
            dnssec_ok: self.dnssec_ok,
            udp_size: self.udp_size,
            ..Self::new(name, rtype)
        }
    }

    /// Encode as a non-recursive query message with a fresh id.
    ///
    /// The OPT record mimics what a recursive nameserver sends.
    pub fn to_message(&self) -> Message {
        let mut edns = Edns::new();
        edns.set_dnssec_ok(self.dnssec_ok);
        edns.set_max_payload(self.udp_size);

        let mut message = Message::new();
        message
            .set_id(rand::random())
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(false)
            .add_query(Question::query(self.name.clone(), self.rtype))
            .set_edns(edns);
        message
    }
}
