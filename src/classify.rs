//! Deciding what a reply means for the walk.

use std::fmt;

use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};

/// What a step's fastest reply tells the walker to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseType {
    /// Continue one level down, at the zone cut with this label.
    Delegation(Name),
    /// Restart resolution for this target.
    Cname(Name),
    /// Terminal: the records asked for, or an authoritative negative answer.
    Answer,
    /// Terminal failure, or no reply at all when the step itself failed.
    Error,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delegation(zone) => write!(f, "delegation to {zone}"),
            Self::Cname(target) => write!(f, "CNAME to {target}"),
            Self::Answer => f.write_str("answer"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Classify the reply to `qname`/`qtype` received from the nameservers of `zone`.
///
/// `message` is `None` when no server answered.
pub fn classify(message: Option<&Message>, qname: &Name, qtype: RecordType, zone: &Name) -> ResponseType {
    let Some(message) = message else {
        return ResponseType::Error;
    };

    match message.response_code() {
        ResponseCode::NoError => {}
        ResponseCode::NXDomain => return ResponseType::Answer,
        _ => return ResponseType::Error,
    }

    // Only records owned by the query name count. A chain answered in one
    // reply (`a CNAME b`, `b A ...`) is still a CNAME hop for `a`.
    if message
        .answers()
        .iter()
        .any(|rr| rr.name() == qname && (rr.record_type() == qtype || qtype == RecordType::ANY))
    {
        return ResponseType::Answer;
    }

    if let Some(target) = cname_target(message, qname) {
        return ResponseType::Cname(target);
    }

    if let Some(label) = referral(message) {
        if zone.zone_of(&label) && label != *zone && label.zone_of(qname) {
            return ResponseType::Delegation(label);
        }
        // Authority data naming the zone itself (or something unrelated)
        // is only acceptable from an authoritative server.
        if !message.authoritative() {
            return ResponseType::Error;
        }
    }

    ResponseType::Answer
}

/// Target of the CNAME owned by `qname`, if the answer section starts a chain.
fn cname_target(message: &Message, qname: &Name) -> Option<Name> {
    message.answers().iter().find_map(|rr| {
        if rr.name() != qname {
            return None;
        }
        match rr.data() {
            Some(RData::CNAME(cname)) => Some(cname.0.clone()),
            _ => None,
        }
    })
}

/// Owner name of the first NS record in the authority section.
pub fn referral(message: &Message) -> Option<Name> {
    message
        .name_servers()
        .iter()
        .find(|rr| rr.record_type() == RecordType::NS)
        .map(|rr| rr.name().clone())
}
