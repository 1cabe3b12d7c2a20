//! Error types.

use std::io;
use std::time::Duration;

use hickory_proto::error::ProtoError;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{Name, RecordType};
use thiserror::Error;

/// Failure of a single query to a single address.
///
/// Isolated to one `Response`; never aborts the step it belongs to.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("malformed message: {0}")]
    Proto(#[from] ProtoError),
    #[error("i/o timeout after {0:?}")]
    Timeout(Duration),
    #[error("response id {got} does not match query id {expected}")]
    IdMismatch { expected: u16, got: u16 },
}

/// Why a trace stopped without an answer.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{name} {rtype}: max retries exceeded, no {zone} nameserver answered after {attempts} attempts")]
    MaxRetriesExceeded {
        name: Name,
        rtype: RecordType,
        zone: Name,
        attempts: usize,
    },
    #[error("{name} {rtype}: unusable {rcode} response from {zone} nameservers")]
    Protocol {
        name: Name,
        rtype: RecordType,
        zone: Name,
        rcode: ResponseCode,
    },
    #[error("{name} {rtype}: CNAME chain longer than {limit} hops")]
    CnameChainTooLong {
        name: Name,
        rtype: RecordType,
        limit: usize,
    },
}

/// A failed trace, with the latency accumulated up to the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct TraceError {
    #[source]
    pub error: ResolveError,
    pub cold_path: Duration,
}

impl TraceError {
    pub fn new(error: ResolveError, cold_path: Duration) -> Self {
        Self { error, cold_path }
    }
}

/// Failure to find the addresses of a nameserver that came without glue.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("glue lookups nested deeper than {0} levels")]
    DepthExceeded(usize),
    #[error("no address records for {0}")]
    NoAddress(Name),
    #[error(transparent)]
    Trace(#[from] TraceError),
}
