//! dnswalk - trace DNS resolution from the root servers down.
//!
//! The walker follows delegations the way an iterative resolver does, but
//! queries every nameserver of each zone cut and reports each step (servers,
//! timings, glue, CNAME hops) to a [`Tracer`].

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod nameserver;
pub mod query;
pub mod race;
pub mod tracer;
pub mod transport;
pub mod walker;

#[cfg(test)]
mod testing;

pub use classify::ResponseType;
pub use config::Config;
pub use error::{ResolveError, TraceError};
pub use nameserver::Nameserver;
pub use query::Query;
pub use race::{Response, ResponseSet};
pub use tracer::Tracer;
pub use transport::{Exchange, NetworkExchange};
pub use walker::{Resolution, Walker};

/// Resolve `query` from the root, reporting every step to `tracer`.
///
/// Each call gets its own delegation cache and step counter. On failure the
/// error still carries the latency accumulated so far.
pub async fn recursive_query<E: Exchange, T: Tracer>(
    exchange: &E,
    config: &Config,
    query: &Query,
    tracer: T,
) -> Result<Resolution, TraceError> {
    Walker::new(exchange, config).run(query, tracer).await
}
