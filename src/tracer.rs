//! Observer hooks invoked by the walker.
//!
//! Hooks are called in-line, in step order, and never influence the walk.

use std::rc::Rc;

use hickory_proto::op::Message;
use hickory_proto::rr::Name;

use crate::classify::ResponseType;
use crate::nameserver::Nameserver;
use crate::race::ResponseSet;

/// Receives every step of a trace as it happens. All hooks default to no-ops.
pub trait Tracer {
    /// Called once per query sent, retries included.
    fn on_step(&mut self, _step: usize, _query: &Message, _responses: &ResponseSet, _rtype: &ResponseType) {}

    /// Called once per CNAME hop, before resolution restarts at the root.
    fn on_cname(&mut self, _from: &Name, _to: &Name) {}

    /// Called after a delegation step with the nameserver set of the new zone cut.
    ///
    /// `reused` is set when the set came from the delegation cache.
    fn on_delegation(&mut self, _zone: &Name, _nameservers: &[Rc<Nameserver>], _reused: bool) {}
}

/// The silent tracer, used for glue lookups.
impl Tracer for () {}

impl<T: Tracer + ?Sized> Tracer for &mut T {
    fn on_step(&mut self, step: usize, query: &Message, responses: &ResponseSet, rtype: &ResponseType) {
        (**self).on_step(step, query, responses, rtype);
    }

    fn on_cname(&mut self, from: &Name, to: &Name) {
        (**self).on_cname(from, to);
    }

    fn on_delegation(&mut self, zone: &Name, nameservers: &[Rc<Nameserver>], reused: bool) {
        (**self).on_delegation(zone, nameservers, reused);
    }
}
