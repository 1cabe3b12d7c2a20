//! Per-trace delegation cache.

use std::rc::Rc;

use hickory_proto::rr::Name;
use rustc_hash::FxHashMap;

use crate::nameserver::Nameserver;

struct CacheEntry {
    generation: u64,
    nameservers: Vec<Rc<Nameserver>>,
}

/// Zone cut label -> nameserver set discovered for it.
///
/// Lives for one trace only, never expires and is never shared between traces.
/// Keys are lowercased so `Example.COM.` and `example.com.` are one zone cut.
#[derive(Default)]
pub struct DelegationCache {
    entries: FxHashMap<Name, CacheEntry>,
    generation: u64,
}

impl DelegationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the nameserver set for a zone cut, with the generation it was stored at.
    pub fn get(&self, label: &Name) -> Option<(u64, &[Rc<Nameserver>])> {
        self.entries
            .get(&label.to_lowercase())
            .map(|entry| (entry.generation, entry.nameservers.as_slice()))
    }

    /// Store the nameserver set for a zone cut, returning its generation.
    pub fn put(&mut self, label: Name, nameservers: Vec<Rc<Nameserver>>) -> u64 {
        self.generation += 1;
        self.entries.insert(
            label.to_lowercase(),
            CacheEntry {
                generation: self.generation,
                nameservers,
            },
        );
        self.generation
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
