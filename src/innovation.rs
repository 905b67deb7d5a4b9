//! Historical markings for structural mutations.
//!
//! Alignment during speciation and crossover only works if genomes that made
//! the same structural change agree on the identifier of the structure they
//! created. The [`IdFactory`] hands out globally increasing vertex ids and
//! remembers, for the current epoch (one generation), which structural key
//! produced which id:
//!
//! - Splitting edge `(from, to)` asks for the id keyed by that edge.
//! - Sprouting a vertex off `v` asks for the id keyed by `v`.
//!
//! Two unrelated genomes that split the same edge in the same generation
//! therefore receive the same new vertex id. Starting a new epoch forgets
//! the cache but never rewinds the counter, so the next request for any key
//! gets a fresh, strictly larger id.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{NeatError, Result};
use crate::genome::{EdgeKey, VertexId};

/// Key of a structural mutation that requests a new vertex id.
///
/// Edge and vertex keys live in separate namespaces: splitting edge `0 -> 5`
/// and sprouting off vertex `5` never share an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralKey {
    /// A vertex placed on the edge whose endpoints zip into this key.
    Edge(u64),
    /// A vertex sprouted from the given vertex.
    Vertex(VertexId),
}

impl StructuralKey {
    #[must_use]
    pub const fn edge(from: VertexId, to: VertexId) -> Self {
        Self::Edge(EdgeKey::new(from, to).zip())
    }

    #[must_use]
    pub const fn vertex(id: VertexId) -> Self {
        Self::Vertex(id)
    }
}

#[derive(Debug, Default)]
struct FactoryState {
    /// Next id to issue. Kept wider than `VertexId` so exhaustion is
    /// detectable instead of wrapping.
    next_id: u64,
    epoch: u64,
    cache: HashMap<StructuralKey, VertexId>,
}

/// Thread-safe issuer of structural identifiers.
///
/// Counter and cache sit behind one lock, so a lookup, an insert and the
/// increment always happen as a unit even when offspring are produced on
/// several worker threads. Share it as `Arc<IdFactory>`.
#[derive(Debug, Default)]
pub struct IdFactory {
    state: Mutex<FactoryState>,
}

impl IdFactory {
    /// A factory whose first id is 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose first id is `next_id`.
    #[must_use]
    pub fn starting_at(next_id: VertexId) -> Self {
        Self {
            state: Mutex::new(FactoryState {
                next_id: u64::from(next_id),
                ..Default::default()
            }),
        }
    }

    /// Identifier for `key`: the cached one if `key` was already requested
    /// this epoch, otherwise the next counter value.
    pub fn get_id(&self, key: StructuralKey) -> Result<VertexId> {
        let mut state = self.state.lock();
        if let Some(&id) = state.cache.get(&key) {
            return Ok(id);
        }
        let id = VertexId::try_from(state.next_id).map_err(|_| NeatError::IdSpaceExhausted)?;
        state.next_id += 1;
        state.cache.insert(key, id);
        trace!(?key, id, epoch = state.epoch, "issued structural id");
        Ok(id)
    }

    /// Identifier of a vertex placed on the edge `from -> to`.
    pub fn edge_id(&self, from: VertexId, to: VertexId) -> Result<VertexId> {
        self.get_id(StructuralKey::edge(from, to))
    }

    /// Identifier of a vertex sprouted from `id`.
    pub fn vertex_id(&self, id: VertexId) -> Result<VertexId> {
        self.get_id(StructuralKey::vertex(id))
    }

    /// Forget every cached key. The counter keeps its value.
    pub fn reset_epoch(&self) {
        let mut state = self.state.lock();
        state.cache.clear();
        state.epoch += 1;
    }

    /// The id the next uncached request will receive.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.state.lock().next_id
    }

    /// Number of epochs started since creation.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Number of keys remembered in the current epoch.
    #[must_use]
    pub fn cached_keys(&self) -> usize {
        self.state.lock().cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_uncached_ids_are_sequential() {
        let factory = IdFactory::new();
        assert_eq!(factory.edge_id(0, 0), Ok(0));
        assert_eq!(factory.edge_id(0, 1), Ok(1));
        assert_eq!(factory.edge_id(1, 0), Ok(2));
        assert_eq!(factory.vertex_id(0), Ok(3));
        assert_eq!(factory.vertex_id(1), Ok(4));
    }

    #[test]
    fn test_cached_ids_are_stable() {
        let factory = IdFactory::new();
        let first = factory.edge_id(0, 0).unwrap();
        assert_eq!(factory.edge_id(0, 0), Ok(first));
        let sprout = factory.vertex_id(1).unwrap();
        assert_eq!(factory.vertex_id(1), Ok(sprout));
        assert_eq!(factory.next_id(), 2);
    }

    #[test]
    fn test_edge_and_vertex_keys_do_not_collide() {
        let factory = IdFactory::new();
        // Edge 0 -> 5 zips to 5, the same integer as vertex key 5.
        let on_edge = factory.edge_id(0, 5).unwrap();
        let sprouted = factory.vertex_id(5).unwrap();
        assert_ne!(on_edge, sprouted);
    }

    #[test]
    fn test_reset_epoch_issues_fresh_ids() {
        let factory = IdFactory::new();
        factory.edge_id(0, 0).unwrap();
        factory.edge_id(0, 1).unwrap();
        factory.vertex_id(0).unwrap();
        factory.vertex_id(1).unwrap();
        factory.reset_epoch();

        assert_eq!(factory.epoch(), 1);
        assert_eq!(factory.cached_keys(), 0);
        assert_eq!(factory.edge_id(0, 0), Ok(4));
        assert_eq!(factory.edge_id(0, 1), Ok(5));
        assert_eq!(factory.vertex_id(0), Ok(6));
        assert_eq!(factory.vertex_id(1), Ok(7));
    }

    #[test]
    fn test_starting_at() {
        let factory = IdFactory::starting_at(3);
        assert_eq!(factory.edge_id(0, 1), Ok(3));
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let factory = IdFactory::starting_at(VertexId::MAX);
        assert_eq!(factory.edge_id(0, 1), Ok(VertexId::MAX));
        assert_eq!(factory.edge_id(1, 2), Err(NeatError::IdSpaceExhausted));
        // Cached keys still resolve after exhaustion.
        assert_eq!(factory.edge_id(0, 1), Ok(VertexId::MAX));
    }

    #[test]
    fn test_concurrent_requests_agree() {
        let factory = Arc::new(IdFactory::new());
        let results: Vec<Vec<VertexId>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let factory = Arc::clone(&factory);
                    scope.spawn(move || {
                        (0..50)
                            .map(|i| factory.edge_id(i, i + 1).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // Every thread saw the same id for the same key.
        for ids in &results[1..] {
            assert_eq!(ids, &results[0]);
        }
        // And distinct keys got distinct ids.
        let unique: HashSet<_> = results[0].iter().collect();
        assert_eq!(unique.len(), 50);
        assert_eq!(factory.next_id(), 50);
    }
}
