//! Graph genome with identifier-keyed vertex and edge storage.
//!
//! A [`GraphGenome`] is a directed graph stored as two independent ordered
//! maps: vertex id to vertex gene, and `(from, to)` pair to edge gene. There
//! are no pointers between vertices and edges, so self-loops, cycles and
//! both directions between a pair are all representable, and two genomes
//! align gene-by-gene simply by looking up the same keys.
//!
//! Ordered maps keep iteration order independent of insertion history,
//! which keeps seeded runs reproducible.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NeatError, Result};
use crate::gene::Gene;

/// Structural identifier of a vertex.
pub type VertexId = u32;

/// Identifier of a directed edge: the ordered pair of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source vertex.
    pub from: VertexId,
    /// Target vertex.
    pub to: VertexId,
}

impl EdgeKey {
    #[must_use]
    pub const fn new(from: VertexId, to: VertexId) -> Self {
        Self { from, to }
    }

    /// Pack both endpoints into one 64-bit key, `from` in the high half.
    #[inline]
    #[must_use]
    pub const fn zip(self) -> u64 {
        ((self.from as u64) << 32) | self.to as u64
    }

    /// Inverse of [`zip`](Self::zip).
    #[inline]
    #[must_use]
    pub const fn unzip(key: u64) -> Self {
        Self {
            from: (key >> 32) as VertexId,
            to: key as VertexId,
        }
    }

    #[must_use]
    pub const fn is_self_loop(self) -> bool {
        self.from == self.to
    }
}

impl From<(VertexId, VertexId)> for EdgeKey {
    fn from((from, to): (VertexId, VertexId)) -> Self {
        Self::new(from, to)
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// Order two optional fitness values; a missing fitness sorts lowest.
#[must_use]
pub fn compare_fitness(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// A graph-structured individual.
///
/// `V` and `E` are the vertex and edge payload types. The genome also keeps
/// one template payload of each kind, used to generate fresh genes when
/// mutations add structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphGenome<V, E> {
    vertices: BTreeMap<VertexId, V>,
    #[serde(with = "edge_map")]
    edges: BTreeMap<EdgeKey, E>,
    vertex_template: V,
    edge_template: E,
    /// Assigned externally after evaluation.
    #[serde(default)]
    fitness: Option<f64>,
}

impl<V: Gene, E: Gene> GraphGenome<V, E> {
    /// Create an empty genome that generates new genes from the templates.
    #[must_use]
    pub fn new(vertex_template: V, edge_template: E) -> Self {
        Self {
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            vertex_template,
            edge_template,
            fitness: None,
        }
    }

    /// Build a genome from existing vertices and edges.
    ///
    /// Fails with [`NeatError::DuplicateVertex`] if a vertex id repeats and
    /// [`NeatError::MissingVertex`] if an edge endpoint is absent.
    pub fn from_parts<K: Into<EdgeKey>>(
        vertex_template: V,
        edge_template: E,
        vertices: impl IntoIterator<Item = (VertexId, V)>,
        edges: impl IntoIterator<Item = (K, E)>,
    ) -> Result<Self> {
        let mut genome = Self::new(vertex_template, edge_template);
        for (id, gene) in vertices {
            if genome.vertices.insert(id, gene).is_some() {
                return Err(NeatError::DuplicateVertex { id });
            }
        }
        for (key, gene) in edges {
            let key = key.into();
            genome.add_edge(key.from, key.to, gene)?;
        }
        Ok(genome)
    }

    /// Template used for new vertex genes.
    #[must_use]
    pub fn vertex_template(&self) -> &V {
        &self.vertex_template
    }

    /// Template used for new edge genes.
    #[must_use]
    pub fn edge_template(&self) -> &E {
        &self.edge_template
    }

    /// Generate a fresh vertex payload from the template.
    pub fn generate_vertex<R: Rng>(&self, rng: &mut R) -> V {
        self.vertex_template.create_new(rng)
    }

    /// Generate a fresh edge payload from the template.
    pub fn generate_edge<R: Rng>(&self, rng: &mut R) -> E {
        self.edge_template.create_new(rng)
    }

    /// Insert a vertex, replacing (and returning) any gene already stored
    /// under `id`.
    pub fn add_vertex(&mut self, id: VertexId, gene: V) -> Option<V> {
        self.vertices.insert(id, gene)
    }

    /// Insert a vertex with a freshly generated gene.
    pub fn add_new_vertex<R: Rng>(&mut self, id: VertexId, rng: &mut R) -> Option<V> {
        let gene = self.generate_vertex(rng);
        self.add_vertex(id, gene)
    }

    /// Remove a vertex together with every edge touching it.
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<V> {
        let gene = self.vertices.remove(&id)?;
        self.edges.retain(|key, _| key.from != id && key.to != id);
        Some(gene)
    }

    /// Insert the edge `from -> to`, replacing (and returning) any gene
    /// already stored for that pair.
    ///
    /// Both endpoints must already be vertices of this genome.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, gene: E) -> Result<Option<E>> {
        for id in [from, to] {
            if !self.vertices.contains_key(&id) {
                return Err(NeatError::MissingVertex { id });
            }
        }
        Ok(self.edges.insert(EdgeKey::new(from, to), gene))
    }

    /// Insert the edge `from -> to` with a freshly generated gene.
    pub fn add_new_edge<R: Rng>(
        &mut self,
        from: VertexId,
        to: VertexId,
        rng: &mut R,
    ) -> Result<Option<E>> {
        let gene = self.generate_edge(rng);
        self.add_edge(from, to, gene)
    }

    pub fn remove_edge(&mut self, from: VertexId, to: VertexId) -> Option<E> {
        self.edges.remove(&EdgeKey::new(from, to))
    }

    #[inline]
    #[must_use]
    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    #[inline]
    #[must_use]
    pub fn contains_edge(&self, from: VertexId, to: VertexId) -> bool {
        self.edges.contains_key(&EdgeKey::new(from, to))
    }

    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&V> {
        self.vertices.get(&id)
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut V> {
        self.vertices.get_mut(&id)
    }

    #[must_use]
    pub fn edge(&self, from: VertexId, to: VertexId) -> Option<&E> {
        self.edges.get(&EdgeKey::new(from, to))
    }

    pub fn edge_mut(&mut self, from: VertexId, to: VertexId) -> Option<&mut E> {
        self.edges.get_mut(&EdgeKey::new(from, to))
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Vertices in ascending id order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &V)> + '_ {
        self.vertices.iter().map(|(&id, gene)| (id, gene))
    }

    pub fn vertices_mut(&mut self) -> impl Iterator<Item = (VertexId, &mut V)> + '_ {
        self.vertices.iter_mut().map(|(&id, gene)| (id, gene))
    }

    /// Vertex ids in ascending order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys().copied()
    }

    /// Edges in ascending `(from, to)` order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &E)> + '_ {
        self.edges.iter().map(|(&key, gene)| (key, gene))
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = (EdgeKey, &mut E)> + '_ {
        self.edges.iter_mut().map(|(&key, gene)| (key, gene))
    }

    /// Edge keys in ascending `(from, to)` order.
    pub fn edge_keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges.keys().copied()
    }

    /// Outgoing edges of `id`, in ascending target order.
    pub fn successors(&self, id: VertexId) -> impl Iterator<Item = (VertexId, &E)> + '_ {
        self.edges
            .range(EdgeKey::new(id, VertexId::MIN)..=EdgeKey::new(id, VertexId::MAX))
            .map(|(key, gene)| (key.to, gene))
    }

    /// Highest vertex id present, if any.
    #[must_use]
    pub fn max_vertex_id(&self) -> Option<VertexId> {
        self.vertices.keys().next_back().copied()
    }

    /// True when every ordered pair of vertices, self-loops included, is
    /// already an edge.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        let n = self.vertices.len();
        self.edges.len() == n * n
    }

    /// Check that every edge references vertices present in the genome.
    ///
    /// Mutation through this API cannot break the invariant; a genome
    /// deserialized from untrusted data can.
    pub fn validate(&self) -> Result<()> {
        for key in self.edges.keys() {
            for id in [key.from, key.to] {
                if !self.vertices.contains_key(&id) {
                    return Err(NeatError::MissingVertex { id });
                }
            }
        }
        Ok(())
    }

    /// Same topology, every gene reinitialised, no fitness.
    #[must_use]
    pub fn create_new<R: Rng>(&self, rng: &mut R) -> Self {
        let vertices = self
            .vertices
            .iter()
            .map(|(&id, gene)| (id, gene.create_new(rng)))
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|(&key, gene)| (key, gene.create_new(rng)))
            .collect();
        Self {
            vertices,
            edges,
            vertex_template: self.vertex_template.clone(),
            edge_template: self.edge_template.clone(),
            fitness: None,
        }
    }

    /// Deep copy without the fitness, as handed to a new generation.
    #[must_use]
    pub fn offspring_clone(&self) -> Self {
        let mut child = self.clone();
        child.fitness = None;
        child
    }
}

impl<V, E> GraphGenome<V, E> {
    #[inline]
    #[must_use]
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    pub fn clear_fitness(&mut self) {
        self.fitness = None;
    }

    /// Compare by fitness only; a genome without fitness sorts lowest.
    #[must_use]
    pub fn compare_fitness(&self, other: &Self) -> Ordering {
        compare_fitness(self.fitness, other.fitness)
    }
}

/// JSON object keys must be strings, so edges serialize as a list of
/// `(key, gene)` pairs.
mod edge_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::EdgeKey;

    pub fn serialize<E, S>(edges: &BTreeMap<EdgeKey, E>, serializer: S) -> Result<S::Ok, S::Error>
    where
        E: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(edges.iter())
    }

    pub fn deserialize<'de, E, D>(deserializer: D) -> Result<BTreeMap<EdgeKey, E>, D::Error>
    where
        E: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let entries: Vec<(EdgeKey, E)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
