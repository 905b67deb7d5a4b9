//! Structural and value mutations on graph genomes.
//!
//! Every mutation rolls its own probability once per call and reports
//! whether it changed the genome. Probabilities outside `[0, 1]` are
//! rejected before any randomness is consumed.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use crate::error::{check_probability, Result};
use crate::gene::Gene;
use crate::genome::{GraphGenome, VertexId};
use crate::innovation::IdFactory;

/// An in-place genome mutation.
pub trait Mutation<V, E>: Send + Sync {
    /// Apply the mutation with the given probability. Returns `true` when
    /// the genome was touched.
    fn mutate<R: Rng>(
        &self,
        genome: &mut GraphGenome<V, E>,
        probability: f64,
        rng: &mut R,
    ) -> Result<bool>;
}

/// Adds one missing directed edge, self-loops included.
///
/// Candidate sources and targets are two independent shuffles of the vertex
/// ids; the first pair in that order that is not yet an edge is added with a
/// fresh gene. A saturated genome is left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddEdgeMutation;

impl<V: Gene, E: Gene> Mutation<V, E> for AddEdgeMutation {
    fn mutate<R: Rng>(
        &self,
        genome: &mut GraphGenome<V, E>,
        probability: f64,
        rng: &mut R,
    ) -> Result<bool> {
        check_probability("add_edge_probability", probability)?;
        if rng.random::<f64>() >= probability || genome.is_saturated() {
            return Ok(false);
        }

        let mut sources: Vec<VertexId> = genome.vertex_ids().collect();
        let mut targets = sources.clone();
        sources.shuffle(rng);
        targets.shuffle(rng);

        for &from in &sources {
            for &to in &targets {
                if !genome.contains_edge(from, to) {
                    genome.add_new_edge(from, to, rng)?;
                    trace!(from, to, "added edge");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// Replaces one edge `a -> b` with a new vertex `n` and the path
/// `a -> n -> b`.
///
/// `n` comes from the shared [`IdFactory`] keyed by `(a, b)`, so every genome
/// splitting the same edge in the same epoch agrees on it. The edge
/// `a -> n` keeps the removed edge's gene; `n -> b` gets a fresh one.
#[derive(Debug, Clone)]
pub struct SplitEdgeMutation {
    factory: Arc<IdFactory>,
}

impl SplitEdgeMutation {
    #[must_use]
    pub fn new(factory: Arc<IdFactory>) -> Self {
        Self { factory }
    }

    #[must_use]
    pub fn factory(&self) -> &Arc<IdFactory> {
        &self.factory
    }
}

impl<V: Gene, E: Gene> Mutation<V, E> for SplitEdgeMutation {
    fn mutate<R: Rng>(
        &self,
        genome: &mut GraphGenome<V, E>,
        probability: f64,
        rng: &mut R,
    ) -> Result<bool> {
        check_probability("split_edge_probability", probability)?;
        if rng.random::<f64>() >= probability || genome.edge_count() == 0 {
            return Ok(false);
        }

        let index = rng.random_range(0..genome.edge_count());
        let Some(key) = genome.edge_keys().nth(index) else {
            return Ok(false);
        };
        let vertex = self.factory.edge_id(key.from, key.to)?;
        if genome.contains_vertex(vertex) {
            // The edge was split before and re-added since.
            debug!(edge = %key, vertex, "split target already present, skipping");
            return Ok(false);
        }

        let Some(gene) = genome.remove_edge(key.from, key.to) else {
            return Ok(false);
        };
        genome.add_new_vertex(vertex, rng);
        genome.add_edge(key.from, vertex, gene)?;
        genome.add_new_edge(vertex, key.to, rng)?;
        trace!(edge = %key, vertex, "split edge");
        Ok(true)
    }
}

/// Grows a new vertex `n` off an existing vertex `v` plus the edge `v -> n`.
///
/// `n` is keyed by `v` in the shared [`IdFactory`].
#[derive(Debug, Clone)]
pub struct SproutVertexMutation {
    factory: Arc<IdFactory>,
}

impl SproutVertexMutation {
    #[must_use]
    pub fn new(factory: Arc<IdFactory>) -> Self {
        Self { factory }
    }
}

impl<V: Gene, E: Gene> Mutation<V, E> for SproutVertexMutation {
    fn mutate<R: Rng>(
        &self,
        genome: &mut GraphGenome<V, E>,
        probability: f64,
        rng: &mut R,
    ) -> Result<bool> {
        check_probability("sprout_vertex_probability", probability)?;
        if rng.random::<f64>() >= probability || genome.vertex_count() == 0 {
            return Ok(false);
        }

        let index = rng.random_range(0..genome.vertex_count());
        let Some(parent) = genome.vertex_ids().nth(index) else {
            return Ok(false);
        };
        let vertex = self.factory.vertex_id(parent)?;
        if genome.contains_vertex(vertex) {
            debug!(parent, vertex, "sprout target already present, skipping");
            return Ok(false);
        }

        genome.add_new_vertex(vertex, rng);
        genome.add_new_edge(parent, vertex, rng)?;
        trace!(parent, vertex, "sprouted vertex");
        Ok(true)
    }
}

/// Hands every vertex and edge gene to [`Gene::mutate`].
///
/// Vertices and edges use their own probability when one is set and the
/// probability passed to [`Mutation::mutate`] otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueMutation {
    vertex_probability: Option<f64>,
    edge_probability: Option<f64>,
}

impl ValueMutation {
    pub fn new(vertex_probability: Option<f64>, edge_probability: Option<f64>) -> Result<Self> {
        if let Some(p) = vertex_probability {
            check_probability("vertex_value_probability", p)?;
        }
        if let Some(p) = edge_probability {
            check_probability("edge_value_probability", p)?;
        }
        Ok(Self {
            vertex_probability,
            edge_probability,
        })
    }
}

impl<V: Gene, E: Gene> Mutation<V, E> for ValueMutation {
    fn mutate<R: Rng>(
        &self,
        genome: &mut GraphGenome<V, E>,
        probability: f64,
        rng: &mut R,
    ) -> Result<bool> {
        check_probability("value_probability", probability)?;
        let vertex_probability = self.vertex_probability.unwrap_or(probability);
        let edge_probability = self.edge_probability.unwrap_or(probability);

        for (_, gene) in genome.vertices_mut() {
            gene.mutate(rng, vertex_probability);
        }
        for (_, gene) in genome.edges_mut() {
            gene.mutate(rng, edge_probability);
        }
        Ok(genome.vertex_count() + genome.edge_count() > 0)
    }
}
