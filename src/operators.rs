//! Per-offspring operator pipeline: crossover, then mutation.

use std::sync::Arc;

use rand::Rng;

use crate::config::MutationConfig;
use crate::crossover::{AlignmentCrossover, Crossover};
use crate::error::Result;
use crate::gene::Gene;
use crate::genome::GraphGenome;
use crate::innovation::IdFactory;
use crate::mutation::{
    AddEdgeMutation, Mutation, SplitEdgeMutation, SproutVertexMutation, ValueMutation,
};

/// The operators applied to every non-elite offspring.
///
/// Mutations run in a fixed order: add-edge, split-edge, sprout-vertex,
/// then value mutation over all genes.
#[derive(Debug, Clone)]
pub struct GenomeOperators {
    config: MutationConfig,
    crossover: AlignmentCrossover,
    add_edge: AddEdgeMutation,
    split_edge: SplitEdgeMutation,
    sprout_vertex: SproutVertexMutation,
    value: ValueMutation,
}

impl GenomeOperators {
    /// Build the pipeline. Split and sprout mutations draw ids from `factory`.
    pub fn new(config: MutationConfig, factory: Arc<IdFactory>) -> Result<Self> {
        config.validate()?;
        let value = ValueMutation::new(config.vertex_value_probability, config.edge_value_probability)?;
        Ok(Self {
            crossover: AlignmentCrossover,
            add_edge: AddEdgeMutation,
            split_edge: SplitEdgeMutation::new(Arc::clone(&factory)),
            sprout_vertex: SproutVertexMutation::new(factory),
            value,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    #[must_use]
    pub fn crossover(&self) -> &AlignmentCrossover {
        &self.crossover
    }

    /// Number of parents one crossover consumes.
    #[must_use]
    pub fn parents_number<V: Gene, E: Gene>(&self) -> usize {
        <AlignmentCrossover as Crossover<V, E>>::parents_number(&self.crossover)
    }

    /// Apply every configured mutation to `genome` in place.
    ///
    /// Same as [`mutate_structure`](Self::mutate_structure) followed by
    /// [`mutate_values`](Self::mutate_values) on one RNG.
    pub fn mutate<V: Gene, E: Gene, R: Rng>(
        &self,
        genome: &mut GraphGenome<V, E>,
        rng: &mut R,
    ) -> Result<()> {
        self.mutate_structure(genome, rng)?;
        self.mutate_values(genome, rng)
    }

    /// Add-edge, split-edge and sprout-vertex mutation.
    ///
    /// These are the only operators that draw ids from the factory, so the
    /// order in which genomes pass through here fixes which new structure
    /// receives which id.
    pub fn mutate_structure<V: Gene, E: Gene, R: Rng>(
        &self,
        genome: &mut GraphGenome<V, E>,
        rng: &mut R,
    ) -> Result<()> {
        self.add_edge
            .mutate(genome, self.config.add_edge_probability, rng)?;
        self.split_edge
            .mutate(genome, self.config.split_edge_probability, rng)?;
        self.sprout_vertex
            .mutate(genome, self.config.sprout_vertex_probability, rng)?;
        Ok(())
    }

    /// Gene-level mutation of every vertex and edge payload.
    pub fn mutate_values<V: Gene, E: Gene, R: Rng>(
        &self,
        genome: &mut GraphGenome<V, E>,
        rng: &mut R,
    ) -> Result<()> {
        self.value.mutate(genome, self.config.value_probability, rng)?;
        Ok(())
    }

    /// Cross `parents` (fittest first) without mutating the child.
    pub fn cross<V: Gene, E: Gene, R: Rng>(
        &self,
        parents: &[&GraphGenome<V, E>],
        rng: &mut R,
    ) -> Result<GraphGenome<V, E>> {
        self.crossover.cross(parents, rng)
    }

    /// Cross `parents` (fittest first) and mutate the child.
    pub fn breed<V: Gene, E: Gene, R: Rng>(
        &self,
        parents: &[&GraphGenome<V, E>],
        rng: &mut R,
    ) -> Result<GraphGenome<V, E>> {
        let mut child = self.crossover.cross(parents, rng)?;
        self.mutate(&mut child, rng)?;
        Ok(child)
    }
}
