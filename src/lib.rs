//! # Graph NEAT
//!
//! A NEAT-style neuroevolution engine over generic graph genomes: vertex and
//! edge genes are opaque payloads, and the engine only cares about the
//! structure that connects them.
//!
//! ## Features
//!
//! - **Historical markings**: a shared [`IdFactory`] gives every genome that
//!   splits the same edge in the same generation the same new vertex id, so
//!   genomes stay alignable gene-by-gene
//! - **Arena-graph genome**: vertices and edges live in two ordered maps keyed
//!   by id and `(from, to)`, with no pointers between them
//! - **Speciation**: alignment distance with separate match and mismatch
//!   weights for vertices and edges, first-fit clustering around centroids
//! - **Reproduction quotas**: fitness-proportional offspring per specie with
//!   stagnation, a population floor and a population ceiling
//! - **Parallel breeding**: offspring are planned sequentially and produced
//!   with Rayon behind the `parallel` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use graph_neat::{GraphGenome, GraphSpeciation, NeatConfig, Population, SpeciationConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! // A two-vertex ancestor with structure-only genes.
//! let mut ancestor: GraphGenome<(), ()> = GraphGenome::new((), ());
//! ancestor.add_vertex(0, ());
//! ancestor.add_vertex(1, ());
//! ancestor.add_edge(0, 1, ()).unwrap();
//!
//! let mut config = NeatConfig::minimal(20);
//! config.reproduction.clone_undersized_species = true;
//! let speciation = GraphSpeciation::new(
//!     SpeciationConfig::uniform(4.0, 0.0, 1.0),
//!     |_: &(), _: &()| 0.0,
//!     |_: &(), _: &()| 0.0,
//! )
//! .unwrap();
//!
//! let mut population = Population::new(ancestor, speciation, config).unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! population.create_initial_generation(&mut rng);
//!
//! for _ in 0..5 {
//!     // Reward bigger graphs.
//!     population.evaluate(|g| (g.vertex_count() + g.edge_count()) as f64);
//!     population.advance(&mut rng).unwrap();
//! }
//! assert_eq!(population.len(), 20);
//! ```
//!
//! ## Architecture
//!
//! ### Generation transition
//!
//! 1. An external evaluator assigns fitness to every genome
//!    ([`Population::evaluate`]).
//! 2. Each specie sorts its members and records its best fitness.
//! 3. The [`ReproductionAllocator`] turns average fitness into offspring
//!    quotas and a breeding plan.
//! 4. The plan is executed: elites are copied, everything else goes through
//!    [`GenomeOperators`] (alignment crossover, then mutations).
//! 5. Offspring are reclustered into species and the id factory starts a new
//!    epoch.
//!
//! [`Population::advance`] runs steps 2 to 5 as one all-or-nothing step.
//!
//! ### Gene payloads
//!
//! Vertex and edge genes implement [`Gene`]: random reinitialisation,
//! crossover with another gene of the same kind, and in-place mutation. The
//! per-gene distance used for speciation is a separate callback handed to
//! [`GraphSpeciation`].

pub mod config;
pub mod crossover;
pub mod error;
pub mod gene;
pub mod genome;
pub mod innovation;
pub mod mutation;
pub mod operators;
pub mod population;
pub mod reproduction;
pub mod speciation;
pub mod species;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use config::{
    MutationConfig, NeatConfig, Normalization, PopulationConfig, ReproductionConfig,
    SpeciationConfig,
};
pub use crossover::{AlignmentCrossover, Crossover};
pub use error::{NeatError, Result};
pub use gene::{random_choice, Gene};
pub use genome::{compare_fitness, EdgeKey, GraphGenome, VertexId};
pub use innovation::{IdFactory, StructuralKey};
pub use mutation::{
    AddEdgeMutation, Mutation, SplitEdgeMutation, SproutVertexMutation, ValueMutation,
};
pub use operators::GenomeOperators;
pub use population::Population;
pub use reproduction::{breed, BreedingTask, ParentRef, Quota, ReproductionAllocator};
pub use speciation::{FnSpeciation, GeneDistanceFn, GraphSpeciation, SpeciationStrategy};
pub use species::{Specie, SpecieId};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{genome, tag_distance};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    #[test]
    fn test_split_then_align() {
        // Two genomes splitting the same edge in one epoch end up with the
        // same structure, so without a match weight they are distance zero.
        let factory = Arc::new(IdFactory::starting_at(2));
        let split = SplitEdgeMutation::new(Arc::clone(&factory));
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let mut a = genome(&[0, 1], &[(0, 1)]);
        let mut b = genome(&[0, 1], &[(0, 1)]);
        split.mutate(&mut a, 1.0, &mut rng).unwrap();
        split.mutate(&mut b, 1.0, &mut rng).unwrap();

        let speciation =
            GraphSpeciation::new(SpeciationConfig::uniform(1.0, 0.0, 1.0), tag_distance, tag_distance)
                .unwrap();
        assert_eq!(speciation.distance(&a, &b), 0.0);
        assert!(speciation.same_species(&a, &b));
    }

    #[test]
    fn test_crossover_after_divergence() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let factory = Arc::new(IdFactory::starting_at(2));
        let mut fitter = genome(&[0, 1], &[(0, 1)]);
        let other = fitter.clone();
        SplitEdgeMutation::new(factory)
            .mutate(&mut fitter, 1.0, &mut rng)
            .unwrap();

        let child = AlignmentCrossover.cross_pair(&fitter, &other, &mut rng);
        assert_eq!(child.vertex_count(), 3);
        assert!(child.contains_edge(0, 2));
        assert!(!child.contains_edge(0, 1));
        assert!(child.validate().is_ok());
    }
}
