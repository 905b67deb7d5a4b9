//! Evolve graphs of scalar genes toward a target shape.
//!
//! Fitness rewards genomes whose edge count approaches `TARGET_EDGES` and
//! whose mean edge weight approaches `TARGET_WEIGHT`. Structure grows through
//! add-edge and split-edge mutations, weights drift through gene mutation.
//!
//! Run with: `RUST_LOG=info cargo run --example target_graph`

use graph_neat::{
    Gene, GraphGenome, GraphSpeciation, MutationConfig, NeatConfig, NeatError, Population,
    PopulationConfig, ReproductionConfig, SpeciationConfig,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TARGET_EDGES: usize = 12;
const TARGET_WEIGHT: f64 = 0.5;
const GENERATIONS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Scalar(f64);

impl Gene for Scalar {
    fn create_new<R: Rng>(&self, rng: &mut R) -> Self {
        Scalar(rng.random_range(-1.0..1.0))
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        if rng.random::<bool>() {
            *self
        } else {
            // Blend.
            Scalar((self.0 + other.0) / 2.0)
        }
    }

    fn mutate<R: Rng>(&mut self, rng: &mut R, probability: f64) {
        if rng.random::<f64>() < probability {
            self.0 = (self.0 + rng.random_range(-0.2..0.2)).clamp(-2.0, 2.0);
        }
    }
}

fn scalar_distance(a: &Scalar, b: &Scalar) -> f64 {
    (a.0 - b.0).abs()
}

fn fitness(genome: &GraphGenome<Scalar, Scalar>) -> f64 {
    let edges = genome.edge_count();
    let mean = if edges == 0 {
        0.0
    } else {
        genome.edges().map(|(_, w)| w.0).sum::<f64>() / edges as f64
    };
    let size_error = edges.abs_diff(TARGET_EDGES) as f64;
    let weight_error = (mean - TARGET_WEIGHT).abs();
    1.0 / (1.0 + size_error + 4.0 * weight_error)
}

fn main() -> Result<(), NeatError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut ancestor = GraphGenome::new(Scalar(0.0), Scalar(0.0));
    ancestor.add_vertex(0, Scalar(0.0));
    ancestor.add_vertex(1, Scalar(0.0));
    ancestor.add_vertex(2, Scalar(0.0));
    ancestor.add_edge(0, 2, Scalar(0.0))?;

    let config = NeatConfig {
        population: PopulationConfig {
            min_size: 100,
            max_size: 110,
            min_specie_size: 2,
            fitness_history: GENERATIONS,
        },
        reproduction: ReproductionConfig {
            stagnation_window: 15,
            clone_undersized_species: true,
            ..ReproductionConfig::default()
        },
        mutation: MutationConfig {
            add_edge_probability: 0.3,
            split_edge_probability: 0.1,
            sprout_vertex_probability: 0.05,
            ..MutationConfig::default()
        },
    };

    let speciation = GraphSpeciation::new(
        SpeciationConfig::uniform(2.5, 0.5, 1.0),
        scalar_distance,
        scalar_distance,
    )?;
    let mut population = Population::new(ancestor, speciation, config)?;
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    population.create_initial_generation(&mut rng);

    let mut best_fitness = f64::NEG_INFINITY;
    for generation in 0..GENERATIONS {
        population.evaluate(fitness);

        if let Some(best) = population.best_genome() {
            let value = best.fitness().unwrap_or(f64::NEG_INFINITY);
            best_fitness = best_fitness.max(value);
            if generation % 10 == 0 {
                info!(
                    generation,
                    best = value,
                    vertices = best.vertex_count(),
                    edges = best.edge_count(),
                    species = population.species().len(),
                    genomes = population.len(),
                    "progress"
                );
            }
        }

        match population.advance(&mut rng) {
            Ok(()) => {}
            Err(err @ (NeatError::AllSpeciesZero | NeatError::CannotTrim { .. })) => {
                warn!(generation, %err, "population collapsed, stopping");
                break;
            }
            Err(err) => return Err(err),
        }
    }

    info!(best = best_fitness, generations = population.generation(), "evolution complete");
    Ok(())
}
