//! Benchmarks for graph-neat.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use graph_neat::{
    AddEdgeMutation, AlignmentCrossover, Gene, GenomeOperators, GraphGenome, GraphSpeciation,
    IdFactory, Mutation, MutationConfig, NeatConfig, Population, SpeciationConfig,
    SpeciationStrategy,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy)]
struct Weight(f64);

impl Gene for Weight {
    fn create_new<R: Rng>(&self, rng: &mut R) -> Self {
        Weight(rng.random_range(-1.0..1.0))
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        graph_neat::random_choice(self, other, rng)
    }

    fn mutate<R: Rng>(&mut self, rng: &mut R, probability: f64) {
        if rng.random::<f64>() < probability {
            self.0 += rng.random_range(-0.1..0.1);
        }
    }
}

fn weight_distance(a: &Weight, b: &Weight) -> f64 {
    (a.0 - b.0).abs()
}

/// A genome grown by `steps` rounds of structural mutation.
fn grown_genome(steps: usize, rng: &mut ChaCha8Rng) -> GraphGenome<Weight, Weight> {
    let mut genome = GraphGenome::new(Weight(0.0), Weight(0.0));
    genome.add_vertex(0, Weight(0.0));
    genome.add_vertex(1, Weight(0.0));
    let ops = GenomeOperators::new(
        MutationConfig {
            add_edge_probability: 0.8,
            split_edge_probability: 0.4,
            ..MutationConfig::default()
        },
        Arc::new(IdFactory::starting_at(2)),
    )
    .unwrap();
    for _ in 0..steps {
        ops.mutate(&mut genome, rng).unwrap();
    }
    genome
}

fn bench_distance(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let genome1 = grown_genome(40, &mut rng);
    let genome2 = grown_genome(40, &mut rng);
    let speciation =
        GraphSpeciation::new(SpeciationConfig::default(), weight_distance, weight_distance).unwrap();

    c.bench_function("graph_distance", |b| {
        b.iter(|| {
            black_box(speciation.distance(&genome1, &genome2));
        });
    });
}

fn bench_crossover(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let parent1 = grown_genome(40, &mut rng);
    let parent2 = grown_genome(40, &mut rng);

    c.bench_function("alignment_crossover", |b| {
        b.iter(|| {
            black_box(AlignmentCrossover.cross_pair(&parent1, &parent2, &mut rng));
        });
    });
}

fn bench_mutation(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let genome = grown_genome(20, &mut rng);
    let ops = GenomeOperators::new(MutationConfig::default(), Arc::new(IdFactory::starting_at(1000)))
        .unwrap();

    c.bench_function("genome_mutation", |b| {
        b.iter(|| {
            let mut g = genome.clone();
            ops.mutate(&mut g, &mut rng).unwrap();
            black_box(g);
        });
    });

    c.bench_function("add_edge_mutation", |b| {
        b.iter(|| {
            let mut g = genome.clone();
            AddEdgeMutation.mutate(&mut g, 1.0, &mut rng).unwrap();
            black_box(g);
        });
    });
}

fn bench_generation(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let ancestor = grown_genome(5, &mut rng);
    let mut config = NeatConfig::minimal(150);
    config.reproduction.clone_undersized_species = true;
    config.reproduction.stagnation_window = usize::MAX;
    config.population.fitness_history = usize::MAX;
    let speciation =
        GraphSpeciation::new(SpeciationConfig::default(), weight_distance, weight_distance).unwrap();
    let mut population = Population::new(ancestor, speciation, config).unwrap();
    population.create_initial_generation(&mut rng);

    c.bench_function("population_advance_150", |b| {
        b.iter(|| {
            population.evaluate(|g| g.edges().map(|(_, w)| w.0).sum::<f64>().exp());
            population.advance(&mut rng).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_distance,
    bench_crossover,
    bench_mutation,
    bench_generation,
);
criterion_main!(benches);
