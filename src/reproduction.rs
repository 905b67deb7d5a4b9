//! Offspring quotas per specie and the breeding plan that fills them.
//!
//! A generation transition runs in three steps:
//!
//! 1. [`ReproductionAllocator::allocate`] turns the species' average fitness
//!    into one offspring count per specie, honouring stagnation and the
//!    population bounds.
//! 2. [`ReproductionAllocator::plan`] consumes the caller's RNG to pick
//!    parents for every offspring and to seed one RNG per offspring.
//! 3. [`breed`] executes the plan, in parallel when the `parallel` feature
//!    is enabled.
//!
//! Steps 1 and 2 are sequential and read the whole, fully evaluated
//! generation. Step 3 only reads parents, so tasks run independently.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{PopulationConfig, ReproductionConfig};
use crate::error::{NeatError, Result};
use crate::gene::Gene;
use crate::genome::GraphGenome;
use crate::operators::GenomeOperators;
use crate::species::{Specie, SpecieId};

/// Offspring allocated to one specie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub specie: SpecieId,
    pub size: usize,
}

/// Position of a parent genome: specie index, then member index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentRef {
    pub specie: usize,
    pub member: usize,
}

/// One offspring to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreedingTask {
    /// Unmodified copy of a specie's best genome.
    Elite(ParentRef),
    /// Crossover of `parents` (fittest first), then mutation.
    Crossover { parents: Vec<ParentRef>, seed: u64 },
    /// Copy of a parent, then mutation.
    Cloned { parent: ParentRef, seed: u64 },
}

/// Computes offspring quotas and breeding plans.
#[derive(Debug, Clone, Default)]
pub struct ReproductionAllocator {
    config: ReproductionConfig,
}

impl ReproductionAllocator {
    pub fn new(config: ReproductionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &ReproductionConfig {
        &self.config
    }

    /// A specie with fewer recorded generations than the stagnation window
    /// always reproduces. Otherwise its latest best fitness must strictly
    /// beat the one recorded `window - 1` generations earlier.
    #[must_use]
    pub fn should_reproduce<V: Gene, E: Gene>(&self, specie: &Specie<V, E>) -> bool {
        let window = self.config.stagnation_window;
        if specie.best_history().len() < window {
            return true;
        }
        match (specie.recorded_best(0), specie.recorded_best(window - 1)) {
            (Some(latest), Some(old)) => latest > old,
            _ => true,
        }
    }

    /// Offspring count for every specie, in specie order.
    ///
    /// Non-stagnant species get `ceil(w / total_w * min_size)`, where `w` is
    /// the specie's average fitness clamped at zero, so every share lies in
    /// `[0, 1]`. Sizes below `min_specie_size` drop to zero. When no specie
    /// has a positive average the shares are equal. The total is then raised to
    /// `min_size` one offspring at a time on the smallest nonzero quota and
    /// lowered to `max_size` one at a time on the largest.
    pub fn allocate<V: Gene, E: Gene>(
        &self,
        species: &[Specie<V, E>],
        bounds: &PopulationConfig,
    ) -> Result<Vec<Quota>> {
        if species.is_empty() {
            return Err(NeatError::EmptyPopulation);
        }
        // NaN and negative averages weigh nothing.
        let weights = species
            .iter()
            .map(|s| {
                s.average_fitness()
                    .map(|average| average.max(0.0))
                    .ok_or(NeatError::MissingFitness)
            })
            .collect::<Result<Vec<f64>>>()?;
        let total: f64 = weights.iter().sum();
        let equal_share = !(total.is_finite() && total > 0.0);
        if equal_share {
            debug!(total, "no usable positive fitness, sharing offspring equally");
        }

        let mut sizes = Vec::with_capacity(species.len());
        for (specie, &weight) in species.iter().zip(&weights) {
            if !self.should_reproduce(specie) {
                debug!(specie = %specie.id(), "stagnant, no offspring");
                sizes.push(0);
                continue;
            }
            let ratio = if equal_share {
                1.0 / species.len() as f64
            } else {
                (weight / total).clamp(0.0, 1.0)
            };
            let size = (ratio * bounds.min_size as f64).ceil() as usize;
            sizes.push(if size < bounds.min_specie_size { 0 } else { size });
        }

        let mut allocated: usize = sizes.iter().sum();
        if allocated == 0 {
            warn!(species = species.len(), "every specie was allocated zero offspring");
            return Err(NeatError::AllSpeciesZero);
        }

        while allocated < bounds.min_size {
            let smallest = smallest_nonzero(&sizes).ok_or(NeatError::AllSpeciesZero)?;
            sizes[smallest] += 1;
            allocated += 1;
        }

        while allocated > bounds.max_size {
            let (largest, size) = largest_size(&sizes);
            if size <= bounds.min_specie_size {
                warn!(
                    largest = size,
                    min_specie_size = bounds.min_specie_size,
                    allocated,
                    max_size = bounds.max_size,
                    "cannot trim offspring to the population ceiling"
                );
                return Err(NeatError::CannotTrim {
                    largest: size,
                    min_specie_size: bounds.min_specie_size,
                });
            }
            sizes[largest] -= 1;
            allocated -= 1;
        }

        let quotas: Vec<Quota> = species
            .iter()
            .zip(sizes)
            .map(|(specie, size)| Quota {
                specie: specie.id(),
                size,
            })
            .collect();
        for quota in &quotas {
            debug!(specie = %quota.specie, quota = quota.size, "allocated offspring");
        }
        Ok(quotas)
    }

    /// Choose the parents of every offspring.
    ///
    /// Each specie with a positive quota `n` yields one elite, then
    /// `round(n * crossover_probability)` crossovers (at most `n - 1`), then
    /// clones of uniformly chosen members. Crossover parents come from a
    /// cyclic pointer over the specie's members that reshuffles on
    /// wraparound; with probability `interspecies_mating_rate` they are
    /// instead sampled without replacement from the whole population.
    pub fn plan<V: Gene, E: Gene, R: Rng>(
        &self,
        species: &[Specie<V, E>],
        quotas: &[Quota],
        parents_number: usize,
        rng: &mut R,
    ) -> Result<Vec<BreedingTask>> {
        let everyone: Vec<ParentRef> = species
            .iter()
            .enumerate()
            .flat_map(|(specie, s)| (0..s.len()).map(move |member| ParentRef { specie, member }))
            .collect();
        let mut tasks = Vec::with_capacity(quotas.iter().map(|q| q.size).sum());

        for quota in quotas.iter().filter(|q| q.size > 0) {
            let Some(index) = species.iter().position(|s| s.id() == quota.specie) else {
                return Err(NeatError::InvalidParameter {
                    name: "quota",
                    reason: format!("specie {} is not part of the population", quota.specie),
                });
            };
            let specie = &species[index];
            let members = specie.members();
            let Some(elite) = best_index(members) else {
                return Err(NeatError::InsufficientParents {
                    specie: specie.id(),
                    available: 0,
                    required: 1,
                });
            };
            tasks.push(BreedingTask::Elite(ParentRef {
                specie: index,
                member: elite,
            }));

            let mut crossovers = ((quota.size as f64 * self.config.crossover_probability)
                .round() as usize)
                .min(quota.size - 1);
            if crossovers > 0 && members.len() < parents_number {
                if !self.config.clone_undersized_species {
                    warn!(
                        specie = %specie.id(),
                        available = members.len(),
                        required = parents_number,
                        "not enough parents for crossover"
                    );
                    return Err(NeatError::InsufficientParents {
                        specie: specie.id(),
                        available: members.len(),
                        required: parents_number,
                    });
                }
                debug!(specie = %specie.id(), crossovers, "too few parents, cloning instead");
                crossovers = 0;
            }

            let mut cycle: Vec<usize> = (0..members.len()).collect();
            let mut pointer = 0;
            for _ in 0..crossovers {
                let mut parents = if rng.random::<f64>() < self.config.interspecies_mating_rate {
                    rand::seq::index::sample(rng, everyone.len(), parents_number)
                        .into_iter()
                        .map(|i| everyone[i])
                        .collect::<Vec<_>>()
                } else {
                    let mut picked = Vec::with_capacity(parents_number);
                    while picked.len() < parents_number {
                        picked.push(ParentRef {
                            specie: index,
                            member: cycle[pointer],
                        });
                        pointer += 1;
                        if pointer >= cycle.len() {
                            pointer = 0;
                            cycle.shuffle(rng);
                        }
                    }
                    picked
                };
                parents.sort_by(|a, b| genome_at(species, *b).compare_fitness(genome_at(species, *a)));
                tasks.push(BreedingTask::Crossover {
                    parents,
                    seed: rng.random(),
                });
            }

            for _ in 0..quota.size - crossovers - 1 {
                tasks.push(BreedingTask::Cloned {
                    parent: ParentRef {
                        specie: index,
                        member: rng.random_range(0..members.len()),
                    },
                    seed: rng.random(),
                });
            }
        }
        Ok(tasks)
    }
}

/// Execute a breeding plan against the generation it was planned on.
///
/// The output order matches `tasks` whether or not the work runs in
/// parallel. Crossover and value mutation run in parallel with the
/// `parallel` feature, while structural mutation walks the tasks in order.
/// Ids from the factory are therefore handed out in task order, and a
/// seeded run yields the same offspring with or without the feature.
pub fn breed<V: Gene, E: Gene>(
    species: &[Specie<V, E>],
    tasks: &[BreedingTask],
    operators: &GenomeOperators,
) -> Result<Vec<GraphGenome<V, E>>> {
    #[cfg(feature = "parallel")]
    let mut offspring = tasks
        .par_iter()
        .map(|task| start_task(species, task, operators))
        .collect::<Result<Vec<_>>>()?;
    #[cfg(not(feature = "parallel"))]
    let mut offspring = tasks
        .iter()
        .map(|task| start_task(species, task, operators))
        .collect::<Result<Vec<_>>>()?;

    for (child, rng) in &mut offspring {
        if let Some(rng) = rng {
            operators.mutate_structure(child, rng)?;
        }
    }

    #[cfg(feature = "parallel")]
    offspring
        .par_iter_mut()
        .try_for_each(|(child, rng)| finish_task(child, rng.as_mut(), operators))?;
    #[cfg(not(feature = "parallel"))]
    offspring
        .iter_mut()
        .try_for_each(|(child, rng)| finish_task(child, rng.as_mut(), operators))?;

    Ok(offspring.into_iter().map(|(child, _)| child).collect())
}

/// The unmutated child of a task, plus the RNG its mutations continue on.
/// Elites carry no RNG and are never mutated.
fn start_task<V: Gene, E: Gene>(
    species: &[Specie<V, E>],
    task: &BreedingTask,
    operators: &GenomeOperators,
) -> Result<(GraphGenome<V, E>, Option<ChaCha8Rng>)> {
    match task {
        BreedingTask::Elite(parent) => Ok((resolve(species, *parent)?.offspring_clone(), None)),
        BreedingTask::Cloned { parent, seed } => {
            let rng = ChaCha8Rng::seed_from_u64(*seed);
            Ok((resolve(species, *parent)?.offspring_clone(), Some(rng)))
        }
        BreedingTask::Crossover { parents, seed } => {
            let mut rng = ChaCha8Rng::seed_from_u64(*seed);
            let parents = parents
                .iter()
                .map(|p| resolve(species, *p))
                .collect::<Result<Vec<_>>>()?;
            let child = operators.cross(&parents, &mut rng)?;
            Ok((child, Some(rng)))
        }
    }
}

fn finish_task<V: Gene, E: Gene>(
    child: &mut GraphGenome<V, E>,
    rng: Option<&mut ChaCha8Rng>,
    operators: &GenomeOperators,
) -> Result<()> {
    match rng {
        Some(rng) => operators.mutate_values(child, rng),
        None => Ok(()),
    }
}

fn resolve<V, E>(species: &[Specie<V, E>], parent: ParentRef) -> Result<&GraphGenome<V, E>>
where
    V: Gene,
    E: Gene,
{
    species
        .get(parent.specie)
        .and_then(|s| s.members().get(parent.member))
        .ok_or_else(|| NeatError::InvalidParameter {
            name: "parent",
            reason: format!(
                "no member {} in specie slot {}",
                parent.member, parent.specie
            ),
        })
}

/// Planning only produces in-range refs.
fn genome_at<V: Gene, E: Gene>(species: &[Specie<V, E>], parent: ParentRef) -> &GraphGenome<V, E> {
    &species[parent.specie].members()[parent.member]
}

fn best_index<V, E>(members: &[GraphGenome<V, E>]) -> Option<usize> {
    members
        .iter()
        .enumerate()
        .reduce(|best, candidate| {
            if candidate.1.compare_fitness(best.1).is_gt() {
                candidate
            } else {
                best
            }
        })
        .map(|(index, _)| index)
}

fn smallest_nonzero(sizes: &[usize]) -> Option<usize> {
    let mut found: Option<(usize, usize)> = None;
    for (index, &size) in sizes.iter().enumerate() {
        if size != 0 && found.map_or(true, |(_, s)| size < s) {
            found = Some((index, size));
        }
    }
    found.map(|(index, _)| index)
}

/// First index holding the largest size.
fn largest_size(sizes: &[usize]) -> (usize, usize) {
    let mut found = (0, 0);
    for (index, &size) in sizes.iter().enumerate() {
        if size > found.1 {
            found = (index, size);
        }
    }
    found
}
