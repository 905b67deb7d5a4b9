//! The speciated population and its generation lifecycle.
//!
//! A typical loop:
//!
//! ```rust
//! use graph_neat::{GraphGenome, GraphSpeciation, NeatConfig, Population, SpeciationConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut ancestor: GraphGenome<(), ()> = GraphGenome::new((), ());
//! ancestor.add_vertex(0, ());
//! ancestor.add_vertex(1, ());
//!
//! let mut config = NeatConfig::minimal(8);
//! config.reproduction.clone_undersized_species = true;
//! let speciation = GraphSpeciation::new(
//!     SpeciationConfig::default(),
//!     |_: &(), _: &()| 0.0,
//!     |_: &(), _: &()| 0.0,
//! )
//! .unwrap();
//! let mut population = Population::new(ancestor, speciation, config).unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//!
//! population.create_initial_generation(&mut rng);
//! for _ in 0..3 {
//!     population.evaluate(|genome| genome.edge_count() as f64 + 1.0);
//!     population.advance(&mut rng).unwrap();
//! }
//! assert_eq!(population.generation(), 3);
//! assert_eq!(population.len(), 8);
//! ```

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::NeatConfig;
use crate::error::{NeatError, Result};
use crate::gene::Gene;
use crate::genome::GraphGenome;
use crate::innovation::IdFactory;
use crate::operators::GenomeOperators;
use crate::reproduction::{breed, ReproductionAllocator};
use crate::speciation::SpeciationStrategy;
use crate::species::{Specie, SpecieId};

/// A population of graph genomes partitioned into species.
pub struct Population<V, E, S> {
    config: NeatConfig,
    strategy: S,
    allocator: ReproductionAllocator,
    operators: GenomeOperators,
    factory: Arc<IdFactory>,
    ancestor: GraphGenome<V, E>,
    species: Vec<Specie<V, E>>,
    next_specie_id: u32,
    generation: usize,
    /// Set once the species have recorded this generation's best fitness.
    ended: bool,
}

impl<V, E, S> Population<V, E, S>
where
    V: Gene,
    E: Gene,
    S: SpeciationStrategy<GraphGenome<V, E>>,
{
    /// Build a population descending from `ancestor`.
    ///
    /// The id factory starts just above the ancestor's highest vertex id, so
    /// ids it hands out never collide with the ancestor's own vertices.
    pub fn new(ancestor: GraphGenome<V, E>, strategy: S, config: NeatConfig) -> Result<Self> {
        config.validate()?;
        ancestor.validate()?;
        let first_id = match ancestor.max_vertex_id() {
            Some(max) => max.checked_add(1).ok_or(NeatError::IdSpaceExhausted)?,
            None => 0,
        };
        let factory = Arc::new(IdFactory::starting_at(first_id));
        let operators = GenomeOperators::new(config.mutation.clone(), Arc::clone(&factory))?;
        let allocator = ReproductionAllocator::new(config.reproduction.clone())?;

        Ok(Self {
            config,
            strategy,
            allocator,
            operators,
            factory,
            ancestor,
            species: Vec::new(),
            next_specie_id: 0,
            generation: 0,
            ended: false,
        })
    }

    /// Replace the current species with a single specie of `min_size`
    /// random reinitialisations of the ancestor.
    pub fn create_initial_generation<R: Rng>(&mut self, rng: &mut R) {
        let bounds = &self.config.population;
        let mut specie = Specie::new(
            SpecieId(0),
            self.ancestor.clone(),
            bounds.min_specie_size,
            bounds.min_size,
            bounds.fitness_history,
        );
        for _ in 0..bounds.min_size {
            specie.push(self.ancestor.create_new(rng));
        }
        self.species = vec![specie];
        self.next_specie_id = 1;
        self.generation = 0;
        self.ended = false;
        info!(size = bounds.min_size, "created initial generation");
    }

    /// Assign fitness to every genome.
    pub fn evaluate<F>(&mut self, fitness: F)
    where
        F: Fn(&GraphGenome<V, E>) -> f64 + Sync + Send,
    {
        for specie in &mut self.species {
            #[cfg(feature = "parallel")]
            specie
                .members_mut()
                .par_iter_mut()
                .for_each(|genome| genome.set_fitness(fitness(genome)));
            #[cfg(not(feature = "parallel"))]
            specie
                .members_mut()
                .iter_mut()
                .for_each(|genome| genome.set_fitness(fitness(genome)));
        }
    }

    /// Close the current generation: every specie orders its members and
    /// records its best fitness.
    ///
    /// Fails without touching any specie if a genome is unevaluated. A
    /// generation is recorded once: calling this again, or calling
    /// [`advance`](Self::advance) afterwards, does not add a second entry to
    /// the fitness histories.
    pub fn end_current_generation(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        if self.genomes().any(|g| g.fitness().is_none()) {
            return Err(NeatError::MissingFitness);
        }
        for specie in &mut self.species {
            specie.end_generation()?;
        }
        self.ended = true;
        Ok(())
    }

    /// Produce the offspring of the current, ended generation.
    pub fn reproduce<R: Rng>(&self, rng: &mut R) -> Result<Vec<GraphGenome<V, E>>> {
        self.reproduce_from(&self.species, rng)
    }

    /// Recluster `offspring` into species and start a new generation.
    ///
    /// Every offspring joins the first specie, in specie order, whose
    /// centroid is within the threshold; otherwise it founds a new specie.
    /// Species left without members are dropped and the id factory starts a
    /// new epoch.
    pub fn create_new_generation(&mut self, offspring: Vec<GraphGenome<V, E>>) -> Result<()> {
        let (species, next_specie_id) = self.cluster(self.species.clone(), offspring)?;
        self.commit(species, next_specie_id);
        Ok(())
    }

    /// Run a whole generation transition: end the current generation unless
    /// [`end_current_generation`](Self::end_current_generation) already did,
    /// allocate and breed offspring, then recluster them.
    ///
    /// Either every step succeeds or the population is left exactly as it
    /// was. Identifiers consumed by a failed attempt are not returned to the
    /// factory.
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let mut ended = self.species.clone();
        if !self.ended {
            for specie in &mut ended {
                specie.end_generation()?;
            }
        }
        let offspring = self.reproduce_from(&ended, rng)?;
        let (species, next_specie_id) = self.cluster(ended, offspring)?;
        self.commit(species, next_specie_id);
        Ok(())
    }

    fn reproduce_from<R: Rng>(
        &self,
        species: &[Specie<V, E>],
        rng: &mut R,
    ) -> Result<Vec<GraphGenome<V, E>>> {
        let quotas = self.allocator.allocate(species, &self.config.population)?;
        let arity = self.operators.parents_number::<V, E>();
        let tasks = self.allocator.plan(species, &quotas, arity, rng)?;
        breed(species, &tasks, &self.operators)
    }

    fn cluster(
        &self,
        mut species: Vec<Specie<V, E>>,
        offspring: Vec<GraphGenome<V, E>>,
    ) -> Result<(Vec<Specie<V, E>>, u32)> {
        if offspring.is_empty() {
            return Err(NeatError::EmptyPopulation);
        }
        let mut next_specie_id = self.next_specie_id;
        for specie in &mut species {
            specie.take_members();
        }

        for genome in offspring {
            let home = species
                .iter()
                .position(|s| self.strategy.same_species(s.centroid(), &genome));
            match home {
                Some(index) => species[index].push(genome),
                None => {
                    let id = SpecieId(next_specie_id);
                    next_specie_id = next_specie_id
                        .checked_add(1)
                        .ok_or(NeatError::IdSpaceExhausted)?;
                    debug!(specie = %id, "founded specie");
                    let mut specie = Specie::new(
                        id,
                        genome.clone(),
                        self.config.population.min_specie_size,
                        self.config.population.max_size,
                        self.config.population.fitness_history,
                    );
                    specie.push(genome);
                    species.push(specie);
                }
            }
        }

        species.retain(|s| !s.is_empty());
        Ok((species, next_specie_id))
    }

    fn commit(&mut self, species: Vec<Specie<V, E>>, next_specie_id: u32) {
        self.species = species;
        self.next_specie_id = next_specie_id;
        self.factory.reset_epoch();
        self.generation += 1;
        self.ended = false;
        info!(
            generation = self.generation,
            species = self.species.len(),
            size = self.len(),
            "started new generation"
        );
    }

    /// The fittest evaluated genome across all species.
    #[must_use]
    pub fn best_genome(&self) -> Option<&GraphGenome<V, E>> {
        self.species
            .iter()
            .filter_map(Specie::best)
            .max_by(|a, b| a.compare_fitness(b))
    }

    /// Every genome, specie by specie.
    pub fn genomes(&self) -> impl Iterator<Item = &GraphGenome<V, E>> + '_ {
        self.species.iter().flat_map(|s| s.members().iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.species.iter().map(Specie::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn species(&self) -> &[Specie<V, E>] {
        &self.species
    }

    /// Number of completed generation transitions.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn config(&self) -> &NeatConfig {
        &self.config
    }

    #[must_use]
    pub fn ancestor(&self) -> &GraphGenome<V, E> {
        &self.ancestor
    }

    #[must_use]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    #[must_use]
    pub fn allocator(&self) -> &ReproductionAllocator {
        &self.allocator
    }

    #[must_use]
    pub fn operators(&self) -> &GenomeOperators {
        &self.operators
    }

    /// The factory shared with the split and sprout mutations.
    #[must_use]
    pub fn id_factory(&self) -> &Arc<IdFactory> {
        &self.factory
    }
}
