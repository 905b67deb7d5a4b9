//! Configuration for speciation, population bounds, reproduction and mutation.
//!
//! All structs are plain serde data with sensible defaults. Components
//! validate the config they are built from, so a bad value is reported at
//! construction time rather than in the middle of a generation.

use serde::{Deserialize, Serialize};

use crate::error::{check_probability, NeatError, Result};

/// How the matched-gene distance of a vertex or edge term is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Normalization {
    /// `mismatches * mismatch_weight + match_weight * sum(distance) / N`
    /// where `N` is the larger gene count of the two genomes.
    #[default]
    MatchedOverLargest,
    /// `mismatch_weight * mismatches / N + match_weight * sum(distance) / matches`.
    Averaged,
}

/// Parameters of the graph distance metric and the species threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciationConfig {
    /// Genomes within this distance of a centroid join its specie.
    pub threshold: f64,
    /// Multiplier for the summed distance of matching vertices.
    pub vertex_match_weight: f64,
    /// Multiplier for the summed distance of matching edges.
    pub edge_match_weight: f64,
    /// Distance contributed by each vertex present in only one genome.
    pub vertex_mismatch_weight: f64,
    /// Distance contributed by each edge present in only one genome.
    pub edge_mismatch_weight: f64,
    /// Normalization scheme for both terms.
    #[serde(default)]
    pub normalization: Normalization,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            vertex_match_weight: 0.4,
            edge_match_weight: 0.4,
            vertex_mismatch_weight: 1.0,
            edge_mismatch_weight: 1.0,
            normalization: Normalization::MatchedOverLargest,
        }
    }
}

impl SpeciationConfig {
    /// Use the same match and mismatch weights for vertices and edges.
    #[must_use]
    pub fn uniform(threshold: f64, match_weight: f64, mismatch_weight: f64) -> Self {
        Self {
            threshold,
            vertex_match_weight: match_weight,
            edge_match_weight: match_weight,
            vertex_mismatch_weight: mismatch_weight,
            edge_mismatch_weight: mismatch_weight,
            normalization: Normalization::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_non_negative("threshold", self.threshold)?;
        check_non_negative("vertex_match_weight", self.vertex_match_weight)?;
        check_non_negative("edge_match_weight", self.edge_match_weight)?;
        check_non_negative("vertex_mismatch_weight", self.vertex_mismatch_weight)?;
        check_non_negative("edge_mismatch_weight", self.edge_mismatch_weight)
    }
}

/// Global population bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Lower bound on the number of offspring per generation.
    pub min_size: usize,
    /// Upper bound on the number of offspring per generation.
    pub max_size: usize,
    /// Allocations below this size are dropped to zero.
    pub min_specie_size: usize,
    /// Number of best-fitness records each specie keeps.
    pub fitness_history: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            min_size: 100,
            max_size: 120,
            min_specie_size: 2,
            fitness_history: 32,
        }
    }
}

impl PopulationConfig {
    /// Bounds with `min_size == max_size == size`.
    #[must_use]
    pub fn fixed(size: usize, min_specie_size: usize) -> Self {
        Self {
            min_size: size,
            max_size: size,
            min_specie_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_size == 0 {
            return Err(invalid("min_size", "must be at least 1"));
        }
        if self.max_size < self.min_size {
            return Err(invalid(
                "max_size",
                format!("{} is below min_size {}", self.max_size, self.min_size),
            ));
        }
        if self.min_specie_size > self.max_size {
            return Err(invalid(
                "min_specie_size",
                format!("{} exceeds max_size {}", self.min_specie_size, self.max_size),
            ));
        }
        if self.fitness_history == 0 {
            return Err(invalid("fitness_history", "must be at least 1"));
        }
        Ok(())
    }
}

/// Parameters of the per-generation reproduction quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReproductionConfig {
    /// Share of each specie's allocation produced by crossover.
    pub crossover_probability: f64,
    /// Odds that a crossover draws its parents from the whole population.
    pub interspecies_mating_rate: f64,
    /// Generations a specie may go without improving its best fitness.
    pub stagnation_window: usize,
    /// Fill the crossover share of a specie with fewer members than the
    /// crossover arity by cloning instead of failing the generation.
    #[serde(default)]
    pub clone_undersized_species: bool,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            crossover_probability: 0.75,
            interspecies_mating_rate: 0.001,
            stagnation_window: 10,
            clone_undersized_species: false,
        }
    }
}

impl ReproductionConfig {
    pub fn validate(&self) -> Result<()> {
        check_probability("crossover_probability", self.crossover_probability)?;
        check_probability("interspecies_mating_rate", self.interspecies_mating_rate)?;
        if self.stagnation_window == 0 {
            return Err(invalid("stagnation_window", "must be at least 1"));
        }
        Ok(())
    }
}

/// Per-offspring mutation probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    pub add_edge_probability: f64,
    pub split_edge_probability: f64,
    pub sprout_vertex_probability: f64,
    /// Probability handed to gene-level mutation unless overridden below.
    pub value_probability: f64,
    #[serde(default)]
    pub vertex_value_probability: Option<f64>,
    #[serde(default)]
    pub edge_value_probability: Option<f64>,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            add_edge_probability: 0.05,
            split_edge_probability: 0.03,
            sprout_vertex_probability: 0.0,
            value_probability: 0.8,
            vertex_value_probability: None,
            edge_value_probability: None,
        }
    }
}

impl MutationConfig {
    /// No mutation at all, useful for isolating crossover.
    #[must_use]
    pub fn none() -> Self {
        Self {
            add_edge_probability: 0.0,
            split_edge_probability: 0.0,
            sprout_vertex_probability: 0.0,
            value_probability: 0.0,
            vertex_value_probability: None,
            edge_value_probability: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_probability("add_edge_probability", self.add_edge_probability)?;
        check_probability("split_edge_probability", self.split_edge_probability)?;
        check_probability("sprout_vertex_probability", self.sprout_vertex_probability)?;
        check_probability("value_probability", self.value_probability)?;
        if let Some(p) = self.vertex_value_probability {
            check_probability("vertex_value_probability", p)?;
        }
        if let Some(p) = self.edge_value_probability {
            check_probability("edge_value_probability", p)?;
        }
        Ok(())
    }
}

/// Configuration of a [`Population`](crate::Population).
///
/// The speciation strategy is handed to the population already built, so
/// [`SpeciationConfig`] goes to [`GraphSpeciation::new`](crate::GraphSpeciation::new)
/// and is not part of this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NeatConfig {
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub reproduction: ReproductionConfig,
    #[serde(default)]
    pub mutation: MutationConfig,
}

impl NeatConfig {
    /// A small population for tests and quick experiments.
    #[must_use]
    pub fn minimal(size: usize) -> Self {
        Self {
            population: PopulationConfig::fixed(size, 1),
            ..Default::default()
        }
    }

    /// Validate every section plus cross-section constraints.
    pub fn validate(&self) -> Result<()> {
        self.population.validate()?;
        self.reproduction.validate()?;
        self.mutation.validate()?;
        if self.population.fitness_history < self.reproduction.stagnation_window {
            return Err(invalid(
                "fitness_history",
                format!(
                    "{} records cannot cover a stagnation window of {}",
                    self.population.fitness_history, self.reproduction.stagnation_window
                ),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> NeatError {
    NeatError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(name, format!("must be finite and non-negative, got {value}")))
    }
}
