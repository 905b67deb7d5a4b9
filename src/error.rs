//! Error types for graph-genome evolution.
//!
//! Every failure surfaced by this crate is a configuration or invariant
//! violation. Nothing here is retried internally: errors propagate straight
//! to the caller, and a failed generation transition leaves the population
//! exactly as it was.

use thiserror::Error;

use crate::genome::VertexId;
use crate::species::SpecieId;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, NeatError>;

/// Errors produced by genomes, operators, speciation and reproduction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NeatError {
    /// A probability argument was outside `[0, 1]` (or NaN).
    #[error("probability `{name}` must be within [0, 1], got {value}")]
    InvalidProbability {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A construction parameter was out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Human readable constraint that was violated.
        reason: String,
    },

    /// An edge referenced a vertex the genome does not contain.
    #[error("vertex {id} does not exist in the genome")]
    MissingVertex {
        /// The missing vertex identifier.
        id: VertexId,
    },

    /// A vertex identifier was inserted twice where uniqueness is required.
    #[error("vertex {id} already exists in the genome")]
    DuplicateVertex {
        /// The duplicated vertex identifier.
        id: VertexId,
    },

    /// The identifier factory ran out of 32-bit identifiers.
    #[error("structural identifier space exhausted")]
    IdSpaceExhausted,

    /// Every specie received a zero allocation, so the population floor
    /// cannot be reached.
    #[error("all species were allocated zero offspring; no specie can reproduce")]
    AllSpeciesZero,

    /// Trimming to the population ceiling would push a specie below the
    /// per-specie minimum.
    #[error(
        "cannot trim to the population ceiling: largest allocation {largest} \
         is already at the minimum specie size {min_specie_size}"
    )]
    CannotTrim {
        /// The largest remaining allocation.
        largest: usize,
        /// Configured per-specie minimum.
        min_specie_size: usize,
    },

    /// A specie had fewer parents than the crossover operator consumes.
    #[error("specie {specie} has {available} parents but crossover requires {required}")]
    InsufficientParents {
        /// The specie that could not supply parents.
        specie: SpecieId,
        /// Parents available.
        available: usize,
        /// Parents required by the operator.
        required: usize,
    },

    /// A crossover operator received the wrong number of parents.
    #[error("crossover expects {expected} parents, got {actual}")]
    ParentCount {
        /// Arity of the operator.
        expected: usize,
        /// Number of parents supplied.
        actual: usize,
    },

    /// A genome was expected to carry an externally assigned fitness.
    #[error("genome has no fitness assigned")]
    MissingFitness,

    /// The population holds no genomes.
    #[error("population has no genomes")]
    EmptyPopulation,
}

/// Reject probabilities outside `[0, 1]` instead of coercing them.
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(NeatError::InvalidProbability { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_probability_bounds() {
        assert!(check_probability("p", 0.0).is_ok());
        assert!(check_probability("p", 1.0).is_ok());
        assert!(matches!(
            check_probability("p", 1.5),
            Err(NeatError::InvalidProbability { name: "p", .. })
        ));
        assert!(check_probability("p", -0.1).is_err());
        assert!(check_probability("p", f64::NAN).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = NeatError::InsufficientParents {
            specie: SpecieId(3),
            available: 1,
            required: 2,
        };
        assert_eq!(
            err.to_string(),
            "specie 3 has 1 parents but crossover requires 2"
        );
    }
}
