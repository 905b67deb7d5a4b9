//! Distance metrics and the species membership test.
//!
//! The graph metric is the sum of a vertex term and an edge term, computed
//! identically over vertex ids and `(from, to)` edge keys:
//!
//! ```text
//! term = mismatched * mismatch_weight + match_weight * sum(gene_distance(matched)) / N
//! ```
//!
//! where `N` is the larger of the two genomes' vertex (or edge) counts. The
//! older averaged formula is available through
//! [`Normalization::Averaged`]; the two are not numerically equivalent.

use std::sync::Arc;

use crate::config::{Normalization, SpeciationConfig};
use crate::error::{NeatError, Result};
use crate::gene::Gene;
use crate::genome::GraphGenome;

/// Per-gene distance callback over opaque payloads.
pub type GeneDistanceFn<T> = Arc<dyn Fn(&T, &T) -> f64 + Send + Sync>;

/// Decides whether two individuals belong to the same specie.
pub trait SpeciationStrategy<G>: Send + Sync {
    /// Non-negative distance between `a` and `b`.
    fn distance(&self, a: &G, b: &G) -> f64;

    /// Largest distance at which two individuals are still the same specie.
    fn threshold(&self) -> f64;

    fn same_species(&self, a: &G, b: &G) -> bool {
        self.distance(a, b) <= self.threshold()
    }
}

/// Alignment-based distance between graph genomes.
pub struct GraphSpeciation<V, E> {
    config: SpeciationConfig,
    vertex_distance: GeneDistanceFn<V>,
    edge_distance: GeneDistanceFn<E>,
}

impl<V, E> Clone for GraphSpeciation<V, E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            vertex_distance: Arc::clone(&self.vertex_distance),
            edge_distance: Arc::clone(&self.edge_distance),
        }
    }
}

impl<V, E> std::fmt::Debug for GraphSpeciation<V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphSpeciation")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Counts gathered while aligning one kind of gene.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Alignment {
    matched: usize,
    mismatched: usize,
    distance_sum: f64,
    largest: usize,
}

impl Alignment {
    fn score(self, match_weight: f64, mismatch_weight: f64, normalization: Normalization) -> f64 {
        if self.largest == 0 {
            return 0.0;
        }
        let n = self.largest as f64;
        let mismatched = self.mismatched as f64;
        match normalization {
            Normalization::MatchedOverLargest => {
                mismatched * mismatch_weight + match_weight * self.distance_sum / n
            }
            Normalization::Averaged => {
                let matched_term = if self.matched == 0 {
                    0.0
                } else {
                    match_weight * self.distance_sum / self.matched as f64
                };
                mismatch_weight * mismatched / n + matched_term
            }
        }
    }
}

impl<V: Gene, E: Gene> GraphSpeciation<V, E> {
    /// Build the metric from its weights and the two per-gene callbacks.
    pub fn new<FV, FE>(config: SpeciationConfig, vertex_distance: FV, edge_distance: FE) -> Result<Self>
    where
        FV: Fn(&V, &V) -> f64 + Send + Sync + 'static,
        FE: Fn(&E, &E) -> f64 + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            vertex_distance: Arc::new(vertex_distance),
            edge_distance: Arc::new(edge_distance),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SpeciationConfig {
        &self.config
    }

    /// Distance contributed by vertices alone.
    #[must_use]
    pub fn vertex_term(&self, a: &GraphGenome<V, E>, b: &GraphGenome<V, E>) -> f64 {
        // Both sides iterate ids in ascending order, so the matched set is
        // summed in the same order whichever genome comes first.
        let mut alignment = Alignment {
            largest: a.vertex_count().max(b.vertex_count()),
            ..Default::default()
        };
        for (id, gene) in a.vertices() {
            match b.vertex(id) {
                Some(other) => {
                    alignment.matched += 1;
                    alignment.distance_sum += (self.vertex_distance)(gene, other);
                }
                None => alignment.mismatched += 1,
            }
        }
        alignment.mismatched += b.vertex_count() - alignment.matched;
        alignment.score(
            self.config.vertex_match_weight,
            self.config.vertex_mismatch_weight,
            self.config.normalization,
        )
    }

    /// Distance contributed by edges alone. Edges match only on the exact
    /// ordered pair.
    #[must_use]
    pub fn edge_term(&self, a: &GraphGenome<V, E>, b: &GraphGenome<V, E>) -> f64 {
        let mut alignment = Alignment {
            largest: a.edge_count().max(b.edge_count()),
            ..Default::default()
        };
        for (key, gene) in a.edges() {
            match b.edge(key.from, key.to) {
                Some(other) => {
                    alignment.matched += 1;
                    alignment.distance_sum += (self.edge_distance)(gene, other);
                }
                None => alignment.mismatched += 1,
            }
        }
        alignment.mismatched += b.edge_count() - alignment.matched;
        alignment.score(
            self.config.edge_match_weight,
            self.config.edge_mismatch_weight,
            self.config.normalization,
        )
    }
}

impl<V: Gene, E: Gene> SpeciationStrategy<GraphGenome<V, E>> for GraphSpeciation<V, E> {
    fn distance(&self, a: &GraphGenome<V, E>, b: &GraphGenome<V, E>) -> f64 {
        self.vertex_term(a, b) + self.edge_term(a, b)
    }

    fn threshold(&self) -> f64 {
        self.config.threshold
    }
}

/// Speciation from an arbitrary distance function.
pub struct FnSpeciation<G> {
    threshold: f64,
    distance: Arc<dyn Fn(&G, &G) -> f64 + Send + Sync>,
}

impl<G> FnSpeciation<G> {
    pub fn new<F>(distance: F, threshold: f64) -> Result<Self>
    where
        F: Fn(&G, &G) -> f64 + Send + Sync + 'static,
    {
        if threshold.is_nan() || threshold < 0.0 {
            return Err(NeatError::InvalidParameter {
                name: "threshold",
                reason: format!("must be non-negative, got {threshold}"),
            });
        }
        Ok(Self {
            threshold,
            distance: Arc::new(distance),
        })
    }
}

impl<G> SpeciationStrategy<G> for FnSpeciation<G> {
    fn distance(&self, a: &G, b: &G) -> f64 {
        (self.distance)(a, b)
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}
