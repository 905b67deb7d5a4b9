//! Alignment crossover between graph genomes.

use rand::Rng;

use crate::error::{NeatError, Result};
use crate::gene::Gene;
use crate::genome::GraphGenome;

/// An operator combining `parents_number()` genomes into one child.
pub trait Crossover<V, E>: Send + Sync {
    /// How many parents [`cross`](Self::cross) consumes.
    fn parents_number(&self) -> usize;

    /// Produce one child. Parents are ordered fittest first.
    fn cross<R: Rng>(&self, parents: &[&GraphGenome<V, E>], rng: &mut R)
        -> Result<GraphGenome<V, E>>;
}

/// NEAT-style crossover aligned on vertex ids and edge keys.
///
/// The child starts as a copy of the fitter parent. Every vertex and edge
/// present in both parents is replaced by the gene-level crossover of the
/// two payloads; structure present only in the fitter parent is kept as is,
/// and structure present only in the other parent is never inherited.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentCrossover;

impl AlignmentCrossover {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Cross two parents. `fitter` is assumed to be the fitter of the two.
    pub fn cross_pair<V: Gene, E: Gene, R: Rng>(
        &self,
        fitter: &GraphGenome<V, E>,
        other: &GraphGenome<V, E>,
        rng: &mut R,
    ) -> GraphGenome<V, E> {
        let mut child = fitter.offspring_clone();

        for (id, gene) in fitter.vertices() {
            if let Some(other_gene) = other.vertex(id) {
                child.add_vertex(id, gene.crossover(other_gene, rng));
            }
        }

        for (key, gene) in fitter.edges() {
            if let (Some(other_gene), Some(slot)) =
                (other.edge(key.from, key.to), child.edge_mut(key.from, key.to))
            {
                *slot = gene.crossover(other_gene, rng);
            }
        }

        child
    }
}

impl<V: Gene, E: Gene> Crossover<V, E> for AlignmentCrossover {
    fn parents_number(&self) -> usize {
        2
    }

    fn cross<R: Rng>(
        &self,
        parents: &[&GraphGenome<V, E>],
        rng: &mut R,
    ) -> Result<GraphGenome<V, E>> {
        match parents {
            [fitter, other] => Ok(self.cross_pair(fitter, other, rng)),
            _ => Err(NeatError::ParentCount {
                expected: 2,
                actual: parents.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::EdgeKey;
    use crate::test_support::{genome, Tag};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_disjoint_genes_come_from_fitter_parent() {
        let mut rng = test_rng();
        let mut parent1 = genome(&[0, 2], &[(0, 0), (0, 2)]);
        let parent2 = genome(&[0, 1, 3], &[(0, 0), (0, 1), (0, 3)]);
        // Distinguish the matching genes of the two parents.
        parent1.add_vertex(0, Tag(500));
        let _ = parent1.add_edge(0, 0, Tag(600));

        let child = AlignmentCrossover.cross(&[&parent1, &parent2], &mut rng).unwrap();

        assert_eq!(child.vertex_ids().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(
            child.edge_keys().collect::<Vec<_>>(),
            vec![EdgeKey::new(0, 0), EdgeKey::new(0, 2)]
        );
        // Matched ids take the gene-level crossover (the second parent's value).
        assert_eq!(child.vertex(0), parent2.vertex(0));
        assert_eq!(child.edge(0, 0), parent2.edge(0, 0));
        // Unmatched ids keep the fitter parent's value.
        assert_eq!(child.vertex(2), parent1.vertex(2));
        assert_eq!(child.edge(0, 2), parent1.edge(0, 2));
    }

    #[test]
    fn test_child_has_no_fitness() {
        let mut rng = test_rng();
        let mut parent1 = genome(&[0], &[]);
        parent1.set_fitness(4.0);
        let parent2 = genome(&[0], &[]);
        let child = AlignmentCrossover.cross_pair(&parent1, &parent2, &mut rng);
        assert!(child.fitness().is_none());
        assert!(parent1.fitness().is_some());
    }

    #[test]
    fn test_wrong_parent_count_rejected() {
        let mut rng = test_rng();
        let parent = genome(&[0], &[]);
        let result = AlignmentCrossover.cross(&[&parent], &mut rng);
        assert!(matches!(
            result,
            Err(NeatError::ParentCount {
                expected: 2,
                actual: 1
            })
        ));
        assert_eq!(<AlignmentCrossover as Crossover<Tag, Tag>>::parents_number(&AlignmentCrossover), 2);
    }
}
