//! Species: clusters of genomes around a fixed centroid.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{NeatError, Result};
use crate::gene::Gene;
use crate::genome::GraphGenome;

/// Unique, sequentially assigned specie identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpecieId(pub u32);

impl std::fmt::Display for SpecieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cluster of genomes within the speciation threshold of a centroid.
///
/// The centroid is the genome that founded the specie. It is a fixed
/// reference point for membership and need not be a current member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specie<V, E> {
    id: SpecieId,
    centroid: GraphGenome<V, E>,
    members: Vec<GraphGenome<V, E>>,
    min_size: usize,
    max_size: usize,
    /// Best fitness of each ended generation, oldest first.
    best_history: VecDeque<f64>,
    history_capacity: usize,
    generations: usize,
}

impl<V: Gene, E: Gene> Specie<V, E> {
    /// Create an empty specie founded on `centroid`.
    #[must_use]
    pub fn new(
        id: SpecieId,
        centroid: GraphGenome<V, E>,
        min_size: usize,
        max_size: usize,
        history_capacity: usize,
    ) -> Self {
        Self {
            id,
            centroid,
            members: Vec::new(),
            min_size,
            max_size,
            best_history: VecDeque::new(),
            history_capacity: history_capacity.max(1),
            generations: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> SpecieId {
        self.id
    }

    #[must_use]
    pub fn centroid(&self) -> &GraphGenome<V, E> {
        &self.centroid
    }

    /// Replace the membership reference point.
    pub fn set_centroid(&mut self, centroid: GraphGenome<V, E>) {
        self.centroid = centroid;
    }

    #[must_use]
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Current members. After [`end_generation`](Self::end_generation) they
    /// are ordered fittest first.
    #[must_use]
    pub fn members(&self) -> &[GraphGenome<V, E>] {
        &self.members
    }

    pub(crate) fn members_mut(&mut self) -> &mut [GraphGenome<V, E>] {
        &mut self.members
    }

    /// Add a member without checking it against the centroid.
    pub fn push(&mut self, genome: GraphGenome<V, E>) {
        self.members.push(genome);
    }

    /// Drop the current members ahead of a new generation.
    pub(crate) fn take_members(&mut self) -> Vec<GraphGenome<V, E>> {
        std::mem::take(&mut self.members)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of generations this specie has completed.
    #[must_use]
    pub fn generations(&self) -> usize {
        self.generations
    }

    /// Recorded best fitness per generation, oldest first. At most
    /// `history_capacity` entries are kept.
    #[must_use]
    pub fn best_history(&self) -> &VecDeque<f64> {
        &self.best_history
    }

    /// Best recorded fitness `back` generations before the latest one.
    #[must_use]
    pub fn recorded_best(&self, back: usize) -> Option<f64> {
        let len = self.best_history.len();
        if back >= len {
            return None;
        }
        self.best_history.get(len - 1 - back).copied()
    }

    /// The fittest current member. Members without fitness never win.
    #[must_use]
    pub fn best(&self) -> Option<&GraphGenome<V, E>> {
        self.members
            .iter()
            .filter(|g| g.fitness().is_some())
            .max_by(|a, b| a.compare_fitness(b))
    }

    #[must_use]
    pub fn best_fitness(&self) -> Option<f64> {
        self.best().and_then(GraphGenome::fitness)
    }

    /// Mean member fitness, or `None` if the specie is empty or any member
    /// is still unevaluated.
    #[must_use]
    pub fn average_fitness(&self) -> Option<f64> {
        if self.members.is_empty() {
            return None;
        }
        let mut total = 0.0;
        for genome in &self.members {
            total += genome.fitness()?;
        }
        Some(total / self.members.len() as f64)
    }

    /// Close the current generation: order members fittest first and record
    /// the best fitness in the rolling history.
    ///
    /// Every member must have been evaluated.
    pub fn end_generation(&mut self) -> Result<()> {
        if self.members.iter().any(|g| g.fitness().is_none()) {
            return Err(NeatError::MissingFitness);
        }
        self.members.sort_by(|a, b| b.compare_fitness(a));
        if let Some(best) = self.members.first().and_then(GraphGenome::fitness) {
            if self.best_history.len() == self.history_capacity {
                self.best_history.pop_front();
            }
            self.best_history.push_back(best);
            self.generations += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{genome, with_fitness, Tag};

    fn specie() -> Specie<Tag, Tag> {
        Specie::new(SpecieId(5), genome(&[0], &[]), 2, 10, 3)
    }

    #[test]
    fn test_new_specie() {
        let s = specie();
        assert_eq!(s.id(), SpecieId(5));
        assert_eq!(s.centroid().vertex_count(), 1);
        assert!(s.is_empty());
        assert_eq!(s.min_size(), 2);
        assert_eq!(s.max_size(), 10);
        assert!(s.average_fitness().is_none());
    }

    #[test]
    fn test_end_generation_orders_and_records() {
        let mut s = specie();
        s.push(with_fitness(genome(&[1], &[]), 1.0));
        s.push(with_fitness(genome(&[2], &[]), 3.0));
        s.push(with_fitness(genome(&[3], &[]), 2.0));

        assert_eq!(s.average_fitness(), Some(2.0));
        s.end_generation().unwrap();

        let order: Vec<f64> = s.members().iter().filter_map(GraphGenome::fitness).collect();
        assert_eq!(order, vec![3.0, 2.0, 1.0]);
        assert_eq!(s.best_fitness(), Some(3.0));
        assert_eq!(s.recorded_best(0), Some(3.0));
        assert_eq!(s.generations(), 1);
    }

    #[test]
    fn test_history_is_rolling() {
        let mut s = specie();
        for fitness in [1.0, 2.0, 3.0, 4.0, 5.0] {
            s.take_members();
            s.push(with_fitness(genome(&[0], &[]), fitness));
            s.end_generation().unwrap();
        }
        assert_eq!(s.best_history().iter().copied().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(s.recorded_best(2), Some(3.0));
        assert_eq!(s.recorded_best(3), None);
        assert_eq!(s.generations(), 5);
    }

    #[test]
    fn test_unevaluated_member_rejected() {
        let mut s = specie();
        s.push(with_fitness(genome(&[1], &[]), 1.0));
        s.push(genome(&[2], &[]));
        assert!(s.average_fitness().is_none());
        assert_eq!(s.end_generation(), Err(NeatError::MissingFitness));
        assert_eq!(s.best_fitness(), Some(1.0));
    }
}
