//! Gene payload capabilities.
//!
//! Vertices and edges of a [`GraphGenome`](crate::GraphGenome) carry opaque
//! payloads. The engine never inspects them; it only needs to clone them,
//! reinitialise them, cross two of them and hand them to a primitive
//! mutation. Scalar encodings (fixed point, integer, real valued) live with
//! the caller and implement [`Gene`].

use rand::Rng;

/// Capabilities the engine requires from a vertex or edge payload.
///
/// # Example
///
/// ```rust
/// use rand::Rng;
/// use graph_neat::Gene;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Weight(f64);
///
/// impl Gene for Weight {
///     fn create_new<R: Rng>(&self, rng: &mut R) -> Self {
///         Weight(rng.random_range(-1.0..1.0))
///     }
///     fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
///         graph_neat::gene::random_choice(self, other, rng)
///     }
///     fn mutate<R: Rng>(&mut self, rng: &mut R, probability: f64) {
///         if rng.random::<f64>() < probability {
///             self.0 += rng.random_range(-0.1..0.1);
///         }
///     }
/// }
/// ```
pub trait Gene: Clone + Send + Sync {
    /// Produce a freshly randomised payload of the same kind.
    ///
    /// `self` acts as the template, so parameterised encodings (ranges,
    /// bit widths) carry over to the new value.
    fn create_new<R: Rng>(&self, rng: &mut R) -> Self;

    /// Combine this payload with another of the same kind.
    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;

    /// Apply the primitive mutation with the given probability.
    fn mutate<R: Rng>(&mut self, rng: &mut R, probability: f64);
}

/// Structure-only payload for genomes whose vertices or edges carry no data.
impl Gene for () {
    fn create_new<R: Rng>(&self, _rng: &mut R) -> Self {}

    fn crossover<R: Rng>(&self, _other: &Self, _rng: &mut R) -> Self {}

    fn mutate<R: Rng>(&mut self, _rng: &mut R, _probability: f64) {}
}

/// Crossover that inherits one of the two payloads unchanged, each with
/// equal probability.
pub fn random_choice<G: Clone, R: Rng>(a: &G, b: &G, rng: &mut R) -> G {
    if rng.random::<bool>() {
        a.clone()
    } else {
        b.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_choice_picks_both_sides() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let picks: Vec<u8> = (0..64).map(|_| random_choice(&1u8, &2u8, &mut rng)).collect();
        assert!(picks.contains(&1));
        assert!(picks.contains(&2));
        assert!(picks.iter().all(|&p| p == 1 || p == 2));
    }

    #[test]
    fn test_unit_gene_is_inert() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut unit = ();
        unit.mutate(&mut rng, 1.0);
        let fresh: () = unit.create_new(&mut rng);
        let crossed: () = unit.crossover(&fresh, &mut rng);
        assert_eq!(std::mem::size_of_val(&crossed), 0);
    }
}
