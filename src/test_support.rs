//! Fixtures shared by the unit tests.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::gene::Gene;
use crate::genome::{GraphGenome, VertexId};

/// Integer payload whose crossover always yields the second parent's value
/// and whose mutation increments it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Tag(pub u32);

impl Gene for Tag {
    fn create_new<R: Rng>(&self, rng: &mut R) -> Self {
        Tag(rng.random())
    }

    fn crossover<R: Rng>(&self, other: &Self, _rng: &mut R) -> Self {
        *other
    }

    fn mutate<R: Rng>(&mut self, rng: &mut R, probability: f64) {
        if rng.random::<f64>() < probability {
            self.0 = self.0.wrapping_add(1);
        }
    }
}

pub(crate) fn tag_distance(a: &Tag, b: &Tag) -> f64 {
    f64::from(a.0.abs_diff(b.0))
}

/// Genome whose vertex `v` carries `Tag(v)` and edge `(f, t)` carries
/// `Tag(1000 * f + t)`.
pub(crate) fn genome(vertices: &[VertexId], edges: &[(VertexId, VertexId)]) -> GraphGenome<Tag, Tag> {
    let mut g = GraphGenome::new(Tag(0), Tag(0));
    for &v in vertices {
        g.add_vertex(v, Tag(v));
    }
    for &(from, to) in edges {
        g.add_edge(from, to, Tag(1000 * from + to))
            .expect("fixture edges reference fixture vertices");
    }
    g
}

pub(crate) fn with_fitness(mut g: GraphGenome<Tag, Tag>, fitness: f64) -> GraphGenome<Tag, Tag> {
    g.set_fitness(fitness);
    g
}
