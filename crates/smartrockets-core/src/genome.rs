//! Force-sequence genomes and their recombination operators.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::Vec2;

/// Ordered per-step forces; one gene is applied per simulated step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genome {
    genes: Vec<Vec2>,
}

impl Genome {
    /// Wrap an explicit gene sequence.
    #[must_use]
    pub fn from_genes(genes: Vec<Vec2>) -> Self {
        Self { genes }
    }

    /// Sample `len` genes with each component uniform in `[-1, 1]`.
    #[must_use]
    pub fn random(len: usize, rng: &mut dyn RngCore) -> Self {
        let genes = (0..len).map(|_| random_force(rng)).collect();
        Self { genes }
    }

    /// Same force repeated for every step.
    #[must_use]
    pub fn constant(force: Vec2, len: usize) -> Self {
        Self {
            genes: vec![force; len],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Gene for `step`, or `None` past the end of the sequence.
    #[must_use]
    pub fn gene(&self, step: usize) -> Option<Vec2> {
        self.genes.get(step).copied()
    }

    #[must_use]
    pub fn genes(&self) -> &[Vec2] {
        &self.genes
    }

    /// Child taking `self[..mid]` followed by `other[mid..]`.
    ///
    /// `mid` is clamped to the shorter parent so the split never runs past either genome.
    #[must_use]
    pub fn crossover(&self, other: &Self, mid: usize) -> Self {
        let len = self.len().min(other.len());
        let mid = mid.min(len);
        let mut genes = Vec::with_capacity(len);
        genes.extend_from_slice(&self.genes[..mid]);
        genes.extend_from_slice(&other.genes[mid..len]);
        Self { genes }
    }

    /// Replace each gene independently with probability `rate`, returning how many changed.
    pub fn mutate(&mut self, rate: f32, rng: &mut dyn RngCore) -> usize {
        let mut replaced = 0;
        for gene in &mut self.genes {
            if rng.random::<f32>() < rate {
                *gene = random_force(rng);
                replaced += 1;
            }
        }
        replaced
    }
}

fn random_force(rng: &mut dyn RngCore) -> Vec2 {
    Vec2::new(rng.random_range(-1.0..=1.0), rng.random_range(-1.0..=1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn random_genes_stay_within_unit_square() {
        let mut rng = SmallRng::seed_from_u64(0xDEADBEEF);
        let genome = Genome::random(500, &mut rng);
        assert_eq!(genome.len(), 500);
        assert!(
            genome
                .genes()
                .iter()
                .all(|g| (-1.0..=1.0).contains(&g.x) && (-1.0..=1.0).contains(&g.y))
        );
    }

    #[test]
    fn crossover_splits_at_mid() {
        let mut rng = SmallRng::seed_from_u64(11);
        let a = Genome::random(20, &mut rng);
        let b = Genome::random(20, &mut rng);
        for mid in [0, 1, 7, 19] {
            let child = a.crossover(&b, mid);
            assert_eq!(child.len(), 20);
            for i in 0..20 {
                let expected = if i < mid { a.genes()[i] } else { b.genes()[i] };
                assert_eq!(child.genes()[i], expected, "mid={mid} index={i}");
            }
        }
    }

    #[test]
    fn crossover_clamps_out_of_range_mid() {
        let a = Genome::constant(Vec2::new(1.0, 0.0), 4);
        let b = Genome::constant(Vec2::new(0.0, 1.0), 4);
        assert_eq!(a.crossover(&b, 99), a);
    }

    #[test]
    fn zero_rate_never_mutates() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut genome = Genome::random(64, &mut rng);
        let original = genome.clone();
        assert_eq!(genome.mutate(0.0, &mut rng), 0);
        assert_eq!(genome, original);
    }

    #[test]
    fn full_rate_replaces_every_gene() {
        let mut rng = SmallRng::seed_from_u64(6);
        let mut genome = Genome::constant(Vec2::new(5.0, 5.0), 32);
        assert_eq!(genome.mutate(1.0, &mut rng), 32);
        assert!(genome.genes().iter().all(|g| g.x <= 1.0 && g.y <= 1.0));
    }
}
