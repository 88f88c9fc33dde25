use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};

use crate::{
    alphabet::Alphabet,
    error::{Error, Result},
    kmer_profile::KmerCountTable,
};

/// Draws the first word of a generated sequence.
///
/// In similar mode words are weighted by their relative frequency,
/// otherwise by its reciprocal. A word that never occurs has an infinite
/// reciprocal weight, so if such words exist, only they are drawn, each
/// with the same probability.
#[derive(Debug, Clone)]
pub struct SequenceSeeder {
    k: usize,
    words: Vec<usize>,
    sampler: WeightedIndex<f64>,
}

impl SequenceSeeder {
    pub fn new(table: &KmerCountTable, similar: bool) -> Result<Self> {
        let total = table.total() as f64;
        let degenerate = || Error::DegenerateProfile { k: table.k() };
        if total == 0.0 {
            return Err(degenerate());
        }

        let counts = table.counts().iter().copied().enumerate();
        let pool: Vec<(usize, f64)> = if similar {
            counts
                .filter(|(_, count)| *count > 0)
                .map(|(rank, count)| (rank, count as f64 / total))
                .collect()
        } else if table.counts().contains(&0) {
            counts
                .filter(|(_, count)| *count == 0)
                .map(|(rank, _)| (rank, 1.0))
                .collect()
        } else {
            counts
                .map(|(rank, count)| (rank, total / count as f64))
                .collect()
        };

        let sampler = WeightedIndex::<f64>::new(pool.iter().map(|(_, weight)| *weight))
            .map_err(|_| degenerate())?;

        Ok(Self {
            k: table.k(),
            words: pool.into_iter().map(|(rank, _)| rank).collect(),
            sampler,
        })
    }

    /// The number of words that can be drawn.
    pub fn pool_size(&self) -> usize {
        self.words.len()
    }

    /// Draws the rank of a word.
    pub fn seed_rank(&self, rng: &mut impl Rng) -> usize {
        self.words[self.sampler.sample(rng)]
    }

    pub fn seed(&self, alphabet: &Alphabet, rng: &mut impl Rng) -> Vec<u8> {
        alphabet.word(self.seed_rank(rng), self.k)
    }
}
