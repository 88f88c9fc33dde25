use std::{fmt::Display, sync::atomic::AtomicBool};

use log::{debug, trace};
use rand::{distributions::WeightedIndex, prelude::Distribution, Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::{
    ensure_not_cancelled,
    error::{Error, Result},
    kmer_profile::GenomeProfile,
};

pub use seeder::SequenceSeeder;

mod seeder;

/// The random number generator each sequence is drawn with.
pub type SequenceRng = Xoshiro256PlusPlus;

/// A generated sequence over the alphabet of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneratedSequence {
    symbols: Vec<u8>,
}

impl GeneratedSequence {
    pub(crate) fn new(symbols: Vec<u8>) -> Self {
        Self { symbols }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.symbols
    }
}

impl AsRef<[u8]> for GeneratedSequence {
    fn as_ref(&self) -> &[u8] {
        &self.symbols
    }
}

impl Display for GeneratedSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.symbols))
    }
}

/// Draws one seed per sequence from the caller's generator.
///
/// Each sequence is then drawn from its own [`SequenceRng`], so the output
/// does not depend on whether sequences are generated in parallel.
pub(crate) fn sequence_seeds(count: usize, rng: &mut impl Rng) -> Vec<u64> {
    (0..count).map(|_| rng.gen()).collect()
}

/// Generates sequences from the Markov chain of a profile while steering
/// their GC content towards the target of the profile.
pub struct SequenceGenerator<'profile> {
    profile: &'profile GenomeProfile,
    seeder: SequenceSeeder,
    cancellation: Option<&'profile AtomicBool>,
}

impl<'profile> SequenceGenerator<'profile> {
    pub fn new(profile: &'profile GenomeProfile) -> Result<Self> {
        Ok(Self {
            profile,
            seeder: SequenceSeeder::new(profile.table(), profile.similar())?,
            cancellation: None,
        })
    }

    /// Generation fails with [`Error::Cancelled`] once the flag is set.
    pub fn with_cancellation(mut self, cancellation: &'profile AtomicBool) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn generate(
        &self,
        count: usize,
        length: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<GeneratedSequence>> {
        self.check_length(length)?;
        let seeds = sequence_seeds(count, rng);

        seeds
            .into_iter()
            .enumerate()
            .map(|(index, seed)| {
                ensure_not_cancelled(self.cancellation)?;
                trace!("Generating sequence {} / {count}", index + 1);
                self.generate_sequence(length, &mut SequenceRng::seed_from_u64(seed))
            })
            .collect()
    }

    /// Like [`Self::generate`], but sequences are generated in parallel.
    pub fn generate_parallel(
        &self,
        count: usize,
        length: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<GeneratedSequence>> {
        self.check_length(length)?;
        let seeds = sequence_seeds(count, rng);
        debug!(
            "Generating {count} sequences on {} threads",
            rayon::current_num_threads()
        );

        seeds
            .into_par_iter()
            .map(|seed| {
                ensure_not_cancelled(self.cancellation)?;
                self.generate_sequence(length, &mut SequenceRng::seed_from_u64(seed))
            })
            .collect()
    }

    /// Generates a single sequence of exactly `length` symbols.
    pub fn generate_sequence(
        &self,
        length: usize,
        rng: &mut impl Rng,
    ) -> Result<GeneratedSequence> {
        self.check_length(length)?;

        let profile = self.profile;
        let alphabet = profile.alphabet();
        let chain = profile.chain();
        let context_count = chain.row_count();

        let seed_rank = self.seeder.seed_rank(rng);
        let mut sequence = Vec::with_capacity(length);
        sequence.extend(alphabet.word(seed_rank, profile.k()));
        let mut gc_count = alphabet.count_gc(&sequence);
        // The context is the last k-1 symbols, i.e. the rank modulo the number of contexts.
        let mut context = seed_rank % context_count;
        let mut weights = vec![0.0; alphabet.size()];

        while sequence.len() < length {
            let excess_gc = gc_count as f64 / sequence.len() as f64 - profile.gc_fraction();
            let row = chain.row(context);

            self.successor_weights(row, &mut weights);
            let total = apply_gc_bias(&mut weights, profile, excess_gc * profile.gc_weight());
            debug_assert!(total > 0.0, "the GC shift leaves one side of the alphabet positive");

            let index = WeightedIndex::<f64>::new(&weights)
                .map_err(|_| Error::DegenerateProfile { k: profile.k() })?
                .sample(rng);

            sequence.push(alphabet.symbol(index));
            if alphabet.is_gc(index) {
                gc_count += 1;
            }
            context = (context * alphabet.size() + index) % context_count;
        }

        Ok(GeneratedSequence::new(sequence))
    }

    fn check_length(&self, length: usize) -> Result<()> {
        if length < self.profile.k() {
            Err(Error::LengthLowerThanK {
                length,
                k: self.profile.k(),
            })
        } else {
            Ok(())
        }
    }

    /// Copies the row into the weights, inverting it unless in similar mode.
    fn successor_weights(&self, row: &[f64], weights: &mut [f64]) {
        weights.copy_from_slice(row);
        if !self.profile.similar() {
            invert_weights(weights);
        }
    }
}

/// Turns a distribution favouring common symbols into one favouring rare symbols.
///
/// If some symbols have probability zero, their reciprocal is infinite,
/// and they share all probability mass equally.
fn invert_weights(weights: &mut [f64]) {
    let zeros = weights.iter().filter(|weight| **weight == 0.0).count();

    if zeros > 0 {
        let share = 1.0 / zeros as f64;
        weights
            .iter_mut()
            .for_each(|weight| *weight = if *weight == 0.0 { share } else { 0.0 });
    } else {
        weights.iter_mut().for_each(|weight| *weight = weight.recip());
        let sum: f64 = weights.iter().sum();
        weights.iter_mut().for_each(|weight| *weight /= sum);
    }
}

/// Moves weight from GC symbols to the other symbols if `shift` is positive,
/// and the other way round if it is negative. Returns the remaining total weight.
///
/// Every symbol on the receiving side ends up with at least `|shift|`, so for a
/// distribution the total stays positive.
fn apply_gc_bias(weights: &mut [f64], profile: &GenomeProfile, shift: f64) -> f64 {
    let alphabet = profile.alphabet();
    let mut total = 0.0;

    for (index, weight) in weights.iter_mut().enumerate() {
        if alphabet.is_gc(index) {
            *weight -= shift;
        } else {
            *weight += shift;
        }
        *weight = weight.max(0.0);
        total += *weight;
    }

    total
}
