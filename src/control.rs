use std::sync::atomic::AtomicBool;

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng, SeedableRng};
use rayon::prelude::*;

use crate::{
    alphabet::Alphabet,
    ensure_not_cancelled,
    error::{Error, Result},
    generator::{sequence_seeds, GeneratedSequence, SequenceRng},
};

/// Generates baseline sequences whose symbols are drawn independently
/// from a distribution that only depends on a target GC fraction.
pub struct ControlGenerator<'alphabet> {
    alphabet: &'alphabet Alphabet,
    probabilities: Vec<f64>,
    sampler: WeightedIndex<f64>,
    cancellation: Option<&'alphabet AtomicBool>,
}

impl<'alphabet> ControlGenerator<'alphabet> {
    pub fn new(alphabet: &'alphabet Alphabet, gc: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&gc) {
            return Err(Error::GcFractionOutOfRange(gc));
        }

        let gc_size = alphabet.gc_size() as f64;
        let other_size = (alphabet.size() - alphabet.gc_size()) as f64;
        let probabilities: Vec<_> = (0..alphabet.size())
            .map(|index| {
                if alphabet.is_gc(index) {
                    gc / gc_size
                } else {
                    (1.0 - gc) / other_size
                }
            })
            .collect();
        let sampler = WeightedIndex::<f64>::new(&probabilities)
            .map_err(|_| Error::GcFractionOutOfRange(gc))?;

        Ok(Self {
            alphabet,
            probabilities,
            sampler,
            cancellation: None,
        })
    }

    pub fn with_cancellation(mut self, cancellation: &'alphabet AtomicBool) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// The probability of each symbol, in alphabet order.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn generate(
        &self,
        count: usize,
        length: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<GeneratedSequence>> {
        check_length(length)?;
        sequence_seeds(count, rng)
            .into_iter()
            .map(|seed| {
                ensure_not_cancelled(self.cancellation)?;
                Ok(self.generate_sequence(length, &mut SequenceRng::seed_from_u64(seed)))
            })
            .collect()
    }

    pub fn generate_parallel(
        &self,
        count: usize,
        length: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<GeneratedSequence>> {
        check_length(length)?;
        sequence_seeds(count, rng)
            .into_par_iter()
            .map(|seed| {
                ensure_not_cancelled(self.cancellation)?;
                Ok(self.generate_sequence(length, &mut SequenceRng::seed_from_u64(seed)))
            })
            .collect()
    }

    pub fn generate_sequence(&self, length: usize, rng: &mut impl Rng) -> GeneratedSequence {
        GeneratedSequence::new(
            (0..length)
                .map(|_| self.alphabet.symbol(self.sampler.sample(rng)))
                .collect(),
        )
    }
}

fn check_length(length: usize) -> Result<()> {
    if length == 0 {
        Err(Error::ZeroLength)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use crate::{alphabet::Alphabet, error::Error};

    use super::ControlGenerator;

    #[test]
    fn symbol_probabilities() {
        let alphabet = Alphabet::dna();
        let generator = ControlGenerator::new(&alphabet, 0.6).unwrap();
        let expected = [0.2, 0.3, 0.3, 0.2];
        for (value, expected) in generator.probabilities().iter().zip(expected) {
            assert!((value - expected).abs() < 1e-12);
        }
        let sum: f64 = generator.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);

        // Zero-probability symbols are never drawn.
        let generator = ControlGenerator::new(&alphabet, 1.0).unwrap();
        let sequence = generator.generate_sequence(1000, &mut Xoshiro256PlusPlus::seed_from_u64(4));
        assert!(sequence.as_bytes().iter().all(|symbol| b"CG".contains(symbol)));
    }

    #[test]
    fn gc_content_converges() {
        let alphabet = Alphabet::dna();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        for gc in [0.0, 0.2, 0.5, 0.65, 1.0] {
            let generator = ControlGenerator::new(&alphabet, gc).unwrap();
            let sequence = generator.generate_sequence(100_000, &mut rng);
            assert_eq!(sequence.len(), 100_000);
            let observed = alphabet.count_gc(sequence.as_bytes()) as f64 / 100_000.0;
            assert!((observed - gc).abs() < 0.01, "{observed} != {gc}");
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let alphabet = Alphabet::dna();
        let generator = ControlGenerator::new(&alphabet, 0.4).unwrap();
        let sequential = generator
            .generate(8, 250, &mut Xoshiro256PlusPlus::seed_from_u64(9))
            .unwrap();
        let parallel = generator
            .generate_parallel(8, 250, &mut Xoshiro256PlusPlus::seed_from_u64(9))
            .unwrap();
        assert_eq!(sequential.len(), 8);
        assert!(sequential.iter().all(|sequence| sequence.len() == 250));
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn invalid_requests() {
        let alphabet = Alphabet::dna();
        assert!(matches!(
            ControlGenerator::new(&alphabet, 1.2),
            Err(Error::GcFractionOutOfRange(_))
        ));
        assert!(matches!(
            ControlGenerator::new(&alphabet, f64::NAN),
            Err(Error::GcFractionOutOfRange(_))
        ));

        let generator = ControlGenerator::new(&alphabet, 0.5).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        assert!(matches!(
            generator.generate(1, 0, &mut rng),
            Err(Error::ZeroLength)
        ));

        let cancelled = AtomicBool::new(true);
        let generator = generator.with_cancellation(&cancelled);
        assert!(matches!(
            generator.generate(1, 10, &mut rng),
            Err(Error::Cancelled)
        ));
    }
}
