//! Generates sequences that deliberately diverge from, or resemble, the
//! k-mer composition of a reference genome.
//!
//! A [`GenomeProfile`] holds the k-mer counts and GC fraction of the
//! reference along with an order-(k-1) Markov chain derived from the counts.
//! Sequences are drawn from that chain, inverted when rare words are wanted,
//! while their GC content is steered towards the target of the profile.
//! Control sequences drawn only from the GC fraction serve as a baseline,
//! and both kinds can be scored against the profile.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

pub mod alphabet;
pub mod config;
pub mod control;
pub mod error;
pub mod generator;
pub mod io;
pub mod kmer_profile;
pub mod markov_chain;
pub mod scoring;

pub use alphabet::Alphabet;
pub use config::{ProfileConfig, UnseenContextPolicy};
pub use control::ControlGenerator;
pub use error::{Error, Result};
pub use generator::{GeneratedSequence, SequenceGenerator};
pub use kmer_profile::GenomeProfile;
pub use markov_chain::MarkovChain;
pub use scoring::{rank_by_score, ScorePair, ScoredSequence, Scorer};

/// Builds the profile of a genome from a stream of sequence records.
pub fn build_profile<Record: AsRef<[u8]>>(
    records: impl IntoIterator<Item = std::io::Result<Record>>,
    alphabet: &Alphabet,
    config: &ProfileConfig,
) -> Result<GenomeProfile> {
    GenomeProfile::from_records(records, alphabet, config, None)
}

pub fn generate_sequences(
    profile: &GenomeProfile,
    count: usize,
    length: usize,
    rng: &mut impl Rng,
) -> Result<Vec<GeneratedSequence>> {
    SequenceGenerator::new(profile)?.generate(count, length, rng)
}

pub fn generate_control_sequences(
    alphabet: &Alphabet,
    gc: f64,
    count: usize,
    length: usize,
    rng: &mut impl Rng,
) -> Result<Vec<GeneratedSequence>> {
    ControlGenerator::new(alphabet, gc)?.generate(count, length, rng)
}

/// Returns the k-mer scores and the GC-adjusted scores of the sequences.
pub fn score_sequences<Sequence: AsRef<[u8]>>(
    sequences: &[Sequence],
    profile: &GenomeProfile,
) -> Result<(Vec<f64>, Vec<f64>)> {
    Ok(Scorer::new(profile)
        .score_all(sequences)?
        .into_iter()
        .map(|scores| (scores.kmer_score, scores.full_score))
        .unzip())
}

pub(crate) fn ensure_not_cancelled(cancellation: Option<&AtomicBool>) -> Result<()> {
    if cancellation.is_some_and(|cancelled| cancelled.load(Ordering::Relaxed)) {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}
