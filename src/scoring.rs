use crate::{
    error::{Error, Result},
    generator::GeneratedSequence,
    kmer_profile::GenomeProfile,
};

/// The scores of a sequence with respect to a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorePair {
    /// The composition score without GC correction.
    pub kmer_score: f64,
    /// The composition score penalised by the GC deviation from the profile.
    pub full_score: f64,
}

/// Scores sequences against the word counts and GC target of a profile.
///
/// In similar mode frequent words of the profile increase the score,
/// otherwise rare words do.
pub struct Scorer<'profile> {
    profile: &'profile GenomeProfile,
    high_frequency: f64,
}

impl<'profile> Scorer<'profile> {
    pub fn new(profile: &'profile GenomeProfile) -> Self {
        Self {
            profile,
            high_frequency: profile.table().max() as f64,
        }
    }

    /// Returns `None` for an empty sequence.
    pub fn score(&self, sequence: &[u8]) -> Option<ScorePair> {
        if sequence.is_empty() {
            return None;
        }

        let profile = self.profile;
        let alphabet = profile.alphabet();
        let table = profile.table();
        let sequence = sequence.to_ascii_uppercase();
        let length = sequence.len() as f64;

        let kmer_sum: f64 = alphabet
            .window_ranks(&sequence, profile.k())
            .map(|rank| {
                let relative_frequency = table.get(rank) as f64 / self.high_frequency;
                if profile.similar() {
                    relative_frequency
                } else {
                    1.0 - relative_frequency
                }
            })
            .sum();
        let kmer_score = kmer_sum / length;

        let gc_fraction = alphabet.count_gc(&sequence) as f64 / length;
        let gc_deviation = (gc_fraction - profile.gc_fraction()).abs();
        let full_score =
            (kmer_score - gc_deviation * profile.gc_weight()) / (1.0 + profile.gc_weight());

        Some(ScorePair {
            kmer_score,
            full_score,
        })
    }

    /// Scores generated sequences and keeps each sequence with its scores, in input order.
    pub fn score_generated(
        &self,
        sequences: Vec<GeneratedSequence>,
    ) -> Result<Vec<ScoredSequence>> {
        sequences
            .into_iter()
            .enumerate()
            .map(|(index, sequence)| {
                let scores = self
                    .score(sequence.as_bytes())
                    .ok_or(Error::EmptySequence { index })?;
                Ok(ScoredSequence { sequence, scores })
            })
            .collect()
    }

    pub fn score_all<Sequence: AsRef<[u8]>>(
        &self,
        sequences: &[Sequence],
    ) -> Result<Vec<ScorePair>> {
        sequences
            .iter()
            .enumerate()
            .map(|(index, sequence)| {
                self.score(sequence.as_ref())
                    .ok_or(Error::EmptySequence { index })
            })
            .collect()
    }
}

/// A sequence together with its scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSequence {
    pub sequence: GeneratedSequence,
    pub scores: ScorePair,
}

/// Sorts scored sequences by their full score, best first. Ties keep their order.
pub fn rank_by_score(mut scored: Vec<ScoredSequence>) -> Vec<ScoredSequence> {
    scored.sort_by(|a, b| b.scores.full_score.total_cmp(&a.scores.full_score));
    scored
}
