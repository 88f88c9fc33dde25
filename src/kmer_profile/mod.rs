use std::sync::atomic::AtomicBool;

use log::{debug, info};
use rayon::prelude::*;

use crate::{
    alphabet::Alphabet,
    config::{ProfileConfig, UnseenContextPolicy},
    ensure_not_cancelled,
    error::{Error, Result},
    markov_chain::MarkovChain,
};

mod serde;

/// Occurrence counts of all words of length `k`, indexed by word rank.
///
/// Every word is present from the start with a count of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerCountTable {
    k: usize,
    counts: Vec<u64>,
}

impl KmerCountTable {
    pub fn new(alphabet: &Alphabet, k: usize) -> Result<Self> {
        Ok(Self::zeroed(k, alphabet.word_count(k)?))
    }

    fn zeroed(k: usize, word_count: usize) -> Self {
        Self {
            k,
            counts: vec![0; word_count],
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn get(&self, rank: usize) -> u64 {
        self.counts[rank]
    }

    /// The count of a word, or `None` if it is not a word of this table.
    pub fn count_of(&self, alphabet: &Alphabet, word: &[u8]) -> Option<u64> {
        if word.len() != self.k {
            return None;
        }
        alphabet.rank(word).map(|rank| self.counts[rank])
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn max(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Adds the windows of an upper-case sequence to the table and returns how many were counted.
    pub fn count_kmers(&mut self, alphabet: &Alphabet, sequence: &[u8]) -> usize {
        let mut counted = 0;
        for rank in alphabet.window_ranks(sequence, self.k) {
            self.counts[rank] += 1;
            counted += 1;
        }
        counted
    }

    pub fn merge(&mut self, other: &Self) {
        assert_eq!(self.k, other.k);
        for (count, other_count) in self.counts.iter_mut().zip(&other.counts) {
            *count += other_count;
        }
    }

    /// All words with their counts in lexicographic order.
    pub fn iter<'table>(
        &'table self,
        alphabet: &'table Alphabet,
    ) -> impl Iterator<Item = (Vec<u8>, u64)> + 'table {
        self.counts
            .iter()
            .enumerate()
            .map(|(rank, count)| (alphabet.word(rank, self.k), *count))
    }
}

/// GC symbol count and total length over a set of records.
///
/// The total length includes wildcards and symbols outside the alphabet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcTally {
    gc_count: u64,
    total_length: u64,
}

impl GcTally {
    /// Adds an upper-case record.
    pub fn add(&mut self, alphabet: &Alphabet, record: &[u8]) {
        self.gc_count += alphabet.count_gc(record) as u64;
        self.total_length += record.len() as u64;
    }

    pub fn merge(&mut self, other: Self) {
        self.gc_count += other.gc_count;
        self.total_length += other.total_length;
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// `None` if no symbol was seen.
    pub fn fraction(&self) -> Option<f64> {
        (self.total_length > 0).then(|| self.gc_count as f64 / self.total_length as f64)
    }
}

/// Accumulates word counts and GC content over sequence records.
#[derive(Debug, Clone)]
pub struct KmerProfiler<'alphabet> {
    alphabet: &'alphabet Alphabet,
    table: KmerCountTable,
    gc: GcTally,
    record_count: usize,
}

impl<'alphabet> KmerProfiler<'alphabet> {
    pub fn new(alphabet: &'alphabet Alphabet, k: usize) -> Result<Self> {
        Ok(Self::with_table(alphabet, KmerCountTable::new(alphabet, k)?))
    }

    fn with_table(alphabet: &'alphabet Alphabet, table: KmerCountTable) -> Self {
        Self {
            alphabet,
            table,
            gc: GcTally::default(),
            record_count: 0,
        }
    }

    pub fn add_record(&mut self, record: &[u8]) {
        let record = record.to_ascii_uppercase();
        self.gc.add(self.alphabet, &record);
        self.record_count += 1;
        self.table.count_kmers(self.alphabet, &record);
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.table.merge(&other.table);
        self.gc.merge(other.gc);
        self.record_count += other.record_count;
        self
    }

    pub fn table(&self) -> &KmerCountTable {
        &self.table
    }

    /// The GC fraction over all records seen so far, or `None` if they were all empty.
    pub fn gc_fraction(&self) -> Option<f64> {
        self.gc.fraction()
    }

    pub fn finish(self, config: &ProfileConfig) -> Result<GenomeProfile> {
        let total = self.table.total();
        info!(
            "Profiled {} records with {} symbols and {} valid {}-mers",
            self.record_count,
            self.gc.total_length(),
            total,
            self.table.k
        );
        let gc_fraction = self
            .gc_fraction()
            .ok_or(Error::DegenerateProfile { k: self.table.k })?;
        debug!("Input GC fraction: {gc_fraction}");

        GenomeProfile::from_parts(self.alphabet.clone(), self.table, gc_fraction, config)
    }
}

/// The GC fraction of all records taken together.
pub fn compute_gc_fraction<Record: AsRef<[u8]>>(
    alphabet: &Alphabet,
    records: impl IntoIterator<Item = Record>,
) -> Option<f64> {
    records
        .into_iter()
        .fold(GcTally::default(), |mut tally, record| {
            tally.add(alphabet, &record.as_ref().to_ascii_uppercase());
            tally
        })
        .fraction()
}

/// The k-mer composition and GC content of a genome together with its Markov chain.
#[derive(Debug, Clone)]
pub struct GenomeProfile {
    alphabet: Alphabet,
    k: usize,
    gc_fraction: f64,
    gc_weight: f64,
    similar: bool,
    unseen_context_policy: UnseenContextPolicy,
    table: KmerCountTable,
    chain: MarkovChain,
}

impl GenomeProfile {
    /// Profiles a stream of records.
    ///
    /// A failing record stops profiling with [`Error::InputRead`].
    pub fn from_records<Record: AsRef<[u8]>>(
        records: impl IntoIterator<Item = std::io::Result<Record>>,
        alphabet: &Alphabet,
        config: &ProfileConfig,
        cancellation: Option<&AtomicBool>,
    ) -> Result<Self> {
        config.validate()?;
        let mut profiler = KmerProfiler::new(alphabet, config.k)?;

        for record in records {
            ensure_not_cancelled(cancellation)?;
            let record = record.map_err(Error::InputRead)?;
            profiler.add_record(record.as_ref());
        }

        profiler.finish(config)
    }

    /// Like [`Self::from_records`], but records are streamed to the rayon
    /// workers and the partial profiles are merged.
    ///
    /// Each worker holds one count table, so memory grows with the number of
    /// threads and not with the number of records.
    pub fn from_records_parallel<Record, Records>(
        records: Records,
        alphabet: &Alphabet,
        config: &ProfileConfig,
        cancellation: Option<&AtomicBool>,
    ) -> Result<Self>
    where
        Record: AsRef<[u8]> + Send,
        Records: IntoIterator<Item = std::io::Result<Record>>,
        Records::IntoIter: Send,
    {
        config.validate()?;
        let word_count = alphabet.word_count(config.k)?;
        let empty =
            || KmerProfiler::with_table(alphabet, KmerCountTable::zeroed(config.k, word_count));

        let profiler = records
            .into_iter()
            .par_bridge()
            .try_fold(empty, |mut profiler, record| {
                ensure_not_cancelled(cancellation)?;
                let record = record.map_err(Error::InputRead)?;
                profiler.add_record(record.as_ref());
                Ok::<_, Error>(profiler)
            })
            .try_reduce_with(|left, right| Ok(left.merge(right)));

        match profiler {
            Some(profiler) => profiler?.finish(config),
            None => empty().finish(config),
        }
    }

    fn from_parts(
        alphabet: Alphabet,
        table: KmerCountTable,
        gc_fraction: f64,
        config: &ProfileConfig,
    ) -> Result<Self> {
        config.validate()?;
        assert_eq!(table.k(), config.k);

        if table.total() == 0 {
            return Err(Error::DegenerateProfile { k: config.k });
        }

        let gc_fraction = config.fixed_gc.unwrap_or(gc_fraction);
        let chain = MarkovChain::from_table(&alphabet, &table, config.unseen_context_policy)?;

        Ok(Self {
            alphabet,
            k: config.k,
            gc_fraction,
            gc_weight: config.gc_weight,
            similar: config.similar,
            unseen_context_policy: config.unseen_context_policy,
            table,
            chain,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// The target GC fraction, either fixed or derived from the input.
    pub fn gc_fraction(&self) -> f64 {
        self.gc_fraction
    }

    pub fn gc_weight(&self) -> f64 {
        self.gc_weight
    }

    pub fn similar(&self) -> bool {
        self.similar
    }

    pub fn unseen_context_policy(&self) -> UnseenContextPolicy {
        self.unseen_context_policy
    }

    pub fn table(&self) -> &KmerCountTable {
        &self.table
    }

    pub fn chain(&self) -> &MarkovChain {
        &self.chain
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use crate::{alphabet::Alphabet, config::ProfileConfig, error::Error};

    use super::{compute_gc_fraction, GcTally, GenomeProfile, KmerCountTable, KmerProfiler};

    fn config(k: usize) -> ProfileConfig {
        ProfileConfig {
            k,
            ..Default::default()
        }
    }

    fn records(records: &[&str]) -> Vec<std::io::Result<Vec<u8>>> {
        records
            .iter()
            .map(|record| Ok(record.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn count_table_starts_complete() {
        let alphabet = Alphabet::dna();
        let table = KmerCountTable::new(&alphabet, 3).unwrap();
        assert_eq!(table.len(), 64);
        assert_eq!(table.total(), 0);
        assert_eq!(table.iter(&alphabet).count(), 64);
    }

    #[test]
    fn acgt_counts() {
        let alphabet = Alphabet::dna();
        let profile =
            GenomeProfile::from_records(records(&["ACGT"]), &alphabet, &config(2), None).unwrap();
        let table = profile.table();

        for (word, count) in table.iter(&alphabet) {
            let expected = u64::from(matches!(word.as_slice(), b"AC" | b"CG" | b"GT"));
            assert_eq!(count, expected, "{}", String::from_utf8_lossy(&word));
        }
        assert_eq!(table.count_of(&alphabet, b"CG"), Some(1));
        assert_eq!(table.count_of(&alphabet, b"CGT"), None);
        assert_eq!(profile.gc_fraction(), 0.5);
    }

    #[test]
    fn lower_case_and_wildcards() {
        let alphabet = Alphabet::dna();
        let profile =
            GenomeProfile::from_records(records(&["acNgt"]), &alphabet, &config(2), None).unwrap();
        let table = profile.table();

        assert_eq!(table.total(), 2);
        assert_eq!(table.count_of(&alphabet, b"AC"), Some(1));
        assert_eq!(table.count_of(&alphabet, b"CG"), Some(0));
        assert_eq!(table.count_of(&alphabet, b"GT"), Some(1));
        assert_eq!(profile.gc_fraction(), 2.0 / 5.0);
    }

    #[test]
    fn gc_fraction_is_aggregate() {
        let alphabet = Alphabet::dna();
        let gc_fraction = compute_gc_fraction(&alphabet, ["gggg", "AAAAAAAA"]).unwrap();
        assert!((gc_fraction - 4.0 / 12.0).abs() < 1e-12);
        assert_eq!(compute_gc_fraction(&alphabet, Vec::<&[u8]>::new()), None);
    }

    #[test]
    fn fixed_gc_overrides_input() {
        let alphabet = Alphabet::dna();
        let config = ProfileConfig {
            k: 2,
            fixed_gc: Some(0.7),
            ..Default::default()
        };
        let profile =
            GenomeProfile::from_records(records(&["AAAT"]), &alphabet, &config, None).unwrap();
        assert_eq!(profile.gc_fraction(), 0.7);
    }

    #[test]
    fn degenerate_inputs() {
        let alphabet = Alphabet::dna();
        let inputs: [&[&str]; 4] = [&["AC"], &["NNNNNN"], &[""], &[]];
        for input in inputs {
            assert!(matches!(
                GenomeProfile::from_records(records(input), &alphabet, &config(3), None),
                Err(Error::DegenerateProfile { k: 3 })
            ));
        }
    }

    #[test]
    fn read_failure_is_distinct() {
        let alphabet = Alphabet::dna();
        let records = vec![
            Ok(b"ACGTACGT".to_vec()),
            Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "truncated record",
            )),
        ];
        assert!(matches!(
            GenomeProfile::from_records(records, &alphabet, &config(2), None),
            Err(Error::InputRead(_))
        ));
    }

    #[test]
    fn invalid_configuration_is_rejected_first() {
        let alphabet = Alphabet::dna();
        assert!(matches!(
            GenomeProfile::from_records(records(&["ACGT"]), &alphabet, &config(1), None),
            Err(Error::WordLengthTooShort(1))
        ));
    }

    #[test]
    fn cancelled_profiling() {
        let alphabet = Alphabet::dna();
        let cancelled = AtomicBool::new(true);
        assert!(matches!(
            GenomeProfile::from_records(
                records(&["ACGT"]),
                &alphabet,
                &config(2),
                Some(&cancelled)
            ),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn parallel_profile_matches_sequential() {
        let alphabet = Alphabet::dna();
        let inputs = [
            "ACGTTGCAAGGCTTAACG",
            "GGGGCCCCAAAATTTT",
            "ACNNNTGCA",
            "TTTTTTTT",
            "CAGTCAGTCAGT",
        ];
        let sequential =
            GenomeProfile::from_records(records(&inputs), &alphabet, &config(3), None).unwrap();
        let parallel =
            GenomeProfile::from_records_parallel(records(&inputs), &alphabet, &config(3), None)
                .unwrap();

        assert_eq!(sequential.table(), parallel.table());
        assert_eq!(sequential.gc_fraction(), parallel.gc_fraction());
        assert_eq!(sequential.chain(), parallel.chain());
    }

    #[test]
    fn merged_profilers() {
        let alphabet = Alphabet::dna();
        let mut left = KmerProfiler::new(&alphabet, 2).unwrap();
        left.add_record(b"ACGT");
        let mut right = KmerProfiler::new(&alphabet, 2).unwrap();
        right.add_record(b"GGAA");

        let merged = left.merge(right);
        assert_eq!(merged.table().total(), 6);
        assert_eq!(merged.gc_fraction(), Some(0.5));
    }

    #[test]
    fn parallel_profile_streams_records() {
        let alphabet = Alphabet::dna();
        let inputs = ["ACGTTGCA", "ggccNNaatt", "TTTACG"];
        // A lazy stream, never collected into a slice.
        let stream = inputs
            .iter()
            .map(|record| Ok::<_, std::io::Error>(record.as_bytes()));
        let parallel =
            GenomeProfile::from_records_parallel(stream, &alphabet, &config(2), None).unwrap();
        let sequential =
            GenomeProfile::from_records(records(&inputs), &alphabet, &config(2), None).unwrap();

        assert_eq!(parallel.table(), sequential.table());
        assert_eq!(parallel.gc_fraction(), sequential.gc_fraction());
    }

    #[test]
    fn parallel_profile_errors() {
        let alphabet = Alphabet::dna();
        let failing = vec![
            Ok(b"ACGTACGT".to_vec()),
            Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "truncated record",
            )),
            Ok(b"GGCCAATT".to_vec()),
        ];
        assert!(matches!(
            GenomeProfile::from_records_parallel(failing, &alphabet, &config(2), None),
            Err(Error::InputRead(_))
        ));

        assert!(matches!(
            GenomeProfile::from_records_parallel(records(&[]), &alphabet, &config(2), None),
            Err(Error::DegenerateProfile { k: 2 })
        ));

        let cancelled = AtomicBool::new(true);
        assert!(matches!(
            GenomeProfile::from_records_parallel(
                records(&["ACGT"]),
                &alphabet,
                &config(2),
                Some(&cancelled)
            ),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn profiler_and_gc_fraction_agree() {
        let alphabet = Alphabet::dna();
        let inputs = ["acgtNNgc", "GGGA", "xTTc"];
        let mut profiler = KmerProfiler::new(&alphabet, 2).unwrap();
        let mut tally = GcTally::default();
        for input in inputs {
            profiler.add_record(input.as_bytes());
            tally.add(&alphabet, &input.as_bytes().to_ascii_uppercase());
        }

        assert_eq!(profiler.gc_fraction(), compute_gc_fraction(&alphabet, inputs));
        assert_eq!(profiler.gc_fraction(), tally.fraction());
        assert_eq!(tally.fraction(), Some(0.5));
    }
}
