use log::debug;

use crate::{
    alphabet::Alphabet,
    config::UnseenContextPolicy,
    error::{Error, Result},
    kmer_profile::KmerCountTable,
};

/// An order-(k-1) Markov chain over an alphabet.
///
/// Rows are contexts of length k-1 and columns are successor symbols,
/// both indexed by their rank in the alphabet. Every row sums to one.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovChain {
    context_length: usize,
    alphabet_size: usize,
    matrix: Vec<f64>,
    unseen_contexts: usize,
}

impl MarkovChain {
    pub fn from_table(
        alphabet: &Alphabet,
        table: &KmerCountTable,
        unseen_context_policy: UnseenContextPolicy,
    ) -> Result<Self> {
        let alphabet_size = alphabet.size();
        let context_length = table.k() - 1;
        let row_count = alphabet.word_count(context_length)?;
        let mut matrix = vec![0.0; row_count * alphabet_size];

        // rank(kmer) = rank(context) * alphabet_size + index(last symbol)
        for (rank, count) in table.counts().iter().enumerate() {
            let row = rank / alphabet_size;
            let column = rank % alphabet_size;
            matrix[row * alphabet_size + column] = *count as f64;
        }

        let mut unseen_contexts = 0;
        for (row_index, row) in matrix.chunks_mut(alphabet_size).enumerate() {
            let sum: f64 = row.iter().sum();
            if sum > 0.0 {
                row.iter_mut().for_each(|probability| *probability /= sum);
            } else {
                match unseen_context_policy {
                    UnseenContextPolicy::Uniform => {
                        row.fill(1.0 / alphabet_size as f64);
                        unseen_contexts += 1;
                    }
                    UnseenContextPolicy::Reject => {
                        return Err(Error::UnseenContext {
                            context: String::from_utf8_lossy(
                                &alphabet.word(row_index, context_length),
                            )
                            .into_owned(),
                        })
                    }
                }
            }
        }

        debug!("{unseen_contexts} of {row_count} contexts were never observed");

        Ok(Self {
            context_length,
            alphabet_size,
            matrix,
            unseen_contexts,
        })
    }

    pub fn context_length(&self) -> usize {
        self.context_length
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    pub fn row_count(&self) -> usize {
        self.matrix.len() / self.alphabet_size
    }

    /// The number of contexts that received the uniform fallback distribution.
    pub fn unseen_contexts(&self) -> usize {
        self.unseen_contexts
    }

    /// The successor distribution of the context with the given rank.
    pub fn row(&self, context_rank: usize) -> &[f64] {
        let offset = context_rank * self.alphabet_size;
        &self.matrix[offset..offset + self.alphabet_size]
    }

    pub fn context_row(&self, alphabet: &Alphabet, context: &[u8]) -> Option<&[f64]> {
        if context.len() != self.context_length {
            return None;
        }
        alphabet.rank(context).map(|rank| self.row(rank))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.matrix.chunks(self.alphabet_size)
    }

    /// The probability of `symbol` following `context`.
    pub fn transition(&self, alphabet: &Alphabet, context: &[u8], symbol: u8) -> Option<f64> {
        let column = alphabet.index_of(symbol)?;
        self.context_row(alphabet, context).map(|row| row[column])
    }
}
