use crate::error::{Error, Result};

/// The largest number of words a table over one word length may hold.
pub const MAX_TABLE_SIZE: usize = 1 << 28;

/// An ordered set of symbols with a GC subset and a wildcard symbol.
///
/// Symbol indices follow the order in which the symbols were given, and
/// word ranks are the base-`size` numbers formed by the symbol indices.
/// Hence ranking words is the same as ordering them lexicographically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<u8>,
    is_gc: Vec<bool>,
    wildcard: u8,
    indices: [Option<u8>; 256],
}

impl Alphabet {
    pub fn new(symbols: &[u8], gc_symbols: &[u8], wildcard: u8) -> Result<Self> {
        if symbols.len() < 2 || symbols.len() > usize::from(u8::MAX) {
            return Err(Error::InvalidAlphabet(format!(
                "an alphabet needs between 2 and {} symbols, but {} were given",
                u8::MAX,
                symbols.len()
            )));
        }

        let mut indices = [None; 256];
        let mut normalised = Vec::with_capacity(symbols.len());
        for (index, symbol) in symbols.iter().map(u8::to_ascii_uppercase).enumerate() {
            if !symbol.is_ascii_graphic() {
                return Err(Error::InvalidAlphabet(format!(
                    "symbol {symbol:#04x} is not a printable ASCII character"
                )));
            }
            if indices[usize::from(symbol)].is_some() {
                return Err(Error::InvalidAlphabet(format!(
                    "symbol {} appears more than once",
                    char::from(symbol)
                )));
            }
            indices[usize::from(symbol)] = Some(index as u8);
            normalised.push(symbol);
        }

        let wildcard = wildcard.to_ascii_uppercase();
        if indices[usize::from(wildcard)].is_some() {
            return Err(Error::InvalidAlphabet(format!(
                "the wildcard {} is also an alphabet symbol",
                char::from(wildcard)
            )));
        }

        let mut is_gc = vec![false; normalised.len()];
        for symbol in gc_symbols.iter().map(u8::to_ascii_uppercase) {
            let index = indices[usize::from(symbol)].ok_or_else(|| {
                Error::InvalidAlphabet(format!(
                    "GC symbol {} is not an alphabet symbol",
                    char::from(symbol)
                ))
            })?;
            is_gc[usize::from(index)] = true;
        }
        let gc_size = is_gc.iter().filter(|is_gc| **is_gc).count();
        if gc_size == 0 || gc_size == normalised.len() {
            return Err(Error::InvalidAlphabet(
                "both the GC subset and its complement must be non-empty".to_string(),
            ));
        }

        Ok(Self {
            symbols: normalised,
            is_gc,
            wildcard,
            indices,
        })
    }

    /// The nucleotide alphabet `ACGT` with GC subset `CG` and wildcard `N`.
    pub fn dna() -> Self {
        Self::new(b"ACGT", b"CG", b'N').expect("the DNA alphabet is valid")
    }

    pub fn size(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    pub fn symbol(&self, index: usize) -> u8 {
        self.symbols[index]
    }

    pub fn wildcard(&self) -> u8 {
        self.wildcard
    }

    pub fn gc_symbols(&self) -> impl Iterator<Item = u8> + '_ {
        self.symbols
            .iter()
            .zip(&self.is_gc)
            .filter(|(_, is_gc)| **is_gc)
            .map(|(symbol, _)| *symbol)
    }

    pub fn gc_size(&self) -> usize {
        self.is_gc.iter().filter(|is_gc| **is_gc).count()
    }

    pub fn index_of(&self, symbol: u8) -> Option<usize> {
        self.indices[usize::from(symbol)].map(usize::from)
    }

    pub fn is_gc(&self, index: usize) -> bool {
        self.is_gc[index]
    }

    pub fn is_gc_symbol(&self, symbol: u8) -> bool {
        self.index_of(symbol)
            .map(|index| self.is_gc[index])
            .unwrap_or(false)
    }

    /// Counts the GC symbols in an upper-case sequence.
    pub fn count_gc(&self, sequence: &[u8]) -> usize {
        sequence
            .iter()
            .filter(|symbol| self.is_gc_symbol(**symbol))
            .count()
    }

    /// The number of words of the given length, if a table over them is supported.
    pub fn word_count(&self, length: usize) -> Result<usize> {
        u32::try_from(length)
            .ok()
            .and_then(|length| self.size().checked_pow(length))
            .filter(|count| *count <= MAX_TABLE_SIZE)
            .ok_or(Error::UnsupportedWordLength {
                k: length,
                alphabet_size: self.size(),
            })
    }

    /// The rank of a word, or `None` if it contains a symbol outside the alphabet.
    pub fn rank(&self, word: &[u8]) -> Option<usize> {
        word.iter().try_fold(0usize, |rank, symbol| {
            self.index_of(*symbol)
                .map(|index| rank * self.size() + index)
        })
    }

    pub fn word(&self, mut rank: usize, length: usize) -> Vec<u8> {
        let mut word = vec![0; length];
        for position in (0..length).rev() {
            word[position] = self.symbols[rank % self.size()];
            rank /= self.size();
        }
        word
    }

    /// The ranks of all windows of length `k` in an upper-case sequence,
    /// skipping windows that contain the wildcard or any other symbol outside the alphabet.
    ///
    /// `k` must be a length accepted by [`Self::word_count`].
    pub fn window_ranks<'sequence>(
        &'sequence self,
        sequence: &'sequence [u8],
        k: usize,
    ) -> impl Iterator<Item = usize> + 'sequence {
        let modulus = self.size().pow(k as u32);
        let mut rank = 0;
        let mut run = 0;

        sequence
            .iter()
            .filter_map(move |symbol| match self.index_of(*symbol) {
                Some(index) => {
                    rank = (rank * self.size() + index) % modulus;
                    run += 1;
                    (run >= k).then_some(rank)
                }
                None => {
                    rank = 0;
                    run = 0;
                    None
                }
            })
    }

    /// All words of the given length in lexicographic order.
    pub fn enumerate_words(&self, length: usize) -> Result<Vec<Vec<u8>>> {
        let count = self.word_count(length)?;
        let mut words = Vec::with_capacity(count);
        let mut digits = vec![0usize; length];

        for _ in 0..count {
            words.push(digits.iter().map(|digit| self.symbols[*digit]).collect());
            for digit in digits.iter_mut().rev() {
                *digit += 1;
                if *digit < self.size() {
                    break;
                }
                *digit = 0;
            }
        }

        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;

    use super::Alphabet;

    #[test]
    fn enumerate_words_is_lexicographic() {
        let alphabet = Alphabet::dna();
        let words = alphabet.enumerate_words(2).unwrap();

        assert_eq!(words.len(), 16);
        assert_eq!(words[0], b"AA");
        assert_eq!(words[1], b"AC");
        assert_eq!(words[4], b"CA");
        assert_eq!(words[15], b"TT");

        let mut sorted = words.clone();
        sorted.sort();
        assert_eq!(words, sorted);

        assert_eq!(alphabet.enumerate_words(0).unwrap(), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn ranks_match_enumeration() {
        let alphabet = Alphabet::dna();
        for (rank, word) in alphabet.enumerate_words(3).unwrap().iter().enumerate() {
            assert_eq!(alphabet.rank(word), Some(rank));
            assert_eq!(&alphabet.word(rank, 3), word);
        }
        assert_eq!(alphabet.rank(b"ANA"), None);
    }

    #[test]
    fn window_ranks_skip_unknown_symbols() {
        let alphabet = Alphabet::dna();
        let ranks: Vec<_> = alphabet.window_ranks(b"ACGNTTA", 2).collect();
        let expected: Vec<_> = [b"AC", b"CG", b"TT", b"TA"]
            .iter()
            .map(|word| alphabet.rank(*word).unwrap())
            .collect();
        assert_eq!(ranks, expected);

        assert_eq!(alphabet.window_ranks(b"ACGT", 4).count(), 1);
        assert_eq!(alphabet.window_ranks(b"ACG", 4).count(), 0);
    }

    #[test]
    fn gc_symbols() {
        let alphabet = Alphabet::dna();
        assert_eq!(alphabet.gc_symbols().collect::<Vec<_>>(), b"CG");
        assert_eq!(alphabet.gc_size(), 2);
        assert_eq!(alphabet.count_gc(b"ACGTNGG"), 4);
        assert!(!alphabet.is_gc_symbol(b'N'));
    }

    #[test]
    fn lower_case_definition() {
        let alphabet = Alphabet::new(b"acgt", b"gc", b'n').unwrap();
        assert_eq!(alphabet, Alphabet::dna());
    }

    #[test]
    fn invalid_alphabets() {
        assert!(matches!(
            Alphabet::new(b"A", b"A", b'N'),
            Err(Error::InvalidAlphabet(_))
        ));
        assert!(matches!(
            Alphabet::new(b"ACGA", b"CG", b'N'),
            Err(Error::InvalidAlphabet(_))
        ));
        assert!(matches!(
            Alphabet::new(b"ACGT", b"CG", b'A'),
            Err(Error::InvalidAlphabet(_))
        ));
        assert!(matches!(
            Alphabet::new(b"ACGT", b"", b'N'),
            Err(Error::InvalidAlphabet(_))
        ));
        assert!(matches!(
            Alphabet::new(b"ACGT", b"ACGT", b'N'),
            Err(Error::InvalidAlphabet(_))
        ));
        assert!(matches!(
            Alphabet::new(b"ACGT", b"CX", b'N'),
            Err(Error::InvalidAlphabet(_))
        ));
    }

    #[test]
    fn word_count_limit() {
        let alphabet = Alphabet::dna();
        assert_eq!(alphabet.word_count(8).unwrap(), 65536);
        assert!(matches!(
            alphabet.word_count(20),
            Err(Error::UnsupportedWordLength {
                k: 20,
                alphabet_size: 4
            })
        ));
    }
}
