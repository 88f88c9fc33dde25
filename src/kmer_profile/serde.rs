use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    alphabet::Alphabet,
    config::{ProfileConfig, UnseenContextPolicy},
    error::{Error, Result},
};

use super::{GenomeProfile, KmerCountTable};

/// The stored form of a profile. Only words that occur are listed,
/// and the Markov chain is rebuilt when loading.
#[derive(Serialize, Deserialize)]
struct StoredProfile {
    symbols: String,
    gc_symbols: String,
    wildcard: char,
    k: usize,
    gc_fraction: f64,
    gc_weight: f64,
    similar: bool,
    unseen_context_policy: UnseenContextPolicy,
    counts: BTreeMap<String, u64>,
}

impl From<&GenomeProfile> for StoredProfile {
    fn from(profile: &GenomeProfile) -> Self {
        let alphabet = profile.alphabet();
        Self {
            symbols: String::from_utf8_lossy(alphabet.symbols()).into_owned(),
            gc_symbols: alphabet.gc_symbols().map(char::from).collect(),
            wildcard: char::from(alphabet.wildcard()),
            k: profile.k(),
            gc_fraction: profile.gc_fraction(),
            gc_weight: profile.gc_weight(),
            similar: profile.similar(),
            unseen_context_policy: profile.unseen_context_policy(),
            counts: profile
                .table()
                .iter(alphabet)
                .filter(|(_, count)| *count > 0)
                .map(|(word, count)| (String::from_utf8_lossy(&word).into_owned(), count))
                .collect(),
        }
    }
}

impl TryFrom<StoredProfile> for GenomeProfile {
    type Error = Error;

    fn try_from(stored: StoredProfile) -> Result<Self> {
        if !stored.wildcard.is_ascii() {
            return Err(Error::InvalidAlphabet(format!(
                "the wildcard {} is not an ASCII character",
                stored.wildcard
            )));
        }
        let alphabet = Alphabet::new(
            stored.symbols.as_bytes(),
            stored.gc_symbols.as_bytes(),
            stored.wildcard as u8,
        )?;

        if !(0.0..=1.0).contains(&stored.gc_fraction) {
            return Err(Error::GcFractionOutOfRange(stored.gc_fraction));
        }

        let config = ProfileConfig {
            k: stored.k,
            gc_weight: stored.gc_weight,
            similar: stored.similar,
            fixed_gc: None,
            unseen_context_policy: stored.unseen_context_policy,
        };
        config.validate()?;

        let mut table = KmerCountTable::new(&alphabet, stored.k)?;
        for (word, count) in stored.counts {
            let rank = alphabet
                .rank(word.as_bytes())
                .filter(|_| word.len() == stored.k)
                .ok_or_else(|| {
                    Error::InvalidAlphabet(format!(
                        "the stored word {word} is not a {}-mer over the alphabet",
                        stored.k
                    ))
                })?;
            table.counts[rank] = count;
        }

        GenomeProfile::from_parts(alphabet, table, stored.gc_fraction, &config)
    }
}

impl Serialize for GenomeProfile {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        StoredProfile::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GenomeProfile {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        StoredProfile::deserialize(deserializer)?
            .try_into()
            .map_err(de::Error::custom)
    }
}
