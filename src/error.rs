use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("failed to read sequence records: {0}")]
    InputRead(#[source] std::io::Error),

    #[error("profile serialisation error: {0}")]
    ProfileSerialisation(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("profile deserialisation error: {0}")]
    ProfileDeserialisation(#[from] ciborium::de::Error<std::io::Error>),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("either a FASTA file or a profile file is required as input")]
    MissingInput,

    #[error("invalid alphabet: {0}")]
    InvalidAlphabet(String),

    #[error("the word length k = {0} is too short, it must be at least 2")]
    WordLengthTooShort(usize),

    #[error("the word length k = {k} is not supported for an alphabet of size {alphabet_size}")]
    UnsupportedWordLength { k: usize, alphabet_size: usize },

    #[error("the given fixed GC fraction is not a number")]
    FixedGcIsNaN,

    #[error("the given fixed GC fraction {0} is out of range [0.0, 1.0]")]
    FixedGcOutOfRange(f64),

    #[error("the given GC weight {0} is not a finite non-negative number")]
    GcWeightInvalid(f64),

    #[error("the GC fraction {0} is out of range [0.0, 1.0]")]
    GcFractionOutOfRange(f64),

    #[error("the requested sequence length {length} is lower than k {k}")]
    LengthLowerThanK { length: usize, k: usize },

    #[error("the requested sequence length is zero")]
    ZeroLength,

    #[error("the input contains no valid {k}-mer, the profile is empty")]
    DegenerateProfile { k: usize },

    #[error("the context {context} was never observed in the input")]
    UnseenContext { context: String },

    #[error("sequence {index} is empty and cannot be scored")]
    EmptySequence { index: usize },

    #[error("the operation was cancelled")]
    Cancelled,
}
